// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates cohort CSV inputs (existence, size, type, header) and
//              records a SHA-256 provenance hash before parsing
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-15
// Version: 1.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MAX_FILE_SIZE: u64 = 200 * 1024 * 1024; // 200 MB

/// Provenance of a validated input file
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub extension: String,
    pub size: u64,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct FileValidator {
    max_file_size: u64,
    allowed_types: HashMap<String, Vec<u8>>,
}

impl FileValidator {
    pub fn new() -> Self {
        let mut allowed_types = HashMap::new();

        // Plain CSV (no specific magic number)
        allowed_types.insert("csv".to_string(), vec![]);

        // Gzip compressed CSV
        allowed_types.insert("csv.gz".to_string(), vec![0x1f, 0x8b, 0x08]);

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {:?}", file_path))?
            .to_string_lossy()
            .to_string();

        info!("Validating input file: {}", file_name);

        // 1. Existence and size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Input file not found: {:?}", file_path))?;

        if !metadata.is_file() {
            anyhow::bail!("Not a regular file: {:?}", file_path);
        }

        let size = metadata.len();
        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        if size == 0 {
            anyhow::bail!("File is empty: {}", file_name);
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension check (allowlist)
        let ext = self.get_extension(&file_name)?;
        let expected_magic = self
            .allowed_types
            .get(&ext)
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 3. Magic number verification
        if !expected_magic.is_empty() {
            let actual_magic = self.read_magic_number(file_path)?;
            if !self.verify_magic_number(expected_magic, &actual_magic) {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 4. Content validation (header row present)
        self.validate_header(file_path, &ext)?;
        debug!("Header check passed");

        // 5. Compute SHA-256 hash
        let hash = self.compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedFile {
            path: file_path.to_path_buf(),
            file_name,
            extension: ext,
            size,
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }

    fn get_extension(&self, filename: &str) -> Result<String> {
        let lowered = filename.to_lowercase();

        // Compound extension
        if lowered.ends_with(".csv.gz") {
            return Ok("csv.gz".to_string());
        }

        match lowered.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Ok(ext.to_string()),
            _ => anyhow::bail!("No file extension found: {}", filename),
        }
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; 4];
        let n = file.read(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    fn verify_magic_number(&self, expected: &[u8], actual: &[u8]) -> bool {
        expected.len() <= actual.len()
            && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
    }

    fn validate_header(&self, path: &Path, ext: &str) -> Result<()> {
        let file = File::open(path)?;
        let reader: Box<dyn Read> = match ext {
            "csv.gz" => Box::new(GzDecoder::new(file)),
            _ => Box::new(file),
        };
        let mut lines = BufReader::new(reader).lines();

        let header = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("File has no header row"))?
            .context("Failed to read header row")?;

        let columns = header.split(',').filter(|c| !c.trim().is_empty()).count();
        if columns < 2 {
            anyhow::bail!(
                "Invalid CSV header: expected comma-separated columns, found {}",
                columns
            );
        }

        Ok(())
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}
