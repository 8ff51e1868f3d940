// ==============================================================================
// cohort.rs - OASIS Cohort CSV Parser
// ==============================================================================
// Description: Parser for the pre-processed cross-sectional and longitudinal
//              OASIS CSV exports into canonical cohort records
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================
// Format: CSV with header, plain or gzip-compressed (.csv.gz)
// Example (cross-sectional):
//   ID,M/F,Hand,Age,Educ,SES,MMSE,CDR,eTIV,nWBV,ASF
//   OAS1_0001_MR1,F,R,74,2,3,29,0,1344,0.743,1.306
// Example (longitudinal):
//   Subject ID,MRI ID,Group,Visit,MR Delay,M/F,Hand,Age,EDUC,SES,MMSE,CDR,eTIV,nWBV,ASF
//   OAS2_0001,OAS2_0001_MR1,Nondemented,1,0,M,R,87,14,2,27,0,1987,0.696,0.883
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::columns::{CanonicalColumn, ColumnMap};
use crate::models::{ClinicalGroup, CohortKind, CohortRecord, Sex, VisitInfo};

/// Cell values treated as missing
const MISSING_TOKENS: [&str; 6] = ["", "na", "nan", "n/a", "null", "none"];

/// Errors that can occur during cohort file parsing
#[derive(Error, Debug)]
pub enum CohortParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column '{column}' in {kind} dataset")]
    MissingColumn { column: &'static str, kind: CohortKind },

    #[error("Invalid {column} value at line {line}: '{value}'")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("File is empty or contains no data rows")]
    EmptyFile,
}

/// Parser for one cohort's CSV export
#[derive(Debug, Clone, Copy)]
pub struct CohortParser {
    kind: CohortKind,
}

impl CohortParser {
    pub fn new(kind: CohortKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> CohortKind {
        self.kind
    }

    /// Parse a cohort file
    ///
    /// Paths ending in `.gz` are decompressed transparently. Derived columns
    /// (`condition`, `education_level`) are filled in on every record.
    ///
    /// # Returns
    /// * `Ok(Vec<CohortRecord>)` - Every data row, including rows that carry no Condition
    /// * `Err(CohortParseError)` - I/O, CSV, schema or value error
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Vec<CohortRecord>, CohortParseError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let is_gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        if is_gzip {
            debug!("Reading gzip-compressed cohort file {:?}", path);
            self.parse_reader(GzDecoder::new(file))
        } else {
            self.parse_reader(file)
        }
    }

    /// Parse CSV content from any reader
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Vec<CohortRecord>, CohortParseError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = ColumnMap::from_headers(headers.iter());

        if let Some(missing) = columns.first_missing(self.kind) {
            return Err(CohortParseError::MissingColumn {
                column: missing.name(),
                kind: self.kind,
            });
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            records.push(self.parse_row(&row, &columns)?);
        }

        if records.is_empty() {
            return Err(CohortParseError::EmptyFile);
        }

        debug!("Parsed {} {} rows", records.len(), self.kind);
        Ok(records)
    }

    fn parse_row(&self, row: &StringRecord, columns: &ColumnMap) -> Result<CohortRecord, CohortParseError> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let cell = Cell { row, columns, line };

        let subject_id = cell.text(CanonicalColumn::SubjectId).map(str::to_string);

        let sex = cell
            .text(CanonicalColumn::Sex)
            .map(|raw| raw.parse::<Sex>().map_err(|_| cell.invalid(CanonicalColumn::Sex)))
            .transpose()?;

        let age = match cell.number(CanonicalColumn::Age)? {
            Some(age) if age <= 0.0 => return Err(cell.invalid(CanonicalColumn::Age)),
            age => age,
        };

        let visit = match self.kind {
            CohortKind::CrossSectional => None,
            CohortKind::Longitudinal => {
                let number = match cell.number(CanonicalColumn::Visit)? {
                    Some(v) if v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Some(v as u32),
                    Some(_) => return Err(cell.invalid(CanonicalColumn::Visit)),
                    None => None,
                };
                let group = cell
                    .text(CanonicalColumn::Group)
                    .map(|raw| raw.parse::<ClinicalGroup>().map_err(|_| cell.invalid(CanonicalColumn::Group)))
                    .transpose()?;
                Some(VisitInfo { number, group })
            }
        };

        if age.is_none() || sex.is_none() {
            debug!("Line {}: blank age or sex, kept as not available", line);
        }

        let record = CohortRecord {
            subject_id,
            age,
            sex,
            education_years: cell.number(CanonicalColumn::Education)?,
            ses: cell.number(CanonicalColumn::Ses)?,
            cdr: cell.number(CanonicalColumn::Cdr)?,
            mmse: cell.number(CanonicalColumn::Mmse)?,
            etiv: cell.number(CanonicalColumn::Etiv)?,
            nwbv: cell.number(CanonicalColumn::Nwbv)?,
            visit,
            condition: None,
            education_level: None,
        };

        Ok(record.derive())
    }
}

/// Typed access to the cells of one data row
struct Cell<'a> {
    row: &'a StringRecord,
    columns: &'a ColumnMap,
    line: u64,
}

impl<'a> Cell<'a> {
    fn raw(&self, column: CanonicalColumn) -> &'a str {
        self.columns
            .position(column)
            .and_then(|idx| self.row.get(idx))
            .unwrap_or("")
    }

    /// Non-missing text value
    fn text(&self, column: CanonicalColumn) -> Option<&'a str> {
        let raw = self.raw(column).trim_matches('"');
        if is_missing(raw) {
            None
        } else {
            Some(raw)
        }
    }

    /// Optional numeric value; present but unparseable cells are errors
    fn number(&self, column: CanonicalColumn) -> Result<Option<f64>, CohortParseError> {
        let Some(raw) = self.text(column) else {
            return Ok(None);
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            Ok(_) => Ok(None),
            Err(_) => Err(self.invalid(column)),
        }
    }

    fn invalid(&self, column: CanonicalColumn) -> CohortParseError {
        CohortParseError::InvalidValue {
            line: self.line,
            column: column.name(),
            value: self.raw(column).to_string(),
        }
    }
}

fn is_missing(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    MISSING_TOKENS.contains(&lowered.as_str())
}
