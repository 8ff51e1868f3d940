// ==============================================================================
// columns.rs - Canonical Column Schema
// ==============================================================================
// Description: Maps the drifting header names of the cohort CSV exports onto a
//              single canonical schema, resolved once per file at load time
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-14
// Version: 1.0.0
// ==============================================================================
// Known drift between exports:
//   Educ / EDUC, ID / Subject ID, M/F / Sex / Gender
// ==============================================================================

use std::collections::HashMap;
use tracing::debug;

use crate::models::CohortKind;

/// Canonical column of the cohort schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalColumn {
    SubjectId,
    Sex,
    Age,
    Education,
    Ses,
    Mmse,
    Cdr,
    Etiv,
    Nwbv,
    Visit,
    Group,
}

impl CanonicalColumn {
    /// Columns both cohorts must provide
    const SHARED: [CanonicalColumn; 9] = [
        CanonicalColumn::SubjectId,
        CanonicalColumn::Sex,
        CanonicalColumn::Age,
        CanonicalColumn::Education,
        CanonicalColumn::Ses,
        CanonicalColumn::Mmse,
        CanonicalColumn::Cdr,
        CanonicalColumn::Etiv,
        CanonicalColumn::Nwbv,
    ];

    pub fn required(kind: CohortKind) -> Vec<CanonicalColumn> {
        let mut columns = Self::SHARED.to_vec();
        if kind == CohortKind::Longitudinal {
            columns.push(CanonicalColumn::Visit);
            columns.push(CanonicalColumn::Group);
        }
        columns
    }

    /// Canonical header name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalColumn::SubjectId => "ID",
            CanonicalColumn::Sex => "M/F",
            CanonicalColumn::Age => "Age",
            CanonicalColumn::Education => "Educ",
            CanonicalColumn::Ses => "SES",
            CanonicalColumn::Mmse => "MMSE",
            CanonicalColumn::Cdr => "CDR",
            CanonicalColumn::Etiv => "eTIV",
            CanonicalColumn::Nwbv => "nWBV",
            CanonicalColumn::Visit => "Visit",
            CanonicalColumn::Group => "Group",
        }
    }

    /// Match a raw header against the alias table
    ///
    /// Matching ignores case, quotes, whitespace and underscores.
    pub fn from_header(header: &str) -> Option<CanonicalColumn> {
        let key: String = header
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '/')
            .collect::<String>()
            .to_ascii_lowercase();

        let column = match key.as_str() {
            "id" | "subjectid" | "subject" => CanonicalColumn::SubjectId,
            "m/f" | "sex" | "gender" => CanonicalColumn::Sex,
            "age" => CanonicalColumn::Age,
            "educ" | "education" | "educationyears" => CanonicalColumn::Education,
            "ses" => CanonicalColumn::Ses,
            "mmse" => CanonicalColumn::Mmse,
            "cdr" => CanonicalColumn::Cdr,
            "etiv" => CanonicalColumn::Etiv,
            "nwbv" => CanonicalColumn::Nwbv,
            "visit" => CanonicalColumn::Visit,
            "group" => CanonicalColumn::Group,
            _ => return None,
        };
        Some(column)
    }
}

/// Header positions of every recognized canonical column
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    positions: HashMap<CanonicalColumn, usize>,
}

impl ColumnMap {
    /// Resolve a header row; the first header matching a column wins.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut positions = HashMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            match CanonicalColumn::from_header(header) {
                Some(column) => {
                    if positions.contains_key(&column) {
                        debug!("Ignoring duplicate column '{}' at position {}", header, idx);
                    } else {
                        positions.insert(column, idx);
                    }
                }
                None => debug!("Ignoring unrecognized column '{}'", header),
            }
        }
        Self { positions }
    }

    pub fn position(&self, column: CanonicalColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    /// First required column of `kind` absent from the header row
    pub fn first_missing(&self, kind: CohortKind) -> Option<CanonicalColumn> {
        CanonicalColumn::required(kind)
            .into_iter()
            .find(|c| !self.positions.contains_key(c))
    }
}
