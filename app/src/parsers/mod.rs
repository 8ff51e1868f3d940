// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for the OASIS cohort CSV files
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-14
// Version: 1.0.0
// ==============================================================================

pub mod columns;
pub mod cohort;

pub use columns::{CanonicalColumn, ColumnMap};
pub use cohort::{CohortParseError, CohortParser};
