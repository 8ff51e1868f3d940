// ==============================================================================
// lib.rs - Cohort Statistics Library
// ==============================================================================
// Description: Library interface shared by the CLI and the HTTP service
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

pub mod analysis;
pub mod dataset;
pub mod models;
pub mod output;
pub mod parsers;
pub mod stats;
pub mod summarizer;
pub mod validator;
