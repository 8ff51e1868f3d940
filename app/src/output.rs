// ==============================================================================
// output.rs - Report Output Generation
// ==============================================================================
// Description: Write analysis reports as JSON, plain-text annotation blocks or
//              a queryable SQLite database
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

// SQLite for queryable database
use rusqlite::{params, Connection, Transaction};

use crate::analysis::{AnalysisReport, CorrelationReport, DescriptiveReport, EducationReport};
use crate::dataset::Cohorts;
use crate::models::{CohortKind, Variable};
use crate::summarizer::{CohortSummary, RegressionSummary, SexAssociation, VariableComparison};

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON (best for web APIs and JavaScript)
    Json,
    /// Plain-text annotation block (best for terminals)
    Text,
    /// SQLite database (best for querying and exploration)
    Sqlite,
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
            OutputFormat::Sqlite => "db",
        }
    }

    /// Get MIME type for HTTP downloads
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Text => "text/plain; charset=utf-8",
            OutputFormat::Sqlite => "application/vnd.sqlite3",
        }
    }

    /// SQLite output cannot be streamed to stdout
    pub fn requires_file(&self) -> bool {
        matches!(self, OutputFormat::Sqlite)
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            "sqlite" | "db" => Ok(OutputFormat::Sqlite),
            _ => anyhow::bail!("Invalid output format '{}' (expected json, text or sqlite)", s),
        }
    }
}

/// Report writer bound to the cohorts the report was computed from
pub struct ReportWriter<'a> {
    cohorts: &'a Cohorts,
    generated_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> ReportWriter<'a> {
    pub fn new(cohorts: &'a Cohorts) -> Self {
        Self {
            cohorts,
            generated_at: chrono::Utc::now(),
        }
    }

    /// Write `report` to `path` in `format`
    pub fn write(&self, report: &AnalysisReport, format: OutputFormat, path: &Path) -> Result<PathBuf> {
        info!("Writing {} report to {:?}", format.extension(), path);

        match format {
            OutputFormat::Json => {
                std::fs::write(path, render_json(report)?)
                    .with_context(|| format!("Failed to write JSON report {:?}", path))?;
            }
            OutputFormat::Text => {
                std::fs::write(path, render_text(report)?)
                    .with_context(|| format!("Failed to write text report {:?}", path))?;
            }
            OutputFormat::Sqlite => self.write_sqlite(report, path)?,
        }

        Ok(path.to_path_buf())
    }

    /// Generate SQLite output (queryable database)
    fn write_sqlite(&self, report: &AnalysisReport, path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path).with_context(|| format!("Failed to replace existing database {:?}", path))?;
        }

        let mut conn = Connection::open(path).context("Failed to create SQLite database")?;

        conn.execute_batch(
            "CREATE TABLE comparisons (
                dataset TEXT NOT NULL,
                variable TEXT NOT NULL,
                label TEXT NOT NULL,
                reference_condition TEXT NOT NULL,
                reference_n INTEGER NOT NULL,
                reference_mean REAL,
                reference_sd REAL,
                affected_condition TEXT NOT NULL,
                affected_n INTEGER NOT NULL,
                affected_mean REAL,
                affected_sd REAL,
                t_statistic REAL,
                p_value REAL,
                not_available TEXT,
                PRIMARY KEY (dataset, variable)
            );
            CREATE TABLE associations (
                dataset TEXT PRIMARY KEY,
                statistic REAL,
                degrees_of_freedom INTEGER,
                p_value REAL,
                yates_corrected INTEGER NOT NULL,
                not_available TEXT
            );
            CREATE TABLE prevalence (
                dataset TEXT NOT NULL,
                sex TEXT NOT NULL,
                total INTEGER NOT NULL,
                affected INTEGER NOT NULL,
                percent_affected REAL,
                not_available TEXT,
                PRIMARY KEY (dataset, sex)
            );
            CREATE TABLE correlations (
                dataset TEXT NOT NULL,
                variable_a TEXT NOT NULL,
                variable_b TEXT NOT NULL,
                r REAL,
                n INTEGER NOT NULL,
                PRIMARY KEY (dataset, variable_a, variable_b)
            );
            CREATE TABLE regressions (
                dataset TEXT NOT NULL,
                response TEXT NOT NULL,
                predictor TEXT NOT NULL,
                n INTEGER,
                slope REAL,
                intercept REAL,
                r REAL,
                r_squared REAL,
                slope_std_err REAL,
                t_statistic REAL,
                p_value REAL,
                not_available TEXT,
                PRIMARY KEY (dataset, response, predictor)
            );
            CREATE TABLE anova (
                dataset TEXT NOT NULL,
                response TEXT NOT NULL,
                factor TEXT NOT NULL,
                f_statistic REAL,
                df_between INTEGER,
                df_within INTEGER,
                p_value REAL,
                groups INTEGER,
                not_available TEXT,
                PRIMARY KEY (dataset, response, factor)
            );
            CREATE TABLE education_levels (
                dataset TEXT NOT NULL,
                level INTEGER NOT NULL,
                condition TEXT NOT NULL,
                count INTEGER NOT NULL,
                level_mean_mmse REAL,
                PRIMARY KEY (dataset, level, condition)
            );
            CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("Failed to create report tables")?;

        let tx = conn.transaction().context("Failed to start transaction")?;
        self.insert_metadata(&tx, report)?;

        match report {
            AnalysisReport::Descriptive { datasets } => {
                for dataset in datasets {
                    insert_summary(&tx, &dataset.summary)?;
                }
            }
            AnalysisReport::Education { datasets } => {
                for dataset in datasets {
                    insert_education(&tx, dataset)?;
                }
            }
            AnalysisReport::Correlation { datasets } => {
                for dataset in datasets {
                    insert_correlations(&tx, dataset)?;
                }
            }
            AnalysisReport::Predictive { message } => {
                tx.execute(
                    "INSERT INTO metadata (key, value) VALUES ('message', ?1)",
                    params![message],
                )
                .context("Failed to insert placeholder message")?;
            }
        }
        tx.commit().context("Failed to commit report")?;

        info!("SQLite output complete: {:?}", path);
        Ok(())
    }

    fn insert_metadata(&self, tx: &Transaction<'_>, report: &AnalysisReport) -> Result<()> {
        let mut items: Vec<(String, String)> = vec![
            ("generated_at".to_string(), self.generated_at.to_rfc3339()),
            ("category".to_string(), report.category().to_string()),
            ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ];

        for kind in CohortKind::ALL {
            let table = self.cohorts.table(kind);
            items.push((format!("{}_rows", kind), table.records().len().to_string()));
            if let Some(provenance) = table.provenance() {
                items.push((format!("{}_file", kind), provenance.file_name.clone()));
                items.push((format!("{}_sha256", kind), provenance.hash_sha256.clone()));
            }
        }

        let mut stmt = tx
            .prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")
            .context("Failed to prepare metadata insert")?;
        for (key, value) in &items {
            stmt.execute(params![key, value]).context("Failed to insert metadata")?;
        }

        Ok(())
    }
}

fn insert_summary(tx: &Transaction<'_>, summary: &CohortSummary) -> Result<()> {
    for comparison in &summary.comparisons {
        insert_comparison(tx, summary.dataset, comparison)?;
    }
    insert_association(tx, summary.dataset, &summary.sex_association)?;

    let mut stmt = tx
        .prepare(
            "INSERT INTO prevalence (dataset, sex, total, affected, percent_affected, not_available)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .context("Failed to prepare prevalence insert")?;
    for row in &summary.prevalence {
        stmt.execute(params![
            summary.dataset.as_str(),
            row.sex.as_str(),
            row.total as i64,
            row.affected as i64,
            row.percent_affected,
            row.not_available.map(|r| r.as_str()),
        ])
        .context("Failed to insert prevalence row")?;
    }

    if let Some(regression) = &summary.regression {
        insert_regression(tx, summary.dataset, regression)?;
    }

    Ok(())
}

fn insert_education(tx: &Transaction<'_>, report: &EducationReport) -> Result<()> {
    insert_comparison(tx, report.dataset, &report.education_comparison)?;

    let mut stmt = tx
        .prepare(
            "INSERT INTO education_levels (dataset, level, condition, count, level_mean_mmse)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .context("Failed to prepare education level insert")?;
    for count in &report.level_distribution {
        let mean_mmse = report
            .mmse_by_level
            .groups
            .iter()
            .find(|g| g.level == count.level)
            .and_then(|g| g.mean_mmse);
        stmt.execute(params![
            report.dataset.as_str(),
            count.level.value(),
            count.condition.as_str(),
            count.count as i64,
            mean_mmse,
        ])
        .context("Failed to insert education level")?;
    }

    let anova = &report.mmse_by_level;
    let test = anova.test.as_ref();
    tx.execute(
        "INSERT INTO anova (dataset, response, factor, f_statistic, df_between, df_within, p_value, groups, not_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            report.dataset.as_str(),
            Variable::Mmse.as_str(),
            "education_level",
            test.map(|t| t.f_statistic),
            test.map(|t| t.df_between as i64),
            test.map(|t| t.df_within as i64),
            test.map(|t| t.p_value),
            test.map(|t| t.groups as i64),
            anova.not_available.map(|r| r.as_str()),
        ],
    )
    .context("Failed to insert ANOVA")?;

    insert_regression(tx, report.dataset, &report.regression)
}

fn insert_regression(tx: &Transaction<'_>, dataset: CohortKind, regression: &RegressionSummary) -> Result<()> {
    let fit = regression.fit.as_ref();
    tx.execute(
        "INSERT INTO regressions (dataset, response, predictor, n, slope, intercept, r, r_squared,
             slope_std_err, t_statistic, p_value, not_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            dataset.as_str(),
            regression.response.as_str(),
            regression.predictor.as_str(),
            fit.map(|f| f.n as i64),
            fit.map(|f| f.slope),
            fit.map(|f| f.intercept),
            fit.map(|f| f.r),
            fit.map(|f| f.r_squared),
            fit.map(|f| f.slope_std_err),
            fit.and_then(|f| f.t_statistic),
            fit.map(|f| f.p_value),
            regression.not_available.map(|r| r.as_str()),
        ],
    )
    .context("Failed to insert regression")?;
    Ok(())
}

fn insert_comparison(tx: &Transaction<'_>, dataset: CohortKind, comparison: &VariableComparison) -> Result<()> {
    tx.execute(
        "INSERT INTO comparisons (dataset, variable, label, reference_condition, reference_n, reference_mean,
             reference_sd, affected_condition, affected_n, affected_mean, affected_sd, t_statistic, p_value, not_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            dataset.as_str(),
            comparison.variable.as_str(),
            comparison.label,
            comparison.reference.condition.as_str(),
            comparison.reference.count as i64,
            comparison.reference.mean,
            comparison.reference.std_dev,
            comparison.affected.condition.as_str(),
            comparison.affected.count as i64,
            comparison.affected.mean,
            comparison.affected.std_dev,
            comparison.t_statistic,
            comparison.p_value,
            comparison.not_available.map(|r| r.as_str()),
        ],
    )
    .context("Failed to insert comparison")?;
    Ok(())
}

fn insert_association(tx: &Transaction<'_>, dataset: CohortKind, association: &SexAssociation) -> Result<()> {
    tx.execute(
        "INSERT INTO associations (dataset, statistic, degrees_of_freedom, p_value, yates_corrected, not_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            dataset.as_str(),
            association.statistic,
            association.degrees_of_freedom.map(|d| d as i64),
            association.p_value,
            association.yates_corrected,
            association.not_available.map(|r| r.as_str()),
        ],
    )
    .context("Failed to insert association")?;
    Ok(())
}

fn insert_correlations(tx: &Transaction<'_>, report: &CorrelationReport) -> Result<()> {
    let matrix = &report.matrix;
    let mut stmt = tx
        .prepare("INSERT INTO correlations (dataset, variable_a, variable_b, r, n) VALUES (?1, ?2, ?3, ?4, ?5)")
        .context("Failed to prepare correlation insert")?;

    for (i, a) in matrix.variables.iter().enumerate() {
        for (j, b) in matrix.variables.iter().enumerate().skip(i + 1) {
            stmt.execute(params![
                report.dataset.as_str(),
                a.as_str(),
                b.as_str(),
                matrix.coefficients[i][j],
                matrix.observations[i][j] as i64,
            ])
            .context("Failed to insert correlation")?;
        }
    }

    Ok(())
}

// ------------------------------------------------------------------------------
// Renderers
// ------------------------------------------------------------------------------

pub fn render_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Fixed five-decimal p-value, or N/A
fn format_p(p: Option<f64>) -> String {
    match p {
        Some(p) => format!("{:.5}", p),
        None => "N/A".to_string(),
    }
}

fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

/// Plain-text rendering, one block per dataset
pub fn render_text(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();
    write_text(&mut out, report).context("Failed to render text report")?;
    Ok(out)
}

fn write_text(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    match report {
        AnalysisReport::Descriptive { datasets } => {
            for dataset in datasets {
                render_descriptive(out, dataset)?;
            }
        }
        AnalysisReport::Education { datasets } => {
            for dataset in datasets {
                render_education(out, dataset)?;
            }
        }
        AnalysisReport::Correlation { datasets } => {
            for dataset in datasets {
                render_correlation(out, dataset)?;
            }
        }
        AnalysisReport::Predictive { message } => {
            writeln!(out, "{}", message)?;
        }
    }
    Ok(())
}

fn render_regression(out: &mut String, regression: &RegressionSummary) -> fmt::Result {
    let fit = regression.fit.as_ref();
    writeln!(
        out,
        "{} ~ {} - slope: {}, r-squared: {}, p-value: {}",
        regression.response.label(),
        regression.predictor.label(),
        format_value(fit.map(|f| f.slope), 4),
        format_value(fit.map(|f| f.r_squared), 4),
        format_p(fit.map(|f| f.p_value))
    )
}

fn render_descriptive(out: &mut String, report: &DescriptiveReport) -> fmt::Result {
    let summary = &report.summary;
    writeln!(out, "{} Data", report.title)?;
    writeln!(
        out,
        "{}: {}, {}: {}, excluded: {}",
        summary.groups.reference, summary.reference_rows, summary.groups.affected, summary.affected_rows, summary.excluded_rows
    )?;

    for comparison in &summary.comparisons {
        writeln!(out, "{} - p-value: {}", comparison.label, format_p(comparison.p_value))?;
    }
    writeln!(out, "Gender - p-value: {}", format_p(summary.sex_association.p_value))?;

    for row in &summary.prevalence {
        writeln!(
            out,
            "{} - {} prevalence: {}% ({}/{})",
            row.sex,
            summary.groups.affected,
            format_value(row.percent_affected, 2),
            row.affected,
            row.total
        )?;
    }

    if let Some(regression) = &summary.regression {
        render_regression(out, regression)?;
    }
    writeln!(out)
}

fn render_education(out: &mut String, report: &EducationReport) -> fmt::Result {
    writeln!(out, "{} Data", report.title)?;

    for count in &report.level_distribution {
        writeln!(out, "Education level {} - {}: {}", count.level.value(), count.condition, count.count)?;
    }

    let comparison = &report.education_comparison;
    writeln!(out, "{} - p-value: {}", comparison.label, format_p(comparison.p_value))?;

    let anova = &report.mmse_by_level;
    writeln!(
        out,
        "MMSE by Education Level - F: {}, p-value: {}",
        format_value(anova.test.as_ref().map(|t| t.f_statistic), 3),
        format_p(anova.test.as_ref().map(|t| t.p_value))
    )?;

    render_regression(out, &report.regression)?;
    writeln!(out)
}

fn render_correlation(out: &mut String, report: &CorrelationReport) -> fmt::Result {
    let matrix = &report.matrix;
    writeln!(out, "{} Data (n = {})", report.title, report.observations)?;

    write!(out, "{:>10}", "")?;
    for variable in &matrix.variables {
        write!(out, "{:>10}", variable.as_str())?;
    }
    writeln!(out)?;

    for (i, variable) in matrix.variables.iter().enumerate() {
        write!(out, "{:>10}", variable.as_str())?;
        for coefficient in &matrix.coefficients[i] {
            write!(out, "{:>10}", format_value(*coefficient, 3))?;
        }
        writeln!(out)?;
    }
    writeln!(out)
}
