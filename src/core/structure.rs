//! Survey structure snapshots
//!
//! The `SurveyStructure` join table only lists the questions that were
//! actually presented in a survey. A snapshot records, for every
//! (survey, question) pair the database knows about, whether that question
//! was asked. Snapshots are compared through a canonical text form so that a
//! structure reloaded from a cache file matches the one read from the driver.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::database::DbError;

/// Column headers of a persisted structure file
pub const STRUCTURE_HEADER: [&str; 3] = ["SurveyId", "QuestionId", "IsAsked"];

/// A single (survey, question, asked) inference result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StructureRecord {
    #[serde(rename = "SurveyId")]
    pub survey_id: i64,
    #[serde(rename = "QuestionId")]
    pub question_id: i64,
    #[serde(rename = "IsAsked")]
    pub asked: bool,
}

impl StructureRecord {
    pub fn new(survey_id: i64, question_id: i64, asked: bool) -> Self {
        Self {
            survey_id,
            question_id,
            asked,
        }
    }

    /// Parse a record from its three text fields, normalizing numeric and
    /// flag representations (`3.0` is question 3, `True` is asked).
    pub fn from_text_fields(
        survey_id: &str,
        question_id: &str,
        asked: &str,
    ) -> Result<Self, CanonicalError> {
        Ok(Self {
            survey_id: parse_id(survey_id)?,
            question_id: parse_id(question_id)?,
            asked: parse_flag(asked)?,
        })
    }

    /// Flag as written to cache files and compared between snapshots
    pub fn asked_flag(&self) -> &'static str {
        if self.asked {
            "1"
        } else {
            "0"
        }
    }

    pub fn canonical(&self) -> CanonicalRecord {
        CanonicalRecord {
            survey_id: self.survey_id.to_string(),
            question_id: self.question_id.to_string(),
            asked: self.asked_flag().to_string(),
        }
    }
}

/// Fixed textual form of a structure record used for equality checks
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalRecord {
    pub survey_id: String,
    pub question_id: String,
    pub asked: String,
}

impl fmt::Display for CanonicalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.survey_id, self.question_id, self.asked)
    }
}

/// Errors raised while normalizing a text field into a structure value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("invalid identifier '{0}'")]
    InvalidId(String),

    #[error("invalid asked flag '{0}'")]
    InvalidFlag(String),
}

fn parse_id(text: &str) -> Result<i64, CanonicalError> {
    let text = text.trim();
    if let Ok(id) = text.parse::<i64>() {
        return Ok(id);
    }
    match text.parse::<f64>() {
        Ok(value)
            if value.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&value) =>
        {
            Ok(value as i64)
        }
        _ => Err(CanonicalError::InvalidId(text.to_string())),
    }
}

fn parse_flag(text: &str) -> Result<bool, CanonicalError> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" => return Ok(true),
        "false" | "no" => return Ok(false),
        _ => {}
    }
    // Older structure files may hold the raw match count
    match text.parse::<f64>() {
        Ok(count) if count.is_finite() && count >= 0.0 => Ok(count > 0.0),
        _ => Err(CanonicalError::InvalidFlag(text.to_string())),
    }
}

/// The complete structure inference result for one database state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StructureSnapshot {
    records: Vec<StructureRecord>,
}

impl StructureSnapshot {
    pub fn new(records: Vec<StructureRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StructureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct survey ids, ascending
    pub fn survey_ids(&self) -> Vec<i64> {
        let ids: BTreeSet<i64> = self.records.iter().map(|r| r.survey_id).collect();
        ids.into_iter().collect()
    }

    /// Distinct question ids across every survey, ascending.
    ///
    /// This is the universal column list of the pivot view: each survey
    /// block must carry all of them, in this order.
    pub fn question_ids(&self) -> Vec<i64> {
        let ids: BTreeSet<i64> = self.records.iter().map(|r| r.question_id).collect();
        ids.into_iter().collect()
    }

    /// Asked question ids per survey. Every survey in the snapshot has an
    /// entry, possibly empty.
    pub fn asked_by_survey(&self) -> BTreeMap<i64, BTreeSet<i64>> {
        let mut asked: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
        for record in &self.records {
            let questions = asked.entry(record.survey_id).or_default();
            if record.asked {
                questions.insert(record.question_id);
            }
        }
        asked
    }

    /// Sorted canonical records; row order does not take part in equality
    pub fn canonical(&self) -> Vec<CanonicalRecord> {
        let mut canonical: Vec<CanonicalRecord> =
            self.records.iter().map(StructureRecord::canonical).collect();
        canonical.sort();
        canonical
    }

    /// Compare two snapshots by canonical content
    pub fn same_structure(&self, other: &StructureSnapshot) -> bool {
        self.canonical() == other.canonical()
    }

    /// SHA-256 of the canonical form, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for record in self.canonical() {
            hasher.update(record.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Source of survey structure rows
pub trait StructureSource {
    /// All survey ids, ascending
    fn survey_ids(&self) -> Result<Vec<i64>, DbError>;

    /// Structure rows of one survey, ordered by question id
    fn survey_structure(&self, survey_id: i64) -> Result<Vec<StructureRecord>, DbError>;
}

/// Build the structure snapshot survey by survey.
///
/// Any query failure aborts the inference; no partial snapshot is returned.
pub fn infer_structure<S: StructureSource + ?Sized>(
    source: &S,
) -> Result<StructureSnapshot, DbError> {
    let mut records = Vec::new();
    for survey_id in source.survey_ids()? {
        let rows = source.survey_structure(survey_id)?;
        tracing::debug!(survey_id, rows = rows.len(), "survey structure loaded");
        records.extend(rows);
    }
    Ok(StructureSnapshot::new(records))
}
