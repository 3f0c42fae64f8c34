use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::DocumentType;

/// Structured fields pulled out of one recognized document.
///
/// The baseline fields are always present. Missing values are empty
/// strings, zero or empty lists, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub patient_name: String,
    /// As written in the document, usually `dd.mm.yyyy`.
    pub date: String,
    pub diagnosis: String,
    #[serde(flatten)]
    pub details: DocumentDetails,
}

/// Type-specific fields, tagged by document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentDetails {
    PhysioAssessment(PhysioFields),
    MedicalReport(ReportFields),
    LabResults(LabFields),
    Radiology(RadiologyFields),
    Generic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysioFields {
    pub pain_level: i32,
    pub mobility_assessment: String,
    pub therapy_goals: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFields {
    pub icd10_codes: Vec<String>,
    pub medications: Vec<String>,
    pub recommendations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabValue {
    pub parameter: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabFields {
    pub lab_values: Vec<LabValue>,
    pub reference_ranges: Vec<ReferenceRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadiologyFields {
    pub imaging_findings: String,
    pub impression: String,
}

impl DocumentDetails {
    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::PhysioAssessment(_) => DocumentType::PhysioAssessment,
            Self::MedicalReport(_) => DocumentType::MedicalReport,
            Self::LabResults(_) => DocumentType::LabResults,
            Self::Radiology(_) => DocumentType::Radiology,
            Self::Generic => DocumentType::Generic,
        }
    }
}

impl ExtractedData {
    /// The extracted `dd.mm.yyyy` date as a calendar date, if it is one.
    pub fn document_date(&self) -> Option<NaiveDate> {
        parse_german_date(&self.date)
    }
}

/// Parse `d.m.yyyy` / `dd.mm.yyyy`.
pub fn parse_german_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().splitn(3, '.');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
