use regex::Regex;

use super::patterns::{Field, PatternTable};
use super::types::*;
use crate::models::DocumentType;

/// Run `table` over `text`. Baseline fields first, then the fields
/// specific to `document_type`.
pub fn extract_with(table: &PatternTable, text: &str, document_type: DocumentType) -> ExtractedData {
    let patient_name = text_field(table, Field::PatientName, text);
    let date = text_field(table, Field::Date, text);
    let diagnosis = text_field(table, Field::Diagnosis, text);

    let details = match document_type {
        DocumentType::PhysioAssessment => DocumentDetails::PhysioAssessment(PhysioFields {
            pain_level: first_capture(table.patterns(Field::PainLevel), text)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            mobility_assessment: text_field(table, Field::Mobility, text),
            therapy_goals: text_field(table, Field::TherapyGoals, text),
        }),
        DocumentType::MedicalReport => DocumentDetails::MedicalReport(ReportFields {
            icd10_codes: table
                .icd10
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
            medications: first_capture(table.patterns(Field::Medications), text)
                .map(|list| list.split(',').map(|m| m.trim().to_string()).collect())
                .unwrap_or_default(),
            recommendations: text_field(table, Field::Recommendations, text),
        }),
        DocumentType::LabResults => DocumentDetails::LabResults(LabFields {
            lab_values: lab_values(&table.lab_value_line, text),
            reference_ranges: reference_ranges(&table.reference_range_line, text),
        }),
        DocumentType::Radiology => DocumentDetails::Radiology(RadiologyFields {
            imaging_findings: text_field(table, Field::ImagingFindings, text),
            impression: text_field(table, Field::Impression, text),
        }),
        DocumentType::Generic => DocumentDetails::Generic,
    };

    ExtractedData {
        patient_name,
        date,
        diagnosis,
        details,
    }
}

/// Capture group 1 of the first pattern that matches (whole match if the
/// pattern has no group).
fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<&'t str> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(text)?;
        caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
    })
}

fn text_field(table: &PatternTable, field: Field, text: &str) -> String {
    first_capture(table.patterns(field), text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Accepts `7.2` and `7,2`. Anything else is 0.
fn parse_decimal(s: &str) -> f64 {
    s.replace(',', ".").parse().unwrap_or(0.0)
}

fn lab_values(line_re: &Regex, text: &str) -> Vec<LabValue> {
    text.lines()
        .filter_map(|line| line_re.captures(line))
        .map(|caps| LabValue {
            parameter: caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
            value: caps.get(2).map(|m| parse_decimal(m.as_str())).unwrap_or(0.0),
            unit: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect()
}

fn reference_ranges(line_re: &Regex, text: &str) -> Vec<ReferenceRange> {
    text.lines()
        .filter_map(|line| line_re.captures(line))
        .map(|caps| ReferenceRange {
            min: caps.get(1).map(|m| parse_decimal(m.as_str())).unwrap_or(0.0),
            max: caps.get(2).map(|m| parse_decimal(m.as_str())).unwrap_or(0.0),
        })
        .collect()
}
