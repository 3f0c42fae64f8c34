use std::sync::LazyLock;

use regex::Regex;

/// Single-valued text fields. Each has an ordered pattern list; the first
/// pattern that matches anywhere in the text supplies capture group 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PatientName,
    Date,
    Diagnosis,
    PainLevel,
    Mobility,
    TherapyGoals,
    Medications,
    Recommendations,
    ImagingFindings,
    Impression,
}

/// The full set of regexes the extractor runs.
///
/// `german()` is the built-in table. Callers may start from it and swap
/// individual fields via [`PatternTable::with_field`].
#[derive(Debug, Clone)]
pub struct PatternTable {
    pub patient_name: Vec<Regex>,
    pub date: Vec<Regex>,
    pub diagnosis: Vec<Regex>,
    pub pain_level: Vec<Regex>,
    pub mobility: Vec<Regex>,
    pub therapy_goals: Vec<Regex>,
    pub medications: Vec<Regex>,
    pub recommendations: Vec<Regex>,
    pub imaging_findings: Vec<Regex>,
    pub impression: Vec<Regex>,
    /// Scanned globally, every match kept.
    pub icd10: Regex,
    /// Applied per line: parameter, value, optional unit.
    pub lab_value_line: Regex,
    /// Applied per line: min, max.
    pub reference_range_line: Regex,
}

static GERMAN: LazyLock<PatternTable> = LazyLock::new(|| PatternTable {
    patient_name: compile(&[
        r"(?i)Name[:\s]*([A-Za-zÄÖÜäöüß\s,]+)(?:\n|Geb)",
        r"(?i)Patient[:\s]*([A-Za-zÄÖÜäöüß\s,]+)(?:\n|,)",
    ]),
    date: compile(&[r"(?i)Datum[:\s]*(\d{1,2}\.\d{1,2}\.\d{4})", r"(\d{1,2}\.\d{1,2}\.\d{4})"]),
    diagnosis: compile(&[r"(?i)Diagnose[:\s]*([^\n]+)", r"(?i)Befund[:\s]*([^\n]+)"]),
    pain_level: compile(&[
        r"(?i)Schmerz[:\s]*(\d+)",
        r"(\d+)/10",
        r"(?i)Schmerzstärke[:\s]*(\d+)",
    ]),
    mobility: compile(&[r"(?i)Mobilität[:\s]*([^\n]+)", r"(?i)Beweglichkeit[:\s]*([^\n]+)"]),
    therapy_goals: compile(&[r"(?i)Therapieziele?[:\s]*([^\n]+)", r"(?i)Ziele?[:\s]*([^\n]+)"]),
    medications: compile(&[r"(?i)Medikation[:\s]*([^\n]+)", r"(?i)Medikamente[:\s]*([^\n]+)"]),
    recommendations: compile(&[
        r"(?i)Empfehlung[:\s]*([^\n]+)",
        r"(?i)Therapieempfehlung[:\s]*([^\n]+)",
    ]),
    imaging_findings: compile(&[r"(?i)Befund[:\s]*([^\n]+)", r"(?i)Ergebnis[:\s]*([^\n]+)"]),
    impression: compile(&[r"(?i)Beurteilung[:\s]*([^\n]+)", r"(?i)Eindruck[:\s]*([^\n]+)"]),
    icd10: Regex::new(r"([A-Z]\d{2}\.\d)").unwrap(),
    lab_value_line: Regex::new(r"([A-Za-zÄÖÜäöüß\s]+):\s*(\d+[,.]?\d*)\s*([A-Za-z/]+)?").unwrap(),
    reference_range_line: Regex::new(r"Referenz[:\s]*(\d+[,.]?\d*)\s*-\s*(\d+[,.]?\d*)").unwrap(),
});

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources.iter().map(|s| Regex::new(s).unwrap()).collect()
}

impl PatternTable {
    /// Built-in German table.
    pub fn german() -> &'static PatternTable {
        &GERMAN
    }

    pub fn patterns(&self, field: Field) -> &[Regex] {
        match field {
            Field::PatientName => &self.patient_name,
            Field::Date => &self.date,
            Field::Diagnosis => &self.diagnosis,
            Field::PainLevel => &self.pain_level,
            Field::Mobility => &self.mobility,
            Field::TherapyGoals => &self.therapy_goals,
            Field::Medications => &self.medications,
            Field::Recommendations => &self.recommendations,
            Field::ImagingFindings => &self.imaging_findings,
            Field::Impression => &self.impression,
        }
    }

    /// Replace the pattern list of one field. Order is match priority.
    pub fn with_field(mut self, field: Field, sources: &[&str]) -> Result<Self, regex::Error> {
        let compiled = sources
            .iter()
            .map(|s| Regex::new(s))
            .collect::<Result<Vec<_>, _>>()?;
        let slot = match field {
            Field::PatientName => &mut self.patient_name,
            Field::Date => &mut self.date,
            Field::Diagnosis => &mut self.diagnosis,
            Field::PainLevel => &mut self.pain_level,
            Field::Mobility => &mut self.mobility,
            Field::TherapyGoals => &mut self.therapy_goals,
            Field::Medications => &mut self.medications,
            Field::Recommendations => &mut self.recommendations,
            Field::ImagingFindings => &mut self.imaging_findings,
            Field::Impression => &mut self.impression,
        };
        *slot = compiled;
        Ok(self)
    }
}
