//! OCR invocation boundary.
//!
//! `SimulatedOcr` stands in for a recognition engine with canned German
//! documents; `RemoteOcr` calls an HTTP endpoint. Both run the extraction
//! engine over the recognized text so `extracted_data` is always typed.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::extraction::{extract_with, ExtractedData, PatternTable};
use crate::models::DocumentType;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("file_path ist erforderlich")]
    MissingFilePath,

    #[error("Cannot reach OCR endpoint at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("OCR endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unreadable OCR response: {0}")]
    ResponseParsing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRequest {
    pub file_path: String,
    pub document_type: DocumentType,
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrOutput {
    pub raw_text: String,
    pub extracted_data: ExtractedData,
    /// 0.0..=1.0
    pub confidence: f64,
    pub processing_time_ms: i64,
}

pub trait OcrService: Send + Sync {
    fn recognize(&self, request: &OcrRequest) -> Result<OcrOutput, OcrError>;
}

// ═══════════════════════════════════════════════════════════
// Simulated recognition
// ═══════════════════════════════════════════════════════════

/// Per-document-type confidence reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceTable {
    pub physio_assessment: f64,
    pub medical_report: f64,
    pub lab_results: f64,
    pub radiology: f64,
    pub generic: f64,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            physio_assessment: 0.92,
            medical_report: 0.88,
            lab_results: 0.95,
            radiology: 0.85,
            generic: 0.80,
        }
    }
}

impl ConfidenceTable {
    pub fn for_type(&self, document_type: DocumentType) -> f64 {
        match document_type {
            DocumentType::PhysioAssessment => self.physio_assessment,
            DocumentType::MedicalReport => self.medical_report,
            DocumentType::LabResults => self.lab_results,
            DocumentType::Radiology => self.radiology,
            DocumentType::Generic => self.generic,
        }
    }
}

pub struct SimulatedOcr {
    latency: Duration,
    confidence: ConfidenceTable,
    patterns: PatternTable,
}

impl SimulatedOcr {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            confidence: ConfidenceTable::default(),
            patterns: PatternTable::german().clone(),
        }
    }

    pub fn with_confidence(mut self, confidence: ConfidenceTable) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = patterns;
        self
    }
}

impl OcrService for SimulatedOcr {
    fn recognize(&self, request: &OcrRequest) -> Result<OcrOutput, OcrError> {
        if request.file_path.trim().is_empty() {
            return Err(OcrError::MissingFilePath);
        }
        let started = Instant::now();
        std::thread::sleep(self.latency);

        let today = chrono::Utc::now().date_naive();
        let raw_text = canned_text(request.document_type, today);
        let extracted_data = extract_with(&self.patterns, &raw_text, request.document_type);

        tracing::debug!(
            file_path = %request.file_path,
            document_type = request.document_type.as_str(),
            "Simulated OCR finished"
        );

        Ok(OcrOutput {
            raw_text,
            extracted_data,
            confidence: self.confidence.for_type(request.document_type),
            processing_time_ms: started.elapsed().as_millis() as i64,
        })
    }
}

/// German sample document for `document_type`, dated `today` (`d.m.yyyy`).
pub fn canned_text(document_type: DocumentType, today: NaiveDate) -> String {
    let date = today.format("%-d.%-m.%Y");
    match document_type {
        DocumentType::PhysioAssessment => format!(
            "Eingangsbefund\n\
             Datum: {date}\n\
             Therapeut: Dr. Müller\n\
             \n\
             Name, Vorname: Mustermann, Max\n\
             Geb.-Datum: 15.03.1995\n\
             \n\
             Diagnose: Lumbalgie, akut\n\
             Relevante Nebendiagnose: Keine\n\
             \n\
             Medikamente: Ibuprofen 400mg\n\
             Freizeitaktivitäten: Volleyball, Laufen\n\
             \n\
             Aktuelle Beschwerden: Schmerzen im unteren Rückenbereich seit 3 Tagen\n\
             Schmerzstärke: 6/10\n\
             Beschwerden im Alltag: Schmerzen beim Bücken und Heben\n\
             Seit wann: 3 Tage\n\
             Häufigkeit: Konstant\n\
             Ausgelöst durch: Sprungbewegungen beim Volleyball\n\
             Linderung durch: Ruhe, Wärme\n\
             \n\
             Inspektion: Schonhaltung erkennbar\n\
             Palpation: Verspannung der Lendenmuskulatur\n\
             \n\
             Therapieziele: Schmerzreduktion, Mobilisation, Rückkehr zum Sport"
        ),
        DocumentType::MedicalReport => format!(
            "Ärztlicher Bericht\n\
             Datum: {date}\n\
             Dr. med. Schmidt\n\
             \n\
             Patient: Mustermann, Max\n\
             Geb.: 15.03.1995\n\
             \n\
             Diagnose: Distorsion des Sprunggelenks (S93.4)\n\
             ICD-10: S93.4\n\
             \n\
             Befund: Schwellung und Druckschmerz laterales Sprunggelenk\n\
             Behandlung: Ruhigstellung, Kryotherapie\n\
             Medikation: Ibuprofen 3x400mg täglich\n\
             \n\
             Empfehlung: Physiotherapie nach Abschwellung\n\
             Wiederkehr zum Sport: In 2-3 Wochen\n\
             Kontrolle: In 1 Woche"
        ),
        DocumentType::LabResults => format!(
            "Laborbefund\n\
             Datum: {date}\n\
             \n\
             Patient: Mustermann, Max\n\
             \n\
             Blutwerte:\n\
             Leukozyten: 7.2 /µl (Referenz: 4.0-10.0)\n\
             Erythrozyten: 4.8 /µl (Referenz: 4.5-5.9)\n\
             Hämoglobin: 14.5 g/dl (Referenz: 14.0-18.0)\n\
             Hämatokrit: 42% (Referenz: 42-50)\n\
             CRP: 0.8 mg/l (Referenz: <3.0)\n\
             BSG: 12 mm/h (Referenz: <20)\n\
             \n\
             Bewertung: Werte im Normbereich"
        ),
        DocumentType::Radiology => format!(
            "Radiologischer Befund\n\
             Datum: {date}\n\
             Dr. med. Weber\n\
             \n\
             Patient: Mustermann, Max\n\
             Untersuchung: Röntgen Knie rechts\n\
             \n\
             Technik: Röntgen in 2 Ebenen\n\
             \n\
             Befund: \n\
             - Keine Frakturzeichen\n\
             - Regelrechte Gelenkstrukturen\n\
             - Kein Erguss\n\
             - Weichteile unauffällig\n\
             \n\
             Beurteilung: Unauffälliger Befund\n\
             Empfehlung: Konservative Therapie"
        ),
        DocumentType::Generic => format!(
            "Medizinisches Dokument\n\
             Datum: {date}\n\
             \n\
             Patient: Mustermann, Max\n\
             Geb.: 15.03.1995\n\
             \n\
             Dokumentinhalt wurde durch OCR erkannt.\n\
             Für spezifische Extraktion bitte Dokumenttyp angeben.\n\
             \n\
             Allgemeine Informationen wurden erkannt und können\n\
             weitere Verarbeitung erfordern."
        ),
    }
}

// ═══════════════════════════════════════════════════════════
// Remote recognition
// ═══════════════════════════════════════════════════════════

/// HTTP OCR endpoint speaking the `ocr-processing` request shape.
///
/// Only `raw_text` and `confidence_score` are taken from the response;
/// fields are re-extracted locally with this service's pattern table.
pub struct RemoteOcr {
    endpoint: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    patterns: PatternTable,
}

#[derive(Deserialize)]
struct RemoteEnvelope {
    data: RemoteResult,
}

#[derive(Deserialize)]
struct RemoteResult {
    raw_text: String,
    confidence_score: f64,
}

impl RemoteOcr {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, OcrError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OcrError::HttpClient(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            timeout_secs,
            patterns: PatternTable::german().clone(),
        })
    }
}

impl OcrService for RemoteOcr {
    fn recognize(&self, request: &OcrRequest) -> Result<OcrOutput, OcrError> {
        if request.file_path.trim().is_empty() {
            return Err(OcrError::MissingFilePath);
        }
        let started = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    OcrError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    OcrError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
                } else {
                    OcrError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OcrError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RemoteEnvelope = response
            .json()
            .map_err(|e| OcrError::ResponseParsing(e.to_string()))?;

        let extracted_data =
            extract_with(&self.patterns, &parsed.data.raw_text, request.document_type);
        Ok(OcrOutput {
            raw_text: parsed.data.raw_text,
            extracted_data,
            confidence: parsed.data.confidence_score.clamp(0.0, 1.0),
            processing_time_ms: started.elapsed().as_millis() as i64,
        })
    }
}
