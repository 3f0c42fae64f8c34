pub mod extraction;
pub mod jobs;
pub mod ocr;

pub use jobs::{NewOcrJob, OcrPipeline, OriginalFile, PipelineError, Promoted};
pub use ocr::{ConfidenceTable, OcrError, OcrOutput, OcrRequest, OcrService, RemoteOcr, SimulatedOcr};
