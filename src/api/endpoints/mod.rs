//! HTTP endpoint handlers.
//!
//! Handlers stay thin: parse, hand off to the pipeline or store on a
//! blocking thread, wrap the result.

pub mod health;
pub mod jobs;
pub mod monitor;
pub mod notifications;
pub mod ocr;
pub mod profiles;
