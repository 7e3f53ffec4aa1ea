//! Core library for Chilean electronic invoicing (DTE) file intake.
//!
//! This crate provides:
//! - Section parsing of point-of-sale export files
//! - Document classification (boleta DTE 39, factura DTE 33)
//! - Transformation into the invoicing API's JSON payloads
//! - Submission to the provider endpoint
//! - The polling intake loop with success and dated error archiving

pub mod classify;
pub mod error;
pub mod intake;
pub mod log;
pub mod models;
pub mod sections;
pub mod submit;
pub mod transform;

pub use classify::DocType;
pub use error::{DteError, Result, SubmitError, TransformError};
pub use intake::{CycleStatus, FileReport, IntakeLoop, ProcessingOutcome, StopHandle};
pub use log::{LogSink, Severity, TracingSink};
pub use models::config::{
    ApiConfig, AppConfig, ConfigSource, DirectoryConfig, DownloadConfig, FileConfigSource,
    MerchantConfig,
};
pub use models::document::{Document, DtePayload};
pub use sections::{RawSections, Section};
pub use submit::{ApiClient, ApiResponse, NoopDispatch, PrintDispatch};
