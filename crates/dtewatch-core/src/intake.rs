//! Intake loop: discovery, claiming, processing and filing of source files.
//!
//! One cycle handles at most one file, the one with the oldest modification
//! time in the watched directory. The loop is cooperative: `stop()` flips a
//! flag that is checked at the top of each cycle, never interrupting
//! in-flight work. Merchant configuration is loaded once at [`IntakeLoop::start`]
//! and reused by every cycle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use tracing::debug;

use crate::classify::{self, DocType};
use crate::error::{DteError, Result, SubmitError};
use crate::log::{LogSink, Severity, TracingSink};
use crate::models::config::{ConfigSource, DirectoryConfig, MerchantConfig};
use crate::sections::{self, RawSections};
use crate::submit::{ApiClient, NoopDispatch, PrintDispatch};
use crate::transform;

/// Result of one file's journey through the pipeline. Drives the filing
/// decision and nothing else.
#[derive(Debug)]
pub enum ProcessingOutcome {
    /// The API accepted the document (or the file needed no submission).
    Success,
    /// The API answered, but not with an acceptance.
    ApiRejected {
        status_code: String,
        status_desc: String,
    },
    /// Parsing or transformation failed before submission.
    TransformError(DteError),
    /// The submission never completed.
    TransportError(SubmitError),
}

/// Outcome plus the issue date used for dated error archiving.
#[derive(Debug)]
pub struct FileReport {
    pub outcome: ProcessingOutcome,
    pub issue_date: Option<NaiveDate>,
}

/// Whether the cycle chain keeps rescheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Reschedule the next cycle after the configured interval.
    Continue,
    /// Stop scheduling; the operator must restart the loop.
    Halt,
}

/// Handle for stopping a running loop from another task.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request a cooperative stop. Takes effect at the next cycle boundary.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The file-intake loop.
pub struct IntakeLoop {
    watch_dir: PathBuf,
    processed_dir: PathBuf,
    interval: Duration,
    source: Box<dyn ConfigSource>,
    client: ApiClient,
    dispatch: Box<dyn PrintDispatch>,
    sink: Box<dyn LogSink>,
    running: Arc<AtomicBool>,
    merchant: Option<MerchantConfig>,
}

impl IntakeLoop {
    pub fn new(
        directories: &DirectoryConfig,
        source: Box<dyn ConfigSource>,
        client: ApiClient,
    ) -> Self {
        Self {
            watch_dir: directories.watch_dir.clone(),
            processed_dir: directories.processed_dir.clone(),
            interval: Duration::from_secs(directories.interval_secs),
            source,
            client,
            dispatch: Box::new(NoopDispatch),
            sink: Box::new(TracingSink),
            running: Arc::new(AtomicBool::new(false)),
            merchant: None,
        }
    }

    /// Replace the retrieval dispatcher.
    pub fn with_dispatch(mut self, dispatch: Box<dyn PrintDispatch>) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replace the operator event sink.
    pub fn with_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Load the merchant configuration and arm the loop.
    pub fn start(&mut self) -> Result<()> {
        self.merchant = Some(self.source.load()?);
        self.sink.record(
            "Configuración cargada exitosamente al iniciar el procesador",
            Severity::Info,
        );
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Request a cooperative stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Handle usable from another task (e.g. a signal listener).
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Drive cycles until stopped or halted. The stop flag is only checked
    /// at cycle boundaries; an in-flight cycle always completes.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if !self.is_running() {
                self.sink.record("Procesamiento detenido.", Severity::Info);
                break;
            }
            if self.run_cycle().await == CycleStatus::Halt {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }
        Ok(())
    }

    /// One full Scanning → Claiming → Processing → Filing pass.
    pub async fn run_cycle(&mut self) -> CycleStatus {
        if !self.watch_dir.is_dir() {
            self.sink.record(
                &format!("Directorio {} no encontrado.", self.watch_dir.display()),
                Severity::Error,
            );
            return CycleStatus::Halt;
        }

        let claimed = match claim_oldest(&self.watch_dir) {
            Ok(c) => c,
            Err(e) => {
                self.sink.record(
                    &format!("Error al listar el directorio: {e}"),
                    Severity::Error,
                );
                return CycleStatus::Halt;
            }
        };
        let Some(path) = claimed else {
            self.sink.record("Directorio vacío.", Severity::Info);
            return CycleStatus::Continue;
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.sink
            .record(&format!("Archivo encontrado: {name}"), Severity::Info);
        self.sink
            .record(&format!("Procesando archivo: {name}"), Severity::Info);

        let report = if name.to_lowercase().ends_with(".txt") {
            match self.merchant_config() {
                Ok(merchant) => {
                    self.sink
                        .record(&format!("Enviando a API: {name}"), Severity::Info);
                    self.process_txt(&path, &merchant).await
                }
                Err(e) => FileReport {
                    outcome: ProcessingOutcome::TransformError(e),
                    issue_date: None,
                },
            }
        } else {
            // Not a transformable file: filed as a success, moved untouched.
            FileReport {
                outcome: ProcessingOutcome::Success,
                issue_date: None,
            }
        };

        self.file_outcome(&path, &name, report);
        CycleStatus::Continue
    }

    /// Cached merchant configuration, loading it on first use when the loop
    /// was driven without `start()`.
    fn merchant_config(&mut self) -> Result<MerchantConfig> {
        if self.merchant.is_none() {
            self.merchant = Some(self.source.load()?);
            debug!("configuración cargada de forma diferida");
        }
        Ok(self.merchant.clone().unwrap_or_default())
    }

    /// Transformation pipeline plus submission for one claimed text file.
    async fn process_txt(&self, path: &Path, merchant: &MerchantConfig) -> FileReport {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                return FileReport {
                    outcome: ProcessingOutcome::TransformError(e.into()),
                    issue_date: None,
                };
            }
        };

        let parsed = sections::parse(&text);
        let issue_date = issue_date_of(&parsed);

        let transformed = classify::classify(&parsed).and_then(|doc_type| match doc_type {
            DocType::Boleta => transform::boleta::transform(&parsed, merchant),
            DocType::Factura => {
                transform::factura::transform(&parsed, merchant, self.sink.as_ref())
            }
        });
        let document = match transformed {
            Ok(doc) => doc,
            Err(e) => {
                return FileReport {
                    outcome: ProcessingOutcome::TransformError(e.into()),
                    issue_date,
                };
            }
        };
        let issue_date = document.issue_date.or(issue_date);

        match self.client.submit(&document).await {
            Ok(response) if response.accepted() => {
                if response.pdf_path.is_some() {
                    self.dispatch.handle(&response);
                }
                FileReport {
                    outcome: ProcessingOutcome::Success,
                    issue_date,
                }
            }
            Ok(response) => FileReport {
                outcome: ProcessingOutcome::ApiRejected {
                    status_code: response.status_code_display().to_string(),
                    status_desc: response.status_desc_display().to_string(),
                },
                issue_date,
            },
            Err(SubmitError::Rejected { status, body }) => FileReport {
                outcome: ProcessingOutcome::ApiRejected {
                    status_code: status.to_string(),
                    status_desc: body,
                },
                issue_date,
            },
            Err(e) => FileReport {
                outcome: ProcessingOutcome::TransportError(e),
                issue_date,
            },
        }
    }

    /// Filing stage: success archive or dated error archive.
    fn file_outcome(&self, path: &Path, name: &str, report: FileReport) {
        match &report.outcome {
            ProcessingOutcome::Success => {
                let dest = self.processed_dir.join(name);
                match move_file(path, &dest) {
                    Ok(()) => self.sink.record(
                        &format!("Archivo procesado y movido a carpeta procesados: {name}"),
                        Severity::Info,
                    ),
                    Err(e) => {
                        self.sink.record(
                            &format!("Error al mover archivo procesado: {e}"),
                            Severity::Error,
                        );
                        self.file_error(path, name, report.issue_date);
                    }
                }
            }
            ProcessingOutcome::ApiRejected {
                status_code,
                status_desc,
            } => {
                self.sink.record(
                    &format!(
                        "Error al enviar a API. StatusCode: {status_code}, StatusDesc: {status_desc}"
                    ),
                    Severity::Error,
                );
                self.file_error(path, name, report.issue_date);
            }
            ProcessingOutcome::TransformError(e) => {
                self.sink.record(
                    &format!("Error al procesar el archivo: {e}"),
                    Severity::Error,
                );
                self.file_error(path, name, report.issue_date);
            }
            ProcessingOutcome::TransportError(e) => {
                self.sink.record(
                    &format!("Error al enviar solicitud a API: {e}"),
                    Severity::Error,
                );
                self.file_error(path, name, report.issue_date);
            }
        }
    }

    /// Move a file into `error/<MM_YYYY>/<DD>/`, creating directories on
    /// demand. A failure here leaves the file where it is.
    fn file_error(&self, path: &Path, name: &str, issue_date: Option<NaiveDate>) {
        let dir = error_dir(&self.processed_dir, issue_date);
        if let Err(e) = fs::create_dir_all(&dir) {
            self.sink.record(
                &format!("No se pudo crear la carpeta de error: {e}"),
                Severity::Error,
            );
            return;
        }
        let dest = dir.join(name);
        match move_file(path, &dest) {
            Ok(()) => self.sink.record(
                &format!("Archivo movido a carpeta de error: {}", dest.display()),
                Severity::Error,
            ),
            Err(e) => self.sink.record(
                &format!("No se pudo mover el archivo a la carpeta de error: {e}"),
                Severity::Error,
            ),
        }
    }
}

/// The entry with the oldest modification time, files and subdirectories
/// alike. Ties keep the listing order.
pub fn claim_oldest(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut oldest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let modified = entry.metadata()?.modified()?;
        let replace = match &oldest {
            Some((current, _)) => modified < *current,
            None => true,
        };
        if replace {
            oldest = Some((modified, entry.path()));
        }
    }
    Ok(oldest.map(|(_, path)| path))
}

/// Dated error-archive directory for a filing date; wall clock when the
/// document's own issue date was not extractable.
fn error_dir(processed: &Path, issue_date: Option<NaiveDate>) -> PathBuf {
    let date = issue_date.unwrap_or_else(|| Local::now().date_naive());
    processed
        .join("error")
        .join(format!("{:02}_{}", date.month(), date.year()))
        .join(format!("{:02}", date.day()))
}

/// Issue date read straight from the header sections, independent of the
/// transformers, so error filing can be dated even when transformation fails.
fn issue_date_of(sections: &RawSections) -> Option<NaiveDate> {
    let line = sections
        .lines("Boleta")
        .first()
        .or_else(|| sections.lines("Encabezado").first())?;
    let field = line.split(';').nth(2)?;
    NaiveDate::parse_from_str(field, "%Y-%m-%d").ok()
}

/// Rename with a copy-and-delete fallback for cross-device moves.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
