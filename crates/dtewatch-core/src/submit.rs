//! API submission for assembled documents.
//!
//! One synchronous-in-spirit POST per document, API key in the `apikey`
//! header, no retry at this layer: a failed submission is a terminal outcome
//! for the file that produced it.

use serde::Deserialize;
use tracing::debug;

use crate::error::SubmitError;
use crate::models::config::ApiConfig;
use crate::models::document::Document;

/// Response envelope returned by the invoicing API.
///
/// Acceptance is the string pair `StatusCode == "200"` / `StatusDesc == "OK"`;
/// any other combination is a rejection even under HTTP 200.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "StatusCode")]
    pub status_code: Option<String>,

    #[serde(rename = "StatusDesc")]
    pub status_desc: Option<String>,

    /// Locator of the generated PDF, when the provider produced one.
    #[serde(rename = "PDFPATH")]
    pub pdf_path: Option<String>,

    /// Anything else the provider sends along.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiResponse {
    /// Whether the provider accepted the document.
    pub fn accepted(&self) -> bool {
        self.status_code.as_deref() == Some("200") && self.status_desc.as_deref() == Some("OK")
    }

    /// Status code for operator-facing messages.
    pub fn status_code_display(&self) -> &str {
        self.status_code.as_deref().unwrap_or("No disponible")
    }

    /// Status description for operator-facing messages.
    pub fn status_desc_display(&self) -> &str {
        self.status_desc.as_deref().unwrap_or("No disponible")
    }
}

/// Handler for the document-retrieval side effect of an accepted response.
///
/// Failure inside a dispatcher must never affect the document's own
/// processing outcome; implementations log and swallow their errors.
pub trait PrintDispatch: Send + Sync {
    fn handle(&self, response: &ApiResponse);
}

impl<T: PrintDispatch + ?Sized> PrintDispatch for std::sync::Arc<T> {
    fn handle(&self, response: &ApiResponse) {
        (**self).handle(response);
    }
}

/// Dispatcher that ignores retrieval references.
pub struct NoopDispatch;

impl PrintDispatch for NoopDispatch {
    fn handle(&self, _response: &ApiResponse) {}
}

/// HTTP client for the document endpoint.
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// POST the document payload and parse the response envelope.
    ///
    /// HTTP 200 with a JSON body yields the parsed [`ApiResponse`] whether or
    /// not it is an acceptance; a non-200 status or a transport failure is an
    /// error.
    pub async fn submit(&self, document: &Document) -> Result<ApiResponse, SubmitError> {
        debug!(endpoint = %self.endpoint, tipo = document.doc_type.code(), "enviando documento");

        let response = self
            .http
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .json(&document.payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SubmitError::MalformedResponse(e.to_string()))
    }
}
