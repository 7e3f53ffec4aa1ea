//! Retrieval of the PDF referenced by an accepted API response.
//!
//! Downloads run fire-and-forget on the runtime so a slow or failing CDN
//! never delays the next intake cycle.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use dtewatch_core::models::config::DownloadConfig;
use dtewatch_core::{ApiResponse, PrintDispatch};

pub struct DownloadDispatch {
    http: reqwest::Client,
    download_dir: PathBuf,
}

impl DownloadDispatch {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            download_dir: config.download_dir.clone(),
        }
    }
}

impl PrintDispatch for DownloadDispatch {
    fn handle(&self, response: &ApiResponse) {
        let Some(url) = response.pdf_path.clone() else {
            return;
        };
        let http = self.http.clone();
        let dir = self.download_dir.clone();
        tokio::spawn(async move {
            if let Err(e) = download(&http, &url, &dir).await {
                warn!("no se pudo descargar el PDF {url}: {e}");
            }
        });
    }
}

async fn download(http: &reqwest::Client, url: &str, dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let dest = dir.join(file_name_of(url));
    tokio::fs::write(&dest, &bytes).await?;
    info!("PDF descargado: {}", dest.display());
    Ok(())
}

/// Last path segment of the locator, with a fallback for opaque URLs.
fn file_name_of(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("documento.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_the_last_segment() {
        assert_eq!(
            file_name_of("https://cdn.example/pdfs/f-1001.pdf"),
            "f-1001.pdf"
        );
        assert_eq!(file_name_of("https://cdn.example/f.pdf/"), "f.pdf");
        assert_eq!(file_name_of(""), "documento.pdf");
    }
}
