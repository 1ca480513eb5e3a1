//! Document Fetcher — resolves a resume link, downloads it, and parks the
//! bytes in the scratch file.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::errors::EvaluationError;
use crate::evaluation::models::RawDocument;

/// Some hosts refuse reqwest's default identifier.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const DRIVE_DOWNLOAD_ENDPOINT: &str = "https://drive.google.com/uc?export=download&id=";

/// `drive.google.com/.../d/<ID>/...` share links.
static DRIVE_SHARE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"drive\.google\.com/(?:.*/)?d/([^/?#]+)").expect("drive link pattern is valid")
});

/// Rewrites a cloud-drive "view" link to its direct-download form.
/// Any other link is returned unchanged.
pub fn resolve_download_url(url: &str) -> String {
    match DRIVE_SHARE_LINK.captures(url).and_then(|c| c.get(1)) {
        Some(id) => format!("{DRIVE_DOWNLOAD_ENDPOINT}{}", id.as_str()),
        None => url.to_string(),
    }
}

pub fn is_drive_link(url: &str) -> bool {
    url.contains("drive.google.com")
}

/// Owns the scratch copy of a download. The file is removed on drop, so
/// it goes away on every exit path, cancellation included.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn claim(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {e}", self.path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: Client,
    scratch_path: PathBuf,
}

impl DocumentFetcher {
    pub fn new(scratch_path: impl Into<PathBuf>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(BROWSER_USER_AGENT).build()?;
        Ok(Self {
            client,
            scratch_path: scratch_path.into(),
        })
    }

    /// Downloads `url` (after drive-link rewriting) and overwrites the
    /// scratch file with the body. Nothing is written on a non-success status.
    pub async fn fetch(&self, url: &str) -> Result<RawDocument, EvaluationError> {
        let resolved = resolve_download_url(url);
        debug!("Resolved resume link {url} -> {resolved}");

        let response = self.client.get(&resolved).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EvaluationError::Download {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let scratch = ScratchFile::claim(&self.scratch_path);
        tokio::fs::write(scratch.path(), &bytes).await?;

        info!(
            "Downloaded {} bytes to {}",
            bytes.len(),
            scratch.path().display()
        );

        Ok(RawDocument {
            source_url: resolved,
            scratch,
            bytes,
        })
    }
}
