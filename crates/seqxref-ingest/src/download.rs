//! Streaming file downloads
//!
//! [`FileFetcher`] is the bulk-download collaborator: it streams a URL to a
//! local path with a progress bar and reports success as a plain boolean.

use anyhow::{bail, Result};
use futures::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone)]
pub struct FileFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl FileFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("seqxref/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            show_progress: true,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Download `url` into `local_path`, creating parent directories.
    ///
    /// Returns false, after logging, when the download fails.
    pub async fn get(&self, url: &str, local_path: impl AsRef<Path>) -> bool {
        let local_path = local_path.as_ref();
        match self.download_file(url, local_path).await {
            Ok(bytes) => {
                info!(url, path = %local_path.display(), bytes, "Downloaded file");
                true
            },
            Err(e) => {
                error!(url, path = %local_path.display(), error = %e, "Download failed");
                false
            },
        }
    }

    async fn download_file(&self, url: &str, output_path: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            bail!("Failed to download {}: {}", url, response.status());
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let label = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let pb = if self.show_progress {
            ProgressBar::new(response.content_length().unwrap_or(0))
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("Downloading {label}"));

        let downloaded = match write_file(response.bytes_stream(), output_path, &pb).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                pb.abandon_with_message(format!("Failed {label}"));
                return Err(e);
            },
        };

        pb.finish_with_message(format!("Downloaded {label}"));
        Ok(downloaded)
    }
}

/// Write a byte stream to `path`. A partially written file is removed when
/// the stream or a write fails.
async fn write_file<S, B, E>(stream: S, path: &Path, pb: &ProgressBar) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    futures::pin_mut!(stream);
    let written = async {
        let mut file = std::fs::File::create(path)?;
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let bytes = chunk.as_ref();
            file.write_all(bytes)?;
            downloaded += bytes.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush()?;
        Ok::<u64, anyhow::Error>(downloaded)
    }
    .await;

    if written.is_err() && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
    written
}

/// Last non-empty path segment of `url`
pub fn file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(segment.to_string())
}
