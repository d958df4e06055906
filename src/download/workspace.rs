//! Per-download temporary workspaces.
//!
//! Every fetch attempt gets a fresh, exclusively-owned directory that is
//! removed when the workspace value is dropped, on every exit path. The
//! delivery step reads the downloaded file from the workspace, so the
//! workspace must outlive delivery.

use crate::core::config;
use crate::download::error::DownloadError;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extensions of thumbnail/cover sidecar files that extractors leave next
/// to the actual media. Skipped during resolution unless the operation is
/// explicitly fetching images.
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// An isolated scratch directory for one download attempt.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Creates a fresh uniquely-named workspace directory.
    pub fn create() -> Result<Self, DownloadError> {
        let path = config::SCRATCH_DIR.join(format!("dl-{}", Uuid::new_v4()));
        fs::create_dir_all(&path)
            .map_err(|e| DownloadError::Terminal(format!("failed to create workspace {}: {}", path.display(), e)))?;
        log::debug!("Created workspace {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// yt-dlp output template writing into this workspace.
    pub fn output_template(&self) -> String {
        format!("{}/%(id)s.%(ext)s", self.path.display())
    }

    /// Resolves the downloaded media file inside the workspace.
    ///
    /// Image sidecars are excluded unless `allow_images` is set (photo
    /// mode). With an `expected_ext`, an exact extension match wins over
    /// the first remaining candidate. Fails if nothing usable remains or
    /// the chosen file is empty.
    pub fn resolve_media_file(
        &self,
        expected_ext: Option<&str>,
        allow_images: bool,
    ) -> Result<PathBuf, DownloadError> {
        let entries = fs::read_dir(&self.path)
            .map_err(|e| DownloadError::EmptyResult(format!("failed to read workspace: {}", e)))?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| allow_images || !has_image_extension(path))
            .collect();
        candidates.sort();

        let chosen = match expected_ext {
            Some(ext) => candidates
                .iter()
                .find(|path| path.extension().and_then(|e| e.to_str()) == Some(ext))
                .or_else(|| candidates.first())
                .cloned(),
            None => candidates.first().cloned(),
        };

        let file = chosen.ok_or_else(|| {
            DownloadError::EmptyResult(format!("no media file found in {}", self.path.display()))
        })?;

        let size = fs::metadata(&file)
            .map_err(|e| DownloadError::EmptyResult(format!("failed to stat {}: {}", file.display(), e)))?
            .len();
        if size == 0 {
            return Err(DownloadError::EmptyResult(format!(
                "downloaded file is empty: {}",
                file.display()
            )));
        }

        Ok(file)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            // Already-gone workspaces are fine; anything else is worth a log line.
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove workspace {}: {}", self.path.display(), e);
            }
        } else {
            log::debug!("Removed workspace {}", self.path.display());
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|img| e.eq_ignore_ascii_case(img)))
        .unwrap_or(false)
}
