//! gallery-dl subprocess binding for the Instagram photo fallback.

use crate::core::config;
use crate::download::error::DownloadError;
use std::path::Path;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Downloads the images of a post into `dest` using gallery-dl.
///
/// The call is bounded by a wall-clock timeout; expiry and non-zero exit
/// are both terminal — the fallback is a last resort, not something worth
/// its own retry ladder of unknown failure modes.
pub async fn download_images(url: &str, dest: &Path) -> Result<(), DownloadError> {
    let gallery_bin = &*config::GALLERY_DL_BIN;
    let dest_str = dest.to_string_lossy();
    log::debug!("gallery-dl command: {} -D {} {}", gallery_bin, dest_str, url);

    let output = timeout(
        config::download::gallery_dl_timeout(),
        TokioCommand::new(gallery_bin).args(["-D", dest_str.as_ref(), url]).output(),
    )
    .await
    .map_err(|_| {
        log::error!(
            "gallery-dl timed out after {} seconds for {}",
            config::download::GALLERY_DL_TIMEOUT_SECS,
            url
        );
        DownloadError::Timeout("gallery-dl command timed out".to_string())
    })?
    .map_err(|e| DownloadError::Terminal(format!("failed to execute {}: {}", gallery_bin, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("gallery-dl failed for {}: {}", url, stderr.trim());
        return Err(DownloadError::Terminal(format!(
            "gallery-dl exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        )));
    }
    Ok(())
}
