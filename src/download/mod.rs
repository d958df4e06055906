//! Download management and external tool orchestration

pub mod error;
pub mod gallery;
pub mod instagram;
pub mod tiktok;
pub mod workspace;
pub mod youtube;
pub mod ytdlp;

use std::path::PathBuf;

// Re-exports for convenience
pub use error::DownloadError;
pub use workspace::Workspace;

/// What kind of media a fetch operation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Video,
    Audio,
    Photo,
}

impl ContentKind {
    /// Label used in statistics rows and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Photo => "photo",
        }
    }
}

/// Result of a completed fetch operation.
///
/// Owns the [`Workspace`] the file lives in: `file_path` stays valid for
/// exactly as long as this value is alive, so delivery must happen before
/// dropping it, and the file can never outlive its scope.
#[derive(Debug)]
pub struct FetchResult {
    pub workspace: Workspace,
    pub file_path: PathBuf,
    pub kind: ContentKind,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub artist: Option<String>,
    pub track: Option<String>,
}
