use std::fmt;

/// Structured error type for download operations.
///
/// The variant carries the retry classification as data: the retry policy
/// branches on the variant, not on message contents. Only the initial
/// mapping from raw yt-dlp stderr to a variant is substring-based
/// ([`classify_tool_error`]), because the tool emits unstructured text —
/// a known fragility, contained in that one function.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadError {
    /// Extraction failure with a known transient signature; worth retrying
    Transient(String),
    /// Extraction or processing failure that retrying will not fix
    Terminal(String),
    /// The URL resolves to still images only, no downloadable video
    PhotoOnly(String),
    /// The tool reported success but no usable media file was produced
    EmptyResult(String),
    /// External tool exceeded its wall-clock timeout
    Timeout(String),
    /// Telegram send failure after a successful download
    SendFailed(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Transient(msg)
            | DownloadError::Terminal(msg)
            | DownloadError::PhotoOnly(msg)
            | DownloadError::EmptyResult(msg)
            | DownloadError::Timeout(msg)
            | DownloadError::SendFailed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns true if the failure is likely to resolve itself on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, DownloadError::Transient(_))
    }

    /// Returns subcategory for logging
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::Transient(_) => "transient",
            DownloadError::Terminal(_) => "terminal",
            DownloadError::PhotoOnly(_) => "photo_only",
            DownloadError::EmptyResult(_) => "empty_result",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::SendFailed(_) => "send_failed",
        }
    }
}

/// Signatures of extractor failures that tend to resolve on retry.
const TRANSIENT_SIGNATURES: [&str; 2] = ["unable to extract", "webpage"];

/// Signatures of posts that contain no video, only images.
const PHOTO_ONLY_SIGNATURES: [&str; 3] = [
    "there is no video in this post",
    "no video formats found",
    "unsupported url",
];

/// Classifies raw extractor stderr into a [`DownloadError`].
///
/// Matching is case-insensitive over known substrings. Photo-only
/// signatures win over transient ones: "unsupported url" posts will never
/// become downloadable by retrying, however flaky the extractor is.
pub fn classify_tool_error(stderr: &str) -> DownloadError {
    let lower = stderr.to_lowercase();

    if PHOTO_ONLY_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        return DownloadError::PhotoOnly(stderr.trim().to_string());
    }

    if TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        return DownloadError::Transient(stderr.trim().to_string());
    }

    DownloadError::Terminal(stderr.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_signatures_detected() {
        assert!(classify_tool_error("ERROR: Unable to extract video data").is_transient());
        assert!(classify_tool_error("ERROR: failed to download webpage").is_transient());
    }

    #[test]
    fn unknown_errors_are_terminal() {
        let err = classify_tool_error("ERROR: Private video");
        assert!(matches!(err, DownloadError::Terminal(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn photo_only_signatures_win_over_transient() {
        let err = classify_tool_error("ERROR: Unsupported URL: https://example.com/p/abc (webpage)");
        assert!(matches!(err, DownloadError::PhotoOnly(_)));
    }

    #[test]
    fn display_shows_inner_message() {
        let err = DownloadError::Terminal("boom".into());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.subcategory(), "terminal");
    }
}
