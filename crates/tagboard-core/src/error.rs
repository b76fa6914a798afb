use std::fmt;
use std::path::PathBuf;

use crate::cache::FetchError;

/// Machine-readable error codes for client-facing decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    MissingParameter,
    InvalidTag,
    InvalidDocument,
    SlugNotFound,
    AssetNotFound,
    AssetInUse,
    StoreUnavailable,
    CorruptStore,
    CacheFetchFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::MissingParameter => "E2001",
            Self::InvalidTag => "E2002",
            Self::InvalidDocument => "E2003",
            Self::SlugNotFound => "E4001",
            Self::AssetNotFound => "E4002",
            Self::AssetInUse => "E4091",
            Self::StoreUnavailable => "E5001",
            Self::CorruptStore => "E5002",
            Self::CacheFetchFailed => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::MissingParameter => "Required parameter missing",
            Self::InvalidTag => "Tag is empty after normalization",
            Self::InvalidDocument => "Document is not a JSON object",
            Self::SlugNotFound => "Slug not found",
            Self::AssetNotFound => "Content asset not found",
            Self::AssetInUse => "Content asset is still referenced",
            Self::StoreUnavailable => "Document store unavailable",
            Self::CorruptStore => "Corrupt document store",
            Self::CacheFetchFailed => "Cached dataset fetch failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `tb init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .tagboard/config.toml and retry."),
            Self::MissingParameter => Some("Pass the required key argument."),
            Self::InvalidTag => Some("Use a tag with at least one non-whitespace character."),
            Self::InvalidDocument => Some("Load an array of JSON objects."),
            Self::SlugNotFound | Self::AssetNotFound => None,
            Self::AssetInUse => {
                Some("Remove the references listed by `tb refs <key>` or pass --force.")
            }
            Self::StoreUnavailable => Some("Retry later; the store may be locked or missing."),
            Self::CorruptStore => Some("Restore .tagboard/tagboard.db from a backup."),
            Self::CacheFetchFailed => Some("Retry; the next consumer will issue a fresh fetch."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }

    /// HTTP-style status class used in JSON error envelopes.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::MissingParameter | Self::InvalidTag | Self::InvalidDocument => 400,
            Self::SlugNotFound | Self::AssetNotFound => 404,
            Self::AssetInUse => 409,
            Self::NotInitialized
            | Self::ConfigParseError
            | Self::StoreUnavailable
            | Self::CorruptStore
            | Self::CacheFetchFailed
            | Self::InternalUnexpected => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the tagboard core operations.
#[derive(Debug, thiserror::Error)]
pub enum TagboardError {
    /// A required request parameter was missing or blank.
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// A tag normalized to the empty string.
    #[error("invalid tag {0:?}: empty after normalization")]
    InvalidTag(String),

    /// A loaded document was not a JSON object.
    #[error("invalid document at index {index}: {reason}")]
    InvalidDocument { index: usize, reason: String },

    /// No registry entry carries the requested slug.
    #[error("slug not found: {0}")]
    SlugNotFound(String),

    /// No content asset has the requested key.
    #[error("content asset not found: {0}")]
    AssetNotFound(String),

    /// Deleting the asset would break live references.
    #[error("content asset `{key}` is referenced by {usage_count} chart element(s)")]
    AssetInUse { key: String, usage_count: usize },

    /// No store exists at the expected location.
    #[error("store not found at {}", .0.display())]
    NotInitialized(PathBuf),

    /// A store file exists but cannot be opened or lacks metadata.
    #[error("store at {} is unreadable or corrupt", .0.display())]
    CorruptStore(PathBuf),

    /// A config file exists but could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A cached dataset could not be fetched.
    #[error(transparent)]
    CacheFetch(#[from] FetchError),

    /// The underlying store failed; callers must not treat this as empty data.
    #[error("document store unavailable: {0}")]
    Store(#[from] rusqlite::Error),

    /// A stored document could not be serialized for writing.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl TagboardError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingParameter(_) => ErrorCode::MissingParameter,
            Self::InvalidTag(_) => ErrorCode::InvalidTag,
            Self::InvalidDocument { .. } => ErrorCode::InvalidDocument,
            Self::SlugNotFound(_) => ErrorCode::SlugNotFound,
            Self::AssetNotFound(_) => ErrorCode::AssetNotFound,
            Self::AssetInUse { .. } => ErrorCode::AssetInUse,
            Self::NotInitialized(_) => ErrorCode::NotInitialized,
            Self::CorruptStore(_) => ErrorCode::CorruptStore,
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::CacheFetch(_) => ErrorCode::CacheFetchFailed,
            Self::Store(_) => ErrorCode::StoreUnavailable,
            Self::Serialize(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Suggestion text for operators, falling back to the code summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.code();
        code.hint().unwrap_or(code.message()).to_string()
    }

    /// Returns true for client-side (4xx-class) failures.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        let status = self.code().status();
        status >= 400 && status < 500
    }
}
