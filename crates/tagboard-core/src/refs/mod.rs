//! Content-asset reference tracking over chart formulas.

pub mod scan;
pub mod tokens;

pub use scan::{ReferenceScan, ReferenceUsageResponse, reference_usage, scan_references};
pub use tokens::{ReferenceToken, extract_tokens};
