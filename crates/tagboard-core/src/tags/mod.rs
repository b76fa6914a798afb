//! Hashtag identity: normalization, usage counting, and the slug registry.

pub mod normalize;
pub mod slug;
pub mod usage;

pub use normalize::{canonicalize, project_representations};
pub use slug::{SlugEntry, resolve, resolve_all};
pub use usage::{HashtagUsageResponse, UsageOptions, hashtag_usage};
