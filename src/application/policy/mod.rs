pub mod admission;
pub mod collections;
pub mod evaluation;
pub mod patterns;
pub mod summary;
pub mod url_filters;

pub use admission::{DomainAdmissionTracker, DomainCount};
pub use collections::CollectionTags;
pub use evaluation::{CrawlCandidate, CrawlDecision, CrawlRejection, IndexDecision, IndexRejection};
pub use patterns::{FilterDimension, FilterPattern, PatternCache, MATCH_ALL, MATCH_NEVER};
pub use summary::{FilterSummary, ProfileSummary};
pub use url_filters::{site_filter, subpath_filter};
