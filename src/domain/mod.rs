pub mod cache_strategy;
pub mod crawl_profile;
pub mod page_quota;
pub mod profile_map;

pub use cache_strategy::CacheStrategy;
pub use crawl_profile::{CrawlProfile, ProfileParams};
pub use page_quota::PageQuota;
pub use profile_map::ProfileRecord;
