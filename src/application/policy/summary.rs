use serde::Serialize;

use crate::application::policy::patterns::FilterDimension;
use crate::domain::cache_strategy::CacheStrategy;
use crate::domain::crawl_profile::{CrawlProfile, RECRAWL_NEVER};
use crate::infrastructure::identity::AgentRegistry;

/// Operator view of a crawl profile, ready to be rendered or serialized
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub handle: String,
    pub name: String,
    pub collections: String,
    pub agent_name: String,
    pub user_agent: Option<String>,
    pub depth: u32,
    pub direct_doc_by_url: bool,
    /// Epoch milliseconds, `None` when no recrawl date is set
    pub recrawl_if_older: Option<i64>,
    /// `None` when unlimited
    pub dom_max_pages: Option<u32>,
    pub crawling_q: bool,
    pub follow_frames: bool,
    pub obey_html_robots_noindex: bool,
    pub obey_html_robots_nofollow: bool,
    pub index_text: bool,
    pub index_media: bool,
    pub store_ht_cache: bool,
    pub remote_indexing: bool,
    pub cache_strategy: CacheStrategy,
    pub filters: Vec<FilterSummary>,
    pub country_must_match: Vec<String>,
    /// Domain counters, only listed for running profiles with a finite quota
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    pub key: &'static str,
    pub source: String,
    /// The source did not compile and the filter matches nothing
    pub fell_back: bool,
}

impl CrawlProfile {
    pub fn summary(
        &self,
        registry: &dyn AgentRegistry,
        active: bool,
        domain_listing_length: usize,
    ) -> ProfileSummary {
        let quota = self.dom_max_pages().limit();
        let domains = match quota {
            Some(max) if active && max > 0 => self.domains().listing(domain_listing_length),
            _ => Vec::new(),
        };
        let recrawl = self.recrawl_if_older();

        ProfileSummary {
            handle: self.handle().to_string(),
            name: self.name().to_string(),
            collections: self.collections_source().to_string(),
            agent_name: self.agent_name().to_string(),
            user_agent: self.agent(registry).map(|agent| agent.user_agent),
            depth: self.depth(),
            direct_doc_by_url: self.direct_doc_by_url(),
            recrawl_if_older: (recrawl != RECRAWL_NEVER).then_some(recrawl),
            dom_max_pages: quota,
            crawling_q: self.crawling_q(),
            follow_frames: self.follow_frames(),
            obey_html_robots_noindex: self.obey_html_robots_noindex(),
            obey_html_robots_nofollow: self.obey_html_robots_nofollow(),
            index_text: self.index_text(),
            index_media: self.index_media(),
            store_ht_cache: self.store_ht_cache(),
            remote_indexing: self.remote_indexing(),
            cache_strategy: self.cache_strategy(),
            filters: FilterDimension::ALL
                .iter()
                .map(|&dimension| FilterSummary {
                    key: dimension.key(),
                    source: self.filter_source(dimension).to_string(),
                    fell_back: self.filter(dimension).is_fallback(),
                })
                .collect(),
            country_must_match: self.country_must_match().to_vec(),
            domains,
        }
    }
}
