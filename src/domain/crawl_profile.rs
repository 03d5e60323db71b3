use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::application::policy::admission::DomainAdmissionTracker;
use crate::application::policy::collections::CollectionTags;
use crate::application::policy::patterns::{FilterDimension, FilterPattern, PatternCache, MATCH_ALL, MATCH_NEVER};
use crate::domain::cache_strategy::CacheStrategy;
use crate::domain::page_quota::PageQuota;
use crate::domain::profile_map::{self, compute_handle, ProfileRecord};
use crate::infrastructure::identity::{AgentRegistry, ClientAgent};
use crate::utils::error::{PolicyError, Result};

/// Longest accepted profile name, in characters.
pub const MAX_NAME_LENGTH: usize = 256;
/// Names of profiles created for pushed documents start with this prefix.
pub const PUSH_PROFILE_PREFIX: &str = "push_";
/// `recrawl_if_older` value meaning no recrawl date was set.
pub const RECRAWL_NEVER: i64 = i64::MAX;

/// Everything needed to create a profile from scratch.
///
/// Filter sources left as `None` get the default of their dimension.
#[derive(Debug, Clone)]
pub struct ProfileParams {
    pub name: String,
    pub crawler_url_must_match: Option<String>,
    pub crawler_url_must_not_match: Option<String>,
    pub crawler_ip_must_match: Option<String>,
    pub crawler_ip_must_not_match: Option<String>,
    /// Comma-separated country codes
    pub crawler_country_must_match: Option<String>,
    pub crawler_no_depth_limit_match: Option<String>,
    pub index_url_must_match: Option<String>,
    pub index_url_must_not_match: Option<String>,
    pub index_content_must_match: Option<String>,
    pub index_content_must_not_match: Option<String>,
    pub depth: u32,
    pub direct_doc_by_url: bool,
    pub recrawl_if_older: Option<DateTime<Utc>>,
    pub dom_max_pages: PageQuota,
    pub crawling_q: bool,
    pub follow_frames: bool,
    pub obey_html_robots_noindex: bool,
    pub obey_html_robots_nofollow: bool,
    pub index_text: bool,
    pub index_media: bool,
    pub store_ht_cache: bool,
    pub remote_indexing: bool,
    /// Negative disables snapshots
    pub snapshots_max_depth: i32,
    pub snapshots_load_image: bool,
    pub snapshots_replace_old: bool,
    pub cache_strategy: CacheStrategy,
    pub collections: String,
    pub agent_name: String,
    pub scraper: Option<serde_json::Value>,
    /// Minutes, applied to dates scraped without a time zone
    pub timezone_offset: i32,
}

impl ProfileParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crawler_url_must_match: None,
            crawler_url_must_not_match: None,
            crawler_ip_must_match: None,
            crawler_ip_must_not_match: None,
            crawler_country_must_match: None,
            crawler_no_depth_limit_match: None,
            index_url_must_match: None,
            index_url_must_not_match: None,
            index_content_must_match: None,
            index_content_must_not_match: None,
            depth: 0,
            direct_doc_by_url: false,
            recrawl_if_older: None,
            dom_max_pages: PageQuota::Unlimited,
            crawling_q: false,
            follow_frames: false,
            obey_html_robots_noindex: false,
            obey_html_robots_nofollow: false,
            index_text: true,
            index_media: true,
            store_ht_cache: false,
            remote_indexing: false,
            snapshots_max_depth: -1,
            snapshots_load_image: false,
            snapshots_replace_old: false,
            cache_strategy: CacheStrategy::default(),
            collections: String::new(),
            agent_name: String::new(),
            scraper: None,
            timezone_offset: 0,
        }
    }
}

/// Policy record of one crawl job.
///
/// Immutable once built. Filters, collection tags and the scraper blob are derived
/// from the stored strings on first use and cached for the lifetime of the
/// instance; the domain counters are the only state that changes.
#[derive(Debug)]
pub struct CrawlProfile {
    record: ProfileRecord,
    patterns: PatternCache,
    countries: OnceLock<Vec<String>>,
    collections: OnceLock<CollectionTags>,
    scraper: OnceLock<serde_json::Value>,
    depth: OnceLock<u32>,
    dom_max_pages: OnceLock<PageQuota>,
    domains: DomainAdmissionTracker,
}

impl CrawlProfile {
    pub fn new(params: ProfileParams) -> Result<Self> {
        if params.name.is_empty() {
            return Err(PolicyError::MissingField(profile_map::NAME));
        }
        let name = truncate_name(params.name);
        if let Some(max) = params.dom_max_pages.limit() {
            if max > PageQuota::MAX_LIMIT {
                return Err(PolicyError::InvalidInput(format!(
                    "domMaxPages {} exceeds the largest storable limit {}",
                    max,
                    PageQuota::MAX_LIMIT
                )));
            }
        }

        let url_must_match = params.crawler_url_must_match.unwrap_or_else(|| MATCH_ALL.to_string());
        let url_must_not_match = params.crawler_url_must_not_match.unwrap_or_else(|| MATCH_NEVER.to_string());
        let depth = params.depth.to_string();
        let dom_max_pages = params.dom_max_pages.to_string();
        let collections: String = params.collections.chars().filter(|c| !c.is_whitespace()).collect();
        let scraper = params
            .scraper
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let handle = compute_handle(
            &name,
            &url_must_match,
            &depth,
            &url_must_not_match,
            &dom_max_pages,
            &collections,
        );
        debug!(handle = %handle, name = %name, "Creating crawl profile");

        let or_default = |source: Option<String>, dimension: FilterDimension| {
            Some(source.unwrap_or_else(|| dimension.default_source().to_string()))
        };

        let record = ProfileRecord {
            handle: Some(handle),
            name: Some(name),
            agent_name: Some(params.agent_name),
            depth: Some(depth),
            direct_doc_by_url: Some(params.direct_doc_by_url.to_string()),
            recrawl_if_older: Some(
                params
                    .recrawl_if_older
                    .map_or(RECRAWL_NEVER, |date| date.timestamp_millis())
                    .to_string(),
            ),
            dom_max_pages: Some(dom_max_pages),
            crawling_q: Some(params.crawling_q.to_string()),
            follow_frames: Some(params.follow_frames.to_string()),
            obey_html_robots_noindex: Some(params.obey_html_robots_noindex.to_string()),
            obey_html_robots_nofollow: Some(params.obey_html_robots_nofollow.to_string()),
            index_text: Some(params.index_text.to_string()),
            index_media: Some(params.index_media.to_string()),
            store_ht_cache: Some(params.store_ht_cache.to_string()),
            remote_indexing: Some(params.remote_indexing.to_string()),
            cache_strategy: Some(params.cache_strategy.to_string()),
            collections: Some(collections),
            scraper: Some(scraper.to_string()),
            timezone_offset: Some(params.timezone_offset.to_string()),
            crawler_url_must_match: Some(url_must_match),
            crawler_url_must_not_match: Some(url_must_not_match),
            crawler_ip_must_match: or_default(params.crawler_ip_must_match, FilterDimension::CrawlerIpMustMatch),
            crawler_ip_must_not_match: or_default(params.crawler_ip_must_not_match, FilterDimension::CrawlerIpMustNotMatch),
            crawler_country_must_match: Some(params.crawler_country_must_match.unwrap_or_default()),
            crawler_no_depth_limit_match: or_default(
                params.crawler_no_depth_limit_match,
                FilterDimension::CrawlerNoDepthLimitMatch,
            ),
            index_url_must_match: or_default(params.index_url_must_match, FilterDimension::IndexUrlMustMatch),
            index_url_must_not_match: or_default(params.index_url_must_not_match, FilterDimension::IndexUrlMustNotMatch),
            index_content_must_match: or_default(params.index_content_must_match, FilterDimension::IndexContentMustMatch),
            index_content_must_not_match: or_default(
                params.index_content_must_not_match,
                FilterDimension::IndexContentMustNotMatch,
            ),
            snapshots_max_depth: Some(params.snapshots_max_depth.to_string()),
            snapshots_replace_old: Some(params.snapshots_replace_old.to_string()),
            snapshots_load_image: Some(params.snapshots_load_image.to_string()),
            extra: BTreeMap::new(),
        };

        let profile = Self::from_record(record);
        // Keep the parsed blob instead of re-reading the string we just wrote.
        let _ = profile.scraper.set(scraper);
        Ok(profile)
    }

    /// Restore a profile from its persisted map. Nothing is validated here; missing
    /// or malformed values fall back to defaults when they are read.
    pub fn from_map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::from_record(ProfileRecord::from_map(entries))
    }

    /// Restore a profile from the JSON object of strings its map is stored as.
    pub fn from_json(raw: &str) -> Result<Self> {
        let map: BTreeMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self::from_map(map))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_map())?)
    }

    /// Wrap a stored record. A record without a handle gets one derived from its
    /// identity fields.
    pub fn from_record(mut record: ProfileRecord) -> Self {
        if record.handle.is_none() {
            let handle = derive_handle(&record);
            debug!(handle = %handle, "Derived missing profile handle");
            record.handle = Some(handle);
        }
        Self {
            record,
            patterns: PatternCache::new(),
            countries: OnceLock::new(),
            collections: OnceLock::new(),
            scraper: OnceLock::new(),
            depth: OnceLock::new(),
            dom_max_pages: OnceLock::new(),
            domains: DomainAdmissionTracker::new(),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.record.to_map()
    }

    pub fn record(&self) -> &ProfileRecord {
        &self.record
    }

    pub fn handle(&self) -> &str {
        self.record.handle.as_deref().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.record.name.as_deref().unwrap_or_default()
    }

    pub fn agent_name(&self) -> &str {
        self.record.agent_name.as_deref().unwrap_or_default()
    }

    /// Resolve the agent this profile crawls as.
    pub fn agent(&self, registry: &dyn AgentRegistry) -> Option<ClientAgent> {
        registry.agent(self.agent_name())
    }

    pub fn is_push_profile(&self) -> bool {
        self.name().starts_with(PUSH_PROFILE_PREFIX)
    }

    /// The collections string, unless it is empty or the catch-all `user`
    /// collection, in which case the profile name.
    pub fn collection_name(&self) -> &str {
        match self.collections_source() {
            "" | "user" => self.name(),
            collections => collections,
        }
    }

    pub fn collections_source(&self) -> &str {
        self.record.collections.as_deref().unwrap_or_default()
    }

    pub fn collections(&self) -> &CollectionTags {
        self.collections
            .get_or_init(|| CollectionTags::parse(self.collections_source()))
    }

    /// Structured scraper configuration; an empty object when absent or unreadable.
    pub fn scraper(&self) -> &serde_json::Value {
        self.scraper.get_or_init(|| {
            let empty = || serde_json::Value::Object(Default::default());
            match self.record.scraper.as_deref() {
                None | Some("") => empty(),
                Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                    warn!(profile = self.handle(), error = %e, "Unreadable scraper configuration, using empty one");
                    empty()
                }),
            }
        })
    }

    /// Stored source of a filter dimension, or its default.
    pub fn filter_source(&self, dimension: FilterDimension) -> &str {
        self.stored_filter(dimension).unwrap_or(dimension.default_source())
    }

    fn stored_filter(&self, dimension: FilterDimension) -> Option<&str> {
        let r = &self.record;
        let slot = match dimension {
            FilterDimension::CrawlerUrlMustMatch => &r.crawler_url_must_match,
            FilterDimension::CrawlerUrlMustNotMatch => &r.crawler_url_must_not_match,
            FilterDimension::CrawlerIpMustMatch => &r.crawler_ip_must_match,
            FilterDimension::CrawlerIpMustNotMatch => &r.crawler_ip_must_not_match,
            FilterDimension::CrawlerNoDepthLimitMatch => &r.crawler_no_depth_limit_match,
            FilterDimension::IndexUrlMustMatch => &r.index_url_must_match,
            FilterDimension::IndexUrlMustNotMatch => &r.index_url_must_not_match,
            FilterDimension::IndexContentMustMatch => &r.index_content_must_match,
            FilterDimension::IndexContentMustNotMatch => &r.index_content_must_not_match,
        };
        slot.as_deref()
    }

    /// Compiled filter of a dimension. Malformed sources yield a filter that
    /// matches nothing.
    pub fn filter(&self, dimension: FilterDimension) -> &FilterPattern {
        self.patterns.get_or_compile(dimension, self.stored_filter(dimension))
    }

    pub fn url_must_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::CrawlerUrlMustMatch)
    }

    pub fn url_must_not_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::CrawlerUrlMustNotMatch)
    }

    pub fn ip_must_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::CrawlerIpMustMatch)
    }

    pub fn ip_must_not_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::CrawlerIpMustNotMatch)
    }

    /// URLs matching this filter are crawled regardless of depth.
    pub fn no_depth_limit_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::CrawlerNoDepthLimitMatch)
    }

    pub fn index_url_must_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::IndexUrlMustMatch)
    }

    pub fn index_url_must_not_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::IndexUrlMustNotMatch)
    }

    pub fn index_content_must_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::IndexContentMustMatch)
    }

    pub fn index_content_must_not_match(&self) -> &FilterPattern {
        self.filter(FilterDimension::IndexContentMustNotMatch)
    }

    /// Country codes a host must resolve to; empty means any country.
    pub fn country_must_match(&self) -> &[String] {
        self.countries.get_or_init(|| {
            self.record
                .crawler_country_must_match
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn depth(&self) -> u32 {
        *self.depth.get_or_init(|| {
            parse_or(&self.record.depth, profile_map::DEPTH, 0, self.handle())
        })
    }

    pub fn dom_max_pages(&self) -> PageQuota {
        *self.dom_max_pages.get_or_init(|| {
            let raw: i64 = parse_or(
                &self.record.dom_max_pages,
                profile_map::DOM_MAX_PAGES,
                i64::from(i32::MAX),
                self.handle(),
            );
            PageQuota::from_raw(raw)
        })
    }

    /// Epoch milliseconds; documents indexed before this are crawled again.
    /// `RECRAWL_NEVER` when unset.
    pub fn recrawl_if_older(&self) -> i64 {
        let value = parse_or(&self.record.recrawl_if_older, profile_map::RECRAWL_IF_OLDER, RECRAWL_NEVER, self.handle());
        value.max(0)
    }

    /// The recrawl limit for documents older than `minutes`. Saturates at the
    /// representable date range.
    pub fn recrawl_date(minutes: i64) -> DateTime<Utc> {
        Duration::try_minutes(minutes)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(if minutes < 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            })
    }

    pub fn snapshot_max_depth(&self) -> i32 {
        let value = parse_or(&self.record.snapshots_max_depth, profile_map::SNAPSHOTS_MAXDEPTH, -1, self.handle());
        if value < 0 { -1 } else { value }
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        parse_or(&self.record.cache_strategy, profile_map::CACHE_STRATEGY, CacheStrategy::default(), self.handle())
    }

    pub fn timezone_offset(&self) -> i32 {
        parse_or(&self.record.timezone_offset, profile_map::TIMEZONE_OFFSET, 0, self.handle())
    }

    pub fn direct_doc_by_url(&self) -> bool {
        flag(&self.record.direct_doc_by_url, false)
    }

    pub fn crawling_q(&self) -> bool {
        flag(&self.record.crawling_q, false)
    }

    pub fn follow_frames(&self) -> bool {
        flag(&self.record.follow_frames, false)
    }

    pub fn obey_html_robots_noindex(&self) -> bool {
        flag(&self.record.obey_html_robots_noindex, false)
    }

    pub fn obey_html_robots_nofollow(&self) -> bool {
        flag(&self.record.obey_html_robots_nofollow, false)
    }

    pub fn index_text(&self) -> bool {
        flag(&self.record.index_text, true)
    }

    pub fn index_media(&self) -> bool {
        flag(&self.record.index_media, true)
    }

    pub fn store_ht_cache(&self) -> bool {
        flag(&self.record.store_ht_cache, false)
    }

    pub fn remote_indexing(&self) -> bool {
        flag(&self.record.remote_indexing, false)
    }

    pub fn snapshot_load_image(&self) -> bool {
        flag(&self.record.snapshots_load_image, false)
    }

    pub fn snapshot_replace_old(&self) -> bool {
        flag(&self.record.snapshots_replace_old, false)
    }

    pub fn domains(&self) -> &DomainAdmissionTracker {
        &self.domains
    }
}

// Same inputs fresh construction hashes, with absent fields at their defaults.
fn derive_handle(record: &ProfileRecord) -> String {
    let stored = |value: &Option<String>, default: &str| value.as_deref().unwrap_or(default).to_string();
    compute_handle(
        &stored(&record.name, ""),
        &stored(&record.crawler_url_must_match, FilterDimension::CrawlerUrlMustMatch.default_source()),
        &stored(&record.depth, "0"),
        &stored(&record.crawler_url_must_not_match, FilterDimension::CrawlerUrlMustNotMatch.default_source()),
        &stored(&record.dom_max_pages, &PageQuota::Unlimited.to_string()),
        &stored(&record.collections, ""),
    )
}

// Keeps the first MAX_NAME_LENGTH characters.
fn truncate_name(name: String) -> String {
    match name.char_indices().nth(MAX_NAME_LENGTH) {
        Some((cut, _)) => {
            warn!(length = name.chars().count(), "Profile name too long, truncating to {} characters", MAX_NAME_LENGTH);
            name[..cut].to_string()
        }
        None => name,
    }
}

fn flag(raw: &Option<String>, default: bool) -> bool {
    match raw {
        None => default,
        Some(value) => value == "true",
    }
}

fn parse_or<T: FromStr>(raw: &Option<String>, key: &str, default: T, handle: &str) -> T {
    match raw.as_deref() {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(profile = handle, field = key, value, "Malformed profile field, using default");
            default
        }),
    }
}
