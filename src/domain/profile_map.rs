//! Persisted form of a crawl profile: a flat map from field name to string.
//!
//! `ProfileRecord` keeps every stored value verbatim in a named slot. Converting a map
//! into a record and back reproduces the map exactly, unknown keys included.
//! Interpretation and defaulting of the values is left to `CrawlProfile`'s getters.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::collections::BTreeMap;

pub const HANDLE: &str = "handle";
pub const NAME: &str = "name";
pub const AGENT_NAME: &str = "agentName";
pub const DEPTH: &str = "generalDepth";
pub const DIRECT_DOC_BY_URL: &str = "directDocByURL";
pub const RECRAWL_IF_OLDER: &str = "recrawlIfOlder";
pub const DOM_MAX_PAGES: &str = "domMaxPages";
pub const CRAWLING_Q: &str = "crawlingQ";
pub const FOLLOW_FRAMES: &str = "followFrames";
pub const OBEY_HTML_ROBOTS_NOINDEX: &str = "obeyHtmlRobotsNoindex";
pub const OBEY_HTML_ROBOTS_NOFOLLOW: &str = "obeyHtmlRobotsNofollow";
pub const INDEX_TEXT: &str = "indexText";
pub const INDEX_MEDIA: &str = "indexMedia";
pub const STORE_HTCACHE: &str = "storeHTCache";
pub const REMOTE_INDEXING: &str = "remoteIndexing";
pub const CACHE_STRATEGY: &str = "cacheStrategy";
pub const COLLECTIONS: &str = "collections";
pub const SCRAPER: &str = "scraper";
pub const TIMEZONE_OFFSET: &str = "timezoneOffset";
pub const CRAWLER_URL_MUSTMATCH: &str = "crawlerURLMustMatch";
pub const CRAWLER_URL_MUSTNOTMATCH: &str = "crawlerURLMustNotMatch";
pub const CRAWLER_IP_MUSTMATCH: &str = "crawlerIPMustMatch";
pub const CRAWLER_IP_MUSTNOTMATCH: &str = "crawlerIPMustNotMatch";
pub const CRAWLER_COUNTRY_MUSTMATCH: &str = "crawlerCountryMustMatch";
pub const CRAWLER_URL_NODEPTHLIMITMATCH: &str = "crawlerNoLimitURLMustMatch";
pub const INDEXING_URL_MUSTMATCH: &str = "indexURLMustMatch";
pub const INDEXING_URL_MUSTNOTMATCH: &str = "indexURLMustNotMatch";
pub const INDEXING_CONTENT_MUSTMATCH: &str = "indexContentMustMatch";
pub const INDEXING_CONTENT_MUSTNOTMATCH: &str = "indexContentMustNotMatch";
pub const SNAPSHOTS_MAXDEPTH: &str = "snapshotsMaxDepth";
pub const SNAPSHOTS_REPLACEOLD: &str = "snapshotsReplaceOld";
pub const SNAPSHOTS_LOADIMAGE: &str = "snapshotsLoadImage";

/// Length of a profile handle in characters.
pub const HANDLE_LENGTH: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileRecord {
    pub handle: Option<String>,
    pub name: Option<String>,
    pub agent_name: Option<String>,
    pub depth: Option<String>,
    pub direct_doc_by_url: Option<String>,
    pub recrawl_if_older: Option<String>,
    pub dom_max_pages: Option<String>,
    pub crawling_q: Option<String>,
    pub follow_frames: Option<String>,
    pub obey_html_robots_noindex: Option<String>,
    pub obey_html_robots_nofollow: Option<String>,
    pub index_text: Option<String>,
    pub index_media: Option<String>,
    pub store_ht_cache: Option<String>,
    pub remote_indexing: Option<String>,
    pub cache_strategy: Option<String>,
    pub collections: Option<String>,
    pub scraper: Option<String>,
    pub timezone_offset: Option<String>,
    pub crawler_url_must_match: Option<String>,
    pub crawler_url_must_not_match: Option<String>,
    pub crawler_ip_must_match: Option<String>,
    pub crawler_ip_must_not_match: Option<String>,
    pub crawler_country_must_match: Option<String>,
    pub crawler_no_depth_limit_match: Option<String>,
    pub index_url_must_match: Option<String>,
    pub index_url_must_not_match: Option<String>,
    pub index_content_must_match: Option<String>,
    pub index_content_must_not_match: Option<String>,
    pub snapshots_max_depth: Option<String>,
    pub snapshots_replace_old: Option<String>,
    pub snapshots_load_image: Option<String>,
    /// Keys this version does not know about, carried through untouched
    pub extra: BTreeMap<String, String>,
}

impl ProfileRecord {
    /// Build a record from a persisted map. Never fails and never validates.
    pub fn from_map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut record = ProfileRecord::default();
        for (key, value) in entries {
            match record.slot_mut(&key) {
                Some(slot) => *slot = Some(value),
                None => {
                    record.extra.insert(key, value);
                }
            }
        }
        record
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        for (key, value) in self.slots() {
            if let Some(value) = value {
                map.insert(key.to_string(), value.clone());
            }
        }
        map
    }

    /// Raw stored value for a persisted key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.slots()
            .into_iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.as_deref())
            .or_else(|| self.extra.get(key).map(String::as_str))
    }

    fn slots(&self) -> [(&'static str, &Option<String>); 32] {
        [
            (HANDLE, &self.handle),
            (NAME, &self.name),
            (AGENT_NAME, &self.agent_name),
            (DEPTH, &self.depth),
            (DIRECT_DOC_BY_URL, &self.direct_doc_by_url),
            (RECRAWL_IF_OLDER, &self.recrawl_if_older),
            (DOM_MAX_PAGES, &self.dom_max_pages),
            (CRAWLING_Q, &self.crawling_q),
            (FOLLOW_FRAMES, &self.follow_frames),
            (OBEY_HTML_ROBOTS_NOINDEX, &self.obey_html_robots_noindex),
            (OBEY_HTML_ROBOTS_NOFOLLOW, &self.obey_html_robots_nofollow),
            (INDEX_TEXT, &self.index_text),
            (INDEX_MEDIA, &self.index_media),
            (STORE_HTCACHE, &self.store_ht_cache),
            (REMOTE_INDEXING, &self.remote_indexing),
            (CACHE_STRATEGY, &self.cache_strategy),
            (COLLECTIONS, &self.collections),
            (SCRAPER, &self.scraper),
            (TIMEZONE_OFFSET, &self.timezone_offset),
            (CRAWLER_URL_MUSTMATCH, &self.crawler_url_must_match),
            (CRAWLER_URL_MUSTNOTMATCH, &self.crawler_url_must_not_match),
            (CRAWLER_IP_MUSTMATCH, &self.crawler_ip_must_match),
            (CRAWLER_IP_MUSTNOTMATCH, &self.crawler_ip_must_not_match),
            (CRAWLER_COUNTRY_MUSTMATCH, &self.crawler_country_must_match),
            (CRAWLER_URL_NODEPTHLIMITMATCH, &self.crawler_no_depth_limit_match),
            (INDEXING_URL_MUSTMATCH, &self.index_url_must_match),
            (INDEXING_URL_MUSTNOTMATCH, &self.index_url_must_not_match),
            (INDEXING_CONTENT_MUSTMATCH, &self.index_content_must_match),
            (INDEXING_CONTENT_MUSTNOTMATCH, &self.index_content_must_not_match),
            (SNAPSHOTS_MAXDEPTH, &self.snapshots_max_depth),
            (SNAPSHOTS_REPLACEOLD, &self.snapshots_replace_old),
            (SNAPSHOTS_LOADIMAGE, &self.snapshots_load_image),
        ]
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            HANDLE => &mut self.handle,
            NAME => &mut self.name,
            AGENT_NAME => &mut self.agent_name,
            DEPTH => &mut self.depth,
            DIRECT_DOC_BY_URL => &mut self.direct_doc_by_url,
            RECRAWL_IF_OLDER => &mut self.recrawl_if_older,
            DOM_MAX_PAGES => &mut self.dom_max_pages,
            CRAWLING_Q => &mut self.crawling_q,
            FOLLOW_FRAMES => &mut self.follow_frames,
            OBEY_HTML_ROBOTS_NOINDEX => &mut self.obey_html_robots_noindex,
            OBEY_HTML_ROBOTS_NOFOLLOW => &mut self.obey_html_robots_nofollow,
            INDEX_TEXT => &mut self.index_text,
            INDEX_MEDIA => &mut self.index_media,
            STORE_HTCACHE => &mut self.store_ht_cache,
            REMOTE_INDEXING => &mut self.remote_indexing,
            CACHE_STRATEGY => &mut self.cache_strategy,
            COLLECTIONS => &mut self.collections,
            SCRAPER => &mut self.scraper,
            TIMEZONE_OFFSET => &mut self.timezone_offset,
            CRAWLER_URL_MUSTMATCH => &mut self.crawler_url_must_match,
            CRAWLER_URL_MUSTNOTMATCH => &mut self.crawler_url_must_not_match,
            CRAWLER_IP_MUSTMATCH => &mut self.crawler_ip_must_match,
            CRAWLER_IP_MUSTNOTMATCH => &mut self.crawler_ip_must_not_match,
            CRAWLER_COUNTRY_MUSTMATCH => &mut self.crawler_country_must_match,
            CRAWLER_URL_NODEPTHLIMITMATCH => &mut self.crawler_no_depth_limit_match,
            INDEXING_URL_MUSTMATCH => &mut self.index_url_must_match,
            INDEXING_URL_MUSTNOTMATCH => &mut self.index_url_must_not_match,
            INDEXING_CONTENT_MUSTMATCH => &mut self.index_content_must_match,
            INDEXING_CONTENT_MUSTNOTMATCH => &mut self.index_content_must_not_match,
            SNAPSHOTS_MAXDEPTH => &mut self.snapshots_max_depth,
            SNAPSHOTS_REPLACEOLD => &mut self.snapshots_replace_old,
            SNAPSHOTS_LOADIMAGE => &mut self.snapshots_load_image,
            _ => return None,
        };
        Some(slot)
    }
}

/// Content hash identifying a profile by the fields that define its crawl scope.
///
/// MD5 over the concatenated fields, URL-safe base64, cut to `HANDLE_LENGTH`.
pub fn compute_handle(
    name: &str,
    url_must_match: &str,
    depth: &str,
    url_must_not_match: &str,
    dom_max_pages: &str,
    collections: &str,
) -> String {
    let mut input = String::with_capacity(
        name.len() + url_must_match.len() + depth.len() + url_must_not_match.len()
            + dom_max_pages.len() + collections.len(),
    );
    input.push_str(name);
    input.push_str(url_must_match);
    input.push_str(depth);
    input.push_str(url_must_not_match);
    input.push_str(dom_max_pages);
    input.push_str(collections);

    let digest = md5::compute(input.as_bytes());
    let mut handle = URL_SAFE_NO_PAD.encode(digest.0);
    handle.truncate(HANDLE_LENGTH);
    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_round_trip_keeps_unknown_keys() {
        let mut map = BTreeMap::new();
        map.insert(NAME.to_string(), "news".to_string());
        map.insert(DEPTH.to_string(), "not-a-number".to_string());
        map.insert("legacyField".to_string(), "42".to_string());

        let record = ProfileRecord::from_map(map.clone());
        assert_eq!(record.name.as_deref(), Some("news"));
        assert_eq!(record.get("legacyField"), Some("42"));
        assert_eq!(record.get(DEPTH), Some("not-a-number"));
        assert_eq!(record.to_map(), map);
    }

    #[test]
    fn handle_has_fixed_length_and_url_safe_alphabet() {
        let handle = compute_handle("a", ".*", "3", "", "2147483647", "");
        assert_eq!(handle.len(), HANDLE_LENGTH);
        assert!(handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn handle_changes_with_each_identity_field() {
        let base = compute_handle("a", ".*", "3", "", "10", "x");
        assert_ne!(base, compute_handle("b", ".*", "3", "", "10", "x"));
        assert_ne!(base, compute_handle("a", "http.*", "3", "", "10", "x"));
        assert_ne!(base, compute_handle("a", ".*", "4", "", "10", "x"));
        assert_ne!(base, compute_handle("a", ".*", "3", ".*pdf", "10", "x"));
        assert_ne!(base, compute_handle("a", ".*", "3", "", "11", "x"));
        assert_ne!(base, compute_handle("a", ".*", "3", "", "10", "y"));
    }
}
