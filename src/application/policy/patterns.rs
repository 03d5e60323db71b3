use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::domain::profile_map;

/// Source string that matches every input.
pub const MATCH_ALL: &str = ".*";
/// Source string that matches no input.
pub const MATCH_NEVER: &str = "";

/// A compiled filter, or the reason it could not be compiled.
///
/// Patterns must match the whole input, the way a crawler compares a full URL
/// against an operator-supplied expression.
#[derive(Debug, Clone)]
pub enum FilterPattern {
    MatchAll,
    MatchNever,
    Compiled { source: String, regex: Regex },
    /// The source did not compile; the filter matches nothing.
    FellBack { source: String, error: String },
}

impl FilterPattern {
    /// Compile case-insensitively.
    pub fn compile(source: &str) -> Self {
        Self::compile_with(source, true)
    }

    pub fn compile_with(source: &str, case_insensitive: bool) -> Self {
        if source == MATCH_ALL {
            return FilterPattern::MatchAll;
        }
        if source == MATCH_NEVER {
            return FilterPattern::MatchNever;
        }

        let build = |expression: &str| {
            RegexBuilder::new(expression)
                .case_insensitive(case_insensitive)
                .build()
        };

        // The bare source is checked first: wrapping it in a group could turn an
        // unbalanced expression such as `a)(b` into a valid one.
        let anchored = build(source).and_then(|_| {
            build(&format!("^(?:{})$", source)).or_else(|e| {
                // A trailing `#` comment in verbose mode swallows the closing group,
                // so close it on a line of its own.
                build(&format!("^(?:{}\n)$", source)).map_err(|_| e)
            })
        });

        match anchored {
            Ok(regex) => FilterPattern::Compiled {
                source: source.to_string(),
                regex,
            },
            Err(e) => FilterPattern::FellBack {
                source: source.to_string(),
                error: e.to_string(),
            },
        }
    }

    pub fn is_match(&self, input: &str) -> bool {
        match self {
            FilterPattern::MatchAll => true,
            FilterPattern::MatchNever | FilterPattern::FellBack { .. } => false,
            FilterPattern::Compiled { regex, .. } => regex.is_match(input),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FilterPattern::FellBack { .. })
    }

    /// The expression this filter was built from.
    pub fn source(&self) -> &str {
        match self {
            FilterPattern::MatchAll => MATCH_ALL,
            FilterPattern::MatchNever => MATCH_NEVER,
            FilterPattern::Compiled { source, .. } | FilterPattern::FellBack { source, .. } => source,
        }
    }
}

impl fmt::Display for FilterPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

/// The regex filters of a crawl profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDimension {
    CrawlerUrlMustMatch,
    CrawlerUrlMustNotMatch,
    CrawlerIpMustMatch,
    CrawlerIpMustNotMatch,
    CrawlerNoDepthLimitMatch,
    IndexUrlMustMatch,
    IndexUrlMustNotMatch,
    IndexContentMustMatch,
    IndexContentMustNotMatch,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 9] = [
        FilterDimension::CrawlerUrlMustMatch,
        FilterDimension::CrawlerUrlMustNotMatch,
        FilterDimension::CrawlerIpMustMatch,
        FilterDimension::CrawlerIpMustNotMatch,
        FilterDimension::CrawlerNoDepthLimitMatch,
        FilterDimension::IndexUrlMustMatch,
        FilterDimension::IndexUrlMustNotMatch,
        FilterDimension::IndexContentMustMatch,
        FilterDimension::IndexContentMustNotMatch,
    ];

    /// Persisted key holding this filter's source.
    pub fn key(self) -> &'static str {
        match self {
            FilterDimension::CrawlerUrlMustMatch => profile_map::CRAWLER_URL_MUSTMATCH,
            FilterDimension::CrawlerUrlMustNotMatch => profile_map::CRAWLER_URL_MUSTNOTMATCH,
            FilterDimension::CrawlerIpMustMatch => profile_map::CRAWLER_IP_MUSTMATCH,
            FilterDimension::CrawlerIpMustNotMatch => profile_map::CRAWLER_IP_MUSTNOTMATCH,
            FilterDimension::CrawlerNoDepthLimitMatch => profile_map::CRAWLER_URL_NODEPTHLIMITMATCH,
            FilterDimension::IndexUrlMustMatch => profile_map::INDEXING_URL_MUSTMATCH,
            FilterDimension::IndexUrlMustNotMatch => profile_map::INDEXING_URL_MUSTNOTMATCH,
            FilterDimension::IndexContentMustMatch => profile_map::INDEXING_CONTENT_MUSTMATCH,
            FilterDimension::IndexContentMustNotMatch => profile_map::INDEXING_CONTENT_MUSTNOTMATCH,
        }
    }

    /// Source used when the profile does not store one.
    pub fn default_source(self) -> &'static str {
        match self {
            FilterDimension::CrawlerUrlMustMatch
            | FilterDimension::CrawlerIpMustMatch
            | FilterDimension::IndexUrlMustMatch
            | FilterDimension::IndexContentMustMatch => MATCH_ALL,
            FilterDimension::CrawlerUrlMustNotMatch
            | FilterDimension::CrawlerIpMustNotMatch
            | FilterDimension::CrawlerNoDepthLimitMatch
            | FilterDimension::IndexUrlMustNotMatch
            | FilterDimension::IndexContentMustNotMatch => MATCH_NEVER,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Compile-once cells for every filter dimension of one profile.
#[derive(Debug, Default)]
pub struct PatternCache {
    cells: [OnceLock<FilterPattern>; 9],
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled filter for `dimension`, compiling `source` on first access.
    ///
    /// Later calls return the cached filter and ignore `source`.
    pub fn get_or_compile(&self, dimension: FilterDimension, source: Option<&str>) -> &FilterPattern {
        self.cells[dimension.index()].get_or_init(|| {
            let source = source.unwrap_or(dimension.default_source());
            let pattern = FilterPattern::compile(source);
            match &pattern {
                FilterPattern::FellBack { error, .. } => {
                    warn!(
                        filter = dimension.key(),
                        source,
                        error = %error,
                        "Malformed filter expression, filter will match nothing"
                    );
                }
                _ => debug!(filter = dimension.key(), source, "Compiled filter"),
            }
            pattern
        })
    }

    pub fn is_compiled(&self, dimension: FilterDimension) -> bool {
        self.cells[dimension.index()].get().is_some()
    }
}
