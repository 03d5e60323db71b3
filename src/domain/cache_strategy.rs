use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::PolicyError;

/// How the loader may use cached content instead of going online
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStrategy {
    /// Never use the cache, always load online
    NoCache,
    /// Use the cache only if the cached entry is fresh
    IfFresh,
    /// Use the cache if an entry exists, load online otherwise
    #[default]
    IfExist,
    /// Never go online, use the cache only
    CacheOnly,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::NoCache => "NOCACHE",
            CacheStrategy::IfFresh => "IFFRESH",
            CacheStrategy::IfExist => "IFEXIST",
            CacheStrategy::CacheOnly => "CACHEONLY",
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheStrategy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return CacheStrategy::try_from(code);
        }
        match s.to_ascii_uppercase().as_str() {
            "NOCACHE" => Ok(CacheStrategy::NoCache),
            "IFFRESH" => Ok(CacheStrategy::IfFresh),
            "IFEXIST" => Ok(CacheStrategy::IfExist),
            "CACHEONLY" => Ok(CacheStrategy::CacheOnly),
            _ => Err(PolicyError::InvalidInput(format!("unknown cache strategy: {}", s))),
        }
    }
}

// Older profile stores persisted the numeric code instead of the name.
impl TryFrom<i32> for CacheStrategy {
    type Error = PolicyError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CacheStrategy::NoCache),
            1 => Ok(CacheStrategy::IfFresh),
            2 => Ok(CacheStrategy::IfExist),
            3 => Ok(CacheStrategy::CacheOnly),
            _ => Err(PolicyError::InvalidInput(format!("unknown cache strategy code: {}", value))),
        }
    }
}

impl From<CacheStrategy> for i32 {
    fn from(strategy: CacheStrategy) -> Self {
        match strategy {
            CacheStrategy::NoCache => 0,
            CacheStrategy::IfFresh => 1,
            CacheStrategy::IfExist => 2,
            CacheStrategy::CacheOnly => 3,
        }
    }
}
