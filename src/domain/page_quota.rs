use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of pages admitted per domain.
///
/// Persisted as a decimal integer. `Unlimited` is written as `i32::MAX`; on read any
/// negative value or anything at or above `i32::MAX` also means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PageQuota {
    #[default]
    Unlimited,
    Limit(u32),
}

impl PageQuota {
    const UNLIMITED_WIRE: i64 = i32::MAX as i64;
    /// Largest limit that reads back as a limit once persisted.
    pub const MAX_LIMIT: u32 = i32::MAX as u32 - 1;

    /// Interpret a raw integer the way persisted profiles use it.
    pub fn from_raw(value: i64) -> Self {
        if value < 0 || value >= Self::UNLIMITED_WIRE {
            PageQuota::Unlimited
        } else {
            PageQuota::Limit(value as u32)
        }
    }

    /// Whether a domain that already holds `count` pages may take one more.
    pub fn admits(&self, count: u64) -> bool {
        match self {
            PageQuota::Unlimited => true,
            PageQuota::Limit(max) => count < u64::from(*max),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, PageQuota::Unlimited)
    }

    pub fn limit(&self) -> Option<u32> {
        match self {
            PageQuota::Unlimited => None,
            PageQuota::Limit(max) => Some(*max),
        }
    }
}

impl fmt::Display for PageQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageQuota::Unlimited => write!(f, "{}", Self::UNLIMITED_WIRE),
            PageQuota::Limit(max) => write!(f, "{}", max),
        }
    }
}
