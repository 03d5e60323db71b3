use std::collections::HashMap;

/// Maps a host name or IP address to an ISO country code.
pub trait CountryResolver: Send + Sync {
    fn country_of(&self, host_or_ip: &str) -> Option<String>;
}

/// Resolver backed by a fixed table of hosts and addresses.
///
/// Hosts not in the table fall back to their country-code top level domain, so
/// `www.example.de` resolves to `DE`. Generic domains and bare addresses not in the
/// table resolve to nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticCountryResolver {
    entries: HashMap<String, String>,
}

impl StaticCountryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, host_or_ip: impl Into<String>, country: impl Into<String>) -> Self {
        self.entries
            .insert(host_or_ip.into().to_ascii_lowercase(), country.into().to_ascii_uppercase());
        self
    }
}

impl CountryResolver for StaticCountryResolver {
    fn country_of(&self, host_or_ip: &str) -> Option<String> {
        let key = host_or_ip.trim_end_matches('.').to_ascii_lowercase();
        if let Some(country) = self.entries.get(&key) {
            return Some(country.clone());
        }
        let (_, tld) = key.rsplit_once('.')?;
        if tld.len() == 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(tld.to_ascii_uppercase())
        } else {
            None
        }
    }
}
