use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

use crawl_policy_engine::application::policy::evaluation::{CrawlCandidate, CrawlDecision};
use crawl_policy_engine::config::settings::PolicyConfig;
use crawl_policy_engine::domain::crawl_profile::CrawlProfile;
use crawl_policy_engine::infrastructure::geo::StaticCountryResolver;
use crawl_policy_engine::infrastructure::identity::{ClientAgent, InMemoryAgentRegistry};
use crawl_policy_engine::utils::logging;

const USAGE: &str = "usage: crawl-policy <profile.json>  (candidates on stdin: url [depth] [ip] [country])";

fn main() -> Result<()> {
    logging::init_tracing("info");

    let config = PolicyConfig::load()?;
    debug!(?config, "Configuration loaded");

    let path = std::env::args().nth(1).context(USAGE)?;
    let profile = CrawlProfile::load(&path).with_context(|| format!("loading profile {}", path))?;
    let registry = InMemoryAgentRegistry::new(ClientAgent::named(&config.profile.default_agent_name));
    info!(handle = profile.handle(), name = profile.name(), "Crawl profile loaded");

    let resolver = StaticCountryResolver::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut accepted = 0usize;
    let mut rejected = 0usize;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(url) = fields.next() else {
            continue;
        };
        let depth = match fields.next().map(str::parse::<u32>).transpose() {
            Ok(depth) => depth.unwrap_or(0),
            Err(e) => {
                warn!(url, error = %e, "Skipping candidate with invalid depth");
                continue;
            }
        };

        let mut candidate = match CrawlCandidate::parse(url, depth) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(url, error = %e, "Skipping candidate");
                continue;
            }
        };
        if let Some(ip) = fields.next() {
            candidate = candidate.with_ip(ip);
        }
        if let Some(country) = fields.next() {
            candidate = candidate.with_country(country);
        }
        let candidate = candidate.resolve_country(&resolver);

        let decision = profile.admit(&candidate);
        match decision {
            CrawlDecision::Accept => accepted += 1,
            CrawlDecision::Reject(reason) => {
                rejected += 1;
                if config.evaluation.log_rejections {
                    info!(url, %reason, "Candidate rejected");
                }
            }
        }
        writeln!(out, "{}\t{}", decision, url)?;
    }

    let summary = profile.summary(&registry, true, config.profile.domain_listing_length);
    writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
    info!(accepted, rejected, domains = profile.domains().len(), "Evaluation finished");

    Ok(())
}
