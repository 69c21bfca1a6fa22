use std::thread::sleep;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};

use crate::catalog::{Catalog, load_catalog, save_catalog};
use crate::config::ClipConfig;
use crate::document::{document_path, read_stored_hash, write_document};
use crate::hash::content_hash;
use crate::normalize::normalize_url;
use crate::runtime::ResolvedPaths;
use crate::scrape::{FirecrawlClient, ScrapeApi, ScrapedPage};
use crate::slug::{collided_slug, page_slug};
use crate::url_list::{load_urls, normalize_all, save_urls};

/// Bounded retry for provider calls. The delay before retrying attempt `n`
/// is `base_delay * 2^(n-1)`, a blocking sleep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(8).min(8);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Bypass the unchanged-content skip and always rewrite.
    pub force: bool,
    pub retry: RetryPolicy,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            force: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Terminal state of one URL within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    Written,
    Unchanged,
    EmptySkipped,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub outcomes: Vec<(String, UrlOutcome)>,
    pub request_count: usize,
}

impl RefreshReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn written(&self) -> usize {
        self.count(|outcome| *outcome == UrlOutcome::Written)
    }

    pub fn unchanged(&self) -> usize {
        self.count(|outcome| *outcome == UrlOutcome::Unchanged)
    }

    pub fn empty_skipped(&self) -> usize {
        self.count(|outcome| *outcome == UrlOutcome::EmptySkipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, UrlOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(url, outcome)| match outcome {
            UrlOutcome::Failed(reason) => Some((url.as_str(), reason.as_str())),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&UrlOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Wrap a provider call in the bounded retry policy, returning the last
/// error once the attempt budget is exhausted.
pub fn fetch_with_retry<A: ScrapeApi>(
    api: &mut A,
    url: &str,
    policy: &RetryPolicy,
) -> Result<ScrapedPage> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match api.scrape(url) {
            Ok(page) => return Ok(page),
            Err(fetch_error) => {
                if attempt < attempts {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "attempt {attempt} failed for {url}: {fetch_error:#}; retrying in {}s",
                        delay.as_secs()
                    );
                    sleep(delay);
                }
                last_error = Some(fetch_error);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("scrape failed for {url}")))
}

/// Drive the refresh pipeline over `urls`, one at a time. The catalog is
/// mutated in memory; persisting it is the caller's responsibility. One
/// URL's failure never aborts the batch.
pub fn refresh_urls_with_api<A: ScrapeApi>(
    paths: &ResolvedPaths,
    catalog: &mut Catalog,
    urls: &[String],
    options: &RefreshOptions,
    api: &mut A,
) -> RefreshReport {
    let mut outcomes = Vec::with_capacity(urls.len());
    for raw_url in urls {
        let url = normalize_url(raw_url);
        if url.is_empty() {
            continue;
        }
        let outcome = match refresh_one(paths, catalog, &url, options, api) {
            Ok(outcome) => outcome,
            Err(refresh_error) => {
                error!("failed to refresh {url}: {refresh_error:#}");
                UrlOutcome::Failed(format!("{refresh_error:#}"))
            }
        };
        outcomes.push((url, outcome));
    }
    RefreshReport {
        outcomes,
        request_count: api.request_count(),
    }
}

fn refresh_one<A: ScrapeApi>(
    paths: &ResolvedPaths,
    catalog: &mut Catalog,
    url: &str,
    options: &RefreshOptions,
    api: &mut A,
) -> Result<UrlOutcome> {
    info!("fetching {url}");
    let page = fetch_with_retry(api, url, &options.retry)?;
    info!(
        "fetched {url} (status {})",
        page.status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    if page.markdown.is_empty() {
        info!("no markdown returned for {url}; skipping");
        return Ok(UrlOutcome::EmptySkipped);
    }

    let new_hash = content_hash(&page.markdown);
    let slug = resolve_slug(catalog, paths, &page.title, url, &new_hash);
    let target = document_path(&paths.content_dir, &slug);
    let relative_path = paths.relative_document_path(&slug);
    let fetched_at = now_timestamp();

    if !options.force
        && target.exists()
        && read_stored_hash(&target).as_deref() == Some(new_hash.as_str())
    {
        info!("unchanged: {url} (slug={slug})");
        catalog.upsert(&page.title, &relative_path, url, &new_hash, &fetched_at);
        return Ok(UrlOutcome::Unchanged);
    }

    let written = write_document(&paths.content_dir, &slug, &page, &new_hash, &fetched_at)?;
    catalog.upsert(&page.title, &relative_path, url, &new_hash, &fetched_at);
    info!("wrote {}", written.display());
    Ok(UrlOutcome::Written)
}

/// Target slug for a fetch. Precedence: a catalog entry for this exact URL
/// reuses its prior slug verbatim; then, reused or derived alike, a slug
/// naming an existing file whose stored hash differs from the new content is
/// suffixed so distinct content is never silently overwritten. A file whose
/// stored hash cannot be read is treated as overwritable.
fn resolve_slug(
    catalog: &Catalog,
    paths: &ResolvedPaths,
    title: &str,
    url: &str,
    new_hash: &str,
) -> String {
    let slug = catalog
        .find_by_url(url)
        .and_then(|entry| slug_from_path(&entry.path))
        .unwrap_or_else(|| page_slug(title, url));

    let candidate = document_path(&paths.content_dir, &slug);
    if candidate.exists()
        && read_stored_hash(&candidate).is_some_and(|stored| stored != new_hash)
    {
        return collided_slug(&slug, new_hash);
    }
    slug
}

fn slug_from_path(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next()?;
    file_name
        .strip_suffix(".md")
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Add one URL to the list (if new), persist the list, and fetch it.
pub fn add_url(
    paths: &ResolvedPaths,
    config: &ClipConfig,
    raw_url: &str,
    options: &RefreshOptions,
    timeout: Duration,
) -> Result<RefreshReport> {
    let mut api = FirecrawlClient::from_config(config, timeout)?;
    add_url_with_api(paths, raw_url, options, &mut api)
}

pub fn add_url_with_api<A: ScrapeApi>(
    paths: &ResolvedPaths,
    raw_url: &str,
    options: &RefreshOptions,
    api: &mut A,
) -> Result<RefreshReport> {
    let url = normalize_url(raw_url);
    if url.is_empty() {
        bail!("cannot add an empty URL");
    }

    let mut urls = load_urls(&paths.urls_path)?;
    if urls.iter().any(|existing| *existing == url) {
        info!("URL already present: {url}");
    } else {
        urls.push(url.clone());
        save_urls(&paths.urls_path, &urls)?;
        info!("added URL: {url}");
    }

    let mut catalog = load_catalog(&paths.catalog_path);
    let report = refresh_urls_with_api(paths, &mut catalog, &[url], options, api);
    save_catalog(&paths.catalog_path, &catalog)?;
    Ok(report)
}

/// Fetch every URL in the list, rewriting the list first when normalization
/// changed any entry.
pub fn refresh_all(
    paths: &ResolvedPaths,
    config: &ClipConfig,
    options: &RefreshOptions,
    timeout: Duration,
) -> Result<RefreshReport> {
    let mut api = FirecrawlClient::from_config(config, timeout)?;
    refresh_all_with_api(paths, options, &mut api)
}

pub fn refresh_all_with_api<A: ScrapeApi>(
    paths: &ResolvedPaths,
    options: &RefreshOptions,
    api: &mut A,
) -> Result<RefreshReport> {
    let raw_urls = load_urls(&paths.urls_path)?;
    if raw_urls.is_empty() {
        info!("no URLs in {}", paths.urls_path.display());
        return Ok(RefreshReport::default());
    }

    let (urls, changed) = normalize_all(&raw_urls);
    if changed {
        save_urls(&paths.urls_path, &urls)?;
        info!("rewrote {} after normalization", paths.urls_path.display());
    }

    let mut catalog = load_catalog(&paths.catalog_path);
    let report = refresh_urls_with_api(paths, &mut catalog, &urls, options, api);
    save_catalog(&paths.catalog_path, &catalog)?;
    Ok(report)
}
