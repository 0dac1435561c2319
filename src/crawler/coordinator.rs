//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the frontier and running the worker pool
//! - Coordinating fetching, classification, and link extraction
//! - Feeding accepted pages to the sitemap rotator
//! - Handling stop requests
//! - Placing the final sitemap files

use crate::config::Config;
use crate::crawler::classify::classify;
use crate::crawler::events::{CrawlEvent, ErrorNotice, EventSink, LogSink};
use crate::crawler::fetcher::{FetchFailure, FetchedPage, HttpFetcher, PageFetcher};
use crate::crawler::frontier::{CrawlTask, Frontier};
use crate::crawler::lock;
use crate::crawler::parser::parse_page;
use crate::output::{place_sitemaps, ChangeFrequency, SitemapEntry, SitemapRotator};
use crate::robots::{ParsedRobots, RobotsGate};
use crate::url::{normalize, normalize_absolute, strip_query, Scope};
use crate::{Result, SitemapError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// Number of additional attempts for a failed fetch
const MAX_FETCH_RETRIES: usize = 1;

/// Predicate deciding whether a fetched page is kept out of the sitemap
pub type IgnoreFn = Arc<dyn Fn(&Url) -> bool + Send + Sync>;

/// Options controlling one crawl run
#[derive(Clone)]
pub struct CrawlOptions {
    /// Maximum depth of newly enqueued tasks (0 means unlimited)
    pub max_depth: u32,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Upper bound for one fetch attempt
    pub timeout: Duration,

    /// Whether to honor the seed origin's robots.txt
    pub respect_robots_txt: bool,

    /// Keep AMP pages out of the sitemap
    pub ignore_amp: bool,

    /// Remove query strings from discovered links
    pub strip_querystring: bool,

    /// User-supplied ignore predicate
    pub ignore: Option<IgnoreFn>,

    /// Product token matched against robots.txt groups
    pub user_agent: String,

    /// Maximum entries per sitemap part
    pub max_entries_per_file: usize,

    /// Final sitemap path
    pub filepath: PathBuf,

    /// URL prefix for the index `<loc>` entries (defaults to the seed)
    pub base_url: Option<String>,

    /// Take `<lastmod>` from the Last-Modified response header
    pub include_lastmod: bool,

    pub changefreq: Option<ChangeFrequency>,

    pub priority: Option<f32>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 0,
            concurrency: 10,
            timeout: Duration::from_secs(30),
            respect_robots_txt: true,
            ignore_amp: true,
            strip_querystring: true,
            ignore: None,
            user_agent: "RippleSitemap".to_string(),
            max_entries_per_file: 50_000,
            filepath: PathBuf::from("./sitemap.xml"),
            base_url: None,
            include_lastmod: false,
            changefreq: None,
            priority: None,
        }
    }
}

impl fmt::Debug for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOptions")
            .field("max_depth", &self.max_depth)
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .field("respect_robots_txt", &self.respect_robots_txt)
            .field("ignore_amp", &self.ignore_amp)
            .field("strip_querystring", &self.strip_querystring)
            .field("ignore", &self.ignore.as_ref().map(|_| "<fn>"))
            .field("user_agent", &self.user_agent)
            .field("max_entries_per_file", &self.max_entries_per_file)
            .field("filepath", &self.filepath)
            .field("base_url", &self.base_url)
            .field("include_lastmod", &self.include_lastmod)
            .field("changefreq", &self.changefreq)
            .field("priority", &self.priority)
            .finish()
    }
}

impl CrawlOptions {
    /// Builds run options from a loaded configuration
    ///
    /// `ignore-patterns` become an ignore predicate matching any URL that contains one
    /// of the patterns.
    pub fn from_config(config: &Config) -> Self {
        let patterns = config.crawler.ignore_patterns.clone();
        let ignore: Option<IgnoreFn> = if patterns.is_empty() {
            None
        } else {
            Some(Arc::new(move |url: &Url| {
                patterns
                    .iter()
                    .any(|pattern| url.as_str().contains(pattern.as_str()))
            }))
        };

        Self {
            max_depth: config.crawler.max_depth,
            concurrency: config.crawler.concurrency as usize,
            timeout: Duration::from_millis(config.crawler.timeout),
            respect_robots_txt: config.crawler.respect_robots_txt,
            ignore_amp: config.crawler.ignore_amp,
            strip_querystring: config.crawler.strip_querystring,
            ignore,
            user_agent: config.user_agent.crawler_name.clone(),
            max_entries_per_file: config.output.max_entries_per_file,
            filepath: PathBuf::from(&config.output.filepath),
            base_url: config.output.base_url.clone(),
            include_lastmod: config.output.include_lastmod,
            changefreq: config
                .output
                .changefreq
                .as_deref()
                .and_then(ChangeFrequency::parse),
            priority: config.output.priority,
        }
    }
}

/// Counters and output of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages fetched successfully
    pub pages_fetched: usize,

    /// Entries written to the sitemap
    pub entries: usize,

    /// Fetched pages kept out of the sitemap
    pub ignored: usize,

    /// Fetches that failed after their retry
    pub errors: usize,

    /// Tasks skipped because robots.txt disallows them
    pub robots_skipped: usize,

    /// Files written, parts first and index last
    pub paths: Vec<PathBuf>,
}

/// Single-domain sitemap generator
///
/// One generator runs at most one crawl at a time. `queue_url`, `stop` and `part_paths`
/// may be called from other tasks while `start` is running.
pub struct SitemapGenerator<F = HttpFetcher> {
    seed: Url,
    options: CrawlOptions,
    fetcher: Arc<F>,
    sink: Arc<dyn EventSink>,
    running: AtomicBool,
    stop_requested: AtomicBool,
    active: Mutex<Option<Arc<RunState>>>,
    extra_seeds: Mutex<Vec<Url>>,
    last_paths: Mutex<Vec<PathBuf>>,
}

impl SitemapGenerator<HttpFetcher> {
    /// Creates a generator backed by an HTTP fetcher built from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(config)?;
        Self::new(&config.seed, CrawlOptions::from_config(config), fetcher)
    }
}

impl<F: PageFetcher + 'static> SitemapGenerator<F> {
    /// Creates a new generator
    ///
    /// # Errors
    ///
    /// Returns `SitemapError::InvalidArgument` if the seed is missing or not a crawlable
    /// URL, if `max_entries_per_file` is zero, if `concurrency` is zero, or if
    /// `priority` lies outside `0.0..=1.0`.
    pub fn new(seed: &str, options: CrawlOptions, fetcher: F) -> Result<Self> {
        if seed.trim().is_empty() {
            return Err(SitemapError::InvalidArgument(
                "a seed URL is required".to_string(),
            ));
        }
        let seed = normalize_absolute(seed).map_err(|e| {
            SitemapError::InvalidArgument(format!("invalid seed URL {}: {}", seed, e))
        })?;

        if options.max_entries_per_file < 1 {
            return Err(SitemapError::InvalidArgument(
                "max_entries_per_file must be at least 1".to_string(),
            ));
        }
        if options.concurrency == 0 {
            return Err(SitemapError::InvalidArgument(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(priority) = options.priority {
            if !(0.0..=1.0).contains(&priority) {
                return Err(SitemapError::InvalidArgument(format!(
                    "priority must be between 0.0 and 1.0, got {}",
                    priority
                )));
            }
        }

        Ok(Self {
            seed,
            options,
            fetcher: Arc::new(fetcher),
            sink: Arc::new(LogSink),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            active: Mutex::new(None),
            extra_seeds: Mutex::new(Vec::new()),
            last_paths: Mutex::new(Vec::new()),
        })
    }

    /// Replaces the default logging sink
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Whether a run is currently active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs one crawl to completion and places the sitemap files
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run finished (or was stopped) and its output is in place
    /// * `Err(SitemapError::AlreadyRunning)` - Another run is active
    /// * `Err(SitemapError)` - The sitemap could not be written; nothing is left at the
    ///   final destination
    pub async fn start(&self) -> Result<RunSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SitemapError::AlreadyRunning);
        }
        let _guard = RunGuard { generator: self };

        self.run().await
    }

    /// Queues an extra seed URL at depth 0
    ///
    /// Outside a run the URL is held until the next `start`; while pages are still
    /// being crawled it is handed straight to the frontier.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was queued
    /// * `Ok(false)` - The URL is out of scope or was already visited
    /// * `Err(SitemapError::UrlError)` - The URL could not be parsed
    pub fn queue_url(&self, raw: &str) -> Result<bool> {
        let url = normalize(raw, &self.seed)?;
        if !crate::url::in_scope(&url, &self.seed) {
            tracing::debug!("Not queueing out-of-scope URL {}", url);
            return Ok(false);
        }

        let active = lock(&self.active);
        match active.as_ref() {
            Some(run) => Ok(run.frontier.enqueue(CrawlTask::new(url, 0))),
            None => {
                let mut extra = lock(&self.extra_seeds);
                if extra.contains(&url) {
                    return Ok(false);
                }
                extra.push(url);
                Ok(true)
            }
        }
    }

    /// Asks the active run to stop
    ///
    /// In-flight fetches finish, nothing new is dequeued and the run places whatever
    /// entries it collected.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(run) = lock(&self.active).as_ref() {
            tracing::info!("Stop requested, finishing in-flight pages");
            run.frontier.stop();
        }
    }

    /// Current sitemap part paths
    ///
    /// While a run is active these are the temporary part files in creation order;
    /// afterwards they are the files placed by the last run.
    pub fn part_paths(&self) -> Vec<PathBuf> {
        if let Some(run) = lock(&self.active).as_ref() {
            return lock(&run.rotator).part_paths();
        }
        lock(&self.last_paths).clone()
    }

    async fn run(&self) -> Result<RunSummary> {
        self.stop_requested.store(false, Ordering::SeqCst);

        let robots = self.load_robots().await;
        let rotator = SitemapRotator::new(
            self.options.max_entries_per_file,
            temp_dir_for(&self.options.filepath),
        )?;
        let fetcher: Arc<dyn PageFetcher> = self.fetcher.clone();

        let run = Arc::new(RunState {
            frontier: Frontier::new(),
            rotator: Mutex::new(rotator),
            scope: Scope::new(self.seed.clone()),
            options: self.options.clone(),
            robots,
            fetcher,
            sink: Arc::clone(&self.sink),
            pages_fetched: AtomicUsize::new(0),
            ignored: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            robots_skipped: AtomicUsize::new(0),
            fatal: Mutex::new(None),
        });

        run.frontier.enqueue(CrawlTask::new(self.seed.clone(), 0));
        {
            let mut active = lock(&self.active);
            for url in lock(&self.extra_seeds).drain(..) {
                run.frontier.enqueue(CrawlTask::new(url, 0));
            }
            *active = Some(Arc::clone(&run));
        }
        if self.stop_requested.load(Ordering::SeqCst) {
            run.frontier.stop();
        }

        tracing::info!(
            "Starting crawl of {} with {} workers",
            self.seed,
            self.options.concurrency
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.options.concurrency {
            let run = Arc::clone(&run);
            workers.spawn(async move { run.work(worker_id).await });
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker terminated abnormally: {}", e);
                run.fail(SitemapError::Worker(e.to_string()));
            }
        }
        // Late `queue_url` calls are held for the next run
        *lock(&self.active) = None;

        match self.finalize(&run) {
            Ok(summary) => {
                tracing::info!(
                    "Crawl complete: {} pages fetched, {} entries, {} ignored, {} errors",
                    summary.pages_fetched,
                    summary.entries,
                    summary.ignored,
                    summary.errors
                );
                *lock(&self.last_paths) = summary.paths.clone();
                self.sink.emit(CrawlEvent::Done {
                    entries: summary.entries,
                    paths: summary.paths.clone(),
                });
                Ok(summary)
            }
            Err(e) => {
                lock(&run.rotator).discard();
                tracing::error!("Crawl run failed: {}", e);
                self.sink
                    .emit(CrawlEvent::Error(ErrorNotice::run_failure(e.to_string())));
                Err(e)
            }
        }
    }

    fn finalize(&self, run: &RunState) -> Result<RunSummary> {
        if let Some(error) = lock(&run.fatal).take() {
            return Err(error);
        }

        let (parts, entries) = {
            let mut rotator = lock(&run.rotator);
            rotator.finish()?;
            (rotator.take_parts(), rotator.total_entries())
        };

        let base_url = self.index_base_url();
        let paths = place_sitemaps(parts, &self.options.filepath, &base_url)?;

        Ok(RunSummary {
            pages_fetched: run.pages_fetched.load(Ordering::SeqCst),
            entries,
            ignored: run.ignored.load(Ordering::SeqCst),
            errors: run.errors.load(Ordering::SeqCst),
            robots_skipped: run.robots_skipped.load(Ordering::SeqCst),
            paths,
        })
    }

    async fn load_robots(&self) -> RobotsGate {
        if !self.options.respect_robots_txt {
            return RobotsGate::open();
        }

        let fetched = tokio::time::timeout(self.options.timeout, self.fetcher.fetch_robots(&self.seed))
            .await
            .ok()
            .flatten();
        match fetched {
            Some(content) => {
                tracing::info!("Loaded robots.txt for {}", self.seed.origin().ascii_serialization());
                RobotsGate::new(ParsedRobots::from_content(&content), &self.options.user_agent)
            }
            None => {
                tracing::debug!("No robots.txt for {}, allowing all", self.seed);
                RobotsGate::open()
            }
        }
    }

    fn index_base_url(&self) -> String {
        match &self.options.base_url {
            Some(base) => base.clone(),
            None => {
                let mut base = self.seed.clone();
                base.set_query(None);
                base.to_string()
            }
        }
    }
}

/// Clears the active-run markers when `start` returns or is cancelled
struct RunGuard<'a, F> {
    generator: &'a SitemapGenerator<F>,
}

impl<F> Drop for RunGuard<'_, F> {
    fn drop(&mut self) {
        *lock(&self.generator.active) = None;
        self.generator.running.store(false, Ordering::SeqCst);
    }
}

/// Temporary parts live next to the final file so placing them is a rename
fn temp_dir_for(filepath: &Path) -> PathBuf {
    match filepath.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Converts an RFC 2822 Last-Modified value into a sitemap date
fn parse_last_modified(value: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// State shared by the workers of one run
struct RunState {
    frontier: Frontier,
    rotator: Mutex<SitemapRotator>,
    scope: Scope,
    options: CrawlOptions,
    robots: RobotsGate,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn EventSink>,
    pages_fetched: AtomicUsize,
    ignored: AtomicUsize,
    errors: AtomicUsize,
    robots_skipped: AtomicUsize,
    fatal: Mutex<Option<SitemapError>>,
}

impl RunState {
    async fn work(&self, worker_id: usize) {
        tracing::debug!("Worker {} started", worker_id);
        while let Some(task) = self.frontier.dequeue().await {
            if let Err(e) = self.process(&task).await {
                self.fail(e);
            }
            self.frontier.task_done();
        }
        tracing::debug!("Worker {} finished", worker_id);
    }

    /// Records the first run-level failure and stops the frontier
    fn fail(&self, error: SitemapError) {
        {
            let mut fatal = lock(&self.fatal);
            if fatal.is_none() {
                *fatal = Some(error);
            }
        }
        self.frontier.stop();
    }

    async fn process(&self, task: &CrawlTask) -> Result<()> {
        if !self.robots.is_allowed(&task.url) {
            tracing::debug!("Disallowed by robots.txt: {}", task.url);
            self.robots_skipped.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        match self.fetch_with_retry(&task.url).await {
            Ok(page) => {
                let fetched = self.pages_fetched.fetch_add(1, Ordering::SeqCst) + 1;
                if fetched % 10 == 0 {
                    tracing::info!(
                        "Progress: {} pages fetched, {} queued",
                        fetched,
                        self.frontier.pending_len()
                    );
                }
                self.handle_page(task, page)
            }
            Err(failure) => {
                let code = classify(&failure);
                tracing::warn!("Failed to fetch {}: {} ({})", task.url, failure.message, code);
                self.errors.fetch_add(1, Ordering::SeqCst);
                self.sink.emit(CrawlEvent::Error(ErrorNotice::from_code(
                    code,
                    Some(task.url.to_string()),
                )));
                Ok(())
            }
        }
    }

    async fn fetch_with_retry(&self, url: &Url) -> std::result::Result<FetchedPage, FetchFailure> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.options.timeout, self.fetcher.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchFailure::timeout(url)),
            };

            match result {
                Ok(page) => return Ok(page),
                Err(failure) if attempt < MAX_FETCH_RETRIES => {
                    attempt += 1;
                    tracing::debug!("Retrying {} after: {}", url, failure);
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    fn handle_page(&self, task: &CrawlTask, page: FetchedPage) -> Result<()> {
        let parsed = parse_page(&page.body, self.options.ignore_amp);
        let url = task.url.to_string();

        // A redirect that leaves the scope is neither listed nor followed
        let offsite = page.url != task.url && !self.scope.contains(&page.url);
        let ignored = offsite
            || parsed.noindex
            || parsed.amp
            || self
                .options
                .ignore
                .as_ref()
                .map_or(false, |ignore| ignore(&task.url));

        if ignored {
            tracing::debug!(
                "Ignoring {} (noindex: {}, amp: {}, offsite: {})",
                url,
                parsed.noindex,
                parsed.amp,
                offsite
            );
            self.ignored.fetch_add(1, Ordering::SeqCst);
            self.sink.emit(CrawlEvent::Ignore { url });
        } else {
            let entry = self.entry_for(&url, page.last_modified.as_deref());
            let added = lock(&self.rotator).add_entry(&entry)?;
            if added {
                self.sink.emit(CrawlEvent::Add { url });
            } else {
                self.ignored.fetch_add(1, Ordering::SeqCst);
                self.sink.emit(CrawlEvent::Ignore { url });
            }
        }

        if offsite {
            return Ok(());
        }

        let next_depth = task.depth + 1;
        if self.options.max_depth != 0 && next_depth > self.options.max_depth {
            tracing::trace!("Not following links of {} at depth {}", task.url, task.depth);
            return Ok(());
        }

        for href in &parsed.links {
            let mut link = match normalize(href, &page.url) {
                Ok(link) => link,
                Err(e) => {
                    tracing::trace!("Dropping link {}: {}", href, e);
                    continue;
                }
            };
            if self.options.strip_querystring {
                strip_query(&mut link);
            }
            if !self.scope.contains(&link) {
                tracing::trace!("Out of scope: {}", link);
                continue;
            }
            if self.frontier.enqueue(CrawlTask::new(link.clone(), next_depth)) {
                tracing::debug!("Queued {} at depth {}", link, next_depth);
            }
        }

        Ok(())
    }

    fn entry_for(&self, url: &str, last_modified: Option<&str>) -> SitemapEntry {
        let mut entry = SitemapEntry::new(url);
        if self.options.include_lastmod {
            if let Some(date) = last_modified.and_then(parse_last_modified) {
                entry = entry.with_lastmod(date);
            }
        }
        if let Some(changefreq) = self.options.changefreq {
            entry = entry.with_changefreq(changefreq);
        }
        if let Some(priority) = self.options.priority {
            entry = entry.with_priority(priority);
        }
        entry
    }
}
