//! `abp-cli bench`: measure match throughput against a compiled (or
//! freshly compiled) snapshot, either from a recorded JSON request trace or
//! a synthetic corpus generated from a small fixed vocabulary.

use std::path::{Path, PathBuf};
use std::time::Instant;

use abp_core::{snapshot, MatchDecision, Matcher, RequestContext};
use serde::Deserialize;

use crate::snapshot as snap;

pub struct BenchOptions {
    pub input_paths: Vec<PathBuf>,
    pub snapshot_path: PathBuf,
    pub compile: bool,
    pub iterations: usize,
    pub warmup: usize,
    pub trace_path: Option<PathBuf>,
    pub synthetic_pages: usize,
    pub synthetic_reqs_per_page: usize,
    pub seed: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct TraceRequest {
    url: String,
    site_domain: Option<String>,
}

#[derive(Debug, Clone)]
struct BenchRequest {
    url: String,
    site_domain: Option<String>,
}

pub struct BenchReport {
    pub request_count: usize,
    pub iterations: usize,
    pub total_matches: usize,
    pub blocked: usize,
    pub elapsed_ms: f64,
    pub matches_per_sec: f64,
}

/// `xorshift32`: enough statistical spread for corpus generation without a
/// dependency; not used for anything security-sensitive.
struct Rng(u32);

impl Rng {
    fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9e3779b9 } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u32() as usize) % items.len()]
    }
}

const SITE_DOMAINS: &[&str] = &["news.example", "shop.example", "blog.example", "forum.example"];
const AD_HOSTS: &[&str] = &["ads.doubleclick.example", "track.adnxs.example", "analytics.example"];
const CONTENT_HOSTS: &[&str] = &["cdn.example", "static.example", "images.example"];
const PATHS: &[&str] = &["/banner-ads/a.js", "/pixel.gif", "/main.css", "/app.js", "/track?id=1"];

fn synthetic_requests(pages: usize, reqs_per_page: usize, seed: u32) -> Vec<BenchRequest> {
    let mut rng = Rng::new(seed);
    let mut out = Vec::with_capacity(pages * reqs_per_page);
    for _ in 0..pages {
        let site = *rng.pick(SITE_DOMAINS);
        for _ in 0..reqs_per_page {
            // Roughly one in three requests targets an ad/tracker host.
            let host = if rng.next_u32() % 3 == 0 {
                *rng.pick(AD_HOSTS)
            } else {
                *rng.pick(CONTENT_HOSTS)
            };
            let path = *rng.pick(PATHS);
            out.push(BenchRequest {
                url: format!("https://{host}{path}"),
                site_domain: Some(site.to_string()),
            });
        }
    }
    out
}

fn load_trace(path: &Path) -> Result<Vec<BenchRequest>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read trace '{}': {e}", path.display()))?;
    let parsed: Vec<TraceRequest> = serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse trace '{}': {e}", path.display()))?;
    Ok(parsed
        .into_iter()
        .map(|r| BenchRequest { url: r.url, site_domain: r.site_domain })
        .collect())
}

fn ensure_snapshot(opts: &BenchOptions) -> Result<Vec<u8>, String> {
    if opts.compile {
        let (bytes, stats) = snap::compile_snapshot_bytes(&opts.input_paths)?;
        snap::write_snapshot(&opts.snapshot_path, &bytes)?;
        println!(
            "compiled {} rule(s) -> {} bytes in {:.1}ms",
            stats.rule_count, stats.snapshot_bytes, stats.total_ms
        );
    }
    snap::read_snapshot(&opts.snapshot_path)
}

pub fn run(opts: BenchOptions) -> Result<(), String> {
    let bytes = ensure_snapshot(&opts)?;
    let index = snapshot::load(&bytes).map_err(|e| format!("invalid snapshot: {e}"))?;
    let matcher = Matcher::new(&index);

    let requests = match &opts.trace_path {
        Some(path) => load_trace(path)?,
        None => synthetic_requests(opts.synthetic_pages, opts.synthetic_reqs_per_page, opts.seed),
    };
    if requests.is_empty() {
        return Err("request corpus is empty".to_string());
    }

    for _ in 0..opts.warmup {
        for req in &requests {
            let ctx = RequestContext {
                url: &req.url,
                site_domain: req.site_domain.as_deref(),
                request_option: abp_core::FilterOption::empty(),
            };
            let _ = matcher.matches(&ctx);
        }
    }

    let mut blocked = 0usize;
    let start = Instant::now();
    for _ in 0..opts.iterations {
        for req in &requests {
            let ctx = RequestContext {
                url: &req.url,
                site_domain: req.site_domain.as_deref(),
                request_option: abp_core::FilterOption::empty(),
            };
            if matcher.matches(&ctx) == MatchDecision::Block {
                blocked += 1;
            }
        }
    }
    let elapsed = start.elapsed();
    let total_matches = requests.len() * opts.iterations;

    let report = BenchReport {
        request_count: requests.len(),
        iterations: opts.iterations,
        total_matches,
        blocked,
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        matches_per_sec: total_matches as f64 / elapsed.as_secs_f64().max(1e-9),
    };

    println!("requests in corpus: {}", report.request_count);
    println!("iterations:         {}", report.iterations);
    println!("total matches:      {}", report.total_matches);
    println!(
        "blocked:             {} ({:.1}%)",
        report.blocked,
        100.0 * report.blocked as f64 / report.total_matches.max(1) as f64
    );
    println!("elapsed:             {:.1}ms", report.elapsed_ms);
    println!("throughput:          {:.0} matches/sec", report.matches_per_sec);

    Ok(())
}
