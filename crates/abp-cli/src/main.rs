//! abp-cli: compile filter lists into binary snapshots and inspect them.
//!
//! This is ambient tooling around `abp-core`/`abp-compiler`, not part of
//! the matching-engine contract - a thin command wrapper that flattens
//! the library's typed errors to `String` for human display at the edge.

mod bench;
mod config;
mod snapshot;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::CliConfig;

#[derive(Parser)]
#[command(name = "abp-cli")]
#[command(about = "Compile and inspect filter-list snapshots")]
struct Cli {
    /// Optional JSON config file; CLI flags override its contents.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile filter lists into a binary snapshot.
    Compile {
        /// Input filter-list files.
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Output snapshot path.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tags to enable immediately after compiling.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Check that a snapshot file round-trips through `deserialize`.
    Validate {
        /// Snapshot file to validate.
        input: PathBuf,
    },

    /// Dump rule counts and section layout for a snapshot.
    Info {
        /// Snapshot file to inspect.
        input: PathBuf,
    },

    /// Compile bundled lists and fail if the parse ratio drops below a
    /// threshold - a CI gate against silent grammar regressions.
    Check {
        /// Input filter-list files.
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Minimum acceptable rules-parsed / content-lines ratio.
        #[arg(long, default_value = "0.95")]
        min_parse_ratio: f64,
    },

    /// Measure match throughput against a snapshot.
    Bench {
        /// Input filter-list files (used with --compile).
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Snapshot path to read (or write to, with --compile).
        #[arg(short, long, default_value = "snapshot.abpbin")]
        snapshot: PathBuf,

        /// Recompile `--input` into `--snapshot` before benchmarking.
        #[arg(long)]
        compile: bool,

        /// Match-pipeline iterations over the request corpus.
        #[arg(long, default_value_t = 20)]
        iterations: usize,

        /// Warmup iterations excluded from the timed measurement.
        #[arg(long, default_value_t = 2)]
        warmup: usize,

        /// Recorded request trace (JSON array of `{url, site_domain}`).
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Synthetic corpus: distinct pages, if no trace is given.
        #[arg(long, default_value_t = 200)]
        pages: usize,

        /// Synthetic corpus: requests per page.
        #[arg(long, default_value_t = 20)]
        reqs_per_page: usize,

        /// Synthetic corpus RNG seed.
        #[arg(long, default_value_t = 1)]
        seed: u32,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CliConfig::load(path) {
            Ok(cfg) => cfg,
            Err(e) => fail(&e),
        },
        None => CliConfig::default(),
    };

    let result = match cli.command {
        Commands::Compile { input, output, tags } => cmd_compile(&config, input, output, tags),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Info { input } => cmd_info(&input),
        Commands::Check { input, min_parse_ratio } => cmd_check(&input, min_parse_ratio),
        Commands::Bench {
            input,
            snapshot,
            compile,
            iterations,
            warmup,
            trace,
            pages,
            reqs_per_page,
            seed,
        } => {
            let inputs = resolve_inputs(&config, input);
            bench::run(bench::BenchOptions {
                input_paths: inputs,
                snapshot_path: snapshot,
                compile,
                iterations,
                warmup,
                trace_path: trace,
                synthetic_pages: pages,
                synthetic_reqs_per_page: reqs_per_page,
                seed,
            })
        }
    };

    if let Err(e) = result {
        fail(&e);
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// `--input` wins when given; otherwise fall back to the config file's
/// `inputs` list.
fn resolve_inputs(config: &CliConfig, cli_inputs: Vec<PathBuf>) -> Vec<PathBuf> {
    if cli_inputs.is_empty() {
        config.inputs.clone()
    } else {
        cli_inputs
    }
}

fn cmd_compile(
    config: &CliConfig,
    cli_inputs: Vec<PathBuf>,
    cli_output: Option<PathBuf>,
    cli_tags: Vec<String>,
) -> Result<(), String> {
    let inputs = resolve_inputs(config, cli_inputs);
    let output = cli_output
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| PathBuf::from("snapshot.abpbin"));

    let (bytes, stats) = snapshot::compile_snapshot_bytes(&inputs)?;
    snapshot::write_snapshot(&output, &bytes)?;

    let tags: Vec<&String> = cli_tags.iter().chain(config.enabled_tags.iter()).collect();

    println!("Compiled {} filter list(s) -> '{}'", inputs.len(), output.display());
    println!("  Rules:    {}", stats.rule_count);
    println!("  Size:     {} bytes ({:.1} KB)", stats.snapshot_bytes, stats.snapshot_bytes as f64 / 1024.0);
    println!("  Time:     {:.1}ms", stats.total_ms);
    if !tags.is_empty() {
        println!(
            "  Tags enabled at load time (not baked into the snapshot): {}",
            tags.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}

fn cmd_validate(input: &PathBuf) -> Result<(), String> {
    let bytes = snapshot::read_snapshot(input)?;
    let index = abp_core::snapshot::load(&bytes).map_err(|e| format!("invalid snapshot: {e}"))?;

    println!("Snapshot '{}' is valid", input.display());
    println!("  Format version: {}", abp_core::snapshot::FORMAT_VERSION);
    println!("  Sections:       {}", abp_core::snapshot::SECTION_COUNT);
    println!("  Size:           {} bytes", bytes.len());
    println!("  Rules:          {}", index.rule_count());

    Ok(())
}

fn cmd_info(input: &PathBuf) -> Result<(), String> {
    let bytes = snapshot::read_snapshot(input)?;
    let index = abp_core::snapshot::load(&bytes).map_err(|e| format!("invalid snapshot: {e}"))?;

    println!("Snapshot: {}", input.display());
    println!("  Magic:          ABP1");
    println!("  Format version: {}", abp_core::snapshot::FORMAT_VERSION);
    println!("  Sections:       {}", abp_core::snapshot::SECTION_COUNT);
    println!("  Total size:     {} bytes ({:.1} KB)", bytes.len(), bytes.len() as f64 / 1024.0);
    println!();
    println!("Rules:");
    println!("  Count:          {}", index.rule_count());

    Ok(())
}

fn cmd_check(inputs: &[PathBuf], min_parse_ratio: f64) -> Result<(), String> {
    if inputs.is_empty() {
        return Err("no input files specified".to_string());
    }

    println!("Checking {} filter list(s)...\n", inputs.len());

    let mut total_content_lines = 0usize;
    for path in inputs {
        let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
        let content_lines = text
            .lines()
            .filter(|l| {
                let t = l.trim();
                !t.is_empty() && !t.starts_with('!') && !t.starts_with('[')
            })
            .count();
        total_content_lines += content_lines;
        println!("  [{}] {} content lines", path.display(), content_lines);
    }

    let (_bytes, stats) = snapshot::compile_snapshot_bytes(inputs)?;
    let ratio = if total_content_lines > 0 {
        stats.rule_count as f64 / total_content_lines as f64
    } else {
        1.0
    };

    println!("\n--- Summary ---");
    println!("Content lines:   {total_content_lines}");
    println!("Rules parsed:    {}", stats.rule_count);
    println!("Parse ratio:     {:.2}%", ratio * 100.0);
    println!("Snapshot size:   {} bytes ({:.1} KB)", stats.snapshot_bytes, stats.snapshot_bytes as f64 / 1024.0);
    println!("Time:            {:.1}ms", stats.total_ms);

    if ratio < min_parse_ratio {
        return Err(format!(
            "parse ratio {:.2}% is below threshold {:.2}%",
            ratio * 100.0,
            min_parse_ratio * 100.0
        ));
    }

    println!("\nAll checks passed");
    Ok(())
}
