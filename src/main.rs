//! Validator staking identity generator CLI
//!
//! Usage:
//!   staker_vanity generate -p gogo -n 5 -o nodes.json   # 5 nodes starting with "gogo"
//!   staker_vanity generate -s xyz -o ./staking          # one node as a staking directory
//!   staker_vanity convert -i nodes.json -o staking-dirs
//!   staker_vanity verify -d nodes.json --remote
//!   staker_vanity upload -d nodes.json --hp-id 3

use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use staker_vanity::api::{
    upload_nodes, LocalPopVerifier, PopVerifier, RemotePopVerifier, RestUploader,
};
use staker_vanity::config::{Cli, Command, ConvertConfig, GenerateConfig, UploadConfig, VerifyConfig};
use staker_vanity::output::{convert_to_staking_dirs, read_json};
use staker_vanity::worker::{
    BatchDriver, CancelToken, ProgressReporter, RoundError, RoundProgress, RoundResult,
};
use staker_vanity::StakingIdentityGenerator;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate(config) => run_generate(&config),
        Command::Convert(config) => run_convert(&config),
        Command::Verify(config) => run_verify(&config),
        Command::Upload(config) => run_upload(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run_generate(config: &GenerateConfig) -> Result<()> {
    config.validate().context("Configuration error")?;

    let constraint = config.constraint();
    let settings = config.round_settings();
    let target = config.output_target()?;

    println!("Validator Staking Identity Generator");
    println!("====================================");
    println!(
        "Pattern:    prefix {:?}, suffix {:?}{}",
        constraint.prefix(),
        constraint.suffix(),
        if constraint.case_sensitive() { " (case sensitive)" } else { "" }
    );
    println!("Difficulty: {}", constraint.difficulty_description());
    println!("Workers:    {}", settings.workers);
    println!("Target:     {} node(s) -> {}", config.count, target.path().display());
    if let Some(provider) = &settings.active_provider {
        println!("Provider:   {}", provider);
    }
    println!();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Error setting Ctrl-C handler")?;

    let driver = BatchDriver::new(Arc::new(StakingIdentityGenerator::new()), settings)
        .with_cancel_token(cancel);

    println!("Searching... (Press Ctrl+C to stop)\n");

    let mut reporter = ConsoleProgress::new(config.count);
    let results = match driver.generate_batch(config.count, &constraint, &mut reporter) {
        Ok(results) => results,
        Err(RoundError::Cancelled) => bail!("Stopped by user, nothing written"),
        Err(e) => return Err(e.into()),
    };

    let bundles: Vec<_> = results.iter().map(|r| r.bundle.clone()).collect();
    target
        .write(&bundles)
        .with_context(|| format!("Failed to write {}", target.path().display()))?;

    let attempts: u64 = results.iter().map(|r| r.attempts).sum();
    let elapsed: f64 = results.iter().map(|r| r.elapsed.as_secs_f64()).sum();

    println!("\n--- Final Statistics ---");
    println!("Nodes generated:      {}", bundles.len());
    println!("Identities generated: {}", format_number(attempts));
    println!("Time elapsed:         {:.2}s", elapsed);
    if elapsed > 0.0 {
        println!(
            "Average speed:        {}/s",
            format_number((attempts as f64 / elapsed) as u64)
        );
    }
    println!("Written to:           {}", target.path().display());
    Ok(())
}

fn run_convert(config: &ConvertConfig) -> Result<()> {
    let nodes = read_json(&config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    let written = convert_to_staking_dirs(&config.output, &nodes)?;
    info!(nodes = written, output = %config.output.display(), "converted node file");
    println!(
        "Wrote {} staking director{} under {}",
        written,
        if written == 1 { "y" } else { "ies" },
        config.output.display()
    );
    Ok(())
}

fn run_verify(config: &VerifyConfig) -> Result<()> {
    let nodes = read_json(&config.data_file)
        .with_context(|| format!("Failed to read {}", config.data_file.display()))?;

    let verifier: Box<dyn PopVerifier> = if config.remote {
        Box::new(RemotePopVerifier::new(config.url.as_str())?)
    } else {
        Box::new(LocalPopVerifier)
    };

    let mut invalid = 0usize;
    for node in &nodes {
        let valid = verifier
            .verify(&node.node_id, &node.bls_public, &node.bls_signature)
            .with_context(|| format!("Verification of {} failed", node.node_id))?;
        if valid {
            println!("{}: valid", node.node_id);
        } else {
            invalid += 1;
            println!("{}: INVALID", node.node_id);
        }
    }

    if invalid > 0 {
        bail!("{} of {} node(s) failed proof-of-possession verification", invalid, nodes.len());
    }
    println!("\nAll {} node(s) verified.", nodes.len());
    Ok(())
}

fn run_upload(config: &UploadConfig) -> Result<()> {
    config.validate().context("Configuration error")?;

    let nodes = read_json(&config.data_file)
        .with_context(|| format!("Failed to read {}", config.data_file.display()))?;
    let uploader = RestUploader::new(&config.api_url, config.api_key.as_str(), config.access_token.as_str())?;
    info!(endpoint = uploader.endpoint(), nodes = nodes.len(), "uploading nodes");

    let summary = upload_nodes(&uploader, &nodes, &config.upload_options())?;
    if summary.rejected_batches > 0 {
        warn!(rejected = summary.rejected_batches, "some batches were rejected");
    }
    println!(
        "Uploaded {} node(s) in {} batch(es), {} rejected",
        summary.total, summary.batches, summary.rejected_batches
    );
    Ok(())
}

/// Prints progress ticks and accepted nodes to stdout.
struct ConsoleProgress {
    target: usize,
    found: usize,
}

impl ConsoleProgress {
    fn new(target: usize) -> Self {
        Self { target, found: 0 }
    }
}

impl ProgressReporter for ConsoleProgress {
    fn tick(&mut self, progress: &RoundProgress) {
        print_progress(progress, self.found, self.target);
    }

    fn round_complete(&mut self, index: usize, result: &RoundResult) {
        self.found = index + 1;
        print_result(result, self.found);
    }
}

fn print_result(result: &RoundResult, index: usize) {
    println!("=== Match #{} ===", index);
    println!("Node ID:     {}", result.bundle.node_id);
    println!("BLS Public:  {}", result.bundle.bls_public);
    println!("Worker:      {}", result.worker_id);
    println!("Attempts:    {}", format_number(result.attempts));
    println!();
}

fn print_progress(progress: &RoundProgress, found: usize, target: usize) {
    println!(
        "[{:>4}s] Node {}/{}: generated {} identities ({}/s)",
        progress.elapsed.as_secs(),
        found + 1,
        target,
        format_number(progress.attempts),
        format_number(progress.attempts_per_second() as u64)
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
