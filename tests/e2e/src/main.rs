//! End-to-End Test Runner for the liquidity keeper

use anyhow::{Context, Result};
use clap::Parser;
use liquidity_e2e_tests::{all_scenarios, TestConfig, TestFramework, TestResult};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario to run, or "all"
    #[arg(short, long, default_value = "all")]
    scenario: String,

    /// Output results to file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stop after the first failing scenario
    #[arg(long)]
    fail_fast: bool,

    /// Settle without the keeper's invariant checks
    #[arg(long)]
    no_invariants: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("liquidity_e2e_tests={log_level}").parse()?)
                .add_directive(format!("liquidity={log_level}").parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting liquidity E2E suite");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let framework = TestFramework::new(TestConfig {
        invariant_checks: !args.no_invariants,
        fail_fast: args.fail_fast,
        verbose: args.verbose,
    });

    let scenarios: Vec<_> = all_scenarios()
        .into_iter()
        .filter(|s| args.scenario == "all" || s.name() == args.scenario)
        .collect();
    if scenarios.is_empty() {
        error!("Unknown test scenario: {}", args.scenario);
        std::process::exit(2);
    }

    let results = framework.run_all(&scenarios);
    print_results_summary(&results);

    if let Some(output_path) = args.output {
        save_results_to_file(&results, &output_path)?;
        info!("Results saved to: {}", output_path.display());
    }

    if !results.iter().all(|r| r.success) {
        error!("Some tests failed");
        std::process::exit(1);
    }
    info!("All tests passed");
    Ok(())
}

fn print_results_summary(results: &[TestResult]) {
    let passed = results.iter().filter(|r| r.success).count();

    println!("\n═══════════════════════════════════════");
    println!("        TEST RESULTS SUMMARY");
    println!("═══════════════════════════════════════");
    println!("Total Tests: {}", results.len());
    println!("Passed:      {passed} ✓");
    println!("Failed:      {} ✗", results.len() - passed);
    println!();

    for result in results {
        let status = if result.success { "✓ PASS" } else { "✗ FAIL" };
        println!(
            "{status} {} ({} ms, {} blocks, {} batches)",
            result.scenario_name,
            result.duration.as_millis(),
            result.metrics.blocks_processed,
            result.metrics.batches_executed,
        );
        if let Some(error) = &result.error_message {
            println!("      Error: {error}");
        }
        for failure in result.failures() {
            println!("      {}: {}", failure.validator, failure.message);
        }
    }
}

fn save_results_to_file(results: &[TestResult], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
