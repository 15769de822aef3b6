//! CLTVForge: builds a customer feature table, optionally with a CLTV target
//!
//! This is the main entrypoint that orchestrates loading, cleaning, feature
//! and target computation, and writing the result.

use anyhow::{Context, Result};
use clap::Parser;
use cltvforge::{
    build_customer_features, build_training_table, clean_data_with, create_target_cltv,
    load_data, target_column_name, transactions_before, Args,
};
use polars::prelude::*;
use std::fs::File;
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let reference_date = args.parse_reference_date()?;
    let start_time = Instant::now();

    // Step 1: Load and clean
    let raw = load_data(&args.input)?;
    let cleaned = clean_data_with(&raw, &args.clean_options())?;
    println!(
        "✓ Data loaded: {} transactions ({} after cleaning)",
        raw.height(),
        cleaned.height()
    );

    // Step 2: Features, and the target when a split date is known
    let mut table = match reference_date {
        Some(reference_date) => {
            let history = transactions_before(&cleaned, reference_date)?;
            let features = build_customer_features(&history, Some(reference_date))?;
            let target = create_target_cltv(&cleaned, reference_date, args.horizon_days)?;
            println!(
                "✓ {} customers with history, {} active in the {}-day window from {}",
                features.height(),
                target.height(),
                args.horizon_days,
                reference_date
            );
            build_training_table(&features, &target, args.horizon_days)?
        }
        None => {
            let features = build_customer_features(&cleaned, None)?;
            println!("✓ {} customers", features.height());
            features
        }
    };

    // Step 3: Write
    let mut file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut table)?;

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Customer table saved to: {}", args.output);
    if reference_date.is_some() {
        println!("Target column: {}", target_column_name(args.horizon_days));
    }

    Ok(())
}
