//! Command-line interface definitions and argument parsing

use crate::error::DataError;
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;

/// Customer RFM features and CLTV targets from a retail transaction log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (Latin-1)
    #[arg(short, long, default_value = "online_retail_II.csv")]
    pub input: String,

    /// Output path for the customer table
    #[arg(short, long, default_value = "customer_features.csv")]
    pub output: String,

    /// Reference date splitting history from the target window.
    /// Accepts "2011-09-01" or "2011-09-01T00:00:00". Without it only
    /// features are written, measured from one day after the last invoice.
    #[arg(short, long)]
    pub reference_date: Option<String>,

    /// Length of the target window in days
    #[arg(long, default_value_t = crate::DEFAULT_HORIZON_DAYS)]
    pub horizon_days: u32,

    /// strftime format of InvoiceDate, e.g. "%m/%d/%Y %H:%M"; inferred when omitted
    #[arg(long)]
    pub date_format: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the reference date, if one was given
    pub fn parse_reference_date(&self) -> crate::Result<Option<NaiveDateTime>> {
        let Some(ref raw) = self.reference_date else {
            return Ok(None);
        };
        let raw = raw.trim();

        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Some(datetime));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(Some)
            .ok_or_else(|| DataError::InvalidReferenceDate(raw.to_string()).into())
    }

    pub fn clean_options(&self) -> crate::CleanOptions {
        crate::CleanOptions {
            date_format: self.date_format.clone(),
        }
    }
}
