//! Customer-level RFM feature computation using Polars

use crate::clean::with_timestamps;
use crate::error::{require_columns, DataError};
use crate::{
    AVG_BASKET_VALUE, CUSTOMER_ID, CUSTOMER_ID_OUT, FREQUENCY, INVOICE, INVOICE_DATE,
    MICROS_PER_DAY, MONETARY_VALUE, RECENCY, TOTAL_PRICE,
};
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use ndarray::Array2;
use polars::prelude::*;

const LAST_PURCHASE_US: &str = "last_purchase_us";

/// Numeric feature columns in matrix order
pub const FEATURE_COLUMNS: [&str; 4] = [RECENCY, FREQUENCY, MONETARY_VALUE, AVG_BASKET_VALUE];

/// Aggregate cleaned transactions into one row per customer
///
/// # Arguments
/// * `df` - Cleaned transactions (see [`crate::clean_data`])
/// * `reference_date` - Date recency is measured from; defaults to one day
///   after the latest `InvoiceDate`
///
/// # Returns
/// * `CustomerID`, `recency`, `frequency`, `monetary_value`,
///   `avg_basket_value`, sorted by customer
pub fn build_customer_features(
    df: &DataFrame,
    reference_date: Option<NaiveDateTime>,
) -> crate::Result<DataFrame> {
    require_columns(df, &[CUSTOMER_ID, INVOICE, INVOICE_DATE, TOTAL_PRICE])?;

    let reference_date = match reference_date {
        Some(date) => date,
        None => default_reference_date(df)?,
    };
    log::debug!("features: reference date {reference_date}");

    let grouped = with_timestamps(df)?
        .filter(col(CUSTOMER_ID).is_not_null())
        .group_by([col(CUSTOMER_ID)])
        .agg([
            col(INVOICE_DATE)
                .max()
                .cast(DataType::Int64)
                .alias(LAST_PURCHASE_US),
            col(INVOICE).n_unique().cast(DataType::Int64).alias(FREQUENCY),
            col(TOTAL_PRICE).sum().alias(MONETARY_VALUE),
            // per line item, so large baskets weigh more than their invoice count
            col(TOTAL_PRICE).mean().alias(AVG_BASKET_VALUE),
        ])
        .sort([CUSTOMER_ID], SortMultipleOptions::default())
        .collect()?;

    let reference_us = reference_date.and_utc().timestamp_micros();
    let recency: Vec<Option<i64>> = grouped
        .column(LAST_PURCHASE_US)?
        .i64()?
        .into_iter()
        .map(|last| last.map(|last| (reference_us - last).div_euclid(MICROS_PER_DAY)))
        .collect();

    let mut grouped = grouped;
    grouped.with_column(Series::new(RECENCY.into(), recency))?;

    let features = grouped
        .lazy()
        .select([
            col(CUSTOMER_ID).alias(CUSTOMER_ID_OUT),
            col(RECENCY),
            col(FREQUENCY),
            col(MONETARY_VALUE),
            col(AVG_BASKET_VALUE),
        ])
        .collect()?;

    log::info!("features: {} customers", features.height());
    Ok(features)
}

/// One day after the latest `InvoiceDate`, so every customer's recency is >= 0
pub fn default_reference_date(df: &DataFrame) -> crate::Result<NaiveDateTime> {
    let latest = with_timestamps(df)?
        .select([col(INVOICE_DATE).max().cast(DataType::Int64)])
        .collect()?
        .column(INVOICE_DATE)?
        .i64()?
        .get(0)
        .ok_or(DataError::EmptyTable {
            what: "a default reference date",
        })?;

    let latest = micros_to_datetime(latest)?;
    add_days(latest, 1, "default reference date")
}

/// Latest `InvoiceDate` as stored (microseconds since the epoch) back to a datetime
pub(crate) fn micros_to_datetime(micros: i64) -> crate::Result<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            DataError::DateOutOfRange {
                what: format!("latest InvoiceDate ({micros}us)"),
            }
            .into()
        })
}

/// `date + days`, failing instead of overflowing
pub(crate) fn add_days(date: NaiveDateTime, days: i64, what: &str) -> crate::Result<NaiveDateTime> {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| {
            DataError::DateOutOfRange {
                what: format!("{what} ({date} + {days} days)"),
            }
            .into()
        })
}

/// Convert a feature frame to an `(n_customers, 4)` matrix in [`FEATURE_COLUMNS`] order
pub fn feature_matrix(features: &DataFrame) -> crate::Result<Array2<f64>> {
    require_columns(features, &FEATURE_COLUMNS)?;

    let n_samples = features.height();
    let columns = FEATURE_COLUMNS
        .iter()
        .map(|name| -> crate::Result<Vec<f64>> {
            let values = features
                .column(name)?
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            Ok(values)
        })
        .collect::<crate::Result<Vec<_>>>()?;

    let mut data = Vec::with_capacity(n_samples * FEATURE_COLUMNS.len());
    for i in 0..n_samples {
        data.extend(columns.iter().map(|column| column[i]));
    }

    Ok(Array2::from_shape_vec((n_samples, FEATURE_COLUMNS.len()), data)?)
}
