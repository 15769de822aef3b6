//! Forward-looking CLTV targets and training-table assembly

use crate::clean::with_timestamps;
use crate::error::require_columns;
use crate::{CUSTOMER_ID, CUSTOMER_ID_OUT, INVOICE_DATE, TOTAL_PRICE};
use crate::features::add_days;
use chrono::NaiveDateTime;
use polars::prelude::*;

/// Default forecast horizon in days
pub const DEFAULT_HORIZON_DAYS: u32 = 90;

/// Name of the target column for a horizon, e.g. `cltv_next_90d`
pub fn target_column_name(horizon_days: u32) -> String {
    format!("cltv_next_{horizon_days}d")
}

/// Total spend per customer in `[reference_date, reference_date + horizon_days)`
///
/// Customers with no transaction in the window are absent from the result
/// rather than present with zero; see [`build_training_table`].
///
/// # Arguments
/// * `df` - Cleaned transactions
/// * `reference_date` - Start of the window (included)
/// * `horizon_days` - Window length; the end instant is excluded
///
/// # Returns
/// * `CustomerID` and `cltv_next_{horizon_days}d`, sorted by customer
pub fn create_target_cltv(
    df: &DataFrame,
    reference_date: NaiveDateTime,
    horizon_days: u32,
) -> crate::Result<DataFrame> {
    require_columns(df, &[CUSTOMER_ID, INVOICE_DATE, TOTAL_PRICE])?;

    let start = reference_date;
    let end = add_days(reference_date, i64::from(horizon_days), "target window end")?;
    log::debug!("target: window [{start}, {end})");

    let instant = col(INVOICE_DATE).cast(DataType::Int64);
    let target = target_column_name(horizon_days);

    let future = with_timestamps(df)?
        .filter(
            instant
                .clone()
                .gt_eq(lit(start.and_utc().timestamp_micros()))
                .and(instant.lt(lit(end.and_utc().timestamp_micros())))
                .and(col(CUSTOMER_ID).is_not_null()),
        )
        .group_by([col(CUSTOMER_ID)])
        .agg([col(TOTAL_PRICE).sum().alias(target.as_str())])
        .select([col(CUSTOMER_ID).alias(CUSTOMER_ID_OUT), col(target.as_str())])
        .sort([CUSTOMER_ID_OUT], SortMultipleOptions::default())
        .collect()?;

    log::info!(
        "target: {} customers active in the next {horizon_days} days",
        future.height()
    );
    Ok(future)
}

/// Transactions strictly before `reference_date`
///
/// Features built from this slice do not see the target window.
pub fn transactions_before(
    df: &DataFrame,
    reference_date: NaiveDateTime,
) -> crate::Result<DataFrame> {
    let cutoff = reference_date.and_utc().timestamp_micros();
    let history = with_timestamps(df)?
        .filter(col(INVOICE_DATE).cast(DataType::Int64).lt(lit(cutoff)))
        .collect()?;

    log::debug!(
        "history: {} of {} rows before {reference_date}",
        history.height(),
        df.height()
    );
    Ok(history)
}

/// Left-join targets onto features, filling customers without future spend with zero
pub fn build_training_table(
    features: &DataFrame,
    target: &DataFrame,
    horizon_days: u32,
) -> crate::Result<DataFrame> {
    let target_column = target_column_name(horizon_days);
    require_columns(features, &[CUSTOMER_ID_OUT])?;
    require_columns(target, &[CUSTOMER_ID_OUT, target_column.as_str()])?;

    let table = features
        .clone()
        .lazy()
        .join(
            target.clone().lazy(),
            [col(CUSTOMER_ID_OUT)],
            [col(CUSTOMER_ID_OUT)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(col(target_column.as_str()).fill_null(lit(0.0)))
        .sort([CUSTOMER_ID_OUT], SortMultipleOptions::default())
        .collect()?;

    Ok(table)
}
