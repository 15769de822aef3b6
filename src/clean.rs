//! Row filtering and normalization of the raw transaction log

use crate::error::require_columns;
use crate::{CUSTOMER_ID, INVOICE, INVOICE_DATE, PRICE, QUANTITY, TOTAL_PRICE};
use polars::prelude::*;

/// Leading character of a cancelled invoice
pub const CANCELLATION_PREFIX: &str = "C";

/// Knobs for [`clean_data_with`]
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// strftime format of textual `InvoiceDate` values; inferred when `None`
    pub date_format: Option<String>,
}

/// Clean raw transactions with default options
///
/// Drops cancellations, rows without a customer and rows with non-positive
/// quantity or price, normalizes `InvoiceDate` to a timestamp and adds
/// `TotalPrice = Quantity * Price`. Row order is preserved.
pub fn clean_data(df: &DataFrame) -> crate::Result<DataFrame> {
    clean_data_with(df, &CleanOptions::default())
}

/// Clean raw transactions, see [`clean_data`]
pub fn clean_data_with(df: &DataFrame, options: &CleanOptions) -> crate::Result<DataFrame> {
    require_columns(df, &[INVOICE, CUSTOMER_ID, QUANTITY, PRICE, INVOICE_DATE])?;

    let cleaned = df
        .clone()
        .lazy()
        .filter(
            is_cancellation()
                .not()
                .and(col(CUSTOMER_ID).is_not_null())
                .and(col(QUANTITY).gt(lit(0)))
                .and(col(PRICE).gt(lit(0.0))),
        )
        .with_columns([
            timestamp_expr(df, options.date_format.as_deref())?,
            (col(QUANTITY) * col(PRICE)).alias(TOTAL_PRICE),
        ])
        .collect()?;

    log::info!(
        "clean: kept {} of {} rows ({} dropped)",
        cleaned.height(),
        df.height(),
        df.height() - cleaned.height()
    );
    Ok(cleaned)
}

/// A null invoice renders as text that does not start with the prefix, so it is kept.
fn is_cancellation() -> Expr {
    col(INVOICE)
        .cast(DataType::String)
        .str()
        .starts_with(lit(CANCELLATION_PREFIX))
        .fill_null(lit(false))
}

/// Expression producing `InvoiceDate` as a microsecond timestamp
///
/// Textual dates are parsed strictly, so one unparseable value fails the
/// whole collect. Anything else is cast.
pub(crate) fn timestamp_expr(df: &DataFrame, format: Option<&str>) -> crate::Result<Expr> {
    let target = DataType::Datetime(TimeUnit::Microseconds, None);
    let dates = df.column(INVOICE_DATE)?;
    let expr = match dates.dtype() {
        DataType::String => {
            // polars cannot infer "12/1/2010 8:26", so month-first logs get an explicit format
            let format = format.or_else(|| {
                dates
                    .str()
                    .ok()
                    .and_then(|values| values.into_iter().flatten().next())
                    .and_then(month_first_format)
            });
            if let Some(format) = format {
                log::debug!("clean: parsing {INVOICE_DATE} with format {format}");
            }
            col(INVOICE_DATE).str().strptime(
                target,
                StrptimeOptions {
                    format: format.map(Into::into),
                    strict: true,
                    ..Default::default()
                },
                lit("raise"),
            )
        }
        _ => col(INVOICE_DATE).cast(target),
    };
    Ok(expr)
}

/// Format for US-style `M/D/YYYY H:MM[:SS]` timestamps, if `sample` has that shape
fn month_first_format(sample: &str) -> Option<&'static str> {
    let (date, time) = sample.trim().split_once(' ')?;
    let parts: Vec<&str> = date.split('/').collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    match time.matches(':').count() {
        1 => Some("%m/%d/%Y %H:%M"),
        2 => Some("%m/%d/%Y %H:%M:%S"),
        _ => None,
    }
}

/// `df` as a lazy frame whose `InvoiceDate` is a microsecond timestamp
pub(crate) fn with_timestamps(df: &DataFrame) -> crate::Result<LazyFrame> {
    require_columns(df, &[INVOICE_DATE])?;
    Ok(df.clone().lazy().with_column(timestamp_expr(df, None)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df![
            INVOICE => ["489434", "C489449", "489435", "489436", "489437", "489438"],
            CUSTOMER_ID => [Some(13085i64), Some(16321), None, Some(13078), Some(13078), Some(15362)],
            QUANTITY => [12i64, -12, 6, 0, 3, 24],
            PRICE => [6.95, 2.95, 1.25, 2.10, 0.0, 0.85],
            INVOICE_DATE => [
                "2009-12-01 07:45:00",
                "2009-12-01 10:33:00",
                "2009-12-01 09:06:00",
                "2009-12-01 09:08:00",
                "2009-12-01 09:10:00",
                "2009-12-01 09:28:00",
            ],
        ]
        .unwrap()
    }

    #[test]
    fn test_clean_filters_invalid_rows() {
        let cleaned = clean_data(&raw_frame()).unwrap();

        // cancellation, missing customer, zero quantity and zero price are dropped
        let invoices: Vec<&str> = cleaned
            .column(INVOICE)
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(invoices, vec!["489434", "489438"]);
    }

    #[test]
    fn test_clean_adds_total_price() {
        let cleaned = clean_data(&raw_frame()).unwrap();

        let quantity = cleaned.column(QUANTITY).unwrap().i64().unwrap();
        let price = cleaned.column(PRICE).unwrap().f64().unwrap();
        let total = cleaned.column(TOTAL_PRICE).unwrap().f64().unwrap();
        for i in 0..cleaned.height() {
            let expected = quantity.get(i).unwrap() as f64 * price.get(i).unwrap();
            assert_eq!(total.get(i), Some(expected));
        }
    }

    #[test]
    fn test_clean_parses_dates() {
        let cleaned = clean_data(&raw_frame()).unwrap();
        assert_eq!(
            cleaned.column(INVOICE_DATE).unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Microseconds, None)
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_data(&raw_frame()).unwrap();
        let twice = clean_data(&once).unwrap();
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_clean_does_not_mutate_input() {
        let raw = raw_frame();
        let _ = clean_data(&raw).unwrap();
        assert_eq!(raw.height(), 6);
        assert!(raw.column(TOTAL_PRICE).is_err());
    }

    #[test]
    fn test_clean_numeric_invoices() {
        let df = df![
            INVOICE => [536365i64, 536366],
            CUSTOMER_ID => [17850i64, 17850],
            QUANTITY => [6i64, 6],
            PRICE => [2.55, 1.85],
            INVOICE_DATE => ["2010-12-01 08:26:00", "2010-12-01 08:28:00"],
        ]
        .unwrap();

        let cleaned = clean_data(&df).unwrap();
        assert_eq!(cleaned.height(), 2);
    }

    #[test]
    fn test_clean_with_explicit_date_format() {
        let df = df![
            INVOICE => ["536365"],
            CUSTOMER_ID => [17850i64],
            QUANTITY => [6i64],
            PRICE => [2.55],
            INVOICE_DATE => ["12/1/2010 8:26"],
        ]
        .unwrap();

        let options = CleanOptions {
            date_format: Some("%m/%d/%Y %H:%M".to_string()),
        };
        let cleaned = clean_data_with(&df, &options).unwrap();
        assert_eq!(cleaned.height(), 1);
    }

    #[test]
    fn test_clean_infers_month_first_dates() {
        let df = df![
            INVOICE => ["536365", "536366"],
            CUSTOMER_ID => [17850i64, 17850],
            QUANTITY => [6i64, 6],
            PRICE => [2.55, 1.85],
            INVOICE_DATE => ["12/1/2010 8:26", "12/13/2010 8:28"],
        ]
        .unwrap();

        let cleaned = clean_data(&df).unwrap();
        let micros = cleaned
            .column(INVOICE_DATE)
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap();
        let micros = micros.i64().unwrap();

        let expected = chrono::NaiveDate::from_ymd_opt(2010, 12, 13)
            .unwrap()
            .and_hms_opt(8, 28, 0)
            .unwrap();
        assert_eq!(micros.get(1), Some(expected.and_utc().timestamp_micros()));
    }

    #[test]
    fn test_month_first_format() {
        assert_eq!(month_first_format("12/1/2010 8:26"), Some("%m/%d/%Y %H:%M"));
        assert_eq!(
            month_first_format("12/1/2010 08:26:59"),
            Some("%m/%d/%Y %H:%M:%S")
        );
        assert_eq!(month_first_format("2010-12-01 08:26:00"), None);
        assert_eq!(month_first_format("12/1/10 8:26"), None);
        assert_eq!(month_first_format("12/1/2010"), None);
    }

    #[test]
    fn test_clean_rejects_bad_dates() {
        let df = df![
            INVOICE => ["536365", "536366"],
            CUSTOMER_ID => [17850i64, 17850],
            QUANTITY => [6i64, 6],
            PRICE => [2.55, 1.85],
            INVOICE_DATE => ["2010-12-01 08:26:00", "not a date"],
        ]
        .unwrap();

        assert!(clean_data(&df).is_err());
    }

    #[test]
    fn test_clean_missing_column() {
        let df = df![
            INVOICE => ["536365"],
            CUSTOMER_ID => [17850i64],
            QUANTITY => [6i64],
            INVOICE_DATE => ["2010-12-01 08:26:00"],
        ]
        .unwrap();

        let err = clean_data(&df).unwrap_err();
        assert_eq!(
            err.downcast_ref::<crate::DataError>(),
            Some(&crate::DataError::MissingColumn {
                name: PRICE.to_string()
            })
        );
    }
}
