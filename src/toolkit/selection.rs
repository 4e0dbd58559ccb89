// External crates
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Deserialize;
use std::str::FromStr;

// Internal modules
use super::grouping::{apply_per_group, GroupKey};
use crate::error::{Result, ToolkitError};

/// Where a fixed fraction of a series is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FractionLocation {
    First,
    Last,
}

impl FromStr for FractionLocation {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(ToolkitError::Configuration(format!(
                "`location` should be either `first` or `last`, got `{}`",
                other
            ))),
        }
    }
}

/// A bound for timestamp-based selection.
///
/// Datetime bounds are cast to the dtype of the timestamp column before comparing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimestampBound {
    Integer(i64),
    Float(f64),
    Datetime(NaiveDateTime),
}

impl TimestampBound {
    fn to_expr(self, dtype: &DataType) -> Expr {
        match self {
            Self::Integer(value) => lit(value),
            Self::Float(value) => lit(value),
            Self::Datetime(value) => lit(value.and_utc().timestamp_millis())
                .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                .cast(dtype.clone()),
        }
    }
}

impl From<i64> for TimestampBound {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for TimestampBound {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDateTime> for TimestampBound {
    fn from(value: NaiveDateTime) -> Self {
        Self::Datetime(value)
    }
}

impl FromStr for TimestampBound {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(value) = s.parse::<i64>() {
            return Ok(Self::Integer(value));
        }
        if let Ok(value) = s.parse::<f64>() {
            return Ok(Self::Float(value));
        }
        if let Ok(value) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(Self::Datetime(value));
        }
        if let Some(value) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::Datetime(value));
        }
        Err(ToolkitError::Configuration(format!(
            "Cannot interpret '{}' as a timestamp",
            s
        )))
    }
}

/// Select rows by timestamp: `start <= timestamp < end`.
///
/// Either bound may be omitted, not both. The selection runs over the whole
/// table; timestamps are assumed to be comparable across groups.
pub fn select_by_timestamp(
    df: &DataFrame,
    timestamp_column: &str,
    start_timestamp: Option<TimestampBound>,
    end_timestamp: Option<TimestampBound>,
) -> Result<DataFrame> {
    let dtype = df.column(timestamp_column)?.dtype().clone();
    let timestamp = || col(timestamp_column);

    let predicate = match (start_timestamp, end_timestamp) {
        (None, None) => {
            return Err(ToolkitError::Configuration(
                "At least one of start_timestamp or end_timestamp must be specified.".into(),
            ))
        }
        (Some(start), None) => timestamp().gt_eq(start.to_expr(&dtype)),
        (None, Some(end)) => timestamp().lt(end.to_expr(&dtype)),
        (Some(start), Some(end)) => timestamp()
            .gt_eq(start.to_expr(&dtype))
            .and(timestamp().lt(end.to_expr(&dtype))),
    };

    Ok(df.clone().lazy().filter(predicate).collect()?)
}

/// Select rows `[start_index, end_index)` of every series.
///
/// With id columns the indices are relative to each group. A non-zero start at
/// or past the end of a group fails; an end past the end of a group is clipped.
pub fn select_by_index(
    df: &DataFrame,
    id_columns: &[&str],
    start_index: Option<i64>,
    end_index: Option<i64>,
) -> Result<DataFrame> {
    if start_index.is_none() && end_index.is_none() {
        return Err(ToolkitError::Configuration(
            "At least one of start_index or end_index must be specified.".into(),
        ));
    }

    apply_per_group(df, id_columns, |group, key| {
        split_group_by_index(group, key, start_index, end_index)
    })
}

/// Select a relative range of every series.
///
/// Per group: `start = floor(len * start_fraction) - start_offset` and
/// `end = floor(len * end_fraction)`.
pub fn select_by_relative_fraction(
    df: &DataFrame,
    id_columns: &[&str],
    start_fraction: Option<f64>,
    start_offset: usize,
    end_fraction: Option<f64>,
) -> Result<DataFrame> {
    if start_fraction.is_none() && end_fraction.is_none() {
        return Err(ToolkitError::Configuration(
            "At least one of start_fraction or end_fraction must be specified.".into(),
        ));
    }
    for fraction in [start_fraction, end_fraction].into_iter().flatten() {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(ToolkitError::Configuration(format!(
                "Fractions must be finite and non-negative, got {}",
                fraction
            )));
        }
    }

    apply_per_group(df, id_columns, |group, key| {
        split_group_by_fraction(group, key, start_fraction, start_offset, end_fraction)
    })
}

/// Select a fixed fraction of every series from its start or its end.
///
/// The size per group is `floor(fraction * (len - minimum_size)) + minimum_size`.
pub fn select_by_fixed_fraction(
    df: &DataFrame,
    id_columns: &[&str],
    fraction: f64,
    location: FractionLocation,
    minimum_size: usize,
) -> Result<DataFrame> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(ToolkitError::Configuration(
            "The value of fraction should be between 0 and 1.".into(),
        ));
    }

    apply_per_group(df, id_columns, |group, key| {
        split_group_by_fixed_fraction(group, key, fraction, location, minimum_size)
    })
}

pub(crate) fn split_group_by_index(
    group: &DataFrame,
    key: Option<&GroupKey>,
    start_index: Option<i64>,
    end_index: Option<i64>,
) -> Result<DataFrame> {
    let length = group.height() as i64;
    let start = start_index.unwrap_or(0);

    if start != 0 && start >= length {
        return Err(ToolkitError::OutOfRange(with_group(
            "Selection would result in an empty time series, please check start_index and time series length",
            key,
        )));
    }
    if start < 0 {
        return Err(ToolkitError::OutOfRange(with_group(
            &format!("start_index {} is negative", start),
            key,
        )));
    }

    let end = match end_index {
        Some(end) if end < 0 => {
            return Err(ToolkitError::OutOfRange(with_group(
                &format!("end_index {} is negative", end),
                key,
            )))
        }
        Some(end) => end.min(length),
        None => length,
    };

    Ok(group.slice(start, (end - start).max(0) as usize))
}

fn split_group_by_fraction(
    group: &DataFrame,
    key: Option<&GroupKey>,
    start_fraction: Option<f64>,
    start_offset: usize,
    end_fraction: Option<f64>,
) -> Result<DataFrame> {
    let length = group.height() as f64;

    let start_index = match start_fraction {
        Some(fraction) => {
            let index = (length * fraction) as i64 - start_offset as i64;
            if index < 0 {
                let msg = match key {
                    Some(key) => format!(
                        "Computed starting_index for id={} is negative, please check individual time series lengths, start_fraction, and start_offset.",
                        key
                    ),
                    None => "Computed starting_index is negative, please check time series length, start_fraction, and start_offset.".to_string(),
                };
                return Err(ToolkitError::OutOfRange(msg));
            }
            Some(index)
        }
        None => None,
    };
    let end_index = end_fraction.map(|fraction| (length * fraction) as i64);

    split_group_by_index(group, key, start_index, end_index)
}

fn split_group_by_fixed_fraction(
    group: &DataFrame,
    key: Option<&GroupKey>,
    fraction: f64,
    location: FractionLocation,
    minimum_size: usize,
) -> Result<DataFrame> {
    let length = group.height() as i64;
    let minimum_size = minimum_size as i64;
    let size = (fraction * (length - minimum_size) as f64) as i64 + minimum_size;

    let (start_index, end_index) = match location {
        FractionLocation::First => (0, size),
        FractionLocation::Last => (length - size, length),
    };

    split_group_by_index(group, key, Some(start_index), Some(end_index))
}

fn with_group(msg: &str, key: Option<&GroupKey>) -> String {
    match key {
        Some(key) => format!("{} (id = {})", msg, key),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::{column_i64, generate_grouped_frame};

    #[test]
    fn test_fraction_location_parsing() {
        assert_eq!("first".parse::<FractionLocation>().unwrap(), FractionLocation::First);
        assert_eq!("last".parse::<FractionLocation>().unwrap(), FractionLocation::Last);
        assert!(matches!(
            "middle".parse::<FractionLocation>(),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn test_timestamp_bound_parsing() {
        assert_eq!("42".parse::<TimestampBound>().unwrap(), TimestampBound::Integer(42));
        assert_eq!("2.5".parse::<TimestampBound>().unwrap(), TimestampBound::Float(2.5));
        assert!(matches!(
            "2021-03-04".parse::<TimestampBound>().unwrap(),
            TimestampBound::Datetime(_)
        ));
        assert!("yesterday".parse::<TimestampBound>().is_err());
    }

    #[test]
    fn test_select_by_timestamp_bounds() {
        let df = generate_grouped_frame(&[("a", 10)]);

        let both = select_by_timestamp(&df, "timestamp", Some(3.into()), Some(7.into())).unwrap();
        assert_eq!(column_i64(&both, "timestamp"), vec![3, 4, 5, 6]);

        let from = select_by_timestamp(&df, "timestamp", Some(8.into()), None).unwrap();
        assert_eq!(column_i64(&from, "timestamp"), vec![8, 9]);

        let until = select_by_timestamp(&df, "timestamp", None, Some(2.into())).unwrap();
        assert_eq!(column_i64(&until, "timestamp"), vec![0, 1]);

        assert!(matches!(
            select_by_timestamp(&df, "timestamp", None, None),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn test_select_by_timestamp_datetime_column() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let day = 24 * 3600 * 1000;
        let dates = Series::new("date".into(), (0..5).map(|i| base + i * day).collect::<Vec<i64>>())
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![dates.into_column()]).unwrap();

        let start = "2024-01-02".parse::<TimestampBound>().unwrap();
        let end = "2024-01-04 00:00:00".parse::<TimestampBound>().unwrap();
        let selected = select_by_timestamp(&df, "date", Some(start), Some(end)).unwrap();
        assert_eq!(selected.height(), 2);
    }

    #[test]
    fn test_select_by_index_per_group() {
        let df = generate_grouped_frame(&[("a", 5), ("b", 8)]);
        let selected = select_by_index(&df, &["id"], Some(2), Some(4)).unwrap();
        assert_eq!(column_i64(&selected, "timestamp"), vec![2, 3, 2, 3]);
    }

    #[test]
    fn test_select_by_index_clips_end() {
        let df = generate_grouped_frame(&[("a", 5)]);
        let selected = select_by_index(&df, &[], Some(3), Some(50)).unwrap();
        assert_eq!(column_i64(&selected, "timestamp"), vec![3, 4]);
    }

    #[test]
    fn test_select_by_index_start_past_end_names_group() {
        let df = generate_grouped_frame(&[("a", 10), ("short", 3)]);
        let err = select_by_index(&df, &["id"], Some(5), None).unwrap_err();
        match err {
            ToolkitError::OutOfRange(msg) => assert!(msg.contains("(id = short)"), "{}", msg),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_by_index_requires_a_bound() {
        let df = generate_grouped_frame(&[("a", 5)]);
        assert!(matches!(
            select_by_index(&df, &[], None, None),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn test_select_by_index_negative_start_is_out_of_range() {
        let df = generate_grouped_frame(&[("a", 5)]);
        assert!(matches!(
            select_by_index(&df, &[], Some(-2), None),
            Err(ToolkitError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_select_by_index_negative_bounds_name_the_group() {
        let df = generate_grouped_frame(&[("a", 5), ("b", 5)]);

        match select_by_index(&df, &["id"], Some(-1), Some(3)) {
            Err(ToolkitError::OutOfRange(msg)) => {
                assert!(msg.contains("start_index -1 is negative"), "{}", msg);
                assert!(msg.contains("(id = a)"), "{}", msg);
            }
            other => panic!("expected out of range, got {:?}", other),
        }

        match select_by_index(&df, &["id"], Some(0), Some(-1)) {
            Err(ToolkitError::OutOfRange(msg)) => {
                assert!(msg.contains("end_index -1 is negative"), "{}", msg);
                assert!(msg.contains("(id = a)"), "{}", msg);
            }
            other => panic!("expected out of range, got {:?}", other),
        }

        assert!(matches!(
            select_by_index(&df, &[], Some(0), Some(-1)),
            Err(ToolkitError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_select_by_relative_fraction_with_offset() {
        let df = generate_grouped_frame(&[("a", 10), ("b", 20)]);
        let selected = select_by_relative_fraction(&df, &["id"], Some(0.5), 2, Some(0.8)).unwrap();
        // a: [5 - 2, 8), b: [10 - 2, 16)
        let expected: Vec<i64> = (3..8).chain(8..16).collect();
        assert_eq!(column_i64(&selected, "timestamp"), expected);
    }

    #[test]
    fn test_select_by_relative_fraction_negative_start() {
        let df = generate_grouped_frame(&[("long", 100), ("tiny", 4)]);
        let err = select_by_relative_fraction(&df, &["id"], Some(0.5), 5, None).unwrap_err();
        match err {
            ToolkitError::OutOfRange(msg) => assert!(msg.contains("id=tiny"), "{}", msg),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_by_relative_fraction_requires_a_fraction() {
        let df = generate_grouped_frame(&[("a", 10)]);
        assert!(matches!(
            select_by_relative_fraction(&df, &[], None, 0, None),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn test_select_by_fixed_fraction_locations() {
        let df = generate_grouped_frame(&[("a", 10), ("b", 20)]);

        let first = select_by_fixed_fraction(&df, &["id"], 0.5, FractionLocation::First, 0).unwrap();
        let expected: Vec<i64> = (0..5).chain(0..10).collect();
        assert_eq!(column_i64(&first, "timestamp"), expected);

        let last = select_by_fixed_fraction(&df, &["id"], 0.5, FractionLocation::Last, 0).unwrap();
        let expected: Vec<i64> = (5..10).chain(10..20).collect();
        assert_eq!(column_i64(&last, "timestamp"), expected);
    }

    #[test]
    fn test_select_by_fixed_fraction_minimum_size() {
        let df = generate_grouped_frame(&[("a", 10)]);
        // floor(0.5 * (10 - 4)) + 4 = 7
        let selected = select_by_fixed_fraction(&df, &[], 0.5, FractionLocation::Last, 4).unwrap();
        assert_eq!(column_i64(&selected, "timestamp"), (3..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_select_by_fixed_fraction_rejects_out_of_range_fraction() {
        let df = generate_grouped_frame(&[("a", 10)]);
        for fraction in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                select_by_fixed_fraction(&df, &[], fraction, FractionLocation::First, 0),
                Err(ToolkitError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_selection_does_not_touch_input() {
        let df = generate_grouped_frame(&[("a", 6)]);
        let before = df.clone();
        let _ = select_by_index(&df, &[], Some(1), Some(3)).unwrap();
        assert!(df.equals(&before));
    }
}
