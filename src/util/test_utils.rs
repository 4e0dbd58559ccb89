// External imports
use polars::prelude::*;
use rand::Rng;

/// Builds a long-format frame with one series per `(id, length)` pair.
///
/// Each series has an `id` column, a `timestamp` column counting from 0 within
/// the series, and a random-walk `value` column.
pub fn generate_grouped_frame(series: &[(&str, usize)]) -> DataFrame {
    let mut rng = rand::rng();

    let mut ids = Vec::new();
    let mut timestamps = Vec::new();
    let mut values = Vec::new();

    for &(id, length) in series {
        // Start with a base level around 100
        let mut level: f64 = 100.0 + rng.random::<f64>() * 50.0;
        for step in 0..length {
            level *= 1.0 + (rng.random::<f64>() * 2.0 - 1.0) * 0.01;
            ids.push(id.to_string());
            timestamps.push(step as i64);
            values.push(level);
        }
    }

    DataFrame::new(vec![
        Series::new("id".into(), ids).into_column(),
        Series::new("timestamp".into(), timestamps).into_column(),
        Series::new("value".into(), values).into_column(),
    ])
    .expect("columns have equal length")
}

/// Reads an integer column into a vector, panicking on nulls
pub fn column_i64(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

pub fn column_str(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect()
}
