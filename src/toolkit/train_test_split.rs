// External crates
use log::debug;
use polars::prelude::*;

// Internal modules
use super::grouping::{concat_frames, map_groups, GroupKey};
use super::selection::split_group_by_index;
use crate::error::{Result, ToolkitError};

/// Train, validation and test portions of a table
#[derive(Debug, Clone)]
pub struct SplitFrames {
    pub train: DataFrame,
    pub valid: DataFrame,
    pub test: DataFrame,
}

/// Splits every series into train, validation and test portions.
///
/// Per group of length `n`: train is `[0, t)` with `t = floor(n * train)`,
/// test takes `floor(n * test)` rows at the end and validation gets the rest.
/// Validation and test windows start `valid_test_offset` rows early so the
/// first target of each has a full context window.
pub fn train_test_split(
    df: &DataFrame,
    id_columns: &[&str],
    train: f64,
    test: f64,
    valid_test_offset: usize,
) -> Result<SplitFrames> {
    validate_fractions(train, test)?;

    let parts = map_groups(df, id_columns, |group, key| {
        split_group_train_test(group, key, train, test, valid_test_offset)
    })?;

    let mut train_parts = Vec::with_capacity(parts.len());
    let mut valid_parts = Vec::with_capacity(parts.len());
    let mut test_parts = Vec::with_capacity(parts.len());
    for part in parts {
        train_parts.push(part.train);
        valid_parts.push(part.valid);
        test_parts.push(part.test);
    }

    Ok(SplitFrames {
        train: concat_frames(df, train_parts)?,
        valid: concat_frames(df, valid_parts)?,
        test: concat_frames(df, test_parts)?,
    })
}

fn validate_fractions(train: f64, test: f64) -> Result<()> {
    for (name, fraction) in [("train", train), ("test", test)] {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ToolkitError::Configuration(format!(
                "The {} fraction should be between 0 and 1, got {}",
                name, fraction
            )));
        }
    }
    if train + test > 1.0 {
        return Err(ToolkitError::Configuration(format!(
            "train ({}) and test ({}) fractions exceed the whole series",
            train, test
        )));
    }
    Ok(())
}

fn split_group_train_test(
    group: &DataFrame,
    key: Option<&GroupKey>,
    train: f64,
    test: f64,
    valid_test_offset: usize,
) -> Result<SplitFrames> {
    let length = group.height() as i64;
    let offset = valid_test_offset as i64;

    let train_size = (length as f64 * train) as i64;
    let test_size = (length as f64 * test) as i64;
    let valid_size = length - train_size - test_size;

    if let Some(key) = key {
        debug!(
            "Group {}: train={} valid={} test={} offset={}",
            key, train_size, valid_size, test_size, offset
        );
    }

    Ok(SplitFrames {
        train: split_group_by_index(group, key, Some(0), Some(train_size))?,
        valid: split_group_by_index(
            group,
            key,
            Some(train_size - offset),
            Some(train_size + valid_size),
        )?,
        test: split_group_by_index(group, key, Some(train_size + valid_size - offset), None)?,
    })
}
