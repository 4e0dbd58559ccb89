// External crates
use log::debug;
use polars::prelude::*;
use rayon::prelude::*;
use std::fmt;

// Internal modules
use crate::error::Result;

/// Identifier values of one group, rendered as strings.
///
/// A single id column renders as `a`, several as `(a, b)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Reads the key from the first row of a non-empty partition
    fn from_partition(group: &DataFrame, id_columns: &[&str]) -> Result<Self> {
        let mut values = Vec::with_capacity(id_columns.len());
        for &name in id_columns {
            let as_text = group
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let value = as_text.str()?.get(0).unwrap_or("null").to_string();
            values.push(value);
        }
        Ok(Self(values))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            values => write!(f, "({})", values.join(", ")),
        }
    }
}

/// Splits a frame into its groups, in order of first appearance.
///
/// Row order inside each group is the row order of the input.
pub fn partition_groups(df: &DataFrame, id_columns: &[&str]) -> Result<Vec<(GroupKey, DataFrame)>> {
    for &name in id_columns {
        df.column(name)?;
    }
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    df.partition_by_stable(id_columns.iter().copied(), true)?
        .into_iter()
        .map(|group| {
            let key = GroupKey::from_partition(&group, id_columns)?;
            Ok((key, group))
        })
        .collect()
}

/// Runs `f` on every group and returns the results in group order.
///
/// Without id columns the whole frame is one unnamed group. The first failing
/// group aborts the call.
pub fn map_groups<T, F>(df: &DataFrame, id_columns: &[&str], f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&DataFrame, Option<&GroupKey>) -> Result<T> + Sync,
{
    if id_columns.is_empty() {
        return Ok(vec![f(df, None)?]);
    }

    let groups = partition_groups(df, id_columns)?;
    debug!("Processing {} groups keyed by {:?}", groups.len(), id_columns);

    // Results keep group order; the first failing group in that order wins
    let results: Vec<Result<T>> = groups
        .par_iter()
        .map(|(key, group)| f(group, Some(key)))
        .collect();
    results.into_iter().collect()
}

/// Applies a single-group selection to every group and stacks the results.
pub fn apply_per_group<F>(df: &DataFrame, id_columns: &[&str], select: F) -> Result<DataFrame>
where
    F: Fn(&DataFrame, Option<&GroupKey>) -> Result<DataFrame> + Sync,
{
    let selected = map_groups(df, id_columns, select)?;
    concat_frames(df, selected)
}

/// Vertically stacks frames sharing the schema of `template`.
///
/// No frames gives an empty frame with the template's schema.
pub fn concat_frames(template: &DataFrame, frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut frames = frames.into_iter();
    let Some(mut stacked) = frames.next() else {
        return Ok(template.clear());
    };
    for frame in frames {
        stacked.vstack_mut(&frame)?;
    }
    // One chunk per group after stacking
    stacked.rechunk_mut();
    Ok(stacked)
}
