// External crates
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Number;

// Internal modules
use super::selection::{select_by_index, select_by_relative_fraction};
use super::train_test_split::{train_test_split, SplitFrames};
use crate::constants::{DEFAULT_TEST_FRACTION, DEFAULT_TRAIN_FRACTION};
use crate::error::{Result, ToolkitError};

/// Boundaries of one split, either as fractions of each series or as row indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitBoundary {
    Fraction { start: f64, end: f64 },
    Index { start: i64, end: i64 },
}

impl SplitBoundary {
    pub fn fraction(start: f64, end: f64) -> Result<Self> {
        for value in [start, end] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ToolkitError::Configuration(format!(
                    "Fraction boundaries must lie in [0, 1], got {}",
                    value
                )));
            }
        }
        Ok(Self::Fraction { start, end })
    }

    pub fn index(start: i64, end: i64) -> Result<Self> {
        if start < 0 || end < 0 {
            return Err(ToolkitError::Configuration(format!(
                "Index boundaries must be non-negative, got [{}, {}]",
                start, end
            )));
        }
        Ok(Self::Index { start, end })
    }

    /// A pair is in fraction mode as soon as one of its numbers is written as a float.
    fn from_numbers(split: &str, numbers: &[Number]) -> Result<Self> {
        let [start, end] = numbers else {
            return Err(ToolkitError::Configuration(format!(
                "The '{}' split needs exactly two boundaries, got {}",
                split,
                numbers.len()
            )));
        };

        if start.is_f64() || end.is_f64() {
            let as_float = |n: &Number| {
                n.as_f64().ok_or_else(|| {
                    ToolkitError::Configuration(format!("Invalid boundary {} in '{}'", n, split))
                })
            };
            Self::fraction(as_float(start)?, as_float(end)?)
        } else {
            let as_int = |n: &Number| {
                n.as_i64().ok_or_else(|| {
                    ToolkitError::Configuration(format!("Invalid boundary {} in '{}'", n, split))
                })
            };
            Self::index(as_int(start)?, as_int(end)?)
        }
    }
}

/// Declarative description of how to split a table.
///
/// Deserializes from `{"train": [a, b], "valid": [c, d], "test": [e, f]}` or
/// from `{"train": 0.7, "test": 0.2}`, in which case validation gets the rest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSplitConfig")]
pub enum SplitConfig {
    ThreeWay {
        train: SplitBoundary,
        valid: SplitBoundary,
        test: SplitBoundary,
    },
    TrainTest {
        train: f64,
        test: f64,
    },
}

impl SplitConfig {
    pub fn three_way(train: SplitBoundary, valid: SplitBoundary, test: SplitBoundary) -> Self {
        Self::ThreeWay { train, valid, test }
    }

    pub fn train_test(train: f64, test: f64) -> Result<Self> {
        for value in [train, test] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ToolkitError::Configuration(format!(
                    "Split fractions must lie in [0, 1], got {}",
                    value
                )));
            }
        }
        if train + test > 1.0 {
            return Err(ToolkitError::Configuration(format!(
                "train ({}) and test ({}) fractions exceed the whole series",
                train, test
            )));
        }
        Ok(Self::TrainTest { train, test })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self::TrainTest {
            train: DEFAULT_TRAIN_FRACTION,
            test: DEFAULT_TEST_FRACTION,
        }
    }
}

#[derive(Deserialize)]
struct RawSplitConfig {
    train: RawBoundary,
    #[serde(default)]
    valid: Option<RawBoundary>,
    test: RawBoundary,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBoundary {
    Pair(Vec<Number>),
    Scalar(f64),
}

impl RawBoundary {
    fn into_boundary(self, split: &str) -> Result<SplitBoundary> {
        match self {
            Self::Pair(numbers) => SplitBoundary::from_numbers(split, &numbers),
            Self::Scalar(_) => Err(ToolkitError::Configuration(format!(
                "The '{}' split must be a [start, end] pair when 'valid' is given",
                split
            ))),
        }
    }

    fn into_fraction(self, split: &str) -> Result<f64> {
        match self {
            Self::Scalar(value) => Ok(value),
            Self::Pair(_) => Err(ToolkitError::Configuration(format!(
                "The '{}' split must be a single fraction when 'valid' is absent",
                split
            ))),
        }
    }
}

impl TryFrom<RawSplitConfig> for SplitConfig {
    type Error = ToolkitError;

    fn try_from(raw: RawSplitConfig) -> Result<Self> {
        match raw.valid {
            Some(valid) => Ok(Self::three_way(
                raw.train.into_boundary("train")?,
                valid.into_boundary("valid")?,
                raw.test.into_boundary("test")?,
            )),
            None => Self::train_test(raw.train.into_fraction("train")?, raw.test.into_fraction("test")?),
        }
    }
}

/// Resolved parameters for a single split and the primitive they drive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionParams {
    RelativeFraction {
        start_fraction: Option<f64>,
        end_fraction: Option<f64>,
        start_offset: usize,
    },
    Index {
        start_index: Option<i64>,
        end_index: Option<i64>,
    },
}

impl SelectionParams {
    fn resolve(boundary: &SplitBoundary, context_length: usize) -> Self {
        match *boundary {
            SplitBoundary::Fraction { start, end } => Self::RelativeFraction {
                start_fraction: Some(start),
                end_fraction: Some(end),
                start_offset: context_length,
            },
            SplitBoundary::Index { start, end } => Self::Index {
                start_index: Some(start - context_length as i64),
                end_index: Some(end),
            },
        }
    }

    pub fn select(&self, df: &DataFrame, id_columns: &[&str]) -> Result<DataFrame> {
        match *self {
            Self::RelativeFraction {
                start_fraction,
                end_fraction,
                start_offset,
            } => select_by_relative_fraction(df, id_columns, start_fraction, start_offset, end_fraction),
            Self::Index {
                start_index,
                end_index,
            } => select_by_index(df, id_columns, start_index, end_index),
        }
    }
}

/// Parameters for the group-aware train/valid/test splitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainTestParams {
    pub train: f64,
    pub test: f64,
    pub valid_test_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitParams {
    PerSplit {
        train: SelectionParams,
        valid: SelectionParams,
        test: SelectionParams,
    },
    TrainTest(TrainTestParams),
}

impl SplitParams {
    /// Splits `df` with the primitive each split resolved to
    pub fn split(&self, df: &DataFrame, id_columns: &[&str]) -> Result<SplitFrames> {
        match self {
            Self::PerSplit { train, valid, test } => Ok(SplitFrames {
                train: train.select(df, id_columns)?,
                valid: valid.select(df, id_columns)?,
                test: test.select(df, id_columns)?,
            }),
            Self::TrainTest(params) => train_test_split(
                df,
                id_columns,
                params.train,
                params.test,
                params.valid_test_offset,
            ),
        }
    }
}

/// Resolves a split configuration into per-split selection parameters.
///
/// Validation and test windows start `context_length` rows early so that their
/// first target has a full context window; train is never shifted.
pub fn get_split_params(config: &SplitConfig, context_length: Option<usize>) -> SplitParams {
    let context_length = context_length.unwrap_or(0);

    match config {
        SplitConfig::ThreeWay { train, valid, test } => SplitParams::PerSplit {
            train: SelectionParams::resolve(train, 0),
            valid: SelectionParams::resolve(valid, context_length),
            test: SelectionParams::resolve(test, context_length),
        },
        SplitConfig::TrainTest { train, test } => SplitParams::TrainTest(TrainTestParams {
            train: *train,
            test: *test,
            valid_test_offset: context_length,
        }),
    }
}
