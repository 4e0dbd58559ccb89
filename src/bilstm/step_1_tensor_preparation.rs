// External crates
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use chrono::{DateTime, NaiveTime, Utc};
use log::{debug, info};
use ndarray::{Array1, Array3};
use polars::prelude::*;
use rayon::prelude::*;

// Internal modules
use crate::constants::{
    DEFAULT_ANCHOR_TIME, DEFAULT_HISTORY_ROWS, DEFAULT_LAGGED_ANCHORS, DEFAULT_TARGET_COLUMN,
    DEFAULT_WINDOW_TIMESTAMP_COLUMN, DEFAULT_WINDOW_TRAIN_FRACTION,
};
use crate::error::{Result, ToolkitError};

/// Configuration for cutting intraday bars into training windows
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub timestamp_column: String,
    pub target_column: String,
    /// Time of day of the rows whose target is predicted
    pub anchor_time: NaiveTime,
    /// Rows of history strictly before each anchor
    pub history_rows: usize,
    /// Previous anchors appended after the history
    pub lagged_anchors: usize,
    /// Share of anchors used for training, the rest go to the test set
    pub train_fraction: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        let (hour, minute, second) = DEFAULT_ANCHOR_TIME;
        Self {
            timestamp_column: DEFAULT_WINDOW_TIMESTAMP_COLUMN.to_string(),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            anchor_time: NaiveTime::from_hms_opt(hour, minute, second).unwrap_or_default(),
            history_rows: DEFAULT_HISTORY_ROWS,
            lagged_anchors: DEFAULT_LAGGED_ANCHORS,
            train_fraction: DEFAULT_WINDOW_TRAIN_FRACTION,
        }
    }
}

/// Windows shaped `(samples, time steps, features)` and one target per window
#[derive(Debug, Clone)]
pub struct WindowedSamples {
    pub features: Array3<f32>,
    pub targets: Array1<f32>,
}

impl WindowedSamples {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn time_steps(&self) -> usize {
        self.features.dim().1
    }

    pub fn num_features(&self) -> usize {
        self.features.dim().2
    }

    /// Converts the samples to Burn tensors `[batch, steps, features]` and `[batch]`
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> Result<(Tensor<B, 3>, Tensor<B, 1>)> {
        if self.is_empty() {
            return Err(ToolkitError::Configuration(
                "Cannot build tensors from an empty sample set".into(),
            ));
        }

        let (n_samples, time_steps, n_features) = self.features.dim();
        let features_data: Vec<f32> = self.features.iter().copied().collect();
        let target_data: Vec<f32> = self.targets.iter().copied().collect();

        let features = Tensor::<B, 1>::from_floats(features_data.as_slice(), device)
            .reshape([n_samples, time_steps, n_features]);
        let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), device);

        Ok((features, targets))
    }
}

/// Builds train and test windows from intraday bars.
///
/// Rows whose time of day equals `anchor_time` are anchors. The first
/// `train_fraction` of them form the train set, the rest the test set. For
/// anchor `i` of a set (from `lagged_anchors` on) the window is the last
/// `history_rows` rows before the anchor followed by anchors `i-1`, `i-2`, ...
/// of the same set; every column except the timestamp is a feature. Anchors
/// without enough history are skipped.
pub fn build_windows(df: &DataFrame, config: &WindowConfig) -> Result<(WindowedSamples, WindowedSamples)> {
    if !(0.0..=1.0).contains(&config.train_fraction) {
        return Err(ToolkitError::Configuration(
            "train_fraction must be between 0.0 and 1.0".into(),
        ));
    }

    let timestamps = timestamp_millis(df, &config.timestamp_column)?;
    df.column(&config.target_column)?;

    let feature_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != config.timestamp_column)
        .map(|name| name.to_string())
        .collect();
    let target_idx = feature_names
        .iter()
        .position(|name| name == &config.target_column)
        .ok_or_else(|| {
            ToolkitError::Configuration(format!(
                "Target column '{}' cannot be the timestamp column",
                config.target_column
            ))
        })?;
    let features = feature_names
        .iter()
        .map(|name| float_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let anchors: Vec<usize> = timestamps
        .iter()
        .enumerate()
        .filter(|(_, millis)| time_of_day(**millis) == Some(config.anchor_time))
        .map(|(row, _)| row)
        .collect();
    let train_len = (anchors.len() as f64 * config.train_fraction) as usize;
    let (train_anchors, test_anchors) = anchors.split_at(train_len);

    info!(
        "Found {} anchors at {} ({} train, {} test)",
        anchors.len(),
        config.anchor_time,
        train_anchors.len(),
        test_anchors.len()
    );

    let train = collect_windows(&timestamps, &features, target_idx, train_anchors, config)?;
    let test = collect_windows(&timestamps, &features, target_idx, test_anchors, config)?;
    Ok((train, test))
}

fn collect_windows(
    timestamps: &[i64],
    features: &[Vec<f32>],
    target_idx: usize,
    anchors: &[usize],
    config: &WindowConfig,
) -> Result<WindowedSamples> {
    let time_steps = config.history_rows + config.lagged_anchors;
    let n_features = features.len();

    let windows: Vec<(Vec<f32>, f32)> = (config.lagged_anchors..anchors.len())
        .into_par_iter()
        .filter_map(|i| {
            let anchor = anchors[i];
            let cutoff = timestamps[anchor];
            let earlier: Vec<usize> = (0..timestamps.len())
                .filter(|&row| timestamps[row] < cutoff)
                .collect();
            if earlier.len() < config.history_rows {
                debug!(
                    "Skipping anchor at row {}: {} rows of history, need {}",
                    anchor,
                    earlier.len(),
                    config.history_rows
                );
                return None;
            }

            let rows = earlier[earlier.len() - config.history_rows..]
                .iter()
                .copied()
                .chain((1..=config.lagged_anchors).map(|lag| anchors[i - lag]));
            let mut window = Vec::with_capacity(time_steps * n_features);
            for row in rows {
                window.extend(features.iter().map(|column| column[row]));
            }
            Some((window, features[target_idx][anchor]))
        })
        .collect();

    let n_samples = windows.len();
    let mut features_data = Vec::with_capacity(n_samples * time_steps * n_features);
    let mut target_data = Vec::with_capacity(n_samples);
    for (window, target) in windows {
        features_data.extend(window);
        target_data.push(target);
    }

    Ok(WindowedSamples {
        features: Array3::from_shape_vec((n_samples, time_steps, n_features), features_data)?,
        targets: Array1::from_vec(target_data),
    })
}

fn timestamp_millis(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let millis = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;

    millis
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                ToolkitError::DataIntegrity(format!("Null timestamp in '{}' at row {}", name, row))
            })
        })
        .collect()
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f32>> {
    let values = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN) as f32)
        .collect())
}

fn time_of_day(millis: i64) -> Option<NaiveTime> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|datetime| datetime.time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use chrono::NaiveDate;

    const MINUTE: i64 = 60 * 1000;

    /// Three days of bars: 14:40 to 14:46 each day, `Close` counts rows
    fn intraday_frame() -> DataFrame {
        let mut millis = Vec::new();
        for day in 1..=3 {
            let start = NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(14, 40, 0)
                .unwrap()
                .and_utc()
                .timestamp_millis();
            millis.extend((0..7).map(|m| start + m * MINUTE));
        }
        let close: Vec<f64> = (0..millis.len()).map(|i| i as f64).collect();
        let volume: Vec<i64> = (0..millis.len()).map(|i| 100 + i as i64).collect();

        let dates = Series::new("Date/Time".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        DataFrame::new(vec![
            dates.into_column(),
            Series::new("Close".into(), close).into_column(),
            Series::new("Volume".into(), volume).into_column(),
        ])
        .unwrap()
    }

    fn small_config(train_fraction: f64) -> WindowConfig {
        WindowConfig {
            history_rows: 4,
            train_fraction,
            ..WindowConfig::default()
        }
    }

    #[test]
    fn test_window_layout() {
        let df = intraday_frame();
        // Anchors are rows 6, 13 and 20; only the third has two earlier anchors
        let (train, test) = build_windows(&df, &small_config(1.0)).unwrap();

        assert!(test.is_empty());
        assert_eq!(train.len(), 1);
        assert_eq!(train.time_steps(), 6);
        assert_eq!(train.num_features(), 2);

        let closes: Vec<f32> = (0..6).map(|step| train.features[[0, step, 0]]).collect();
        assert_eq!(closes, vec![16.0, 17.0, 18.0, 19.0, 13.0, 6.0]);
        assert_eq!(train.targets[0], 20.0);
        assert_eq!(train.features[[0, 0, 1]], 116.0);
    }

    #[test]
    fn test_anchor_split_by_fraction() {
        let df = intraday_frame();
        let config = WindowConfig {
            lagged_anchors: 0,
            ..small_config(0.5)
        };
        let (train, test) = build_windows(&df, &config).unwrap();

        // One train anchor (row 6), two test anchors (rows 13, 20)
        assert_eq!(train.targets.to_vec(), vec![6.0]);
        assert_eq!(test.targets.to_vec(), vec![13.0, 20.0]);
    }

    #[test]
    fn test_short_history_is_skipped() {
        let df = intraday_frame();
        let config = WindowConfig {
            history_rows: 10,
            lagged_anchors: 0,
            ..small_config(1.0)
        };
        let (train, _) = build_windows(&df, &config).unwrap();
        assert_eq!(train.targets.to_vec(), vec![13.0, 20.0]);
    }

    #[test]
    fn test_missing_target_column() {
        let df = intraday_frame();
        let config = WindowConfig {
            target_column: "Open".into(),
            ..small_config(1.0)
        };
        assert!(matches!(build_windows(&df, &config), Err(ToolkitError::Polars(_))));
    }

    #[test]
    fn test_to_tensors_shapes() {
        let df = intraday_frame();
        let config = WindowConfig {
            lagged_anchors: 0,
            ..small_config(1.0)
        };
        let (train, _) = build_windows(&df, &config).unwrap();

        let device = NdArrayDevice::default();
        let (features, targets) = train.to_tensors::<NdArray>(&device).unwrap();
        assert_eq!(features.dims(), [3, 4, 2]);
        assert_eq!(targets.dims(), [3]);
    }

    #[test]
    fn test_to_tensors_rejects_empty_set() {
        let df = intraday_frame();
        let (_, test) = build_windows(&df, &small_config(1.0)).unwrap();
        let device = NdArrayDevice::default();
        assert!(test.to_tensors::<NdArray>(&device).is_err());
    }
}
