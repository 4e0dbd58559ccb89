// External imports
use burn::data::dataset::Dataset;
use ndarray::{Array2, Axis};

// Internal imports
use super::step_1_tensor_preparation::WindowedSamples;

/// One window and the value that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceItem {
    /// `[steps, features]`
    pub window: Array2<f32>,
    pub target: f32,
}

/// Windowed samples exposed as a burn dataset
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    samples: WindowedSamples,
}

impl SequenceDataset {
    pub fn new(samples: WindowedSamples) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &WindowedSamples {
        &self.samples
    }
}

impl From<WindowedSamples> for SequenceDataset {
    fn from(samples: WindowedSamples) -> Self {
        Self::new(samples)
    }
}

impl Dataset<SequenceItem> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceItem> {
        if index >= self.samples.len() {
            return None;
        }

        Some(SequenceItem {
            window: self.samples.features.index_axis(Axis(0), index).to_owned(),
            target: self.samples.targets[index],
        })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
