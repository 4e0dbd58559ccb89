// External imports
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;

// Internal imports
use crate::bilstm::step_3_bilstm_model_arch::BiLstmConfig;
use crate::constants::LONG_ID_COLUMN;
use crate::error::Result;
use crate::toolkit::split_params::SplitConfig;

/// Settings for a split run, loaded from a JSON file.
///
/// Every field is optional; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub id_columns: Vec<String>,
    pub context_length: Option<usize>,
    pub split: SplitConfig,
    pub model: BiLstmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            id_columns: vec![LONG_ID_COLUMN.to_string()],
            context_length: None,
            split: SplitConfig::default(),
            model: BiLstmConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn id_columns(&self) -> Vec<&str> {
        self.id_columns.iter().map(String::as_str).collect()
    }
}
