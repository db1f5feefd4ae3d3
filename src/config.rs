//! Fixed model configuration.
//!
//! Everything here is an assumption of the model rather than a fitted parameter:
//! delay shapes, `R_t` shape constants and engine settings. The defaults
//! reproduce the published model; a JSON file can replace any section.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::delay::DelayShapeConfig;
use crate::engine::EngineConfig;
use crate::error::AppError;
use crate::rt::RtShapeConfig;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub delays: DelayShapeConfig,
    pub rt: RtShapeConfig,
    pub engine: EngineConfig,
}

pub fn load_model_config(path: &Path) -> Result<ModelConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model config '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid model config '{}': {e}", path.display())))
}
