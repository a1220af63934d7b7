//! JSON model metadata adapter.

use std::fs;
use std::path::Path;

use crate::domain::error::SignalbenchError;
use crate::domain::model_metadata::ModelMetadata;

/// Reads and validates the metadata file written next to a trained model.
pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<ModelMetadata, SignalbenchError> {
    let path = path.as_ref();
    let file = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| SignalbenchError::Metadata {
        file: file.clone(),
        reason: e.to_string(),
    })?;
    let metadata: ModelMetadata =
        serde_json::from_str(&content).map_err(|e| SignalbenchError::Metadata {
            file: file.clone(),
            reason: e.to_string(),
        })?;
    metadata.validate().map_err(|e| match e {
        SignalbenchError::Configuration { reason } => SignalbenchError::Configuration {
            reason: format!("{file}: {reason}"),
        },
        other => other,
    })?;
    Ok(metadata)
}

/// Writes metadata as pretty-printed JSON.
pub fn save_metadata<P: AsRef<Path>>(
    metadata: &ModelMetadata,
    path: P,
) -> Result<(), SignalbenchError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(metadata).map_err(|e| SignalbenchError::Metadata {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    fs::write(path, json)?;
    Ok(())
}
