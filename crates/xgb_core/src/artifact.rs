//! Model artifact persistence
//!
//! A trained model is written to a single file named [`MODEL_FILE_NAME`]
//! inside the model directory, and loaded back from the same name. Layout:
//!
//! ```text
//! offset  size  field
//! 0       8     magic "XGBCVMDL"
//! 8       4     format version (u32 little endian)
//! 12      32    blake3 checksum of the payload
//! 44      ..    bincode-encoded Model
//! ```

use crate::errors::{ModelError, Result};
use crate::gbdt::Model;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name shared by the training writer and the inference loader
pub const MODEL_FILE_NAME: &str = "xgboost-model";

pub const ARTIFACT_MAGIC: [u8; 8] = *b"XGBCVMDL";
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 32;

/// Path of the model artifact inside `model_dir`
pub fn model_path(model_dir: &Path) -> PathBuf {
    model_dir.join(MODEL_FILE_NAME)
}

/// Encode a model into artifact bytes
pub fn encode_artifact(model: &Model) -> Result<Vec<u8>> {
    let payload = model.encode()?;
    let checksum = blake3::hash(&payload);

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&ARTIFACT_MAGIC);
    bytes.extend_from_slice(&ARTIFACT_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(checksum.as_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode and validate artifact bytes
pub fn decode_artifact(bytes: &[u8]) -> Result<Model> {
    if bytes.len() < HEADER_LEN {
        return Err(ModelError::Corrupt(format!(
            "artifact is {} bytes, shorter than the {} byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let (magic, rest) = bytes.split_at(8);
    if magic != ARTIFACT_MAGIC {
        return Err(ModelError::Incompatible(format!(
            "unrecognized magic {}",
            hex::encode(magic)
        )));
    }

    let (version, rest) = rest.split_at(4);
    let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
    if version != ARTIFACT_FORMAT_VERSION {
        return Err(ModelError::Incompatible(format!(
            "artifact format version {} (supported: {})",
            version, ARTIFACT_FORMAT_VERSION
        )));
    }

    let (checksum, payload) = rest.split_at(32);
    if blake3::hash(payload).as_bytes()[..] != checksum[..] {
        return Err(ModelError::Corrupt("payload checksum mismatch".to_string()));
    }

    let model: Model = bincode::deserialize(payload)
        .map_err(|e| ModelError::Corrupt(format!("payload decode failed: {}", e)))?;
    model
        .validate()
        .map_err(|e| ModelError::Corrupt(e.to_string()))?;

    Ok(model)
}

/// Write `model` to `<model_dir>/xgboost-model`, returning the path written
///
/// `model_dir` must already exist. A model that [`load_model`] would
/// reject is refused with [`ModelError::ValidationFailed`] and nothing is
/// written.
pub fn save_model(model_dir: &Path, model: &Model) -> Result<PathBuf> {
    model.validate()?;
    let path = model_path(model_dir);
    let bytes = encode_artifact(model)?;
    fs::write(&path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "model artifact written");
    Ok(path)
}

/// Load the model persisted in `model_dir`, unchanged
pub fn load_model(model_dir: &Path) -> Result<Model> {
    let path = model_path(model_dir);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ModelError::ArtifactMissing(path.clone()),
        _ => ModelError::Io(e),
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "model artifact read");
    decode_artifact(&bytes)
}
