use std::fmt;

use log::{debug, warn};
use uuid::Uuid;

use crate::imaging::{self, DecodeError, Rotation};
use crate::inference::{self, Classifier, InferenceError, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Normalizing,
    Inferring,
    Rendered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "decoding",
            Stage::Normalizing => "normalizing",
            Stage::Inferring => "inferring",
            Stage::Rendered => "rendered",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Decode(_) => Stage::Decoding,
            PipelineError::Inference(_) => Stage::Inferring,
        }
    }
}

/// Everything produced for one upload.
#[derive(Debug, Clone)]
pub struct Classification {
    pub id: Uuid,
    pub rotation: Rotation,
    pub report: Report,
    /// Thumbnail `data:` URI; `None` when it could not be rendered.
    pub preview: Option<String>,
}

/// Runs one upload through decode, normalize and inference. Blocking.
pub fn run(model: &dyn Classifier, image_data: &[u8]) -> Result<Classification, PipelineError> {
    let id = Uuid::new_v4();

    debug!("[{}] {}", id, Stage::Decoding);
    let decoded = imaging::fix_rotation(image_data)?;
    debug!("[{}] decoded {:?} upload", id, decoded.format);

    debug!("[{}] {}", id, Stage::Normalizing);
    let tensor = imaging::normalize(&decoded.image);

    debug!("[{}] {}", id, Stage::Inferring);
    let report = inference::classify(model, &tensor)?;

    let preview = imaging::preview_data_uri(&decoded.image)
        .inspect_err(|e| warn!("[{}] Skipping preview: {}", id, e))
        .ok();
    debug!("[{}] {}", id, Stage::Rendered);

    Ok(Classification {
        id,
        rotation: decoded.rotation,
        report,
        preview,
    })
}
