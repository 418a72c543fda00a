pub mod model;
pub mod report;

use std::sync::Arc;

use ndarray::Array4;

pub use model::TorchLoader;
pub use report::{Report, classify};

/// Shape of the single-image batch the model expects: (batch, height, width, channels).
pub const INPUT_SHAPE: [usize; 4] = [1, 150, 150, 3];

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Input tensor shape {actual:?} does not match model input {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Model produced {actual} scores for {expected} labels")]
    OutputLength { expected: usize, actual: usize },
    #[error("Model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("Model lock poisoned")]
    Poisoned,
}

/// A loaded classifier that maps one normalized image batch to per-label
/// probabilities.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

pub type ModelHandle = Arc<dyn Classifier>;

pub fn check_input_shape(input: &Array4<f32>) -> Result<(), InferenceError> {
    if input.shape() != INPUT_SHAPE {
        return Err(InferenceError::ShapeMismatch {
            expected: INPUT_SHAPE.to_vec(),
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}
