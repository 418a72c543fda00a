use std::path::Path;
use std::sync::{Arc, Mutex};

use log::info;
use ndarray::Array4;
use tch::{CModule, Device, Kind, Tensor};

use super::{Classifier, INPUT_SHAPE, InferenceError, ModelHandle, check_input_shape};
use crate::provision::{ModelLoader, ProvisioningError};

/// TorchScript classifier executed through libtorch.
pub struct TorchClassifier {
    model: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn load(model_path: &Path) -> Result<Self, tch::TchError> {
        let device = Device::cuda_if_available();
        let mut model = CModule::load_on_device(model_path, device)?;
        model.set_eval();
        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        check_input_shape(input)?;

        let shape: Vec<i64> = INPUT_SHAPE.iter().map(|&d| d as i64).collect();
        let tensor = match input.as_slice() {
            Some(data) => Tensor::from_slice(data),
            None => Tensor::from_slice(&input.iter().copied().collect::<Vec<f32>>()),
        }
        .view(shape.as_slice())
        .to_device(self.device);

        let model = self.model.lock().map_err(|_| InferenceError::Poisoned)?;
        let output = tch::no_grad(|| model.forward_ts(&[tensor]))?;
        let output_flat = output.to_kind(Kind::Float).to_device(Device::Cpu).view([-1]);
        let output_vec = Vec::<f32>::try_from(&output_flat)?;
        Ok(output_vec)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TorchLoader;

impl ModelLoader for TorchLoader {
    fn load(&self, path: &Path) -> Result<ModelHandle, ProvisioningError> {
        let classifier =
            TorchClassifier::load(path).map_err(|e| ProvisioningError::Load(e.to_string()))?;
        info!("Model placed on {:?}", classifier.device);
        Ok(Arc::new(classifier))
    }
}
