use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};
use uuid::Uuid;

pub use strum::{EnumCount, IntoEnumIterator};

/// Output classes of the model, in the order of the prediction vector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumCount,
)]
pub enum Fruit {
    Apple,
    Banana,
    Carambola,
}

impl Fruit {
    pub fn labels() -> Vec<Fruit> {
        Fruit::iter().collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LabelScore {
    pub label: Fruit,
    pub probability: f32,
    pub percentage: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClassificationResponse {
    pub id: Uuid,
    pub predictions: Vec<f32>,
    pub scores: Vec<LabelScore>,
    pub rotation_degrees: u16,
    pub classified_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProvisionStatus {
    Pending,
    Downloading { bytes: u64, total: Option<u64> },
    Loading,
    Ready,
    Failed { reason: String },
}

impl ProvisionStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProvisionStatus::Ready)
    }

    pub fn describe(&self) -> String {
        match self {
            ProvisionStatus::Pending => "Model not loaded yet".to_string(),
            ProvisionStatus::Downloading { bytes, total: Some(total) } if *total > 0 => {
                format!(
                    "Downloading model... {:.1}% ({} of {} bytes)",
                    *bytes as f64 / *total as f64 * 100.0,
                    bytes,
                    total
                )
            }
            ProvisionStatus::Downloading { bytes, .. } => {
                format!("Downloading model... {} bytes", bytes)
            }
            ProvisionStatus::Loading => "Loading model...".to_string(),
            ProvisionStatus::Ready => "Model ready".to_string(),
            ProvisionStatus::Failed { reason } => format!("Model unavailable: {}", reason),
        }
    }
}
