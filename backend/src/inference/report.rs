use chrono::Utc;
use ndarray::Array4;
use shared::{ClassificationResponse, EnumCount, Fruit, IntoEnumIterator, LabelScore};
use uuid::Uuid;

use super::{Classifier, InferenceError};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub fruit: Fruit,
    pub probability: f32,
}

impl ReportRow {
    pub fn percentage(&self) -> String {
        format!("{:.2}%", f64::from(self.probability) * 100.0)
    }
}

/// Per-label confidences in label order, never re-sorted by score.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn from_predictions(predictions: &[f32]) -> Result<Self, InferenceError> {
        if predictions.len() != Fruit::COUNT {
            return Err(InferenceError::OutputLength {
                expected: Fruit::COUNT,
                actual: predictions.len(),
            });
        }

        let rows = Fruit::iter()
            .zip(predictions)
            .map(|(fruit, &probability)| ReportRow { fruit, probability })
            .collect();
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn predictions(&self) -> Vec<f32> {
        self.rows.iter().map(|row| row.probability).collect()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<table class=\"confidence\"><tr><th>Fruit</th><th>Confidence</th></tr>");
        for row in &self.rows {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                row.fruit,
                row.percentage()
            ));
        }
        out.push_str("</table>");
        out
    }

    pub fn to_response(&self, id: Uuid, rotation_degrees: u16) -> ClassificationResponse {
        ClassificationResponse {
            id,
            predictions: self.predictions(),
            scores: self
                .rows
                .iter()
                .map(|row| LabelScore {
                    label: row.fruit,
                    probability: row.probability,
                    percentage: row.percentage(),
                })
                .collect(),
            rotation_degrees,
            classified_at: Utc::now(),
        }
    }
}

pub fn classify(model: &dyn Classifier, input: &Array4<f32>) -> Result<Report, InferenceError> {
    let predictions = model.predict(input)?;
    Report::from_predictions(&predictions)
}
