//! Response schema of `POST /predict`.
//!
//! ```json
//! { "prediction": "ALL", "confidence": "93.12%",
//!   "description": "...", "highlighted_image": "data:image/jpeg;base64,..." }
//! ```
//!
//! `prediction` and `confidence` are required. Confidence may be a number or
//! a formatted string and is normalised on the way in.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sagal_core::models::{Confidence, Label, PredictionResult};
use serde::Deserialize;

use crate::error::InferenceError;

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: String,
    confidence: Confidence,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    highlighted_image: Option<String>,
}

pub fn parse_prediction(body: &[u8]) -> Result<PredictionResult, InferenceError> {
    let raw: PredictResponse = serde_json::from_slice(body)
        .map_err(|e| InferenceError::Protocol(format!("response did not match schema: {e}")))?;

    let label = raw.prediction.trim();
    if label.is_empty() {
        return Err(InferenceError::Protocol("empty prediction label".to_string()));
    }

    let highlighted_image = raw
        .highlighted_image
        .as_deref()
        .map(decode_data_url)
        .transpose()?;

    Ok(PredictionResult {
        label: Label::new(label),
        confidence: raw.confidence,
        description: raw.description.filter(|d| !d.trim().is_empty()),
        highlighted_image,
    })
}

/// Decode a `data:<mime>;base64,<payload>` URL. A bare base64 payload is
/// accepted too.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, InferenceError> {
    let payload = match url.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| InferenceError::Protocol("data URL has no payload".to_string()))?;
            if !meta.ends_with(";base64") {
                return Err(InferenceError::Protocol(format!(
                    "data URL is not base64 encoded: {meta}"
                )));
            }
            data
        }
        None => url,
    };

    STANDARD
        .decode(payload.trim())
        .map_err(|e| InferenceError::Protocol(format!("invalid base64 image: {e}")))
}
