use serde::{Deserialize, Serialize};

use crate::data_models::Finding;

pub const PLACEHOLDER_BUSINESS: &str = "Custom Business";
pub const PLACEHOLDER_LOCATION: &str = "Custom Location";

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    /// "1".."4" select presets, "5" is a custom setup.
    pub choice: String,
    #[serde(default)]
    pub business: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Newline separated keywords for a custom setup.
    #[serde(default)]
    pub keywords: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub found: usize,
    pub total: usize,
    pub success_rate: f64,
    pub data: Vec<Finding>,
}

impl ResultsResponse {
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            found: 0,
            total: 0,
            success_rate: 0.0,
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    pub filename: Option<String>,
    pub success: bool,
    pub message: String,
}
