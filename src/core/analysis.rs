//! Single-shot image classification against the hosted `analyze-image`
//! function, and the result model shown in the result view.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{
    AnalysisPayload, AnalyzeRequest, AnalyzeResponse, Attribute, Confidence, DetailSection,
    ScanContext,
};
use crate::core::service::{
    error_summary, status_error, ServiceError, ServiceSettings, ANALYZE_FUNCTION,
};

const GENERIC_FAILURE: &str = "Failed to analyze image";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub timestamp: i64,
    pub image_data: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub details: Vec<DetailSection>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AnalysisResult {
    pub fn from_payload(payload: AnalysisPayload, image_data: String, now_ms: i64) -> Self {
        let AnalysisPayload {
            context,
            confidence,
        } = payload;
        Self {
            id: now_ms.to_string(),
            timestamp: now_ms,
            image_data,
            name: context.name,
            category: context.category,
            confidence,
            attributes: context.attributes,
            details: context.details,
            tips: context.tips,
            is_favorite: false,
            notes: None,
        }
    }

    /// Textual subset of the result: what chat requests carry as context and
    /// what the translate function rewrites.
    pub fn to_context(&self) -> ScanContext {
        ScanContext {
            name: self.name.clone(),
            category: self.category.clone(),
            attributes: self.attributes.clone(),
            details: self.details.clone(),
            tips: self.tips.clone(),
        }
    }

    /// Replace the textual fields with a translated copy. Identity, image,
    /// confidence and bookkeeping fields are untouched.
    pub fn apply_translation(&mut self, translated: ScanContext) {
        self.name = translated.name;
        self.category = translated.category;
        self.attributes = translated.attributes;
        self.details = translated.details;
        self.tips = translated.tips;
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
        let result = serde_json::from_str(&contents)
            .map_err(|err| format!("{} is not a saved scan result: {err}", path.display()))?;
        Ok(result)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Follow-up prompts offered before the first question is asked.
pub fn suggested_questions(name: &str) -> [String; 4] {
    [
        format!("Tell me more about {name}"),
        "Is this healthy?".to_string(),
        "What are the benefits?".to_string(),
        "Any safety concerns?".to_string(),
    ]
}

#[derive(Debug)]
pub enum ImageError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Empty(PathBuf),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Read { path, source } => {
                write!(f, "Failed to read image {}: {source}", path.display())
            }
            ImageError::Empty(path) => write!(f, "Image {} is empty", path.display()),
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageError::Read { source, .. } => Some(source),
            ImageError::Empty(_) => None,
        }
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Read an image file into the `data:` URL the analysis function expects.
pub fn encode_image(path: &Path) -> Result<String, ImageError> {
    let bytes = fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(ImageError::Empty(path.to_path_buf()));
    }
    Ok(data_url(mime_for_path(path), &bytes))
}

pub struct AnalysisClient {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl AnalysisClient {
    pub fn new(client: reqwest::Client, settings: ServiceSettings) -> Self {
        Self { client, settings }
    }

    pub async fn analyze(&self, image_data: String) -> Result<AnalysisResult, ServiceError> {
        let url = self.settings.function_url(ANALYZE_FUNCTION);
        debug!(%url, bytes = image_data.len(), "submitting image for analysis");

        let response = self
            .settings
            .authorize(self.client.post(url))
            .json(&AnalyzeRequest {
                image_data: &image_data,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, GENERIC_FAILURE).await);
        }

        let body = response.text().await?;
        let payload = parse_analyze_body(&body)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        let result = AnalysisResult::from_payload(payload, image_data, now_ms);
        info!(name = %result.name, confidence = result.confidence.label(), "analysis complete");
        Ok(result)
    }
}

fn parse_analyze_body(body: &str) -> Result<AnalysisPayload, ServiceError> {
    let response: AnalyzeResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        let message = error_summary(&error).unwrap_or_else(|| GENERIC_FAILURE.to_string());
        return Err(ServiceError::Api(message));
    }
    response
        .result
        .ok_or_else(|| ServiceError::Api(GENERIC_FAILURE.to_string()))
}
