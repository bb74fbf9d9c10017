use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::ChatMessage;

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub context: &'a ScanContext,
}

/// One decoded `data:` payload of the chat event stream.
///
/// Every field is optional: the hosted chat function forwards whatever the
/// upstream model emits, which is either the OpenAI-compatible
/// `choices[].delta.content` shape or Gemini's `candidates[].content.parts[]`.
#[derive(Deserialize, Default, Debug)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChatChunkChoice>,
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize, Default, Debug)]
pub struct ChatChunkChoice {
    #[serde(default)]
    pub delta: ChatChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct ChatChunkDelta {
    pub content: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

#[derive(Deserialize, Default, Debug)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Deserialize, Default, Debug)]
pub struct GeminiPart {
    pub text: Option<String>,
}

impl ChatChunk {
    /// The content delta carried by this chunk, if any. Empty strings count as
    /// no delta.
    pub fn content_delta(&self) -> Option<String> {
        if let Some(choice) = self.choices.first() {
            return choice
                .delta
                .content
                .as_deref()
                .filter(|content| !content.is_empty())
                .map(str::to_owned);
        }

        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Body returned by the hosted functions on failure: `{ "error": ... }`.
#[derive(Deserialize, Default, Debug)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[serde(alias = "High")]
    High,
    #[default]
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Low")]
    Low,
}

impl Confidence {
    pub fn label(self) -> &'static str {
        match self {
            Confidence::High => "High Confidence",
            Confidence::Medium => "Medium Confidence",
            Confidence::Low => "Low Confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailSection {
    pub title: String,
    pub content: String,
}

/// The textual part of an analysis: sent as chat context and used as the
/// payload for translation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanContext {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub details: Vec<DetailSection>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest<'a> {
    pub image_data: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct AnalysisPayload {
    #[serde(flatten)]
    pub context: ScanContext,
    #[serde(default)]
    pub confidence: Confidence,
}

#[derive(Deserialize, Debug)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub result: Option<AnalysisPayload>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest<'a, T> {
    pub content: &'a T,
    pub target_language: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct TranslateResponse<T> {
    // A missing `Option` field already reads as `None`; `#[serde(default)]`
    // here would demand `T: Default`.
    pub translated: Option<T>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_delta_is_extracted() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.content_delta().as_deref(), Some("Hi"));
    }

    #[test]
    fn missing_fields_mean_no_delta() {
        for raw in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"delta":{}}]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
            r#"{"choices":[{"finish_reason":"stop"}]}"#,
        ] {
            let chunk: ChatChunk = serde_json::from_str(raw).unwrap();
            assert_eq!(chunk.content_delta(), None, "payload {raw}");
        }
    }

    #[test]
    fn gemini_parts_are_concatenated() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#;
        let chunk: ChatChunk = serde_json::from_str(raw).unwrap();
        assert_eq!(chunk.content_delta().as_deref(), Some("Hello"));
    }

    #[test]
    fn analysis_payload_flattens_context() {
        let raw = r#"{
            "name": "Banana",
            "category": "Food / Fruit",
            "confidence": "high",
            "attributes": [{"label": "Color", "value": "Yellow"}],
            "details": [{"title": "Nutrition", "content": "Rich in **potassium**"}],
            "tips": ["Store at room temperature"]
        }"#;
        let payload: AnalysisPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.confidence, Confidence::High);
        assert_eq!(payload.context.name, "Banana");
        assert_eq!(payload.context.attributes[0].value, "Yellow");
        assert_eq!(payload.context.tips.len(), 1);
    }

    #[test]
    fn confidence_accepts_capitalised_values() {
        let c: Confidence = serde_json::from_str(r#""Low""#).unwrap();
        assert_eq!(c, Confidence::Low);
        assert_eq!(c.label(), "Low Confidence");
    }

    #[test]
    fn chat_request_serialises_messages_and_context() {
        let messages = vec![ChatMessage::user("Is this healthy?")];
        let context = ScanContext {
            name: "Apple".into(),
            ..ScanContext::default()
        };
        let body = serde_json::to_value(ChatRequest {
            messages: &messages,
            context: &context,
        })
        .unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Is this healthy?");
        assert_eq!(body["context"]["name"], "Apple");
    }
}
