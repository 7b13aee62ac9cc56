//! Serde types for the provider's HTTP request and response bodies.

use serde::{Deserialize, Serialize};

use crate::{Chunk, FinishReason, Part, RequestPayload, Role};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    pub contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<ApiSystemInstruction>,
    pub generation_config: ApiGenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiSystemInstruction {
    pub parts: Vec<ApiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiContent {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<ApiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<ApiFileData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub candidates: Vec<ApiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<ApiPromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCandidate {
    #[serde(default)]
    pub content: Option<ApiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// One line of the streaming body. The provider interleaves two shapes:
/// compact `{"text": ...}` delta records and full response objects; both
/// decode into the same chunk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStreamRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub candidates: Vec<ApiCandidate>,
}

pub fn build_api_request(payload: RequestPayload) -> ApiRequest {
    let contents = payload
        .contents
        .into_iter()
        .map(|content| ApiContent {
            role: wire_role(content.role).to_string(),
            parts: content.parts.into_iter().map(wire_part).collect(),
        })
        .collect();

    ApiRequest {
        contents,
        system_instruction: payload.system_instruction.map(|text| ApiSystemInstruction {
            parts: vec![ApiPart {
                text: Some(text),
                file_data: None,
            }],
        }),
        generation_config: ApiGenerationConfig {
            temperature: payload.options.temperature,
            top_k: payload.options.top_k,
            top_p: payload.options.top_p,
            max_output_tokens: payload.options.max_output_tokens,
        },
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn wire_part(part: Part) -> ApiPart {
    match part {
        Part::Text(text) => ApiPart {
            text: Some(text),
            file_data: None,
        },
        Part::File { uri, mime_type } => ApiPart {
            text: None,
            file_data: Some(ApiFileData {
                mime_type,
                file_uri: uri,
            }),
        },
    }
}

pub fn candidate_text(candidate: &ApiCandidate) -> String {
    candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") | Some("SPII") => {
            FinishReason::Safety
        }
        _ => FinishReason::Other,
    }
}

pub fn chunk_from_record(record: &ApiStreamRecord) -> Chunk {
    let text = match &record.text {
        Some(text) => text.clone(),
        None => record
            .candidates
            .first()
            .map(candidate_text)
            .unwrap_or_default(),
    };

    let raw_finish = record
        .finish_reason
        .as_deref()
        .or_else(|| {
            record
                .candidates
                .first()
                .and_then(|candidate| candidate.finish_reason.as_deref())
        });

    Chunk {
        text,
        finish_reason: raw_finish.map(|reason| parse_finish_reason(Some(reason))),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error.message)
}
