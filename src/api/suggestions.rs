use axum::{Json, body::Bytes, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SuggestRequest, SuggestionsPayload, validation};
use crate::services::SuggestionError;

impl From<SuggestionError> for ApiError {
    fn from(err: SuggestionError) -> Self {
        match &err {
            SuggestionError::NoModelAvailable { available } if !available.is_empty() => {
                ApiError::suggestion_error(format!(
                    "{err} Available models: {}",
                    available.join(", ")
                ))
            }
            _ => ApiError::suggestion_error(err.to_string()),
        }
    }
}

/// POST /suggest-messages
/// The body is optional; an empty or unparseable body uses the configured prompt.
pub async fn suggest_messages(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ApiResponse<SuggestionsPayload>>, ApiError> {
    let request = parse_request(&body);

    let prompt = validation::validate_prompt(request.prompt.as_deref())?;

    let suggestion = state.suggestion_service().suggest(prompt).await?;

    Ok(Json(ApiResponse::success(SuggestionsPayload {
        suggestions: suggestion.text,
        model: suggestion.model,
    })))
}

fn parse_request(body: &[u8]) -> SuggestRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return SuggestRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!("Ignoring unparseable suggestion request: {e}");
        SuggestRequest::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_bodies_fall_back_to_default_prompt() {
        assert!(parse_request(b"").prompt.is_none());
        assert!(parse_request(b"{not json").prompt.is_none());
        assert!(parse_request(br#"{"prompt": 42}"#).prompt.is_none());
        assert_eq!(
            parse_request(br#"{"prompt": "Ask about food"}"#).prompt.as_deref(),
            Some("Ask about food")
        );
    }

    #[test]
    fn no_model_error_lists_available_models() {
        let err = ApiError::from(SuggestionError::NoModelAvailable {
            available: vec!["embedding-001".to_string(), "aqa".to_string()],
        });
        let ApiError::ExternalApiError { message, .. } = err else {
            panic!("expected upstream error");
        };
        assert!(message.starts_with("No supported models found"));
        assert!(message.ends_with("Available models: embedding-001, aqa"));
    }

    #[test]
    fn missing_key_is_server_error() {
        assert_eq!(
            ApiError::from(SuggestionError::MissingCredentials).status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
