//! Prompt-question suggestions from a generative text provider.
//!
//! Lists the provider's models, picks one by [`ModelPolicy`], and forwards
//! the prompt once. No retries.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ModelPolicy, SuggestionConfig};

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("Missing suggestion provider API key")]
    MissingCredentials,

    #[error(
        "No supported models found for this API key. Check model availability, API key permissions, and billing."
    )]
    NoModelAvailable { available: Vec<String> },

    #[error("Suggestion provider error: {0}")]
    Provider(String),
}

/// A generative text backend.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Model ids without any `models/` prefix.
    async fn list_models(&self) -> anyhow::Result<Vec<String>>;

    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub model: String,
    pub text: String,
}

/// Picks a model: first preferred id present, then any id containing the
/// marker, then any id in the family.
#[must_use]
pub fn select_model(available: &[String], policy: &ModelPolicy) -> Option<String> {
    policy
        .preferred
        .iter()
        .find(|wanted| available.iter().any(|m| m == *wanted))
        .cloned()
        .or_else(|| {
            (!policy.marker.is_empty())
                .then(|| available.iter().find(|m| m.contains(&policy.marker)))
                .flatten()
                .cloned()
        })
        .or_else(|| {
            (!policy.family_prefix.is_empty())
                .then(|| {
                    available
                        .iter()
                        .find(|m| m.starts_with(&policy.family_prefix))
                })
                .flatten()
                .cloned()
        })
}

pub struct SuggestionService {
    generator: Arc<dyn TextGenerator>,
    policy: ModelPolicy,
    default_prompt: String,
}

impl SuggestionService {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, config: &SuggestionConfig) -> Self {
        Self {
            generator,
            policy: config.model_policy.clone(),
            default_prompt: config.default_prompt.clone(),
        }
    }

    /// Generates suggestions for `prompt`, or the configured default prompt.
    pub async fn suggest(&self, prompt: Option<&str>) -> Result<Suggestion, SuggestionError> {
        if !self.generator.is_configured() {
            return Err(SuggestionError::MissingCredentials);
        }

        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_prompt);

        // A failed listing is not fatal on its own; it just leaves nothing to pick.
        let available = match self.generator.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!("Failed to list suggestion models: {e:#}");
                Vec::new()
            }
        };

        let model = select_model(&available, &self.policy)
            .ok_or(SuggestionError::NoModelAvailable { available })?;

        info!(model = %model, "Generating message suggestions");

        let text = self
            .generator
            .generate(&model, prompt)
            .await
            .map_err(|e| SuggestionError::Provider(format!("{e:#}")))?;

        Ok(Suggestion { model, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn preferred_order_wins_over_list_order() {
        let available = models(&["gemini-1.5-flash", "gemini-2.0-flash", "gemini-2.5-flash"]);
        assert_eq!(
            select_model(&available, &ModelPolicy::default()).as_deref(),
            Some("gemini-2.5-flash")
        );
    }

    #[test]
    fn falls_back_to_marker_then_family() {
        let policy = ModelPolicy::default();

        let available = models(&["gemini-exp-pro", "gemini-3.0-flash-lite"]);
        assert_eq!(
            select_model(&available, &policy).as_deref(),
            Some("gemini-3.0-flash-lite")
        );

        let available = models(&["embedding-001", "gemini-exp-pro"]);
        assert_eq!(select_model(&available, &policy).as_deref(), Some("gemini-exp-pro"));
    }

    #[test]
    fn nothing_matches() {
        let available = models(&["embedding-001", "aqa"]);
        assert_eq!(select_model(&available, &ModelPolicy::default()), None);
        assert_eq!(select_model(&[], &ModelPolicy::default()), None);
    }

    #[test]
    fn empty_marker_and_prefix_disable_fallbacks() {
        let policy = ModelPolicy {
            preferred: vec![],
            marker: String::new(),
            family_prefix: String::new(),
        };
        assert_eq!(select_model(&models(&["anything"]), &policy), None);
    }

    struct FakeGenerator {
        configured: bool,
        models: anyhow::Result<Vec<String>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl TextGenerator for FakeGenerator {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn list_models(&self) -> anyhow::Result<Vec<String>> {
            match &self.models {
                Ok(m) => Ok(m.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            Ok("a?||b?||c?".to_string())
        }
    }

    fn service(generator: FakeGenerator) -> (SuggestionService, Arc<FakeGenerator>) {
        let generator = Arc::new(generator);
        let svc = SuggestionService::new(generator.clone(), &SuggestionConfig::default());
        (svc, generator)
    }

    #[tokio::test]
    async fn unconfigured_generator_is_missing_credentials() {
        let (svc, _) = service(FakeGenerator {
            configured: false,
            models: Ok(models(&["gemini-2.5-flash"])),
            prompts: Mutex::new(vec![]),
        });
        assert!(matches!(
            svc.suggest(None).await,
            Err(SuggestionError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn listing_failure_reports_no_model() {
        let (svc, _) = service(FakeGenerator {
            configured: true,
            models: Err(anyhow::anyhow!("boom")),
            prompts: Mutex::new(vec![]),
        });
        match svc.suggest(None).await {
            Err(SuggestionError::NoModelAvailable { available }) => assert!(available.is_empty()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_prompt_uses_default() {
        let (svc, generator) = service(FakeGenerator {
            configured: true,
            models: Ok(models(&["gemini-2.0-flash"])),
            prompts: Mutex::new(vec![]),
        });

        let suggestion = svc.suggest(Some("   ")).await.unwrap();
        assert_eq!(suggestion.model, "gemini-2.0-flash");
        assert_eq!(suggestion.text, "a?||b?||c?");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1.contains("'||'"));
    }
}
