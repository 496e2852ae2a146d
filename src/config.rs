use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Minimum length of the session signing secret in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

const DEFAULT_SUGGESTION_PROMPT: &str = "Create a list of three open-ended and engaging questions formatted as a single string. Each question should be separated by '||'. These questions are for an anonymous social messaging platform, like Qooh.me, and should be suitable for a diverse audience. Avoid personal or sensitive topics, focusing instead on universal themes that encourage friendly interaction. For example, your output should be structured like this: 'What's a hobby you've recently started?||If you could have dinner with any historical figure, who would it be?||What's a simple thing that makes you happy?'. Ensure the questions are intriguing, foster curiosity, and contribute to a positive and welcoming conversational environment.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub verification: VerificationConfig,

    pub email: EmailConfig,

    pub suggestions: SuggestionConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Emit logs as JSON lines instead of the human readable format.
    pub json_logs: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/echobox.db".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Key used to sign session cookies. At least 64 bytes.
    /// When unset a random key is generated and sessions do not survive a restart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_secret: Option<String>,

    pub session_inactivity_minutes: i64,

    /// Timeout for outbound calls to the email and suggestion providers.
    pub http_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            secure_cookies: true,
            session_secret: None,
            session_inactivity_minutes: 60 * 24 * 30,
            http_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Lifetime of an issued verification code.
    pub code_ttl_minutes: i64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_minutes: 60,
        }
    }
}

impl VerificationConfig {
    #[must_use]
    pub fn code_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.code_ttl_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub from_address: String,

    pub base_url: String,

    pub subject: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            from_address: "onboarding@resend.dev".to_string(),
            base_url: "https://api.resend.com".to_string(),
            subject: "EchoBox - Verification Code".to_string(),
        }
    }
}

impl EmailConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,

    pub default_prompt: String,

    pub model_policy: ModelPolicy,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            default_prompt: DEFAULT_SUGGESTION_PROMPT.to_string(),
            model_policy: ModelPolicy::default(),
        }
    }
}

/// Ordered preferences used to pick a generation model from the provider's list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelPolicy {
    /// Exact model ids, most preferred first.
    pub preferred: Vec<String>,

    /// Substring accepted when no preferred model is available.
    pub marker: String,

    /// Prefix accepted as a last resort.
    pub family_prefix: String,
}

impl Default for ModelPolicy {
    fn default() -> Self {
        Self {
            preferred: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-2.0".to_string(),
                "gemini-1.5-flash".to_string(),
                "gemini-1.5".to_string(),
            ],
            marker: "flash".to_string(),
            family_prefix: "gemini-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "echobox".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            verification: VerificationConfig::default(),
            email: EmailConfig::default(),
            suggestions: SuggestionConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Overlays secrets and deployment settings from the environment.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(secret) = non_empty("SESSION_SECRET") {
            self.server.session_secret = Some(secret);
        }
        if let Some(key) = non_empty("RESEND_API_KEY") {
            self.email.api_key = Some(key);
        }
        if let Some(from) = non_empty("EMAIL_FROM") {
            self.email.from_address = from;
        }
        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            self.suggestions.api_key = Some(key);
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("echobox").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".echobox").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Writes a default config file unless one already exists.
    pub fn create_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(path)?;
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.verification.code_ttl_minutes <= 0 {
            anyhow::bail!("Verification code TTL must be greater than 0 minutes");
        }

        if self.server.session_inactivity_minutes <= 0 {
            anyhow::bail!("Session inactivity timeout must be greater than 0 minutes");
        }

        if let Some(secret) = &self.server.session_secret
            && secret.len() < MIN_SESSION_SECRET_LEN
        {
            anyhow::bail!(
                "Session secret must be at least {MIN_SESSION_SECRET_LEN} bytes (got {})",
                secret.len()
            );
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.verification.code_ttl_minutes, 60);
        assert_eq!(config.server.port, 3000);
        assert!(config.server.secure_cookies);
        assert_eq!(config.suggestions.model_policy.marker, "flash");
        assert!(!config.email.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[verification]"));
        assert!(toml_str.contains("[suggestions.model_policy]"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [verification]
            code_ttl_minutes = 15

            [suggestions.model_policy]
            preferred = ["gemini-3.0-pro"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.verification.code_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.suggestions.model_policy.preferred, vec!["gemini-3.0-pro"]);
        assert_eq!(config.suggestions.model_policy.family_prefix, "gemini-");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn env_overrides_replace_secrets() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite:/tmp/other.db"),
            ("RESEND_API_KEY", "re_test"),
            ("EMAIL_FROM", "noreply@example.com"),
            ("GOOGLE_API_KEY", "g-key"),
            ("PORT", "8080"),
            ("SESSION_SECRET", "   "),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.general.database_path, "sqlite:/tmp/other.db");
        assert_eq!(config.email.api_key.as_deref(), Some("re_test"));
        assert_eq!(config.email.from_address, "noreply@example.com");
        assert_eq!(config.suggestions.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.server.port, 8080);
        assert!(config.server.session_secret.is_none());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = Config::default();
        config.server.session_secret = Some("too-short".to_string());
        assert!(config.validate().is_err());

        config.server.session_secret = Some("x".repeat(MIN_SESSION_SECRET_LEN));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.verification.code_ttl_minutes = 0;
        assert!(config.validate().is_err());
    }
}
