use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting (per client IP)
    pub rate_protected_per_min: u32,
    pub rate_ai_per_min: u32,

    pub api_prefix: String,

    pub leave: LeavePolicyConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone)]
pub struct LeavePolicyConfig {
    /// Leave-type code subject to the yearly quota
    pub annual_leave_type_code: String,
    /// Used when the leave type itself carries no positive quota
    pub annual_quota_days: i64,
    pub leave_type_cache_ttl_secs: u64,
}

impl LeavePolicyConfig {
    pub const DEFAULT_ANNUAL_CODE: &'static str = "ANNUAL";
    pub const DEFAULT_ANNUAL_QUOTA_DAYS: i64 = 14;

    /// Non-positive quotas fall back to the default.
    pub fn effective_quota(&self) -> i64 {
        if self.annual_quota_days <= 0 {
            Self::DEFAULT_ANNUAL_QUOTA_DAYS
        } else {
            self.annual_quota_days
        }
    }
}

impl Default for LeavePolicyConfig {
    fn default() -> Self {
        Self {
            annual_leave_type_code: Self::DEFAULT_ANNUAL_CODE.to_string(),
            annual_quota_days: Self::DEFAULT_ANNUAL_QUOTA_DAYS,
            leave_type_cache_ttl_secs: 300,
        }
    }
}

#[derive(Clone)]
pub struct AiConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Outbound provider calls per rolling minute; 0 disables the limiter
    pub rate_limit_per_minute: i64,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 15,
            max_tokens: 800,
            temperature: 0.2,
            rate_limit_per_minute: 0,
        }
    }
}

impl AiConfig {
    /// The provider is only called when the feature is on and a credential exists.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} is invalid ({raw}): {e}")),
        _ => Ok(default),
    }
}

fn string_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let ai_defaults = AiConfig::default();
        let leave_defaults = LeavePolicyConfig::default();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,
            rate_ai_per_min: parsed_or("RATE_AI_PER_MIN", 30)?,

            api_prefix: string_or("API_PREFIX", "/api"),

            leave: LeavePolicyConfig {
                annual_leave_type_code: string_or(
                    "LEAVE_ANNUAL_TYPE_CODE",
                    &leave_defaults.annual_leave_type_code,
                ),
                annual_quota_days: parsed_or(
                    "LEAVE_ANNUAL_QUOTA_DAYS",
                    leave_defaults.annual_quota_days,
                )?,
                leave_type_cache_ttl_secs: parsed_or(
                    "LEAVE_TYPE_CACHE_TTL_SECS",
                    leave_defaults.leave_type_cache_ttl_secs,
                )?,
            },

            ai: AiConfig {
                enabled: parsed_or("AI_ENABLED", ai_defaults.enabled)?,
                api_key: env::var("AI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                base_url: string_or("AI_BASE_URL", &ai_defaults.base_url),
                model: string_or("AI_MODEL", &ai_defaults.model),
                timeout_secs: parsed_or("AI_TIMEOUT_SECS", ai_defaults.timeout_secs)?,
                max_tokens: parsed_or("AI_MAX_TOKENS", ai_defaults.max_tokens)?,
                temperature: parsed_or("AI_TEMPERATURE", ai_defaults.temperature)?,
                rate_limit_per_minute: parsed_or(
                    "AI_RATE_LIMIT_PER_MIN",
                    ai_defaults.rate_limit_per_minute,
                )?,
            },
        })
    }
}
