//! Every call to the text-generation provider goes through here.
//!
//! build prompt -> rate-limited call -> normalize -> one repair round -> fallback.
//! Transport failures and unusable output degrade to a deterministic payload;
//! a provider timeout is the only error handed back to the caller.

use super::normalizer::{self, Normalized};
use super::prompts::{self, Prompt};
use super::provider::{OpenAiChatProvider, ProviderErrorKind, TextProvider};
use super::rate_limiter::RateLimiter;
use super::types::{
    AiInsights, AiOutcome, AiSource, AiTimeout, DecisionExplanation, FallbackReason,
    JobDescriptionDraft, ReasonNormalization,
};
use super::fallback;
use crate::config::AiConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type AiResult<T> = Result<AiOutcome<T>, AiTimeout>;

/// Result of a single provider round.
enum Attempt<T> {
    Accepted(T),
    Rejected { raw: String },
    Failed(FallbackReason),
}

pub struct AiAugmentationGateway {
    enabled: bool,
    provider: Option<Arc<dyn TextProvider>>,
    limiter: Arc<RateLimiter>,
}

impl AiAugmentationGateway {
    pub fn new(
        enabled: bool,
        provider: Option<Arc<dyn TextProvider>>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            enabled,
            provider,
            limiter,
        }
    }

    pub fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        let provider = OpenAiChatProvider::from_config(config)?
            .map(|p| Arc::new(p) as Arc<dyn TextProvider>);

        info!(
            enabled = config.enabled,
            credential = provider.is_some(),
            model = %config.model,
            rate_limit_per_minute = config.rate_limit_per_minute,
            "AI gateway configured"
        );

        Ok(Self::new(
            config.enabled,
            provider,
            Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute)),
        ))
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(false, None, Arc::new(RateLimiter::per_minute(0)))
    }

    fn provider(&self) -> Result<&Arc<dyn TextProvider>, FallbackReason> {
        if !self.enabled {
            return Err(FallbackReason::Disabled);
        }
        self.provider.as_ref().ok_or(FallbackReason::MissingCredential)
    }

    pub async fn draft_job_description(
        &self,
        role: &str,
        department: &str,
    ) -> AiResult<JobDescriptionDraft> {
        self.run(
            "job_description",
            prompts::job_description(role, department),
            |raw| normalizer::job_description(raw, role, department),
            |_| fallback::job_description(role, department),
        )
        .await
    }

    pub async fn generate_insights(&self, aggregated_json: &str) -> AiResult<AiInsights> {
        self.run(
            "insights",
            prompts::insights(aggregated_json),
            normalizer::insights,
            |reason| fallback::insights(&reason),
        )
        .await
    }

    /// The suggested code is returned as the provider gave it; clamping belongs to the caller.
    pub async fn normalize_leave_reason(
        &self,
        text: &str,
        allowed_codes: &[String],
    ) -> AiResult<ReasonNormalization> {
        self.run(
            "leave_reason",
            prompts::leave_reason(text, allowed_codes),
            normalizer::leave_reason,
            |_| fallback::leave_reason(text, allowed_codes),
        )
        .await
    }

    pub async fn explain_decision(&self, facts_json: &str) -> AiResult<DecisionExplanation> {
        self.run(
            "explanation",
            prompts::explanation(facts_json),
            normalizer::explanation,
            |reason| fallback::explanation(&reason),
        )
        .await
    }

    async fn run<T: Serialize>(
        &self,
        use_case: &'static str,
        prompt: Prompt,
        normalize: impl Fn(&str) -> Normalized<T>,
        fallback: impl FnOnce(FallbackReason) -> T,
    ) -> AiResult<T> {
        let provider = match self.provider() {
            Ok(provider) => provider,
            Err(reason) => {
                debug!(use_case, ?reason, "AI gateway short-circuited to fallback");
                return Ok(AiOutcome {
                    value: fallback(reason.clone()),
                    source: AiSource::Fallback(reason),
                });
            }
        };

        let raw = match self.attempt(provider, &prompt, &normalize).await? {
            Attempt::Accepted(value) => {
                return Ok(AiOutcome {
                    value,
                    source: AiSource::Provider,
                });
            }
            Attempt::Failed(reason) => return Ok(degrade(use_case, reason, fallback)),
            Attempt::Rejected { raw } => raw,
        };

        debug!(use_case, "AI output rejected, sending repair prompt");
        let repair = prompts::repair(&prompt, &raw);

        match self.attempt(provider, &repair, &normalize).await? {
            Attempt::Accepted(value) => Ok(AiOutcome {
                value,
                source: AiSource::Repaired,
            }),
            Attempt::Failed(reason) => Ok(degrade(use_case, reason, fallback)),
            Attempt::Rejected { .. } => Ok(degrade(use_case, FallbackReason::InvalidOutput, fallback)),
        }
    }

    async fn attempt<T: Serialize>(
        &self,
        provider: &Arc<dyn TextProvider>,
        prompt: &Prompt,
        normalize: &impl Fn(&str) -> Normalized<T>,
    ) -> Result<Attempt<T>, AiTimeout> {
        self.limiter.acquire().await;

        match provider.complete(&prompt.system, &prompt.user).await {
            Ok(raw) => {
                let normalized = normalize(&raw);
                if normalized.valid {
                    debug!(payload = %normalized.canonical_json(), "AI output accepted");
                    Ok(Attempt::Accepted(normalized.value))
                } else {
                    Ok(Attempt::Rejected { raw })
                }
            }
            Err(e) if e.kind == ProviderErrorKind::Timeout => {
                warn!(detail = %e.detail, "AI provider call timed out");
                Err(AiTimeout)
            }
            Err(e) => Ok(Attempt::Failed(FallbackReason::Unavailable(e.detail))),
        }
    }
}

fn degrade<T>(
    use_case: &'static str,
    reason: FallbackReason,
    fallback: impl FnOnce(FallbackReason) -> T,
) -> AiOutcome<T> {
    warn!(use_case, ?reason, "AI output unusable, using deterministic fallback");
    AiOutcome {
        value: fallback(reason.clone()),
        source: AiSource::Fallback(reason),
    }
}
