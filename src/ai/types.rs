use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptionDraft {
    #[schema(example = "Engineering Backend Developer")]
    pub title_suggested: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub nice_to_have: Vec<String>,
    /// Two paragraphs separated by a blank line
    pub job_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub summary: String,
    pub insights: Vec<String>,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReasonNormalization {
    #[schema(example = "Health")]
    pub category: String,
    #[schema(example = "Doctor appointment and recovery.")]
    pub summary: String,
    /// Clamped to the allowed leave-type codes by the policy engine
    #[schema(example = "SICK")]
    pub suggested_leave_type_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionExplanation {
    pub explanation: String,
}

/// Where a gateway value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiSource {
    Provider,
    /// Accepted on the repair round
    Repaired,
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Disabled,
    MissingCredential,
    /// Both attempts produced unusable output
    InvalidOutput,
    /// Network or HTTP failure, with the transport's detail
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiOutcome<T> {
    pub value: T,
    pub source: AiSource,
}

impl<T> AiOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AiSource::Fallback(_))
    }
}

/// The only gateway failure surfaced to callers; everything else degrades to a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "AI provider call timed out")]
pub struct AiTimeout;

impl std::error::Error for AiTimeout {}

impl From<AiTimeout> for crate::error::LeaveError {
    fn from(_: AiTimeout) -> Self {
        crate::error::LeaveError::AiTimeout
    }
}
