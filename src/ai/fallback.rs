//! Deterministic payloads used whenever the provider is off, absent, or unusable.

use super::types::{AiInsights, DecisionExplanation, FallbackReason, JobDescriptionDraft, ReasonNormalization};

const GENERAL_DEPARTMENT: &str = "General";

fn department_name(department: &str) -> &str {
    match department.trim() {
        "" => GENERAL_DEPARTMENT,
        trimmed => trimmed,
    }
}

fn title_for_department(department: &str) -> String {
    match department {
        "Engineering" => "Software Engineer".to_string(),
        "Sales" => "Sales Specialist".to_string(),
        "Finance" => "Finance Specialist".to_string(),
        "Human Resources" => "Human Resources Specialist".to_string(),
        GENERAL_DEPARTMENT => "General Specialist".to_string(),
        other => format!("{other} Specialist"),
    }
}

fn title(role: &str, department: &str) -> String {
    let role = role.trim();
    if role.is_empty() {
        return format!("{department} Specialist");
    }
    if role.eq_ignore_ascii_case("admin") {
        return "Systems Administration Specialist".to_string();
    }
    if role.eq_ignore_ascii_case("hr") {
        return "Human Resources Specialist".to_string();
    }
    if role.eq_ignore_ascii_case("employee") {
        return title_for_department(department);
    }
    if !department.eq_ignore_ascii_case(GENERAL_DEPARTMENT)
        && !role.to_lowercase().contains(&department.to_lowercase())
    {
        return format!("{department} {role}");
    }
    role.to_string()
}

pub fn job_description(role: &str, department: &str) -> JobDescriptionDraft {
    let department = department_name(department);
    let title = title(role, department);

    let responsibilities = vec![
        format!("Analyse {department} needs and develop suitable solutions."),
        "Coordinate with stakeholders across the team and track progress.".to_string(),
        "Work in line with quality, security and compliance standards.".to_string(),
        "Keep documentation and reporting up to date.".to_string(),
    ];
    let requirements = vec![
        format!("Foundational knowledge and experience in {department}."),
        "Analytical thinking and problem-solving skills.".to_string(),
        "Clear communication and a collaborative attitude.".to_string(),
        "Planning, prioritisation and time-management skills.".to_string(),
    ];
    let nice_to_have = vec![
        format!("Certifications or training programmes focused on {department}."),
        "Experience with process improvement or automation projects.".to_string(),
    ];

    let first = format!(
        "As {title}, this position focuses on meeting business needs within the {department} discipline. \
         The role takes active ownership of requirements analysis, planning, delivery and process improvement. \
         It keeps regular contact with stakeholders to clarify scope, goals and expectations and supports delivery."
    );
    let second = format!(
        "Within the company the role is a key link in helping the {department} department reach its goals. \
         It contributes to outcomes through cross-team coordination, risk reduction and continuous improvement. \
         Disciplined work and reporting give decision makers reliable input."
    );

    JobDescriptionDraft {
        title_suggested: title,
        responsibilities,
        requirements,
        nice_to_have,
        job_description: format!("{first}\n\n{second}"),
    }
}

pub fn insights(reason: &FallbackReason) -> AiInsights {
    match reason {
        FallbackReason::Disabled => AiInsights {
            summary: "AI insights are disabled.".to_string(),
            insights: vec!["Enable the AI feature to generate insights for this report.".to_string()],
            recommended_actions: vec!["Review the report figures manually.".to_string()],
        },
        FallbackReason::MissingCredential => AiInsights {
            summary: "AI insights are not configured.".to_string(),
            insights: vec!["No AI API key is configured for this environment.".to_string()],
            recommended_actions: vec!["Configure an AI API key or review the figures manually.".to_string()],
        },
        FallbackReason::InvalidOutput => AiInsights {
            summary: "AI insights could not be generated.".to_string(),
            insights: vec!["The AI service returned output that could not be used.".to_string()],
            recommended_actions: vec!["Try again later or review the figures manually.".to_string()],
        },
        FallbackReason::Unavailable(detail) => AiInsights {
            summary: "AI service is unavailable.".to_string(),
            insights: vec![format!("The AI service request failed: {detail}")],
            recommended_actions: vec!["Try again later or review the figures manually.".to_string()],
        },
    }
}

/// Fixed category with the first allowed code; the engine clamps the code again regardless.
pub fn leave_reason(text: &str, allowed_codes: &[String]) -> ReasonNormalization {
    let summary = match text.trim() {
        "" => "No reason provided.".to_string(),
        trimmed => trimmed.to_string(),
    };
    ReasonNormalization {
        category: "Other".to_string(),
        summary,
        suggested_leave_type_code: allowed_codes.first().cloned().unwrap_or_default(),
    }
}

/// The policy engine replaces these with a fact-based explanation; the wording is how it recognises them.
pub fn explanation(reason: &FallbackReason) -> DecisionExplanation {
    let explanation = match reason {
        FallbackReason::Disabled => "AI explanation is disabled.".to_string(),
        FallbackReason::MissingCredential => "AI explanation is not configured: no AI API key.".to_string(),
        FallbackReason::InvalidOutput => "AI explanation could not be generated.".to_string(),
        FallbackReason::Unavailable(detail) => format!("AI service is unavailable: {detail}"),
    };
    DecisionExplanation { explanation }
}
