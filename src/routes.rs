use crate::{
    api::{job_description, leave_request, leave_type, report},
    auth::middleware::auth_middleware,
    config::Config,
    error::LeaveError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type IpLimiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-client-IP limiters, built once at startup and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    protected: IpLimiter,
    ai: IpLimiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: build_limiter(config.rate_protected_per_min)?,
            ai: build_limiter(config.rate_ai_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<IpLimiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| LeaveError::validation(format!("Invalid request body: {err}")).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| LeaveError::validation(format!("Invalid query: {err}")).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    let ai_limiter = limits.ai.clone();

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .app_data(json_config())
            .app_data(query_config())
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limits.protected.clone()) // rate limiting
            .service(
                web::scope("/leave-requests")
                    // /leave-requests
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::list_leave_requests))
                            .route(web::post().to(leave_request::create_leave_request)),
                    )
                    // /leave-requests/ai/normalize-reason
                    .service(
                        web::resource("/ai/normalize-reason")
                            .wrap(ai_limiter.clone())
                            .route(web::post().to(leave_request::normalize_reason)),
                    )
                    // /leave-requests/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave_request)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(leave_request::approve_leave_request)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::post().to(leave_request::reject_leave_request)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::post().to(leave_request::cancel_leave_request)),
                    )
                    .service(
                        web::resource("/{id}/ai/explain-decision")
                            .wrap(ai_limiter.clone())
                            .route(web::post().to(leave_request::explain_decision)),
                    ),
            )
            .service(
                web::resource("/leave-types").route(web::get().to(leave_type::list_leave_types)),
            )
            .service(
                web::scope("/reports")
                    .service(
                        web::resource("/leave-requests-monthly")
                            .route(web::get().to(report::leave_requests_monthly)),
                    )
                    .service(
                        web::resource("/ai/insights")
                            .wrap(ai_limiter.clone())
                            .route(web::post().to(report::ai_insights)),
                    ),
            )
            .service(
                web::resource("/job-descriptions/ai/draft")
                    .wrap(ai_limiter)
                    .route(web::post().to(job_description::draft_job_description)),
            ),
    );
}
