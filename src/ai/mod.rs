pub mod fallback;
pub mod gateway;
pub mod normalizer;
pub mod prompts;
pub mod provider;
pub mod rate_limiter;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use gateway::AiAugmentationGateway;
