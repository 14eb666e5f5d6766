pub mod catalog;
pub mod explain;
pub mod locks;
pub mod policy;
pub mod repository;
pub mod rules;

#[cfg(test)]
pub mod memory;

pub use policy::{Actor, LeaveRequestPolicyEngine};
