//! Per-tenant pipeline orchestration
//!
//! Tenants run concurrently; within a tenant the stages run in a fixed,
//! serialized order (detect → trend → correlate → recommend → select →
//! deliver) so per-tenant adaptive state is never mutated concurrently.

mod coordinator;

pub use coordinator::{PipelineCoordinator, RunReport, TenantInputs, TenantRunResult};
