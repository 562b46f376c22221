//! Application layer orchestrating admission and reconciliation.
//!
//! `AdmissionCoordinator` is the entry point for new payments. It owns no
//! state beyond its store handle, so one instance can be shared across tasks
//! and every concurrent caller is serialized only by the store's uniqueness
//! constraint.

pub mod admission;
pub mod reconciliation;
