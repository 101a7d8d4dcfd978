//! Tracker Core - Shared service infrastructure
//!
//! This crate provides:
//! - Standard service trait all tracker services implement
//! - Error handling utilities
//! - Runtime bootstrap with graceful shutdown

pub mod error;
pub mod service;

pub use error::{Result, TrackerError};
pub use service::{DependencyStatus, HealthStatus, MicroserviceRuntime, ReadinessStatus, TrackerService};
