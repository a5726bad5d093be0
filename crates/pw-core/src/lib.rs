//! # pw-core
//!
//! Core domain models and ports for the Platewise session bootstrap.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

// Public module exports
pub mod boot;
pub mod error;
pub mod identity;
pub mod ports;
pub mod profile;

// Re-export commonly used types at the crate root
pub use boot::{
    decide_route, AppRoute, BootMetrics, BootResult, BootState, CachedAuthSnapshot, ProfileOutcome,
    SessionOutcome,
};
pub use error::{BootFailure, IdentityError, ProfileStoreError, RetryError, TimeoutError};
pub use identity::{AuthEvent, Identity, Session, UserId};
pub use profile::{NewProfile, Profile};
