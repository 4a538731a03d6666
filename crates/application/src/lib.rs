//! Tessera Application - Session lifecycle and ports
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for external dependencies)
//! - The session store, its background tasks and the request pipeline
//! - Use case orchestration
//! - Application-level error handling

pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod task;
pub mod use_cases;

#[cfg(test)]
mod testing;

pub use auth::{
    AuthError, ConsistencyWatcher, PasswordChangeOutcome, PendingAuthStore, RenewOutcome,
    RenewalScheduler, SecondFactorOutcome, SessionStore, TokenPersistence, WatchState,
};
pub use config::{RenewalStrategy, SessionConfig};
pub use error::{ApplicationError, ApplicationResult};
pub use pipeline::{PipelineError, RequestPipeline, RequestStage, ResponseAction};
pub use task::TaskHandle;
pub use use_cases::{
    AccountOrigin, EmployeeOnboarding, OnboardingError, OnboardingInput, OnboardingOutcome,
};
