//! Tessera Domain - Core session types
//!
//! This crate defines the domain model for the Tessera session client.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod cookie;
pub mod error;
pub mod onboarding;
pub mod request;
pub mod response;

pub use auth::{
    AuthContextKind, Claims, LogoutReason, PendingAuthContext, Session, SessionPhase, Token,
    TokenPair, User,
};
pub use cookie::{Cookie, SameSite};
pub use error::{DomainError, DomainResult};
pub use onboarding::{Employee, NewEmployee, NewUserAccount, UserAccount};
pub use request::{ApiRequest, HttpMethod};
pub use response::ApiResponse;
