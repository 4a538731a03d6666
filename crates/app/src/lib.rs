//! Tessera - command-line session client
//!
//! Wires the session core to its adapters. The binary in `main.rs` is a
//! thin command layer over [`Tessera`].

pub mod batch;
pub mod client;
pub mod error;

pub use batch::{OnboardingRequest, load_requests};
pub use client::{Background, Ports, Tessera};
pub use error::AppError;
