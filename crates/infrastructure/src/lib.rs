//! Tessera Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: HTTP transport, cookie and session
//! storage, the credential and provisioning APIs, and configuration.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod persistence;
pub mod provisioning;

pub use adapters::{ChannelNavigator, InMemoryUserCache, ReqwestHttpClient, SystemClock};
pub use auth::HttpCredentialService;
pub use config::{AppConfig, ConfigError, SessionSettings};
pub use persistence::{FileCookieStore, MemoryCookieStore, MemorySessionStorage};
pub use provisioning::HttpProvisioningService;
