//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod cookie_store;
mod credential_service;
mod http_client;
mod navigator;
mod provisioning_service;
mod remote;
mod session_storage;
mod user_cache;

pub use clock::Clock;
pub use cookie_store::{CookieStore, StorageError};
pub use credential_service::{CredentialResponse, CredentialService, IssuedTokens};
pub use http_client::HttpClient;
pub use navigator::Navigator;
pub use provisioning_service::{ProvisioningError, ProvisioningService};
pub use remote::{RemoteError, RemoteResult};
pub use session_storage::SessionStorage;
pub use user_cache::{CurrentUserCache, UserCacheEvent};
