//! Authentication adapters.

mod http_credential_service;

pub use http_credential_service::HttpCredentialService;
