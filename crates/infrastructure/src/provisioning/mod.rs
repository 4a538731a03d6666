//! Provisioning adapters.

mod http_provisioning_service;

pub use http_provisioning_service::HttpProvisioningService;
