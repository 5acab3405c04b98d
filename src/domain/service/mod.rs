pub mod env_variable_domain_service;

pub use env_variable_domain_service::{DomainError, EnvVariableDomainService};
