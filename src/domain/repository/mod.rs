pub mod env_variable_repository;

pub use env_variable_repository::{is_store_timeout, EnvVariableRepository, StoreTimeoutError};
