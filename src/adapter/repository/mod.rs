pub mod cached_env_variable_repository;
pub mod env_variable_memory;
pub mod env_variable_postgres;

pub use cached_env_variable_repository::{CachePolicy, CachedEnvVariableRepository};
pub use env_variable_memory::InMemoryEnvVariableRepository;
pub use env_variable_postgres::EnvVariablePostgresRepository;
