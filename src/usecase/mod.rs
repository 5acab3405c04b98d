pub mod export_env_file;
pub mod get_env_variable;
pub mod list_env_variables;
pub mod seed_env_variables;
pub mod sync_cache;
pub mod update_env_variable;

pub use export_env_file::ExportEnvFileUseCase;
pub use get_env_variable::GetEnvVariableUseCase;
pub use list_env_variables::ListEnvVariablesUseCase;
pub use seed_env_variables::SeedEnvVariablesUseCase;
pub use sync_cache::SyncCacheUseCase;
pub use update_env_variable::UpdateEnvVariableUseCase;
