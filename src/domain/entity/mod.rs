pub mod env_variable;
