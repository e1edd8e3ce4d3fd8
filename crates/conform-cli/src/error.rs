use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings key to the environment variable that sets it
///
/// Serde reports missing fields without their table; generation settings all have
/// defaults, so a bare field name belongs to the provider table.
pub fn to_env_var(field_path: &str) -> String {
    let key = if field_path.contains('.') {
        field_path.to_string()
    } else if field_path == "provider" {
        "provider.type".to_string()
    } else {
        format!("provider.{field_path}")
    };
    format!("CONFORM_{}", key.replace('.', "__").to_uppercase())
}
