use std::fs;

use super::ConfigError;

/// Helper function to load and parse an environment variable.
/// Returns Ok(()) if the variable doesn't exist (keeps default).
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load a string environment variable.
pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

/// Reads `{name}_FILE` (Docker secrets) before falling back to `{name}`.
/// Returns `None` when neither is set.
pub fn get_env_or_file(name: &str) -> Result<Option<String>, ConfigError> {
    let file_env = format!("{name}_FILE");
    if let Ok(file_path) = std::env::var(&file_env) {
        return fs::read_to_string(&file_path)
            .map(|content| Some(content.trim().to_string()))
            .map_err(|e| ConfigError::EnvError(format!("Failed to read {file_env}: {e}")));
    }
    Ok(std::env::var(name).ok())
}
