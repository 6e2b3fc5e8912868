//! Runtime mode loaded from the `APP_ENV` environment variable.
//!
//! Production mode masks internal error details in caller-facing messages.

/// Deployment mode of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// Parses an `APP_ENV` value; anything other than `production`/`prod` is development.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Reads `APP_ENV`, defaulting to development when unset.
#[must_use]
pub fn runtime_mode() -> RuntimeMode {
    std::env::var("APP_ENV")
        .map(|value| RuntimeMode::parse(&value))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_runtime_mode() {
        assert_eq!(RuntimeMode::parse("production"), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse(" PROD "), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse("staging"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::parse(""), RuntimeMode::Development);
    }
}
