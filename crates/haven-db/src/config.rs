use haven_core::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the document store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (required)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let url = lookup("DATABASE_URL").filter(|u| !u.is_empty()).ok_or_else(|| {
            AppError::ConfigError("DATABASE_URL not set. Required for the import command.".into())
        })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => parse_max_connections(&raw)?,
        };

        Ok(Self {
            url,
            max_connections,
        })
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, AppError> {
    let parsed: u32 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid DATABASE_MAX_CONNECTIONS '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(
            "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn url_required() {
        let err = DatabaseConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn max_connections_defaults_to_five() {
        let config =
            DatabaseConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/haven")]))
                .unwrap();
        assert_eq!(config.url, "postgres://localhost/haven");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn max_connections_override() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/haven"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn zero_or_garbage_max_connections_rejected() {
        for raw in ["0", "many", "-1"] {
            let err = DatabaseConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/haven"),
                ("DATABASE_MAX_CONNECTIONS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{raw}");
        }
    }
}
