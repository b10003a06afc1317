use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Environment::Production),
            "dev" | "development" | "test" => Ok(Environment::Development),
            other => Err(anyhow!("unknown APP_ENV `{other}`")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_configured: bool,
    pub default_school_id: Option<Uuid>,
    pub roster_file: Option<PathBuf>,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = lookup("APP_ENV")
            .map(|raw| raw.parse::<Environment>())
            .transpose()?
            .unwrap_or(Environment::Development);

        let database_configured = lookup("DATABASE_URL").is_some_and(|url| !url.trim().is_empty());

        let default_school_id = lookup("DEFAULT_SCHOOL_ID")
            .map(|raw| Uuid::parse_str(raw.trim()))
            .transpose()
            .context("invalid DEFAULT_SCHOOL_ID")?;

        let roster_file = lookup("ROSTER_FILE")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            environment,
            database_configured,
            default_school_id,
            roster_file,
            cors_allowed_origins,
        })
    }
}
