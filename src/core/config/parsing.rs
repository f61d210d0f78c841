use std::env;
use std::str::FromStr;

use super::types::{ConfigError, Environment, GradingEngineKind};

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

const SUPPORTED_DOCUMENT_EXTENSIONS: &[&str] =
    &["pdf", "jpg", "jpeg", "png", "webp", "txt", "md", "docx"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

/// Unset means `false`; anything other than a recognised "on" spelling is off too.
pub(super) fn env_flag(key: &'static str) -> bool {
    env_optional(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

pub(super) fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { field: key, value: raw }),
        None => Ok(default),
    }
}

/// Accepts either a JSON array of strings or a comma-separated list.
pub(super) fn parse_list(field: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(raw)
            .map_err(|_| ConfigError::InvalidValue { field, value: raw.to_string() })?
    } else {
        raw.split(',').map(str::to_string).collect()
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

pub(super) fn cors_origins(raw: Option<String>) -> Result<Vec<String>, ConfigError> {
    let origins = match raw {
        Some(raw) => parse_list("BACKEND_CORS_ORIGINS", &raw)?,
        None => Vec::new(),
    };
    if origins.is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|origin| origin.to_string()).collect());
    }
    Ok(origins)
}

/// Lowercased extensions without a leading dot.
pub(super) fn document_extensions(raw: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(["pdf", "jpg", "jpeg", "png", "txt"].map(String::from).to_vec());
    };
    let extensions = parse_list("ALLOWED_DOCUMENT_EXTENSIONS", &raw)?
        .into_iter()
        .map(|item| item.trim_start_matches('.').to_ascii_lowercase())
        .collect::<Vec<_>>();

    if extensions.is_empty() {
        return Err(ConfigError::InvalidValue { field: "ALLOWED_DOCUMENT_EXTENSIONS", value: raw });
    }
    if let Some(unknown) =
        extensions.iter().find(|ext| !SUPPORTED_DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
    {
        return Err(ConfigError::InvalidValue {
            field: "ALLOWED_DOCUMENT_EXTENSIONS",
            value: unknown.clone(),
        });
    }
    Ok(extensions)
}

pub(super) fn environment(raw: Option<String>) -> Environment {
    match raw.map(|value| value.to_ascii_lowercase()).as_deref() {
        Some("production" | "prod") => Environment::Production,
        Some("test" | "testing") => Environment::Test,
        _ => Environment::Development,
    }
}

impl FromStr for GradingEngineKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(Self::Simulated),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue { field: "GRADING_ENGINE", value: value.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_accept_json_or_commas() {
        let json = parse_list("X", "[\"http://a\", \" http://b \"]").expect("json");
        let csv = parse_list("X", "http://a, ,http://b").expect("csv");
        assert_eq!(json, vec!["http://a", "http://b"]);
        assert_eq!(csv, json);
        assert!(parse_list("X", "[broken").is_err());
    }

    #[test]
    fn blank_cors_falls_back_to_local_origins() {
        assert_eq!(cors_origins(Some(" , ".to_string())).expect("cors").len(), 2);
        assert_eq!(cors_origins(None).expect("cors")[0], "http://localhost:5173");
    }

    #[test]
    fn document_extensions_are_normalized_and_checked() {
        let parsed = document_extensions(Some(".PDF, txt".to_string())).expect("extensions");
        assert_eq!(parsed, vec!["pdf", "txt"]);
        assert!(document_extensions(Some("exe".to_string())).is_err());
        assert!(document_extensions(Some(",".to_string())).is_err());
        assert!(document_extensions(None).expect("defaults").contains(&"txt".to_string()));
    }

    #[test]
    fn environment_names() {
        assert_eq!(environment(Some("PROD".to_string())), Environment::Production);
        assert_eq!(environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(environment(Some("staging".to_string())), Environment::Development);
        assert_eq!(environment(None), Environment::Development);
    }

    #[test]
    fn engine_kinds() {
        assert_eq!("Mock".parse::<GradingEngineKind>().unwrap(), GradingEngineKind::Simulated);
        assert_eq!("http".parse::<GradingEngineKind>().unwrap(), GradingEngineKind::Http);
        assert!("ocr".parse::<GradingEngineKind>().is_err());
    }
}
