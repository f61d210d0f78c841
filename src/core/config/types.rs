use thiserror::Error;

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(super) server: ServerSettings,
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) cors: CorsSettings,
    pub(super) uploads: UploadSettings,
    pub(super) grading: GradingSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    /// Production checks without running as production.
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_v1_str: String,
    /// No trailing slash. Share, feedback and document links are built on it.
    pub(crate) public_base_url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct UploadSettings {
    pub(crate) max_upload_size_mb: u64,
    pub(crate) allowed_document_extensions: Vec<String>,
}

impl UploadSettings {
    pub(crate) fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_size_mb)
            .unwrap_or(usize::MAX)
            .saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradingEngineKind {
    Simulated,
    Http,
}

#[derive(Debug, Clone)]
pub(crate) struct GradingSettings {
    pub(crate) engine: GradingEngineKind,
    pub(crate) engine_url: String,
    pub(crate) engine_api_key: String,
    pub(crate) worker_concurrency: usize,
    pub(crate) timeout_seconds: u64,
    pub(crate) simulated_delay_ms: u64,
    pub(crate) max_retries: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    pub(super) fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),
}
