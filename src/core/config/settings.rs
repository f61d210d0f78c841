use super::parsing::{
    cors_origins, document_extensions, env_flag, env_number, env_optional, env_or_default,
    environment,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, GradingEngineKind, GradingSettings, RuntimeSettings,
    ServerSettings, Settings, TelemetrySettings, UploadSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            environment(env_optional("MARKDESK_ENV").or_else(|| env_optional("ENVIRONMENT")));

        let server = ServerSettings {
            host: env_or_default("MARKDESK_HOST", "0.0.0.0"),
            port: env_number("MARKDESK_PORT", 8000)?,
        };
        let runtime = RuntimeSettings {
            environment,
            strict_config: env_flag("MARKDESK_STRICT_CONFIG") || environment.is_production(),
        };
        let api = ApiSettings {
            project_name: env_or_default("PROJECT_NAME", "Markdesk API"),
            version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
            api_v1_str: env_or_default("API_V1_STR", "/api/v1"),
            public_base_url: env_or_default("PUBLIC_BASE_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
        };
        let uploads = UploadSettings {
            max_upload_size_mb: env_number("MAX_UPLOAD_SIZE_MB", 10)?,
            allowed_document_extensions: document_extensions(env_optional(
                "ALLOWED_DOCUMENT_EXTENSIONS",
            ))?,
        };
        let grading = GradingSettings {
            engine: env_or_default("GRADING_ENGINE", "simulated").parse()?,
            engine_url: env_or_default("GRADING_ENGINE_URL", ""),
            engine_api_key: env_or_default("GRADING_ENGINE_API_KEY", ""),
            worker_concurrency: env_number("GRADING_WORKER_CONCURRENCY", 3)?,
            timeout_seconds: env_number("GRADING_TIMEOUT_SECONDS", 120)?,
            simulated_delay_ms: env_number("GRADING_SIMULATED_DELAY_MS", 1000)?,
            max_retries: env_number("MAX_GRADING_RETRIES", 3)?,
        };
        let telemetry = TelemetrySettings {
            log_level: env_or_default("MARKDESK_LOG_LEVEL", "info"),
            json: env_flag("MARKDESK_LOG_JSON"),
            prometheus_enabled: env_flag("PROMETHEUS_ENABLED"),
        };

        let settings = Self {
            server,
            runtime,
            api,
            cors: CorsSettings { origins: cors_origins(env_optional("BACKEND_CORS_ORIGINS"))? },
            uploads,
            grading,
            telemetry,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn server(&self) -> &ServerSettings {
        &self.server
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("MARKDESK_PORT", self.server.port == 0),
            ("MAX_UPLOAD_SIZE_MB", self.uploads.max_upload_size_mb == 0),
            ("GRADING_WORKER_CONCURRENCY", self.grading.worker_concurrency == 0),
            ("GRADING_TIMEOUT_SECONDS", self.grading.timeout_seconds == 0),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::InvalidValue { field, value: "0".to_string() });
        }
        if self.server.host.is_empty() {
            return Err(ConfigError::InvalidValue { field: "MARKDESK_HOST", value: String::new() });
        }

        let http_engine = self.grading.engine == GradingEngineKind::Http;
        if http_engine && self.grading.engine_url.is_empty() {
            return Err(ConfigError::MissingSetting("GRADING_ENGINE_URL"));
        }
        if !self.runtime.strict_config {
            return Ok(());
        }

        if http_engine && self.grading.engine_api_key.is_empty() {
            return Err(ConfigError::MissingSetting("GRADING_ENGINE_API_KEY"));
        }
        if !self.api.public_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "PUBLIC_BASE_URL",
                value: self.api.public_base_url.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn defaults_load_with_simulated_engine() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.grading().engine, GradingEngineKind::Simulated);
        assert_eq!(settings.grading().max_retries, 3);
        assert_eq!(settings.api().api_v1_str, "/api/v1");
        assert_eq!(settings.uploads().max_upload_bytes(), 1024 * 1024);
        assert_eq!(settings.grading().simulated_delay_ms, 0);
    }

    #[tokio::test]
    async fn http_engine_requires_url() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("GRADING_ENGINE", "http");
        std::env::remove_var("GRADING_ENGINE_URL");

        let err = Settings::load().expect_err("missing url");
        assert!(matches!(err, ConfigError::MissingSetting("GRADING_ENGINE_URL")));

        std::env::remove_var("GRADING_ENGINE");
    }

    #[tokio::test]
    async fn rejects_zero_worker_concurrency() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("GRADING_WORKER_CONCURRENCY", "0");

        let err = Settings::load().expect_err("zero workers");
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "GRADING_WORKER_CONCURRENCY", .. }
        ));

        std::env::remove_var("GRADING_WORKER_CONCURRENCY");
    }

    #[tokio::test]
    async fn strict_mode_requires_https_public_url() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("MARKDESK_STRICT_CONFIG", "1");
        std::env::set_var("PUBLIC_BASE_URL", "http://insecure.local");

        let err = Settings::load().expect_err("insecure url");
        assert!(matches!(err, ConfigError::InvalidValue { field: "PUBLIC_BASE_URL", .. }));

        std::env::remove_var("MARKDESK_STRICT_CONFIG");
        std::env::remove_var("PUBLIC_BASE_URL");
    }
}
