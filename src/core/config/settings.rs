use super::parsing::{
    env_flag, env_optional, env_or_default, parse_cors_origins, parse_environment, parse_f64,
    parse_u32, parse_u64, parse_usize,
};
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, GradingSettings, RuntimeSettings,
    ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("DESEVA_HOST", "0.0.0.0");
        let port = env_or_default("DESEVA_PORT", "8000");

        let environment =
            parse_environment(env_optional("DESEVA_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("DESEVA_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Descriptive Answer Evaluation API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let feedback_model = env_or_default("FEEDBACK_MODEL", "gpt-3.5-turbo");
        let embedding_model = env_or_default("EMBEDDING_MODEL", "text-embedding-3-small");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "500"))?;
        let ai_temperature =
            parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.7"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "60"))?;

        let default_semantic_weight = parse_f64(
            "DEFAULT_SEMANTIC_WEIGHT",
            env_or_default("DEFAULT_SEMANTIC_WEIGHT", "0.5"),
        )?;
        let default_concept_weight =
            parse_f64("DEFAULT_CONCEPT_WEIGHT", env_or_default("DEFAULT_CONCEPT_WEIGHT", "0.5"))?;
        let max_required_concepts =
            parse_usize("MAX_REQUIRED_CONCEPTS", env_or_default("MAX_REQUIRED_CONCEPTS", "15"))?;
        let worker_concurrency = parse_usize(
            "GRADING_WORKER_CONCURRENCY",
            env_or_default("GRADING_WORKER_CONCURRENCY", "4"),
        )?;
        let concept_semantic_match = env_flag("CONCEPT_SEMANTIC_MATCH");

        let log_level = env_or_default("DESEVA_LOG_LEVEL", "info");
        let json = env_flag("DESEVA_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                feedback_model,
                embedding_model,
                ai_max_tokens,
                ai_temperature,
                ai_request_timeout,
            },
            grading: GradingSettings {
                default_semantic_weight,
                default_concept_weight,
                max_required_concepts,
                worker_concurrency,
                concept_semantic_match,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
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
        if self.grading.worker_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "GRADING_WORKER_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        if self.grading.max_required_concepts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_REQUIRED_CONCEPTS",
                value: "0".to_string(),
            });
        }

        for (field, weight) in [
            ("DEFAULT_SEMANTIC_WEIGHT", self.grading.default_semantic_weight),
            ("DEFAULT_CONCEPT_WEIGHT", self.grading.default_concept_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidValue { field, value: weight.to_string() });
            }
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.openai_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{env_lock, set_test_env};

    #[tokio::test]
    async fn loads_defaults() {
        let _guard = env_lock().await;
        set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().api_v1_str, "/api/v1");
        assert_eq!(settings.grading().max_required_concepts, 15);
        assert_eq!(settings.grading().worker_concurrency, 4);
        assert_eq!(settings.ai().feedback_model, "gpt-3.5-turbo");
        assert_eq!(settings.server_addr(), "0.0.0.0:8000");
    }

    #[tokio::test]
    async fn rejects_zero_concurrency() {
        let _guard = env_lock().await;
        set_test_env();
        std::env::set_var("GRADING_WORKER_CONCURRENCY", "0");

        let err = Settings::load().expect_err("zero concurrency");
        std::env::remove_var("GRADING_WORKER_CONCURRENCY");
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "GRADING_WORKER_CONCURRENCY", .. }
        ));
    }

    #[tokio::test]
    async fn strict_mode_requires_api_key() {
        let _guard = env_lock().await;
        set_test_env();
        std::env::set_var("DESEVA_STRICT_CONFIG", "1");

        let err = Settings::load().expect_err("missing key");
        std::env::set_var("DESEVA_STRICT_CONFIG", "0");
        assert!(matches!(err, ConfigError::MissingSecret("OPENAI_API_KEY")));
    }
}
