//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. AWS credentials are not read here; the
//! SDK's default provider chain resolves them.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_allowed_origin: String,
    pub aws_region: String,
    /// May be empty; see [`Config::diagnostics`].
    pub s3_bucket_name: String,
    pub s3_url_expiration: Duration,
    pub bedrock_text_model_id: String,
    pub bedrock_image_model_id: String,
    pub transcribe_timeout: Duration,
    pub transcribe_poll_interval: Duration,
    pub transcribe_sample_rate: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = var_or("CORS_ALLOWED_ORIGIN", "http://localhost:3000");

        // --- AWS Settings ---
        let aws_region = var_or("AWS_REGION", "us-east-1");
        let s3_bucket_name = var_or("AWS_S3_BUCKET_NAME", "");
        let s3_url_expiration =
            Duration::from_secs(parse_number(&lookup, "S3_URL_EXPIRATION_SECS", 3600)?);

        let bedrock_text_model_id = var_or(
            "BEDROCK_TEXT_MODEL_ID",
            "anthropic.claude-3-5-sonnet-20240620-v1:0",
        );
        let bedrock_image_model_id =
            var_or("BEDROCK_IMAGE_MODEL_ID", "stability.stable-diffusion-xl-v1");

        // --- Transcription Settings ---
        let transcribe_timeout =
            Duration::from_secs(parse_number(&lookup, "TRANSCRIBE_TIMEOUT_SECS", 60)?);
        let transcribe_poll_interval =
            Duration::from_millis(parse_number(&lookup, "TRANSCRIBE_POLL_INTERVAL_MS", 1000)?);
        if transcribe_poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "TRANSCRIBE_POLL_INTERVAL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let sample_rate = parse_number(&lookup, "TRANSCRIBE_SAMPLE_RATE", 48_000)?;
        let transcribe_sample_rate = u32::try_from(sample_rate).map_err(|e| {
            ConfigError::InvalidValue("TRANSCRIBE_SAMPLE_RATE".to_string(), e.to_string())
        })?;

        Ok(Self {
            bind_address,
            log_level,
            cors_allowed_origin,
            aws_region,
            s3_bucket_name,
            s3_url_expiration,
            bedrock_text_model_id,
            bedrock_image_model_id,
            transcribe_timeout,
            transcribe_poll_interval,
            transcribe_sample_rate,
        })
    }

    /// Problems that do not stop the server but will make requests fail later.
    pub fn diagnostics(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();
        if self.s3_bucket_name.trim().is_empty() {
            problems.push(ConfigError::MissingVar("AWS_S3_BUCKET_NAME".to_string()));
        }
        problems
    }
}

fn parse_number<F>(lookup: &F, name: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.s3_url_expiration, Duration::from_secs(3600));
        assert_eq!(config.transcribe_timeout, Duration::from_secs(60));
        assert_eq!(config.transcribe_poll_interval, Duration::from_secs(1));
        assert_eq!(config.bedrock_image_model_id, "stability.stable-diffusion-xl-v1");
    }

    #[test]
    fn missing_bucket_is_a_diagnostic_not_an_error() {
        let config = config_from(&[]).unwrap();
        let problems = config.diagnostics();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].to_string().contains("AWS_S3_BUCKET_NAME"));

        let config = config_from(&[("AWS_S3_BUCKET_NAME", "koala-media")]).unwrap();
        assert!(config.diagnostics().is_empty());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            config_from(&[("BIND_ADDRESS", "not an address")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "BIND_ADDRESS"
        ));
        assert!(matches!(
            config_from(&[("S3_URL_EXPIRATION_SECS", "an hour")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "S3_URL_EXPIRATION_SECS"
        ));
        assert!(config_from(&[("TRANSCRIBE_POLL_INTERVAL_MS", "0")]).is_err());
    }

    #[test]
    fn sample_rate_must_fit_in_a_wav_header() {
        assert!(matches!(
            config_from(&[("TRANSCRIBE_SAMPLE_RATE", "4294967296")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "TRANSCRIBE_SAMPLE_RATE"
        ));
        let config = config_from(&[("TRANSCRIBE_SAMPLE_RATE", "16000")]).unwrap();
        assert_eq!(config.transcribe_sample_rate, 16_000);
    }
}
