use std::path::PathBuf;

use url::Url;

use crate::provision::ModelSource;

pub const DEFAULT_MODEL_URL: &str =
    "https://inteligencia-artificial.s3.sa-east-1.amazonaws.com/best_model.h5";
pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid MODEL_URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("MODEL_URL {0} has no file name in its path")]
    MissingFileName(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    pub model_url: Url,
    pub model_dir: PathBuf,
    pub model_sha256: Option<String>,
    pub preload_model: bool,
    pub max_upload_bytes: usize,
    pub static_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_url = get("MODEL_URL").unwrap_or_else(|| DEFAULT_MODEL_URL.to_string());
        let model_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            value: raw_url.clone(),
            source,
        })?;
        if ModelSource::file_name_of(&model_url).is_none() {
            return Err(ConfigError::MissingFileName(raw_url));
        }

        let port = match get("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let preload_model = match get("PRELOAD_MODEL") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                key: "PRELOAD_MODEL",
                value,
            })?,
            None => true,
        };

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(value) => match value.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "MAX_UPLOAD_BYTES",
                        value,
                    });
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let model_sha256 = get("MODEL_SHA256").map(|digest| digest.trim().to_lowercase());
        if let Some(digest) = &model_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidValue {
                    key: "MODEL_SHA256",
                    value: digest.clone(),
                });
            }
        }

        // `cargo run` sets CARGO_MANIFEST_DIR; a deployed binary serves ./static.
        let static_dir = get("STATIC_DIR")
            .map(PathBuf::from)
            .or_else(|| get("CARGO_MANIFEST_DIR").map(|dir| PathBuf::from(dir).join("static")))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            model_url,
            model_dir: get("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            model_sha256,
            preload_model,
            max_upload_bytes,
            static_dir,
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn model_source(&self) -> Result<ModelSource, ConfigError> {
        ModelSource::new(
            self.model_url.clone(),
            self.model_dir.clone(),
            self.model_sha256.clone(),
        )
        .ok_or_else(|| ConfigError::MissingFileName(self.model_url.to_string()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
