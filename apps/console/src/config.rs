use std::{collections::HashMap, fs};

use anyhow::{bail, Context};
use url::Url;

#[derive(Debug)]
pub struct Settings {
    pub auth_service_url: String,
    pub todo_service_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_service_url: "http://localhost:3001".into(),
            todo_service_url: "http://localhost:3002".into(),
        }
    }
}

/// Defaults, then `taskflow.toml`, then environment variables, last one wins.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("taskflow.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("auth_service_url") {
                settings.auth_service_url = v.clone();
            }
            if let Some(v) = file_cfg.get("todo_service_url") {
                settings.todo_service_url = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("AUTH_SERVICE_URL") {
        settings.auth_service_url = v;
    }
    if let Ok(v) = std::env::var("APP__AUTH_SERVICE_URL") {
        settings.auth_service_url = v;
    }

    if let Ok(v) = std::env::var("TODO_SERVICE_URL") {
        settings.todo_service_url = v;
    }
    if let Ok(v) = std::env::var("APP__TODO_SERVICE_URL") {
        settings.todo_service_url = v;
    }

    settings
}

/// Normalizes a configured base URL: http(s) only, no trailing slash.
pub fn validate_base_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).with_context(|| format!("invalid service url: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("service url must be http or https: {raw}");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_strips_trailing_slash() {
        let url = validate_base_url("http://localhost:3001/").expect("valid");
        assert_eq!(url, "http://localhost:3001");
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(validate_base_url("ftp://localhost:3001").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn defaults_point_at_local_services() {
        let settings = Settings::default();
        assert_eq!(settings.auth_service_url, "http://localhost:3001");
        assert_eq!(settings.todo_service_url, "http://localhost:3002");
    }
}
