use crate::app::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub accept_invalid_certs: bool,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub startup_grace_ms: u64,
    pub store_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::config("API_BASE_URL is required"))?;

        Ok(Self {
            api_base_url,
            accept_invalid_certs: parse_or_default(&lookup, "ACCEPT_INVALID_CERTS", false)?,
            request_timeout_secs: parse_or_default(&lookup, "REQUEST_TIMEOUT_SECS", 30_u64)?,
            poll_interval_secs: parse_or_default(&lookup, "POLL_INTERVAL_SECS", 1800_u64)?,
            startup_grace_ms: parse_or_default(&lookup, "STARTUP_GRACE_MS", 3000_u64)?,
            store_path: lookup("STORE_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "./data/aquabill.db".to_string()),
        })
    }
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid value"))),
        None => Ok(default),
    }
}
