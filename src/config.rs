use crate::model::ScheduleDefaults;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ADMIN_ID: &str = "eightyard";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Eightyard8!";
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 20;
pub const MIN_SYNC_TIMEOUT_SECS: u64 = 1;
pub const MAX_SYNC_TIMEOUT_SECS: u64 = 300;

pub const ENV_SYNC_URL: &str = "SHUTTLED_SYNC_URL";
pub const ENV_SYNC_TIMEOUT_SECS: &str = "SHUTTLED_SYNC_TIMEOUT_SECS";
pub const ENV_SUGGEST_URL: &str = "SHUTTLED_SUGGEST_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// `None` means no remote store: load the seed dataset, skip pushes.
    pub endpoint_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            endpoint_url: None,
            timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestConfig {
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminCredentials {
    pub login_id: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        AdminCredentials {
            login_id: DEFAULT_ADMIN_ID.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl AdminCredentials {
    pub fn matches(&self, login_id: &str, password: &str) -> bool {
        self.login_id == login_id && self.password == password
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub sync: SyncConfig,
    pub suggest: SuggestConfig,
    pub admin: AdminCredentials,
    pub defaults: ScheduleDefaults,
}

impl Config {
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg
    }

    /// Blank values clear an endpoint; unparsable or out-of-range timeouts are
    /// ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SYNC_URL) {
            self.sync.endpoint_url = non_blank(&url);
        }
        if let Some(secs) = lookup(ENV_SYNC_TIMEOUT_SECS).and_then(|v| v.trim().parse().ok()) {
            if (MIN_SYNC_TIMEOUT_SECS..=MAX_SYNC_TIMEOUT_SECS).contains(&secs) {
                self.sync.timeout_secs = secs;
            } else {
                tracing::warn!(secs, "ignoring out-of-range {}", ENV_SYNC_TIMEOUT_SECS);
            }
        }
        if let Some(url) = lookup(ENV_SUGGEST_URL) {
            self.suggest.endpoint_url = non_blank(&url);
        }
    }
}

pub fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_leave_endpoints_unset() {
        let cfg = Config::default();
        assert_eq!(cfg.sync.endpoint_url, None);
        assert_eq!(cfg.sync.timeout_secs, 20);
        assert!(cfg.admin.matches("eightyard", "Eightyard8!"));
        assert!(!cfg.admin.matches("eightyard", "wrong"));
    }

    #[test]
    fn env_overrides_endpoints_and_timeout() {
        let env: HashMap<&str, &str> = [
            (ENV_SYNC_URL, " http://sheet.example/exec "),
            (ENV_SYNC_TIMEOUT_SECS, "5"),
            (ENV_SUGGEST_URL, ""),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.suggest.endpoint_url = Some("http://old".into());
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.sync.endpoint_url.as_deref(), Some("http://sheet.example/exec"));
        assert_eq!(cfg.sync.timeout_secs, 5);
        assert_eq!(cfg.suggest.endpoint_url, None);
    }

    #[test]
    fn env_timeout_outside_the_setup_range_is_ignored() {
        for raw in ["0", "301", "-4", "soon"] {
            let mut cfg = Config::default();
            cfg.apply_env(|k| (k == ENV_SYNC_TIMEOUT_SECS).then(|| raw.to_string()));
            assert_eq!(cfg.sync.timeout_secs, DEFAULT_SYNC_TIMEOUT_SECS, "{} accepted", raw);
        }
        let mut cfg = Config::default();
        cfg.apply_env(|k| (k == ENV_SYNC_TIMEOUT_SECS).then(|| "300".to_string()));
        assert_eq!(cfg.sync.timeout_secs, 300);
    }
}
