use crate::config::{
    non_blank, AdminCredentials, Config, SuggestConfig, SyncConfig, MAX_SYNC_TIMEOUT_SECS,
    MIN_SYNC_TIMEOUT_SECS,
};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_admin;
use crate::ipc::types::{AppState, Request};
use crate::model::ScheduleDefaults;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Sync,
    Suggest,
    Admin,
    Defaults,
}

impl SetupSection {
    const ALL: [SetupSection; 4] = [
        SetupSection::Sync,
        SetupSection::Suggest,
        SetupSection::Admin,
        SetupSection::Defaults,
    ];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "sync" => Some(Self::Sync),
            "suggest" => Some(Self::Suggest),
            "admin" => Some(Self::Admin),
            "defaults" => Some(Self::Defaults),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Sync => "setup.sync",
            Self::Suggest => "setup.suggest",
            Self::Admin => "setup.admin",
            Self::Defaults => "setup.defaults",
        }
    }
}

fn default_section(section: SetupSection, base: &Config) -> Value {
    let v = match section {
        SetupSection::Sync => serde_json::to_value(&base.sync),
        SetupSection::Suggest => serde_json::to_value(&base.suggest),
        SetupSection::Admin => serde_json::to_value(&base.admin),
        SetupSection::Defaults => serde_json::to_value(&base.defaults),
    };
    v.unwrap_or_else(|_| json!({}))
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_non_empty(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = parse_string_max(v, key, max_len)?;
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    Ok(s)
}

/// `null` or blank clears the endpoint.
fn parse_endpoint(v: &Value, key: &str) -> Result<Value, String> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    let s = parse_string_max(v, key, 2048)?;
    match non_blank(&s) {
        None => Ok(Value::Null),
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(Value::String(url))
        }
        Some(_) => Err(format!("{} must be an http(s) URL", key)),
    }
}

fn parse_hhmm(v: &Value, key: &str) -> Result<String, String> {
    let s = parse_string_max(v, key, 5)?;
    chrono::NaiveTime::parse_from_str(&s, "%H:%M")
        .map_err(|_| format!("{} must be HH:mm", key))?;
    Ok(s)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Sync => match k.as_str() {
                "endpointUrl" => {
                    obj.insert(k.clone(), parse_endpoint(v, k)?);
                }
                "timeoutSecs" => {
                    let secs = parse_i64_range(
                        v,
                        k,
                        MIN_SYNC_TIMEOUT_SECS as i64,
                        MAX_SYNC_TIMEOUT_SECS as i64,
                    )?;
                    obj.insert(k.clone(), Value::from(secs));
                }
                _ => return Err(format!("unknown sync field: {}", k)),
            },
            SetupSection::Suggest => match k.as_str() {
                "endpointUrl" => {
                    obj.insert(k.clone(), parse_endpoint(v, k)?);
                }
                _ => return Err(format!("unknown suggest field: {}", k)),
            },
            SetupSection::Admin => match k.as_str() {
                "loginId" => {
                    obj.insert(k.clone(), Value::String(parse_non_empty(v, k, 64)?));
                }
                "password" => {
                    obj.insert(k.clone(), Value::String(parse_non_empty(v, k, 128)?));
                }
                _ => return Err(format!("unknown admin field: {}", k)),
            },
            SetupSection::Defaults => match k.as_str() {
                "dropoffLocation" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 120)?));
                }
                "pickupTime" | "dropoffTime" => {
                    obj.insert(k.clone(), Value::String(parse_hhmm(v, k)?));
                }
                _ => return Err(format!("unknown defaults field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(
    conn: &rusqlite::Connection,
    section: SetupSection,
    base: &Config,
) -> anyhow::Result<Value> {
    let mut current = default_section(section, base);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a bad stored value must not lock out setup.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

/// Effective config: `base` with every stored section layered on top.
pub fn load_config(conn: &rusqlite::Connection, base: &Config) -> anyhow::Result<Config> {
    let mut cfg = base.clone();
    for section in SetupSection::ALL {
        let v = load_section(conn, section, base)?;
        match section {
            SetupSection::Sync => cfg.sync = serde_json::from_value::<SyncConfig>(v)?,
            SetupSection::Suggest => cfg.suggest = serde_json::from_value::<SuggestConfig>(v)?,
            SetupSection::Admin => cfg.admin = serde_json::from_value::<AdminCredentials>(v)?,
            SetupSection::Defaults => {
                cfg.defaults = serde_json::from_value::<ScheduleDefaults>(v)?
            }
        }
    }
    Ok(cfg)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let cfg = match load_config(conn, &state.base_config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "sync": cfg.sync,
            "suggest": cfg.suggest,
            "admin": {
                "loginId": cfg.admin.login_id,
                "passwordSet": !cfg.admin.password.is_empty()
            },
            "defaults": cfg.defaults
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section, &state.base_config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    let cfg = match load_config(conn, &state.base_config) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(e) = state.apply_config(cfg) {
        return err(&req.id, "config_failed", e.to_string(), None);
    }
    tracing::info!(section = section_raw, "setup updated");
    ok(&req.id, json!({ "ok": true, "source": state.source }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
