use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::Weekday;
use serde::de::DeserializeOwned;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) => Ok(v.to_string()),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

/// Day parameter; `default` applies when the key is absent.
pub fn day_param(
    req: &Request,
    key: &str,
    default: Option<Weekday>,
) -> Result<Weekday, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(raw) => Weekday::parse(raw).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("unknown weekday: {}", raw),
                None,
            )
        }),
        None => default.ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn parse_params<T: DeserializeOwned>(req: &Request) -> Result<T, serde_json::Value> {
    let params = if req.params.is_null() {
        serde_json::json!({})
    } else {
        req.params.clone()
    };
    serde_json::from_value(params)
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

pub fn require_admin(state: &AppState, req: &Request) -> Result<(), serde_json::Value> {
    if state.session.admin {
        Ok(())
    } else {
        Err(err(
            &req.id,
            "admin_required",
            "log in as administrator first",
            None,
        ))
    }
}
