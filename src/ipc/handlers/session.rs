use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let login_id = req
        .params
        .get("loginId")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if !state.config.admin.matches(login_id, password) {
        tracing::warn!("administrator login rejected");
        return err(
            &req.id,
            "bad_credentials",
            "login id or password is incorrect",
            None,
        );
    }
    state.session.admin = true;
    tracing::info!("administrator mode on");
    ok(&req.id, json!({ "admin": true }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.admin = false;
    state.session.pending_delete = None;
    ok(&req.id, json!({ "admin": false }))
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "admin": state.session.admin,
            "pendingDelete": state.session.pending_delete,
            "syncing": state.sync.status().syncing
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.status" => Some(handle_status(state, req)),
        _ => None,
    }
}
