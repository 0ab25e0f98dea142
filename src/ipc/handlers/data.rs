use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_data_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "source": state.source,
            "document": state.book
        }),
    )
}

fn handle_data_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.reload();
    ok(
        &req.id,
        json!({
            "source": state.source,
            "studentCount": state.book.students.len(),
            "classTimes": state.book.class_times
        }),
    )
}

fn handle_sync_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(state.sync.status()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "data.get" => Some(handle_data_get(state, req)),
        "data.refresh" => Some(handle_data_refresh(state, req)),
        "sync.status" => Some(handle_sync_status(state, req)),
        _ => None,
    }
}
