use crate::admin::{self, Direction};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_admin, required_str};
use crate::ipc::types::{AppState, PendingDelete, Request};
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "classTimes": state.book.class_times }))
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let label = match required_str(req, "classTime") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let applied = admin::add_class_time(&mut state.book, &label);
    if applied {
        tracing::info!(class_time = %label.trim(), "class time added");
        state.save();
    }
    ok(
        &req.id,
        json!({ "applied": applied, "classTimes": state.book.class_times }),
    )
}

fn handle_mark_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let label = match required_str(req, "classTime") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !state.book.has_class_time(&label) {
        return err(&req.id, "not_found", "class time not found", None);
    }
    state.session.pending_delete = Some(PendingDelete::ClassTime(label.clone()));
    ok(&req.id, json!({ "pendingDelete": { "classTime": label } }))
}

fn handle_confirm_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let Some(PendingDelete::ClassTime(label)) = state.session.pending_delete.clone() else {
        return err(
            &req.id,
            "no_pending_delete",
            "no class time is marked for deletion",
            None,
        );
    };
    state.session.pending_delete = None;
    if let Err(e) = admin::delete_class_time(&mut state.book, &label) {
        return err(&req.id, "not_found", e.to_string(), None);
    }
    tracing::info!(class_time = %label, "class time deleted");
    state.save();
    ok(
        &req.id,
        json!({ "deleted": label, "classTimes": state.book.class_times }),
    )
}

fn handle_cancel_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    if matches!(state.session.pending_delete, Some(PendingDelete::ClassTime(_))) {
        state.session.pending_delete = None;
    }
    ok(&req.id, json!({ "pendingDelete": null }))
}

fn handle_move(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let index = match req.params.get("index").and_then(|v| v.as_u64()) {
        Some(i) => i as usize,
        None => match req.params.get("classTime").and_then(|v| v.as_str()) {
            Some(label) => match state.book.class_times.iter().position(|t| t == label) {
                Some(i) => i,
                None => return err(&req.id, "not_found", "class time not found", None),
            },
            None => return err(&req.id, "bad_params", "missing index or classTime", None),
        },
    };
    let Some(dir) = req
        .params
        .get("direction")
        .and_then(|v| v.as_str())
        .and_then(Direction::parse)
    else {
        return err(&req.id, "bad_params", "direction must be up or down", None);
    };

    let moved = admin::move_class_time(&mut state.book, index, dir);
    if moved {
        state.save();
    }
    ok(
        &req.id,
        json!({ "moved": moved, "classTimes": state.book.class_times }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classTimes.list" => Some(handle_list(state, req)),
        "classTimes.add" => Some(handle_add(state, req)),
        "classTimes.markDelete" => Some(handle_mark_delete(state, req)),
        "classTimes.confirmDelete" => Some(handle_confirm_delete(state, req)),
        "classTimes.cancelDelete" => Some(handle_cancel_delete(state, req)),
        "classTimes.move" => Some(handle_move(state, req)),
        _ => None,
    }
}
