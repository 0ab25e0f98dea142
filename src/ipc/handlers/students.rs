use crate::admin::{self, AdminError, NewStudent, StudentEdit};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{parse_params, require_admin, required_str};
use crate::ipc::types::{AppState, PendingDelete, Request};
use crate::routes;
use serde_json::json;

fn not_found(req: &Request, e: AdminError) -> serde_json::Value {
    err(&req.id, "not_found", e.to_string(), None)
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    ok(
        &req.id,
        json!({ "students": routes::roster(&state.book.students) }),
    )
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.book.student(&student_id) {
        Some(s) => ok(&req.id, json!({ "student": s })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let form: NewStudent = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let now_ms = chrono::Utc::now().timestamp_millis();
    let created = admin::add_student(&mut state.book, &form, &state.config.defaults, now_ms);
    let Some(student_id) = created else {
        // Incomplete forms are ignored, not reported.
        return ok(&req.id, json!({ "applied": false }));
    };
    tracing::info!(student_id = %student_id, days = form.days.len(), "student created");
    state.save();
    ok(
        &req.id,
        json!({ "applied": true, "studentId": student_id }),
    )
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let edit: StudentEdit = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(e) =
        admin::update_student(&mut state.book, &student_id, &edit, &state.config.defaults)
    {
        return not_found(req, e);
    }
    tracing::info!(student_id = %student_id, "student updated");
    state.save();
    ok(
        &req.id,
        json!({ "student": state.book.student(&student_id) }),
    )
}

fn handle_students_mark_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(student) = state.book.student(&student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };
    let name = student.name.clone();
    state.session.pending_delete = Some(PendingDelete::Student(student_id.clone()));
    ok(
        &req.id,
        json!({ "pendingDelete": { "studentId": student_id, "name": name } }),
    )
}

fn handle_students_confirm_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let Some(PendingDelete::Student(student_id)) = state.session.pending_delete.clone() else {
        return err(
            &req.id,
            "no_pending_delete",
            "no student is marked for deletion",
            None,
        );
    };
    state.session.pending_delete = None;
    if let Err(e) = admin::delete_student(&mut state.book, &student_id) {
        return not_found(req, e);
    }
    tracing::info!(student_id = %student_id, "student deleted");
    state.save();
    ok(&req.id, json!({ "deleted": student_id }))
}

fn handle_students_cancel_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    if matches!(state.session.pending_delete, Some(PendingDelete::Student(_))) {
        state.session.pending_delete = None;
    }
    ok(&req.id, json!({ "pendingDelete": null }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.markDelete" => Some(handle_students_mark_delete(state, req)),
        "students.confirmDelete" => Some(handle_students_confirm_delete(state, req)),
        "students.cancelDelete" => Some(handle_students_cancel_delete(state, req)),
        _ => None,
    }
}
