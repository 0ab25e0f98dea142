use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_admin, required_str};
use crate::ipc::types::{AppState, Request};
use crate::sync::DataSource;
use serde_json::json;
use std::path::PathBuf;

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    match backup::export_bundle(&state.book, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "ok": true,
                "path": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "sha256": summary.sha256,
                "studentCount": summary.student_count
            }),
        ),
        Err(e) => err(&req.id, "backup_export_failed", format!("{e:?}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };
    let (book, summary) = match backup::import_bundle(&in_path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "backup_import_failed", format!("{e:?}"), None),
    };

    state.book = book;
    state.source = DataSource::Bundle;
    state.session.pending_delete = None;
    tracing::info!(
        path = %in_path.to_string_lossy(),
        students = summary.student_count,
        "document restored from bundle"
    );
    // A restore is a mutation like any other: the remote copy is replaced.
    state.save();
    ok(
        &req.id,
        json!({
            "ok": true,
            "bundleFormatDetected": summary.bundle_format_detected,
            "studentCount": summary.student_count,
            "classTimes": state.book.class_times
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_export(state, req)),
        "backup.importBundle" => Some(handle_import(state, req)),
        _ => None,
    }
}
