use crate::admin;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{day_param, require_admin, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::is_bus;
use crate::suggest::RouteQuery;
use serde_json::json;

fn handle_suggest_pickup_times(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_admin(state, req) {
        return resp;
    }
    let class_time = match required_str(req, "classTime") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !state.book.has_class_time(&class_time) {
        return err(
            &req.id,
            "bad_params",
            format!("not a registered class time: {}", class_time),
            None,
        );
    }
    let day = match day_param(req, "day", None) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let bus = match required_str(req, "bus") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !is_bus(&bus) {
        return err(&req.id, "bad_params", format!("unknown bus: {}", bus), None);
    }

    let stops = admin::pickup_stops(&state.book, day, &class_time, &bus);
    if stops.is_empty() {
        return ok(
            &req.id,
            json!({
                "applied": false,
                "updated": 0,
                "notice": "no students are picked up by this bus for that class"
            }),
        );
    }

    let query = RouteQuery {
        day,
        class_time: &class_time,
        bus: &bus,
    };
    let suggestions = match state.suggest.suggest(query, &stops) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "pickup time suggestion failed");
            Vec::new()
        }
    };
    if suggestions.is_empty() {
        return ok(
            &req.id,
            json!({
                "applied": false,
                "updated": 0,
                "notice": "suggestion failed or returned no changes"
            }),
        );
    }

    let updated = admin::apply_pickup_suggestions(&mut state.book, day, &suggestions);
    tracing::info!(
        day = %day,
        class_time = %class_time,
        bus = %bus,
        updated,
        "applied pickup time suggestions"
    );
    state.save();
    ok(
        &req.id,
        json!({
            "applied": true,
            "updated": updated,
            "suggestions": suggestions,
            "notice": "pickup times updated from suggestions"
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "routes.suggestPickupTimes" => Some(handle_suggest_pickup_times(state, req)),
        _ => None,
    }
}
