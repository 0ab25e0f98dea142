use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{day_param, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{is_bus, Weekday};
use crate::routes;
use serde_json::json;

fn handle_timetable_day(state: &mut AppState, req: &Request) -> serde_json::Value {
    // The parent view opens on Monday.
    let day = match day_param(req, "day", Some(Weekday::Mon)) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let tt = routes::day_timetable(&state.book.students, day, &state.book.class_times);
    ok(
        &req.id,
        json!({
            "day": tt.day,
            "hasAnyRides": tt.has_any_rides(),
            "sections": tt.sections
        }),
    )
}

fn handle_timetable_route(state: &mut AppState, req: &Request) -> serde_json::Value {
    let day = match day_param(req, "day", None) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let class_time = match required_str(req, "classTime") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // Orphaned labels are invisible in every projection.
    if !state.book.has_class_time(&class_time) {
        return err(
            &req.id,
            "bad_params",
            format!("not a registered class time: {}", class_time),
            None,
        );
    }
    let bus = match required_str(req, "bus") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !is_bus(&bus) {
        return err(&req.id, "bad_params", format!("unknown bus: {}", bus), None);
    }
    let route = routes::route_for(&state.book.students, day, &class_time, &bus);
    ok(
        &req.id,
        json!({
            "day": day,
            "classTime": class_time,
            "route": route
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.day" => Some(handle_timetable_day(state, req)),
        "timetable.route" => Some(handle_timetable_route(state, req)),
        _ => None,
    }
}
