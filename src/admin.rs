use crate::model::{DailySchedule, ScheduleBook, ScheduleDefaults, Student, Weekday, BUSES, NO_BUS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("student not found: {0}")]
    StudentNotFound(String),
    #[error("class time not found: {0}")]
    ClassTimeNotFound(String),
}

/// Add-student form. One template is stamped onto every selected day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewStudent {
    pub name: String,
    pub days: Vec<Weekday>,
    pub class_time: Option<String>,
    pub pickup_bus: Option<String>,
    pub dropoff_bus: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: Option<String>,
    pub pickup_time: Option<String>,
    pub dropoff_time: Option<String>,
}

/// Returns the new student's id, or `None` when the form is incomplete.
pub fn add_student(
    book: &mut ScheduleBook,
    form: &NewStudent,
    defaults: &ScheduleDefaults,
    now_ms: i64,
) -> Option<String> {
    let name = form.name.trim();
    let pickup_bus = form
        .pickup_bus
        .clone()
        .unwrap_or_else(|| BUSES[0].to_string());
    let dropoff_bus = form
        .dropoff_bus
        .clone()
        .unwrap_or_else(|| BUSES[0].to_string());
    let pickup_ok = pickup_bus == NO_BUS || !form.pickup_location.trim().is_empty();
    if name.is_empty() || form.days.is_empty() || !pickup_ok {
        return None;
    }

    let template = DailySchedule {
        class_time: form
            .class_time
            .clone()
            .or_else(|| book.class_times.first().cloned())
            .unwrap_or_default(),
        pickup_bus,
        dropoff_bus,
        pickup_location: form.pickup_location.trim().to_string(),
        dropoff_location: form
            .dropoff_location
            .clone()
            .unwrap_or_else(|| defaults.dropoff_location.clone()),
        pickup_time: form
            .pickup_time
            .clone()
            .unwrap_or_else(|| defaults.pickup_time.clone()),
        dropoff_time: form
            .dropoff_time
            .clone()
            .unwrap_or_else(|| defaults.dropoff_time.clone()),
    };
    let schedules = form
        .days
        .iter()
        .map(|d| (*d, template.clone()))
        .collect::<BTreeMap<_, _>>();

    let id = book.next_student_id(now_ms);
    book.students.push(Student {
        id: id.clone(),
        name: name.to_string(),
        schedules,
    });
    Some(id)
}

/// Field-level changes to one day's schedule. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulePatch {
    pub class_time: Option<String>,
    pub pickup_bus: Option<String>,
    pub dropoff_bus: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: Option<String>,
    pub dropoff_time: Option<String>,
}

impl SchedulePatch {
    fn apply(&self, sch: &mut DailySchedule) {
        let fields = [
            (&self.class_time, &mut sch.class_time),
            (&self.pickup_bus, &mut sch.pickup_bus),
            (&self.dropoff_bus, &mut sch.dropoff_bus),
            (&self.pickup_location, &mut sch.pickup_location),
            (&self.dropoff_location, &mut sch.dropoff_location),
            (&self.pickup_time, &mut sch.pickup_time),
            (&self.dropoff_time, &mut sch.dropoff_time),
        ];
        for (patch, slot) in fields {
            if let Some(v) = patch {
                *slot = v.clone();
            }
        }
    }
}

/// Edit-student payload. Applied in order: schedule replacement, day
/// toggles, per-day field patches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentEdit {
    pub name: Option<String>,
    pub schedules: Option<BTreeMap<Weekday, DailySchedule>>,
    pub days: BTreeMap<Weekday, bool>,
    pub patch: BTreeMap<Weekday, SchedulePatch>,
}

pub fn update_student(
    book: &mut ScheduleBook,
    id: &str,
    edit: &StudentEdit,
    defaults: &ScheduleDefaults,
) -> Result<(), AdminError> {
    let fresh_day = DailySchedule::default_for(&book.class_times, defaults);
    let Some(student) = book.student_mut(id) else {
        return Err(AdminError::StudentNotFound(id.to_string()));
    };

    if let Some(name) = edit.name.as_deref().map(str::trim) {
        if !name.is_empty() {
            student.name = name.to_string();
        }
    }
    if let Some(schedules) = &edit.schedules {
        student.schedules = schedules.clone();
    }
    for (day, enabled) in &edit.days {
        if *enabled {
            student
                .schedules
                .entry(*day)
                .or_insert_with(|| fresh_day.clone());
        } else {
            student.schedules.remove(day);
        }
    }
    for (day, patch) in &edit.patch {
        // Patches only touch days that are switched on.
        if let Some(sch) = student.schedules.get_mut(day) {
            patch.apply(sch);
        }
    }
    Ok(())
}

pub fn delete_student(book: &mut ScheduleBook, id: &str) -> Result<Student, AdminError> {
    let Some(idx) = book.students.iter().position(|s| s.id == id) else {
        return Err(AdminError::StudentNotFound(id.to_string()));
    };
    Ok(book.students.remove(idx))
}

/// Appends a label; `false` for empty or duplicate labels.
pub fn add_class_time(book: &mut ScheduleBook, label: &str) -> bool {
    let label = label.trim();
    if label.is_empty() || book.has_class_time(label) {
        return false;
    }
    book.class_times.push(label.to_string());
    true
}

/// Removes exactly one registry entry. Student schedules keep the label.
pub fn delete_class_time(book: &mut ScheduleBook, label: &str) -> Result<usize, AdminError> {
    let Some(idx) = book.class_times.iter().position(|t| t == label) else {
        return Err(AdminError::ClassTimeNotFound(label.to_string()));
    };
    book.class_times.remove(idx);
    Ok(idx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Swaps with the neighbour; `false` at either boundary or out of range.
pub fn move_class_time(book: &mut ScheduleBook, index: usize, dir: Direction) -> bool {
    let len = book.class_times.len();
    if index >= len {
        return false;
    }
    match dir {
        Direction::Up if index > 0 => {
            book.class_times.swap(index - 1, index);
            true
        }
        Direction::Down if index + 1 < len => {
            book.class_times.swap(index, index + 1);
            true
        }
        _ => false,
    }
}

/// One pickup stop handed to the suggestion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupStop {
    pub id: String,
    pub location: String,
    pub current_pickup_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub student_id: String,
    pub suggested_pickup_time: String,
}

/// Students picked up by `bus` for `class_time` on `day`.
pub fn pickup_stops(
    book: &ScheduleBook,
    day: Weekday,
    class_time: &str,
    bus: &str,
) -> Vec<PickupStop> {
    book.students
        .iter()
        .filter_map(|s| {
            let sch = s.schedule(day)?;
            (sch.class_time == class_time && sch.pickup_bus == bus).then(|| PickupStop {
                id: s.id.clone(),
                location: sch.pickup_location.clone(),
                current_pickup_time: sch.pickup_time.clone(),
            })
        })
        .collect()
}

/// Overwrites pickup times for students with a suggestion and a schedule on
/// `day`. Returns how many schedules changed.
pub fn apply_pickup_suggestions(
    book: &mut ScheduleBook,
    day: Weekday,
    suggestions: &[Suggestion],
) -> usize {
    let mut updated = 0;
    for student in book.students.iter_mut() {
        let Some(suggestion) = suggestions.iter().find(|s| s.student_id == student.id) else {
            continue;
        };
        if let Some(sch) = student.schedules.get_mut(&day) {
            sch.pickup_time = suggestion.suggested_pickup_time.clone();
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::day_timetable;

    fn form(name: &str, days: &[Weekday], pickup_bus: &str, location: &str) -> NewStudent {
        NewStudent {
            name: name.into(),
            days: days.to_vec(),
            class_time: Some("2:30".into()),
            pickup_bus: Some(pickup_bus.into()),
            dropoff_bus: Some("1호차".into()),
            pickup_location: location.into(),
            ..NewStudent::default()
        }
    }

    #[test]
    fn add_student_stamps_template_on_each_selected_day() {
        let mut book = ScheduleBook::seed();
        let defaults = ScheduleDefaults::default();
        let id = add_student(
            &mut book,
            &form("New", &[Weekday::Tue, Weekday::Thu], "2호차", "Park gate"),
            &defaults,
            1_700_000_000_000,
        )
        .expect("added");
        let s = book.student(&id).expect("present");
        assert_eq!(s.schedules.len(), 2);
        let tue = s.schedule(Weekday::Tue).expect("tue");
        assert_eq!(tue.class_time, "2:30");
        assert_eq!(tue.pickup_bus, "2호차");
        assert_eq!(tue.dropoff_bus, "1호차");
        assert_eq!(tue.dropoff_location, "학원 정문");
        assert_eq!(tue.pickup_time, "14:00");
        assert_eq!(s.schedule(Weekday::Thu), Some(tue));
    }

    #[test]
    fn add_student_silently_refuses_incomplete_forms() {
        let mut book = ScheduleBook::seed();
        let before = book.clone();
        let d = ScheduleDefaults::default();
        assert!(add_student(&mut book, &form("  ", &[Weekday::Mon], "1호차", "x"), &d, 1).is_none());
        assert!(add_student(&mut book, &form("A", &[], "1호차", "x"), &d, 1).is_none());
        assert!(add_student(&mut book, &form("A", &[Weekday::Mon], "1호차", " "), &d, 1).is_none());
        assert_eq!(book, before);

        // Not riding for pickup means no pickup location is needed.
        assert!(add_student(&mut book, &form("A", &[Weekday::Mon], NO_BUS, ""), &d, 1).is_some());
    }

    #[test]
    fn toggling_days_deletes_or_reinstates_entries() {
        let mut book = ScheduleBook::seed();
        let defaults = ScheduleDefaults::default();
        let edit = StudentEdit {
            days: [(Weekday::Mon, false), (Weekday::Tue, true), (Weekday::Wed, true)]
                .into_iter()
                .collect(),
            ..StudentEdit::default()
        };
        let wed_before = book.student("1").and_then(|s| s.schedule(Weekday::Wed)).cloned();
        update_student(&mut book, "1", &edit, &defaults).expect("update");
        let s = book.student("1").expect("kim");
        assert!(s.schedule(Weekday::Mon).is_none());
        let tue = s.schedule(Weekday::Tue).expect("tue on");
        assert_eq!(tue.class_time, "2:30");
        assert_eq!(tue.pickup_location, "");
        // Already-on days are not reset.
        assert_eq!(s.schedule(Weekday::Wed).cloned(), wed_before);
    }

    #[test]
    fn update_replaces_name_and_patches_fields() {
        let mut book = ScheduleBook::seed();
        let edit = StudentEdit {
            name: Some("Renamed".into()),
            patch: [
                (
                    Weekday::Tue,
                    SchedulePatch {
                        pickup_time: Some("15:00".into()),
                        ..SchedulePatch::default()
                    },
                ),
                (
                    Weekday::Mon,
                    SchedulePatch {
                        pickup_time: Some("09:00".into()),
                        ..SchedulePatch::default()
                    },
                ),
            ]
            .into_iter()
            .collect(),
            ..StudentEdit::default()
        };
        update_student(&mut book, "2", &edit, &ScheduleDefaults::default()).expect("update");
        let s = book.student("2").expect("lee");
        assert_eq!(s.name, "Renamed");
        assert_eq!(s.schedule(Weekday::Tue).map(|x| x.pickup_time.as_str()), Some("15:00"));
        assert!(s.schedule(Weekday::Mon).is_none());
        assert_eq!(
            update_student(&mut book, "nope", &edit, &ScheduleDefaults::default()),
            Err(AdminError::StudentNotFound("nope".into()))
        );
    }

    #[test]
    fn deleted_student_leaves_every_projection() {
        let mut book = ScheduleBook::seed();
        delete_student(&mut book, "3").expect("delete");
        for day in Weekday::ALL {
            let tt = day_timetable(&book.students, day, &book.class_times);
            assert!(tt
                .sections
                .iter()
                .flat_map(|s| s.routes.iter())
                .flat_map(|r| r.riders.iter())
                .all(|row| row.student_id != "3"));
        }
        assert!(delete_student(&mut book, "3").is_err());
    }

    #[test]
    fn class_time_registry_keeps_manual_order() {
        let mut book = ScheduleBook::seed();
        assert!(add_class_time(&mut book, "1:30"));
        assert!(!add_class_time(&mut book, "2:30"));
        assert!(!add_class_time(&mut book, "  "));
        assert_eq!(book.class_times, vec!["2:30", "3:30", "4:30", "5:30", "1:30"]);

        assert_eq!(delete_class_time(&mut book, "3:30"), Ok(1));
        assert_eq!(book.class_times, vec!["2:30", "4:30", "5:30", "1:30"]);

        assert!(!move_class_time(&mut book, 0, Direction::Up));
        assert!(!move_class_time(&mut book, 3, Direction::Down));
        assert!(move_class_time(&mut book, 3, Direction::Up));
        assert_eq!(book.class_times, vec!["2:30", "4:30", "1:30", "5:30"]);
    }

    #[test]
    fn deleting_class_time_does_not_touch_students() {
        let mut book = ScheduleBook::seed();
        delete_class_time(&mut book, "4:30").expect("delete");
        let park = book.student("3").expect("park");
        assert_eq!(park.schedule(Weekday::Mon).map(|s| s.class_time.as_str()), Some("4:30"));
        let tt = day_timetable(&book.students, Weekday::Mon, &book.class_times);
        assert!(tt.sections.iter().all(|s| s.class_time != "4:30"));
    }

    #[test]
    fn suggestions_overwrite_only_pickup_times_of_matching_students() {
        let mut book = ScheduleBook::seed();
        let stops = pickup_stops(&book, Weekday::Mon, "2:30", "1호차");
        assert_eq!(
            stops,
            vec![PickupStop {
                id: "1".into(),
                location: "현대아파트 정문".into(),
                current_pickup_time: "14:10".into(),
            }]
        );
        let updated = apply_pickup_suggestions(
            &mut book,
            Weekday::Mon,
            &[
                Suggestion {
                    student_id: "1".into(),
                    suggested_pickup_time: "13:55".into(),
                },
                Suggestion {
                    student_id: "2".into(),
                    suggested_pickup_time: "13:00".into(),
                },
            ],
        );
        // Student 2 has no Monday schedule.
        assert_eq!(updated, 1);
        let kim = book.student("1").expect("kim");
        assert_eq!(kim.schedule(Weekday::Mon).map(|s| s.pickup_time.as_str()), Some("13:55"));
        assert_eq!(kim.schedule(Weekday::Mon).map(|s| s.dropoff_time.as_str()), Some("14:25"));
        assert_eq!(kim.schedule(Weekday::Wed).map(|s| s.pickup_time.as_str()), Some("14:10"));
    }
}
