use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel bus identifier: the student does not ride for that leg.
pub const NO_BUS: &str = "미이용";

pub const BUSES: [&str; 2] = ["1호차", "2호차"];

pub const DEFAULT_CLASS_TIMES: [&str; 4] = ["2:30", "3:30", "4:30", "5:30"];

pub const ACADEMY_GATE: &str = "학원 정문";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Mon => "월",
            Weekday::Tue => "화",
            Weekday::Wed => "수",
            Weekday::Thu => "목",
            Weekday::Fri => "금",
        }
    }

    /// Accepts the native labels and English short names.
    pub fn parse(s: &str) -> Option<Self> {
        let t = s.trim();
        if let Some(d) = Self::ALL.into_iter().find(|d| d.label() == t) {
            return Some(d);
        }
        match t.to_ascii_lowercase().as_str() {
            "mon" | "monday" => Some(Weekday::Mon),
            "tue" | "tuesday" => Some(Weekday::Tue),
            "wed" | "wednesday" => Some(Weekday::Wed),
            "thu" | "thursday" => Some(Weekday::Thu),
            "fri" | "friday" => Some(Weekday::Fri),
            _ => None,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Weekdays are map keys in the document, so they travel as plain strings.
impl Serialize for Weekday {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Weekday {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Weekday::parse(&s).ok_or_else(|| de::Error::custom(format!("unknown weekday: {}", s)))
    }
}

pub fn is_bus(id: &str) -> bool {
    BUSES.contains(&id)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailySchedule {
    #[serde(deserialize_with = "null_as_empty")]
    pub class_time: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub pickup_bus: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub dropoff_bus: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub pickup_location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub dropoff_location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub pickup_time: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub dropoff_time: String,
}

// Spreadsheet backends write empty cells as null.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl DailySchedule {
    pub fn rides_pickup(&self) -> bool {
        self.pickup_bus != NO_BUS
    }

    pub fn rides_dropoff(&self) -> bool {
        self.dropoff_bus != NO_BUS
    }

    /// Schedule inserted when a day is switched on for an existing student.
    pub fn default_for(class_times: &[String], defaults: &ScheduleDefaults) -> Self {
        DailySchedule {
            class_time: class_times.first().cloned().unwrap_or_default(),
            pickup_bus: BUSES[0].to_string(),
            dropoff_bus: BUSES[0].to_string(),
            pickup_location: String::new(),
            dropoff_location: defaults.dropoff_location.clone(),
            pickup_time: defaults.pickup_time.clone(),
            dropoff_time: defaults.dropoff_time.clone(),
        }
    }
}

/// Values prefilled into new daily schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleDefaults {
    pub dropoff_location: String,
    pub pickup_time: String,
    pub dropoff_time: String,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        ScheduleDefaults {
            dropoff_location: ACADEMY_GATE.to_string(),
            pickup_time: "14:00".to_string(),
            dropoff_time: "15:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "known_days")]
    pub schedules: BTreeMap<Weekday, DailySchedule>,
}

/// Drops entries keyed by anything but a weekday (and null entries) instead
/// of rejecting the whole document.
fn known_days<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Weekday, DailySchedule>, D::Error> {
    let raw = Option::<BTreeMap<String, Option<serde_json::Value>>>::deserialize(deserializer)?
        .unwrap_or_default();
    let mut schedules = BTreeMap::new();
    for (key, value) in raw {
        let Some(day) = Weekday::parse(&key) else {
            tracing::warn!(key = %key, "skipping schedule with unknown day key");
            continue;
        };
        if let Some(value) = value {
            let sch = DailySchedule::deserialize(value).map_err(de::Error::custom)?;
            schedules.insert(day, sch);
        }
    }
    Ok(schedules)
}

impl Student {
    pub fn schedule(&self, day: Weekday) -> Option<&DailySchedule> {
        self.schedules.get(&day)
    }
}

// Spreadsheet backends sometimes hand ids back as numbers.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or numeric student id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            if v.fract() == 0.0 && v.abs() < 9.0e15 {
                Ok(format!("{}", v as i64))
            } else {
                Ok(v.to_string())
            }
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// The whole synchronized document: every student plus the ordered
/// class-time registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBook {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub class_times: Vec<String>,
}

impl ScheduleBook {
    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn student_mut(&mut self, id: &str) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| s.id == id)
    }

    pub fn has_class_time(&self, label: &str) -> bool {
        self.class_times.iter().any(|t| t == label)
    }

    /// Timestamp-derived id, bumped past any id already in use.
    pub fn next_student_id(&self, now_ms: i64) -> String {
        let mut candidate = now_ms;
        loop {
            let id = candidate.to_string();
            if self.student(&id).is_none() {
                return id;
            }
            candidate += 1;
        }
    }

    pub fn seed() -> Self {
        let gate = ACADEMY_GATE;
        let bus1 = BUSES[0];
        let bus2 = BUSES[1];
        let ride = |class_time: &str, bus: &str, from: &str, pickup: &str, dropoff: &str| {
            DailySchedule {
                class_time: class_time.to_string(),
                pickup_bus: bus.to_string(),
                dropoff_bus: bus.to_string(),
                pickup_location: from.to_string(),
                dropoff_location: gate.to_string(),
                pickup_time: pickup.to_string(),
                dropoff_time: dropoff.to_string(),
            }
        };
        let on_days = |days: &[Weekday], sch: DailySchedule| {
            days.iter()
                .map(|d| (*d, sch.clone()))
                .collect::<BTreeMap<_, _>>()
        };

        ScheduleBook {
            students: vec![
                Student {
                    id: "1".to_string(),
                    name: "김지수".to_string(),
                    schedules: on_days(
                        &[Weekday::Mon, Weekday::Wed, Weekday::Fri],
                        ride("2:30", bus1, "현대아파트 정문", "14:10", "14:25"),
                    ),
                },
                Student {
                    id: "2".to_string(),
                    name: "이민호".to_string(),
                    schedules: on_days(
                        &[Weekday::Tue, Weekday::Thu],
                        ride("3:30", bus1, "래미안 상가", "15:10", "15:25"),
                    ),
                },
                Student {
                    id: "3".to_string(),
                    name: "박서준".to_string(),
                    schedules: on_days(
                        &Weekday::ALL,
                        ride("4:30", bus2, "자이 후문", "16:05", "16:25"),
                    ),
                },
            ],
            class_times: DEFAULT_CLASS_TIMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weekday_parses_native_and_english_labels() {
        assert_eq!(Weekday::parse("수"), Some(Weekday::Wed));
        assert_eq!(Weekday::parse(" FRI "), Some(Weekday::Fri));
        assert_eq!(Weekday::parse("토"), None);
    }

    #[test]
    fn document_uses_native_day_keys_and_camel_case() {
        let book = ScheduleBook::seed();
        let v = serde_json::to_value(&book).expect("serialize");
        let kim = &v["students"][0];
        assert_eq!(kim["schedules"]["월"]["pickupTime"], "14:10");
        assert!(kim["schedules"].get("화").is_none());
        assert_eq!(v["classTimes"], json!(["2:30", "3:30", "4:30", "5:30"]));
    }

    #[test]
    fn numeric_ids_and_missing_fields_are_tolerated() {
        let v = json!({
            "students": [
                { "id": 17, "name": "A", "schedules": { "화": { "classTime": "3:30" } } }
            ],
            "classTimes": ["3:30"]
        });
        let book: ScheduleBook = serde_json::from_value(v).expect("parse");
        assert_eq!(book.students[0].id, "17");
        let sch = book.students[0].schedule(Weekday::Tue).expect("tuesday");
        assert_eq!(sch.pickup_time, "");
    }

    #[test]
    fn unknown_day_keys_and_null_cells_do_not_reject_the_document() {
        let v = json!({
            "students": [
                {
                    "id": "5",
                    "name": null,
                    "schedules": {
                        "월": { "classTime": "2:30", "pickupBus": "1호차", "pickupTime": null },
                        "토": { "classTime": "2:30" },
                        "Sat": 3,
                        "수": null
                    }
                },
                { "id": "6", "name": "B", "schedules": null }
            ],
            "classTimes": ["2:30"]
        });
        let book: ScheduleBook = serde_json::from_value(v).expect("parse");
        assert_eq!(book.students.len(), 2);
        let first = &book.students[0];
        assert_eq!(first.name, "");
        assert_eq!(first.schedules.keys().copied().collect::<Vec<_>>(), vec![Weekday::Mon]);
        let mon = first.schedule(Weekday::Mon).expect("monday");
        assert_eq!(mon.pickup_time, "");
        assert_eq!(mon.pickup_bus, "1호차");
        assert!(book.students[1].schedules.is_empty());
    }

    #[test]
    fn next_student_id_skips_collisions() {
        let mut book = ScheduleBook::default();
        book.students.push(Student {
            id: "1000".into(),
            name: "x".into(),
            schedules: BTreeMap::new(),
        });
        assert_eq!(book.next_student_id(1000), "1001");
        assert_eq!(book.next_student_id(5), "5");
    }
}
