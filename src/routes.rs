use crate::model::{DailySchedule, Student, Weekday, BUSES, NO_BUS};
use serde::Serialize;

pub const INDIVIDUAL_PICKUP: &str = "개별 등원";
pub const INDIVIDUAL_DROPOFF: &str = "개별 하원";

/// Time used when a leg has no time set; sorts ahead of every real HH:mm.
const MISSING_TIME: &str = "00:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LegView {
    /// The leg rides the bus whose route is being shown.
    #[serde(rename_all = "camelCase")]
    OnBus { time: String, location: String },
    /// The leg does not use the shuttle at all.
    Individual { label: &'static str },
    /// The leg rides the other bus.
    OtherBus { bus: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRow {
    pub position: usize,
    pub student_id: String,
    pub name: String,
    pub bus_tag: String,
    pub sort_time: String,
    pub pickup: LegView,
    pub dropoff: LegView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusRoute {
    pub bus: String,
    pub riders: Vec<RouteRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSection {
    pub class_time: String,
    pub routes: Vec<BusRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTimetable {
    pub day: Weekday,
    pub sections: Vec<ClassSection>,
}

impl DayTimetable {
    /// False when no route on the day has a rider, even if a section exists
    /// for students who ride neither leg.
    pub fn has_any_rides(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|s| &s.routes)
            .any(|r| !r.riders.is_empty())
    }
}

/// `1호차` when both legs share a bus, `1호차/2호차` otherwise.
pub fn bus_tag(sch: &DailySchedule) -> String {
    if sch.pickup_bus == sch.dropoff_bus {
        sch.pickup_bus.clone()
    } else {
        format!("{}/{}", sch.pickup_bus, sch.dropoff_bus)
    }
}

fn sort_time<'a>(sch: &'a DailySchedule, bus: &str) -> &'a str {
    let t = if sch.pickup_bus == bus {
        sch.pickup_time.as_str()
    } else {
        sch.dropoff_time.as_str()
    };
    if t.is_empty() {
        MISSING_TIME
    } else {
        t
    }
}

fn rides_bus(sch: &DailySchedule, bus: &str) -> bool {
    sch.pickup_bus == bus || sch.dropoff_bus == bus
}

fn leg_view(
    leg_bus: &str,
    time: &str,
    location: &str,
    other_leg_on_bus: bool,
    bus: &str,
    individual: &'static str,
) -> LegView {
    if leg_bus == bus {
        LegView::OnBus {
            time: time.to_string(),
            location: location.to_string(),
        }
    } else if leg_bus == NO_BUS && other_leg_on_bus {
        LegView::Individual { label: individual }
    } else {
        LegView::OtherBus {
            bus: leg_bus.to_string(),
            label: format!("{} 탑승", leg_bus),
        }
    }
}

/// Ordered riders of one bus for one class time on one day.
pub fn route_for(students: &[Student], day: Weekday, class_time: &str, bus: &str) -> BusRoute {
    let mut riders: Vec<(&Student, &DailySchedule)> = students
        .iter()
        .filter_map(|s| s.schedule(day).map(|sch| (s, sch)))
        .filter(|(_, sch)| sch.class_time == class_time && rides_bus(sch, bus))
        .collect();
    // sort_by is stable: equal times keep roster order.
    riders.sort_by(|(_, a), (_, b)| sort_time(a, bus).cmp(sort_time(b, bus)));

    let riders = riders
        .into_iter()
        .enumerate()
        .map(|(idx, (s, sch))| {
            let pickup_on_bus = sch.pickup_bus == bus;
            let dropoff_on_bus = sch.dropoff_bus == bus;
            RouteRow {
                position: idx + 1,
                student_id: s.id.clone(),
                name: s.name.clone(),
                bus_tag: bus_tag(sch),
                sort_time: sort_time(sch, bus).to_string(),
                pickup: leg_view(
                    &sch.pickup_bus,
                    &sch.pickup_time,
                    &sch.pickup_location,
                    dropoff_on_bus,
                    bus,
                    INDIVIDUAL_PICKUP,
                ),
                dropoff: leg_view(
                    &sch.dropoff_bus,
                    &sch.dropoff_time,
                    &sch.dropoff_location,
                    pickup_on_bus,
                    bus,
                    INDIVIDUAL_DROPOFF,
                ),
            }
        })
        .collect();

    BusRoute {
        bus: bus.to_string(),
        riders,
    }
}

/// True when anyone has that class on that day, whether or not they ride.
pub fn has_class_on(students: &[Student], day: Weekday, class_time: &str) -> bool {
    students
        .iter()
        .any(|s| s.schedule(day).is_some_and(|sch| sch.class_time == class_time))
}

/// Parent timetable for one day, sections in registry order.
pub fn day_timetable(students: &[Student], day: Weekday, class_times: &[String]) -> DayTimetable {
    let sections = class_times
        .iter()
        .filter(|t| has_class_on(students, day, t))
        .map(|t| ClassSection {
            class_time: t.clone(),
            routes: BUSES
                .iter()
                .map(|bus| route_for(students, day, t, bus))
                .collect(),
        })
        .collect();
    DayTimetable { day, sections }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterDay {
    pub day: Weekday,
    pub class_time: String,
    pub bus_tag: String,
    pub pickup: String,
    pub dropoff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub days: Vec<RosterDay>,
}

/// Admin list view: one line per active day.
pub fn roster(students: &[Student]) -> Vec<RosterEntry> {
    students
        .iter()
        .map(|s| RosterEntry {
            id: s.id.clone(),
            name: s.name.clone(),
            days: Weekday::ALL
                .iter()
                .filter_map(|d| s.schedule(*d).map(|sch| (*d, sch)))
                .map(|(day, sch)| RosterDay {
                    day,
                    class_time: sch.class_time.clone(),
                    bus_tag: bus_tag(sch),
                    pickup: if sch.rides_pickup() {
                        format!("{} ({})", sch.pickup_location, sch.pickup_time)
                    } else {
                        INDIVIDUAL_PICKUP.to_string()
                    },
                    dropoff: if sch.rides_dropoff() {
                        sch.dropoff_location.clone()
                    } else {
                        INDIVIDUAL_DROPOFF.to_string()
                    },
                })
                .collect(),
        })
        .collect()
}
