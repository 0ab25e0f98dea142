pub mod backup;
pub mod class_times;
pub mod core;
pub mod data;
pub mod session;
pub mod setup;
pub mod students;
pub mod suggest;
pub mod timetable;
