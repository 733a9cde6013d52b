// Core school records: groups, students and attendance.

pub mod attendance;
pub mod groups;
pub mod students;
