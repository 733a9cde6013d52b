// Scores: per-category breakdowns, group rankings, and the score routes.

pub mod breakdown;
pub mod handlers;
pub mod ranking;
