pub mod admin;
pub mod attendance;
pub mod group;
pub mod material;
pub mod parent;
pub mod payment;
pub mod score;
pub mod student;
