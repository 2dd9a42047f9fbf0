pub mod access_log;
pub mod facilities;
pub mod occupancy;
pub mod transaction;
pub mod usage_sessions;
pub mod users;
