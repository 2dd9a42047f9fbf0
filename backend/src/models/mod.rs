pub mod access_log;
pub mod facility;
pub mod occupancy;
pub mod usage_session;
pub mod user;
