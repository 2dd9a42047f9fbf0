pub mod access_gate;
pub mod occupancy;
pub mod session_control;
