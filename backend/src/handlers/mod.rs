pub mod access;
pub mod facilities;
pub mod health;
pub mod sessions;
pub mod users;
