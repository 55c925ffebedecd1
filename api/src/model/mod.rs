pub mod auth;
pub mod booking;
