pub mod appointment;
pub mod auth;
pub mod authorization;
pub mod clock;
pub mod error;
