pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod testing;

pub use models::*;
pub use services::*;
