mod health;
mod pages;

pub use health::{health_check, readiness_check};
pub use pages::{home, not_found, whoami};
