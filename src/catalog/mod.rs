pub mod plans;
pub mod services;
pub mod subjects;

pub use plans::{fallback_plans, format_cents, format_price};
pub use services::ServiceType;
pub use subjects::Subject;
