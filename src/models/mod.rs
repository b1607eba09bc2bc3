mod availability;
mod booking;
mod payment;
mod plan;
mod provider;

pub use availability::*;
pub use booking::*;
pub use payment::*;
pub use plan::*;
pub use provider::*;
