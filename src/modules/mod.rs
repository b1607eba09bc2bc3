pub mod admin;
pub mod booking;
pub mod counseling;
pub mod payments;
pub mod plans;
pub mod sessions;
