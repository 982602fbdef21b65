//! API Routes
//!
//! Route handlers organized by functionality.

pub mod checkins;
pub mod health;
pub mod passive;
