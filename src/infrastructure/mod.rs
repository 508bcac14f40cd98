//! Infrastructure layer - Concrete implementations

pub mod logging;
pub mod user;
