pub mod general;
pub mod logger;
