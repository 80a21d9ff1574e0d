pub mod live_interface;
pub mod session_store;
