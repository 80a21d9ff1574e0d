pub mod attributes;
pub mod competitor;
pub mod events;
pub mod handle_race;
pub mod qualifying;
pub mod race;
pub mod strategy;
pub mod test_session;
pub mod training;
pub mod tyre;
pub mod weather;
