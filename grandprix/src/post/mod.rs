pub mod points;
pub mod race_result;
pub mod standings;
