pub mod models;
pub mod normalize;
pub mod schedule;
pub mod trigger;
pub mod week;
