pub mod patterns;
pub mod schedule;
pub mod settings;
pub mod task;
