pub mod controller;
pub mod derivation;
pub mod margin;
pub mod resolver;
pub mod scheduler;
pub mod validator;

pub use controller::{CycleSources, IngestionController};
pub use scheduler::{ScheduleHandle, spawn_schedule};
