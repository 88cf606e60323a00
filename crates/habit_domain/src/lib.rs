pub mod error;
pub mod habit;
pub mod notifications;
pub mod reminder;
pub mod report;
pub mod repository;
pub mod service;
pub mod storage;

pub use crate::error::HabitError;
pub use crate::service::{HabitService, HabitServiceBuilder};
