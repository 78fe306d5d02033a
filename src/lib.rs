//! Auto-scheduling core of the task panel.
//!
//! [`services::work_pattern_analyzer`] turns task history into a productivity
//! profile and proposes time slots, [`services::conflict_detector`] reports
//! overlaps and overloaded days, and [`services::scheduling_engine`] owns the
//! block list and keeps both consistent with it.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, AppResult};
pub use models::schedule::{ScheduleConflict, ScheduledBlock};
pub use models::settings::SchedulerSettings;
pub use models::task::TaskRecord;
pub use services::scheduling_engine::SchedulingEngine;
