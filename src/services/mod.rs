pub mod conflict_detector;
pub mod schedule_utils;
pub mod scheduling_engine;
pub mod settings_service;
pub mod work_pattern_analyzer;
