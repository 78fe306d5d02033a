use chrono::{DateTime, FixedOffset, TimeZone};
use taskpanel_scheduler::models::patterns::UserWorkPatterns;
use taskpanel_scheduler::models::schedule::{ScheduledBlock, TaskScheduleState};
use taskpanel_scheduler::models::settings::SchedulerSettings;
use taskpanel_scheduler::models::task::{TaskCategory, TaskPriority, TaskRecord, TaskStatus};
use taskpanel_scheduler::services::schedule_utils::WorkZone;
use taskpanel_scheduler::services::scheduling_engine::validate_tasks;
use taskpanel_scheduler::services::work_pattern_analyzer::WorkPatternAnalyzer;
use taskpanel_scheduler::{AppError, SchedulingEngine};

fn dt(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset")
        .with_ymd_and_hms(2025, 7, day, hour, minute, 0)
        .single()
        .expect("valid datetime")
}

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        timezone: Some("UTC".to_string()),
        ..SchedulerSettings::default()
    }
}

fn task(id: &str) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: String::new(),
        category: TaskCategory::Work,
        priority: TaskPriority::Medium,
        completed: false,
        status: TaskStatus::Todo,
        due_date: None,
        created_at: "2025-06-01T08:00:00+00:00".to_string(),
        last_update: None,
        estimated_minutes: Some(45),
        subtasks: None,
        blockers: None,
    }
}

#[test]
fn malformed_tasks_become_diagnostics() {
    let mut bad_due = task("bad-due");
    bad_due.due_date = Some("2025-13-40".to_string());
    let mut stale = task("stale");
    stale.last_update = Some("2025-05-01T08:00:00+00:00".to_string());

    let (valid, diagnostics) = validate_tasks(vec![task("ok"), bad_due, stale, task("")]);
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].id, "ok");
    assert_eq!(diagnostics.len(), 3);
    assert_eq!(diagnostics[0].task_id.as_deref(), Some("bad-due"));
    assert_eq!(diagnostics[1].task_id.as_deref(), Some("stale"));
    assert!(diagnostics[2].task_id.is_none());
}

#[test]
fn engine_keeps_working_after_bad_input() {
    let mut engine = SchedulingEngine::new(settings())
        .expect("engine")
        .with_planning_start(dt(1, 8, 0));
    let mut broken = task("broken");
    broken.created_at = "not a date".to_string();
    let good = task("good");
    engine.sync_tasks(vec![broken.clone(), good.clone()]);

    assert_eq!(engine.diagnostics().len(), 1);
    assert!(engine.auto_schedule_task(&broken).is_none());
    let block = engine.auto_schedule_task(&good).expect("scheduled");
    assert_eq!(block.duration_minutes(), 45);
    assert_eq!(engine.task_state("good"), TaskScheduleState::Scheduled);
}

#[test]
fn non_finite_history_yields_neutral_profile() {
    let settings = settings();
    let zone = WorkZone::from_setting(settings.timezone.as_deref()).expect("zone");
    let analyzer = WorkPatternAnalyzer::new(settings.clone(), zone);

    let mut poisoned = ScheduledBlock::new("a", dt(2, 10, 0), dt(2, 11, 0));
    poisoned.productivity_score = Some(f64::INFINITY);
    let healthy = ScheduledBlock::new("b", dt(2, 14, 0), dt(2, 15, 0));

    let patterns = analyzer.analyze_work_patterns(&[], &[healthy, poisoned]);
    assert_eq!(
        patterns,
        UserWorkPatterns::neutral(settings.default_task_minutes)
    );
}

#[test]
fn empty_and_single_block_lists_have_no_conflicts() {
    let mut engine = SchedulingEngine::new(settings()).expect("engine");
    engine.sync_tasks(vec![task("solo")]);

    assert!(engine.detect_conflicts(&[]).is_empty());
    let single = [ScheduledBlock::new("solo", dt(3, 9, 0), dt(3, 16, 0))];
    assert!(engine.detect_conflicts(&single).is_empty());
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let unknown_zone = SchedulerSettings {
        timezone: Some("Atlantis/Capital".to_string()),
        ..SchedulerSettings::default()
    };
    assert!(matches!(
        SchedulingEngine::new(unknown_zone),
        Err(AppError::Config { .. })
    ));

    let no_horizon = SchedulerSettings {
        lookahead_days: 0,
        ..SchedulerSettings::default()
    };
    assert!(SchedulingEngine::new(no_horizon).is_err());
}

#[test]
fn outcome_for_unscheduled_task_is_not_found() {
    let mut engine = SchedulingEngine::new(settings()).expect("engine");
    engine.sync_tasks(vec![task("idle")]);

    assert!(matches!(
        engine.record_block_outcome("idle", Some(30), None),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        engine.record_block_outcome("idle", Some(0), None),
        Err(AppError::Validation { .. })
    ));
}

#[test]
fn tasks_that_cannot_fit_the_window_are_deferred() {
    let narrow = SchedulerSettings {
        workday_start_minute: 9 * 60,
        workday_end_minute: 10 * 60,
        ..settings()
    };
    let mut engine = SchedulingEngine::new(narrow.clone())
        .expect("engine")
        .with_planning_start(dt(1, 8, 0));
    let mut long = task("long");
    long.estimated_minutes = Some(90);
    engine.sync_tasks(vec![long.clone()]);

    assert!(engine.diagnostics().is_empty());
    assert!(engine.auto_schedule_task(&long).is_none());
    assert_eq!(engine.task_state("long"), TaskScheduleState::Unscheduled);

    let endless = SchedulerSettings {
        lookahead_days: u32::MAX,
        ..narrow
    };
    assert!(matches!(
        SchedulingEngine::new(endless),
        Err(AppError::Config { .. })
    ));
}

#[test]
fn huge_estimates_are_reported_instead_of_scheduled() {
    let mut engine = SchedulingEngine::new(settings())
        .expect("engine")
        .with_planning_start(dt(1, 8, 0));
    let mut huge = task("huge");
    huge.estimated_minutes = Some(i64::MAX);
    engine.sync_tasks(vec![huge.clone(), task("fine")]);

    let diagnostics = engine.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].task_id.as_deref(), Some("huge"));
    assert!(engine.auto_schedule_task(&huge).is_none());
    assert!(engine.auto_schedule_task(&task("fine")).is_some());
}
