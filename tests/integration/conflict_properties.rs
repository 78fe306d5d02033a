use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use taskpanel_scheduler::models::schedule::{ConflictKind, ScheduleConflict, ScheduledBlock};
use taskpanel_scheduler::models::settings::SchedulerSettings;
use taskpanel_scheduler::models::task::{TaskCategory, TaskPriority, TaskRecord, TaskStatus};
use taskpanel_scheduler::SchedulingEngine;

fn dt(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset")
        .with_ymd_and_hms(2025, 6, day, hour, minute, 0)
        .single()
        .expect("valid datetime")
}

fn task(id: &str, priority: TaskPriority) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: String::new(),
        category: TaskCategory::Work,
        priority,
        completed: false,
        status: TaskStatus::Todo,
        due_date: None,
        created_at: "2025-05-01T08:00:00+00:00".to_string(),
        last_update: None,
        estimated_minutes: None,
        subtasks: None,
        blockers: None,
    }
}

fn engine_with(tasks: Vec<TaskRecord>) -> SchedulingEngine {
    let mut engine = SchedulingEngine::new(SchedulerSettings {
        timezone: Some("UTC".to_string()),
        ..SchedulerSettings::default()
    })
    .expect("engine");
    engine.sync_tasks(tasks);
    engine
}

fn overlap_pairs(conflicts: &[ScheduleConflict]) -> BTreeSet<(String, String)> {
    conflicts
        .iter()
        .filter(|conflict| conflict.kind == ConflictKind::Overlap)
        .map(|conflict| {
            let mut ids = conflict.task_ids.clone();
            ids.sort();
            (ids[0].clone(), ids[1].clone())
        })
        .collect()
}

#[test]
fn partial_overlap_is_reported_once() {
    let engine = engine_with(vec![
        task("a", TaskPriority::Low),
        task("b", TaskPriority::Low),
    ]);
    let blocks = vec![
        ScheduledBlock::new("a", dt(2, 9, 0), dt(2, 10, 0)),
        ScheduledBlock::new("b", dt(2, 9, 30), dt(2, 10, 30)),
    ];

    let conflicts = engine.detect_conflicts(&blocks);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::Overlap);
    assert_eq!(conflicts[0].task_ids, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn adjacent_blocks_do_not_overlap() {
    let engine = engine_with(vec![
        task("a", TaskPriority::Low),
        task("b", TaskPriority::Low),
    ]);
    let blocks = vec![
        ScheduledBlock::new("a", dt(2, 9, 0), dt(2, 10, 0)),
        ScheduledBlock::new("b", dt(2, 10, 0), dt(2, 11, 0)),
    ];

    assert!(engine.detect_conflicts(&blocks).is_empty());
}

#[test]
fn three_heavy_blocks_overload_the_day() {
    let engine = engine_with(vec![
        task("a", TaskPriority::High),
        task("b", TaskPriority::High),
        task("c", TaskPriority::High),
    ]);
    let blocks = vec![
        ScheduledBlock::new("a", dt(3, 8, 0), dt(3, 11, 0)),
        ScheduledBlock::new("b", dt(3, 11, 0), dt(3, 14, 0)),
        ScheduledBlock::new("c", dt(3, 14, 0), dt(3, 17, 0)),
    ];

    let conflicts = engine.detect_conflicts(&blocks);
    assert_eq!(conflicts.len(), 1);
    let overload = &conflicts[0];
    assert_eq!(overload.kind, ConflictKind::DayOverload);
    assert_eq!(overload.date, NaiveDate::from_ymd_opt(2025, 6, 3));
    assert_eq!(
        overload.task_ids,
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    let hours = overload.weighted_hours.expect("weighted hours");
    assert!((hours - 13.5).abs() < 1e-9);
}

#[test]
fn detection_is_idempotent() {
    let engine = engine_with(vec![
        task("a", TaskPriority::High),
        task("b", TaskPriority::Medium),
        task("c", TaskPriority::Low),
    ]);
    let blocks = vec![
        ScheduledBlock::new("a", dt(4, 8, 0), dt(4, 13, 0)),
        ScheduledBlock::new("b", dt(4, 12, 0), dt(4, 15, 0)),
        ScheduledBlock::new("c", dt(4, 14, 30), dt(4, 16, 0)),
    ];

    let first = engine.detect_conflicts(&blocks);
    let second = engine.detect_conflicts(&blocks);
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn overlap_pairs_do_not_depend_on_order() {
    let engine = engine_with(
        ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| task(id, TaskPriority::Low))
            .collect(),
    );
    let blocks = vec![
        ScheduledBlock::new("a", dt(5, 9, 0), dt(5, 11, 0)),
        ScheduledBlock::new("b", dt(5, 10, 0), dt(5, 12, 0)),
        ScheduledBlock::new("c", dt(5, 10, 30), dt(5, 10, 45)),
        ScheduledBlock::new("d", dt(5, 12, 0), dt(5, 13, 0)),
    ];
    let mut reversed = blocks.clone();
    reversed.reverse();
    let mut rotated = blocks.clone();
    rotated.rotate_left(2);

    let expected = overlap_pairs(&engine.detect_conflicts(&blocks));
    assert_eq!(expected.len(), 3);
    assert_eq!(overlap_pairs(&engine.detect_conflicts(&reversed)), expected);
    assert_eq!(overlap_pairs(&engine.detect_conflicts(&rotated)), expected);
}
