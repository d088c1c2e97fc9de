//! End-to-end generation tests on small rosters: the pipeline runs
//! pre-flight, encodes, solves, and the solutions honor the invariants.

use std::collections::BTreeMap;
use std::sync::Arc;

use roster_service::adapter::input::parse_request;
use roster_service::config::RosterConfig;
use roster_service::domain::sink::{MemoryNotificationSink, MemoryProgressSink};
use roster_service::error::GenerationError;
use roster_service::solver::{Assignment, RosterGenerator, SolveOutcome};
use shared::types::{
    GlobalRule, HopeEntry, ProgressEvent, RawConstraint, RosterRequest, ShiftBounds, SolveMode,
    Staff,
};
use shared::vocabulary::ShiftCode;
use tokio_util::sync::CancellationToken;

fn make_staff(name: &str) -> Staff {
    let mut shift_counts = BTreeMap::new();
    shift_counts.insert("早番".to_string(), ShiftBounds { min: 0, max: 28 });
    shift_counts.insert("日勤".to_string(), ShiftBounds { min: 0, max: 28 });
    shift_counts.insert("遅番".to_string(), ShiftBounds { min: 0, max: 28 });
    shift_counts.insert("夜勤".to_string(), ShiftBounds { min: 0, max: 0 });
    Staff {
        name: name.into(),
        role: "介護".into(),
        day_shift_only: false,
        part_time: false,
        global_rule_excluded: false,
        shift_counts,
        holiday_override: None,
        reliability_override: None,
        constraints: Vec::new(),
    }
}

/// One staff, February 2026, no fixed staffing except a half-open day band.
fn single_staff_request() -> RosterRequest {
    RosterRequest {
        staff_list: vec![make_staff("佐藤")],
        rule: GlobalRule {
            holiday_count: 9,
            consecutive_work_limit: 5,
            weekday_staff: 0.5,
            sunday_staff: 0.5,
            early_staff: 0,
            late_staff: 0,
            night_staff: 0,
            weekday_reliability: None,
            sunday_reliability: None,
            preference_constraints: Vec::new(),
        },
        hope_entries: Vec::new(),
        preference_entries: Vec::new(),
        weights: None,
        search_time_seconds: 10,
        year: 2026,
        month: 2,
        mode: SolveMode::Turbo,
    }
}

fn hope(staff: &str, day: u32, code: ShiftCode) -> HopeEntry {
    HopeEntry {
        staff_name: staff.into(),
        day,
        shift_code: code,
        role: String::new(),
        part_time: false,
    }
}

fn generate(request: &RosterRequest) -> (Result<SolveOutcome, GenerationError>, Vec<ProgressEvent>) {
    let sink = MemoryNotificationSink::new();
    let progress = MemoryProgressSink::new();
    let generator = RosterGenerator::new(RosterConfig::default());
    let parsed = parse_request(request, &sink).expect("request parses");
    let outcome = generator.generate_blocking(&parsed, &sink, &progress);
    (outcome, progress.snapshot())
}

fn solved(outcome: Result<SolveOutcome, GenerationError>) -> Vec<Assignment> {
    match outcome.expect("generation runs") {
        SolveOutcome::Solved { assignments, .. } => assignments,
        SolveOutcome::NoSolution { status } => panic!("expected a roster, got {status}"),
    }
}

fn code_at(assignments: &[Assignment], staff: &str, day: u32) -> ShiftCode {
    assignments
        .iter()
        .find(|a| a.staff_name == staff && a.day == day)
        .map(|a| a.shift_code)
        .unwrap_or_else(|| panic!("no assignment for {staff} day {day}"))
}

fn count_code(assignments: &[Assignment], staff: &str, code: ShiftCode) -> usize {
    assignments
        .iter()
        .filter(|a| a.staff_name == staff && a.shift_code == code)
        .count()
}

#[test]
fn single_staff_month_fills_every_cell() {
    let request = single_staff_request();
    let (outcome, progress) = generate(&request);
    let assignments = solved(outcome);

    // Total assignment: one code per day.
    assert_eq!(assignments.len(), 28);
    for day in 1..=28 {
        let day_codes: Vec<_> = assignments.iter().filter(|a| a.day == day).collect();
        assert_eq!(day_codes.len(), 1, "day {day} must hold exactly one code");
    }

    // The monthly rest total is exact, and the forbidden codes never appear.
    assert_eq!(count_code(&assignments, "佐藤", ShiftCode::Rest), 9);
    assert_eq!(count_code(&assignments, "佐藤", ShiftCode::Unset), 0);
    assert_eq!(count_code(&assignments, "佐藤", ShiftCode::Special), 0);

    // Consecutive-work limit: every 6-day window holds a rest.
    let mut streak = 0;
    for day in 1..=28 {
        if code_at(&assignments, "佐藤", day) == ShiftCode::Rest {
            streak = 0;
        } else {
            streak += 1;
            assert!(streak <= 5, "6 working days in a row around day {day}");
        }
    }

    assert_eq!(progress.first(), Some(&ProgressEvent::Reset));
    assert!(progress.len() >= 2, "at least one incumbent must stream");
}

#[test]
fn night_macro_rotation_holds() {
    let mut request = single_staff_request();
    request.rule.night_staff = 1;
    request.rule.holiday_count = 9;
    request.rule.weekday_staff = 0.0;
    request.rule.sunday_staff = 0.0;

    let mut a = make_staff("佐藤");
    let mut b = make_staff("田中");
    let mut c = make_staff("鈴木");
    for staff in [&mut a, &mut b, &mut c] {
        staff
            .shift_counts
            .insert("夜勤".to_string(), ShiftBounds { min: 0, max: 10 });
    }
    c.holiday_override = Some(10);
    request.staff_list = vec![a, b, c];
    request.hope_entries = vec![
        hope("佐藤", 1, ShiftCode::NightIn),
        hope("田中", 1, ShiftCode::NightOut),
        hope("鈴木", 1, ShiftCode::Rest),
    ];

    let (outcome, _) = generate(&request);
    let assignments = solved(outcome);

    // The pinned night propagates through the macro-pattern.
    assert_eq!(code_at(&assignments, "佐藤", 1), ShiftCode::NightIn);
    assert_eq!(code_at(&assignments, "佐藤", 2), ShiftCode::NightOut);
    assert_eq!(code_at(&assignments, "佐藤", 3), ShiftCode::Rest);
    // An inherited night-out rests the next day.
    assert_eq!(code_at(&assignments, "田中", 2), ShiftCode::Rest);

    // Exactly one night-in and one night-out per day.
    for day in 1..=28 {
        let nights = assignments
            .iter()
            .filter(|x| x.day == day && x.shift_code == ShiftCode::NightIn)
            .count();
        let outs = assignments
            .iter()
            .filter(|x| x.day == day && x.shift_code == ShiftCode::NightOut)
            .count();
        assert_eq!(nights, 1, "day {day} night-in count");
        assert_eq!(outs, 1, "day {day} night-out count");
    }

    // Night triple everywhere, not just at the pin.
    for staff in ["佐藤", "田中", "鈴木"] {
        for day in 1..=26 {
            if code_at(&assignments, staff, day) == ShiftCode::NightIn {
                assert_eq!(code_at(&assignments, staff, day + 1), ShiftCode::NightOut);
                assert_eq!(code_at(&assignments, staff, day + 2), ShiftCode::Rest);
            }
        }
    }
}

#[test]
fn day_specific_attendance_is_enforced() {
    let mut request = single_staff_request();
    request.staff_list[0].constraints.push(RawConstraint {
        kind: "必須".into(),
        category: "出シフト".into(),
        sub_category: "14日".into(),
        target: "出勤".into(),
        ..RawConstraint::default()
    });

    let (outcome, _) = generate(&request);
    let assignments = solved(outcome);

    // Early and late are pinned to zero by the staffing rule, so attendance
    // on day 14 must land on the day shift.
    assert_eq!(code_at(&assignments, "佐藤", 14), ShiftCode::Day);
}

#[test]
fn day_shift_preference_tilts_the_objective() {
    let mut request = single_staff_request();
    request.staff_list[0].constraints.push(RawConstraint {
        kind: "選好".into(),
        category: "勤務希望".into(),
        sub_category: "愛好".into(),
        target: "日勤".into(),
        ..RawConstraint::default()
    });

    let (outcome, _) = generate(&request);
    let outcome = outcome.expect("generation runs");
    let (status, assignments) = match outcome {
        SolveOutcome::Solved {
            status,
            assignments,
            ..
        } => (status, assignments),
        SolveOutcome::NoSolution { status } => panic!("expected a roster, got {status}"),
    };

    let days = count_code(&assignments, "佐藤", ShiftCode::Day);
    let rests = count_code(&assignments, "佐藤", ShiftCode::Rest);
    assert_eq!(rests, 9);
    if status == shared::vocabulary::SolveStatus::Optimal {
        // The day band allows one 日 per day, so the optimum works all 19.
        assert_eq!(days, 19);
    } else {
        assert!(days > 0, "an incumbent should pick up some rewarded days");
    }
}

#[test]
fn exact_rest_runs_split_the_holiday_budget() {
    let mut request = single_staff_request();
    request.rule.holiday_count = 10;
    request.staff_list[0].constraints.push(RawConstraint {
        kind: "必須".into(),
        category: "連続休暇".into(),
        sub_category: "愛好".into(),
        count: "二連休".into(),
        target: "丁度".into(),
        ..RawConstraint::default()
    });

    let (outcome, _) = generate(&request);
    let assignments = solved(outcome);

    // Ten rests in exactly five maximal two-day runs.
    assert_eq!(count_code(&assignments, "佐藤", ShiftCode::Rest), 10);
    let mut runs = Vec::new();
    let mut current = 0;
    for day in 1..=28 {
        if code_at(&assignments, "佐藤", day) == ShiftCode::Rest {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }
    assert_eq!(runs.len(), 5);
    assert!(runs.iter().all(|&r| r == 2), "all rest runs must be pairs: {runs:?}");
}

#[test]
fn infeasible_input_aborts_before_solving() {
    let mut request = single_staff_request();
    // Night allowance is zero, yet a night-out is pinned.
    request.hope_entries = vec![hope("佐藤", 5, ShiftCode::NightOut)];

    let sink = MemoryNotificationSink::new();
    let progress = MemoryProgressSink::new();
    let generator = RosterGenerator::new(RosterConfig::default());
    let parsed = parse_request(&request, &sink).expect("request parses");
    let outcome = generator.generate_blocking(&parsed, &sink, &progress);

    assert!(matches!(outcome, Err(GenerationError::InfeasibleInput(_))));
    assert_eq!(progress.snapshot(), vec![ProgressEvent::Reset]);
    assert!(!sink.snapshot().is_empty());
}

#[test]
fn resolving_a_solution_as_hopes_is_a_fixpoint() {
    let request = single_staff_request();
    let (outcome, _) = generate(&request);
    let first = solved(outcome);

    let mut pinned = single_staff_request();
    pinned.hope_entries = first
        .iter()
        .map(|a| hope(&a.staff_name, a.day, a.shift_code))
        .collect();
    let (outcome, _) = generate(&pinned);
    let second = solved(outcome);

    let mut first_sorted: Vec<_> = first
        .iter()
        .map(|a| (a.staff_name.clone(), a.day, a.shift_code))
        .collect();
    let mut second_sorted: Vec<_> = second
        .iter()
        .map(|a| (a.staff_name.clone(), a.day, a.shift_code))
        .collect();
    first_sorted.sort();
    second_sorted.sort();
    assert_eq!(first_sorted, second_sorted);
}

#[tokio::test(flavor = "multi_thread")]
async fn balanced_mode_streams_progress_in_order() {
    let mut request = single_staff_request();
    request.mode = SolveMode::Balanced;

    let sink = Arc::new(MemoryNotificationSink::new());
    let progress = Arc::new(MemoryProgressSink::new());
    let generator = RosterGenerator::new(RosterConfig::default());
    let parsed = parse_request(&request, sink.as_ref()).expect("request parses");

    let outcome = generator
        .generate(
            parsed,
            sink.clone(),
            progress.clone(),
            CancellationToken::new(),
        )
        .await
        .expect("generation runs");
    assert!(matches!(outcome, SolveOutcome::Solved { .. }));

    let events = progress.snapshot();
    assert_eq!(events.first(), Some(&ProgressEvent::Reset));
    let mut last_index = 0;
    let mut incumbents = 0;
    for event in &events {
        if let ProgressEvent::Incumbent { solution_index, .. } = event {
            assert!(*solution_index > last_index, "indices must increase");
            last_index = *solution_index;
            incumbents += 1;
        }
    }
    assert!(incumbents >= 1);
}
