//! Pre-flight feasibility analysis.
//!
//! Static predicates that catch contradictory or impossible input before any
//! solver time is spent. Checks run in a fixed order (basic → pattern →
//! sequence → interval) and short-circuit: the first violation becomes one
//! error notification and aborts the generation. All checks are pure
//! functions of the input, so re-running the analyzer yields the same
//! diagnostics.

mod basic;
mod interval;
mod pattern;
mod sequence;

use std::collections::HashMap;

use shared::time::MonthContext;
use shared::types::{GlobalRule, HopeEntry, Notification, Staff};
use shared::vocabulary::ShiftCode;

use crate::domain::catalog::Constraint;
use crate::domain::sink::NotificationSink;
use crate::error::GenerationError;

/// Everything the checks read. Hope entries are re-shaped into a per-staff
/// day board once, up front.
pub struct AnalysisInput<'a> {
    pub month: &'a MonthContext,
    pub rule: &'a GlobalRule,
    pub staff: &'a [Staff],
    pub staff_constraints: &'a [Vec<Constraint>],
    pub rule_constraints: &'a [Constraint],
    pub hopes: &'a [HopeEntry],
    board: Vec<HashMap<usize, ShiftCode>>,
}

impl<'a> AnalysisInput<'a> {
    pub fn new(
        month: &'a MonthContext,
        rule: &'a GlobalRule,
        staff: &'a [Staff],
        staff_constraints: &'a [Vec<Constraint>],
        rule_constraints: &'a [Constraint],
        hopes: &'a [HopeEntry],
    ) -> Self {
        let mut board = vec![HashMap::new(); staff.len()];
        for entry in hopes {
            if let Some(s) = staff.iter().position(|m| m.name == entry.staff_name) {
                let day = entry.day as usize - 1;
                if day < month.days {
                    board[s].insert(day, entry.shift_code);
                }
            }
        }
        Self {
            month,
            rule,
            staff,
            staff_constraints,
            rule_constraints,
            hopes,
            board,
        }
    }

    /// Confirmed code of a 0-based (staff, day) cell, if any.
    pub fn confirmed(&self, staff: usize, day: usize) -> Option<ShiftCode> {
        self.board[staff].get(&day).copied()
    }

    /// Confirmed cells of one staff, day-ascending.
    pub fn confirmed_cells(&self, staff: usize) -> Vec<(usize, ShiftCode)> {
        let mut cells: Vec<(usize, ShiftCode)> = self.board[staff]
            .iter()
            .map(|(&d, &c)| (d, c))
            .collect();
        cells.sort_unstable();
        cells
    }

    pub fn holiday_budget(&self, staff: usize) -> u32 {
        self.staff[staff]
            .holiday_override
            .unwrap_or(self.rule.holiday_count)
    }

    /// Count of confirmed `☆` cells for one staff.
    pub fn star_count(&self, staff: usize) -> usize {
        self.board[staff]
            .values()
            .filter(|&&c| c == ShiftCode::Special)
            .count()
    }
}

type Check = fn(&AnalysisInput<'_>) -> Result<(), String>;

/// Run every check; emit the first violation as an error notification and
/// abort with `InfeasibleInput`.
pub fn preflight(
    input: &AnalysisInput<'_>,
    notifier: &dyn NotificationSink,
) -> Result<(), GenerationError> {
    let checks: &[(&str, Check)] = &[
        ("staff list", basic::check_staff_present),
        ("shift counts", basic::check_shift_count_conflicts),
        ("total slots", basic::check_total_slots),
        ("per-shift totals", basic::check_shift_type_requirements),
        ("per-day slots", basic::check_daily_slots),
        ("per-staff slots", basic::check_staff_slots),
        ("weekday wishes", pattern::check_weekday_obligations),
        ("pairing", pattern::check_pairing_feasible),
        ("referenced staff", pattern::check_referenced_staff_exist),
        ("night pattern", pattern::check_confirmed_night_pattern),
        ("pair overlap", pattern::check_pair_overlap),
        ("separation", pattern::check_separation),
        ("shift-pattern conflicts", pattern::check_shift_pattern_conflicts),
        ("shift-pattern counts", pattern::check_shift_pattern_counts),
        ("global shift-pattern form", pattern::check_global_shift_pattern_form),
        ("confirmed work runs", sequence::check_confirmed_work_limit),
        ("holiday constraint shape", sequence::check_holiday_constraint_shape),
        ("holiday constraint ranges", sequence::check_holiday_constraint_ranges),
        ("confirmed holiday runs", sequence::check_confirmed_holiday_runs),
        ("night holiday budget", sequence::check_night_holiday_budget),
        ("night sequence form", sequence::check_night_sequence_form),
        ("confirmed shift sequences", sequence::check_confirmed_shift_sequences),
        ("work-pattern ranges", sequence::check_work_pattern_ranges),
        ("confirmed work patterns", sequence::check_confirmed_work_patterns),
        ("shift-interval entries", interval::check_confirmed_intervals),
        ("shift-interval conflicts", interval::check_interval_conflicts),
        ("shift-interval counts", interval::check_interval_counts),
    ];

    for (name, check) in checks {
        if let Err(message) = check(input) {
            tracing::warn!(check = name, "pre-flight violation");
            notifier.notify(Notification::error(message.clone()));
            return Err(GenerationError::InfeasibleInput(message));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sink::MemoryNotificationSink;
    use shared::types::{NotificationCategory, RawConstraint, ShiftBounds};
    use std::collections::BTreeMap;

    fn make_rule() -> GlobalRule {
        // Half-step day staffing keeps the slot totals satisfiable for small
        // fixtures without pinning every cell.
        GlobalRule {
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
        }
    }

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

    fn run(
        rule: &GlobalRule,
        staff: &[Staff],
        staff_constraints: &[Vec<Constraint>],
        rule_constraints: &[Constraint],
        hopes: &[HopeEntry],
    ) -> (Result<(), GenerationError>, Vec<Notification>) {
        let month = MonthContext::new(2026, 2).unwrap();
        let input = AnalysisInput::new(&month, rule, staff, staff_constraints, rule_constraints, hopes);
        let sink = MemoryNotificationSink::new();
        let outcome = preflight(&input, &sink);
        (outcome, sink.snapshot())
    }

    /// Build an `AnalysisInput` and hand it to one check directly, so a
    /// targeted fixture does not have to satisfy every earlier check.
    fn run_check(
        check: fn(&AnalysisInput<'_>) -> Result<(), String>,
        rule: &GlobalRule,
        staff: &[Staff],
        staff_constraints: &[Vec<Constraint>],
        rule_constraints: &[Constraint],
        hopes: &[HopeEntry],
    ) -> Result<(), String> {
        let month = MonthContext::new(2026, 2).unwrap();
        let input = AnalysisInput::new(&month, rule, staff, staff_constraints, rule_constraints, hopes);
        check(&input)
    }

    fn constraint(kind: &str, category: &str) -> Constraint {
        Constraint::from_raw(&RawConstraint {
            kind: kind.into(),
            category: category.into(),
            ..RawConstraint::default()
        })
        .unwrap()
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

    #[test]
    fn empty_staff_list_is_rejected() {
        let rule = make_rule();
        let (outcome, notes) = run(&rule, &[], &[], &[], &[]);
        assert!(matches!(outcome, Err(GenerationError::InfeasibleInput(_))));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].category, NotificationCategory::Error);
    }

    #[test]
    fn min_above_max_is_rejected() {
        let rule = make_rule();
        let mut staff = make_staff("佐藤");
        staff
            .shift_counts
            .insert("早番".to_string(), ShiftBounds { min: 5, max: 2 });
        let outcome = run_check(
            basic::check_shift_count_conflicts,
            &rule,
            &[staff],
            &[Vec::new()],
            &[],
            &[],
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn broken_night_triple_in_hopes_is_rejected() {
        let rule = make_rule();
        let mut staff = make_staff("佐藤");
        staff
            .shift_counts
            .insert("夜勤".to_string(), ShiftBounds { min: 0, max: 5 });
        let hopes = vec![
            hope("佐藤", 10, ShiftCode::NightIn),
            hope("佐藤", 11, ShiftCode::Day),
        ];
        let outcome = run_check(
            pattern::check_confirmed_night_pattern,
            &rule,
            &[staff],
            &[Vec::new()],
            &[],
            &hopes,
        );
        assert!(outcome.unwrap_err().contains("／"));
    }

    #[test]
    fn night_out_for_night_free_staff_is_rejected() {
        let rule = make_rule();
        let staff = make_staff("佐藤");
        let hopes = vec![hope("佐藤", 5, ShiftCode::NightOut)];
        let outcome = run_check(
            pattern::check_confirmed_night_pattern,
            &rule,
            &[staff],
            &[Vec::new()],
            &[],
            &hopes,
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn confirmed_pair_overlap_is_rejected() {
        let mut rule = make_rule();
        rule.night_staff = 2;
        let mut members = vec![make_staff("佐藤"), make_staff("田中")];
        for staff in &mut members {
            staff
                .shift_counts
                .insert("夜勤".to_string(), ShiftBounds { min: 3, max: 3 });
        }
        let mut overlap = constraint("必須", "ペア重複");
        overlap.count = "夜勤".into();
        overlap.final_ = "三".into();
        overlap.target = "以上".into();
        let hopes = vec![
            hope("佐藤", 1, ShiftCode::NightIn),
            hope("田中", 1, ShiftCode::NightIn),
            hope("佐藤", 4, ShiftCode::NightIn),
            hope("田中", 4, ShiftCode::NightIn),
            hope("佐藤", 7, ShiftCode::NightIn),
            hope("田中", 7, ShiftCode::NightIn),
        ];
        let outcome = run_check(
            pattern::check_pair_overlap,
            &rule,
            &members,
            &[Vec::new(), Vec::new()],
            &[overlap],
            &hopes,
        );
        assert!(outcome.unwrap_err().contains("佐藤"));
    }

    #[test]
    fn night_min_with_long_rest_runs_blows_the_budget() {
        let rule = make_rule();
        let mut staff = make_staff("佐藤");
        staff
            .shift_counts
            .insert("夜勤".to_string(), ShiftBounds { min: 4, max: 6 });
        // Rest runs must be four days; (4-1)*4 = 12 > 9.
        let mut runs = constraint("必須", "連続休暇");
        runs.sub_category = "愛好".into();
        runs.count = "四連休".into();
        runs.target = "以上".into();
        let outcome = run_check(
            sequence::check_night_holiday_budget,
            &rule,
            &[staff],
            &[vec![runs]],
            &[],
            &[],
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn spacing_constraint_that_cannot_fit_the_month_is_rejected() {
        let rule = make_rule();
        let mut staff = make_staff("佐藤");
        staff
            .shift_counts
            .insert("夜勤".to_string(), ShiftBounds { min: 3, max: 5 });
        let mut spacing = constraint("必須", "シフト間隔");
        spacing.sub_category = "嫌悪".into();
        spacing.count = "夜勤".into();
        spacing.target = "13".into();
        // 1 + 14*2 = 29 > 28 days of February.
        let outcome = run_check(
            interval::check_interval_counts,
            &rule,
            &[staff],
            &[vec![spacing]],
            &[],
            &[],
        );
        assert!(outcome.unwrap_err().contains("29"));
    }

    #[test]
    fn preference_night_sequence_is_rejected() {
        let rule = make_rule();
        let staff = make_staff("佐藤");
        let mut sequence_rule = constraint("選好", "連続シフト");
        sequence_rule.count = "夜勤".into();
        sequence_rule.final_ = "三".into();
        sequence_rule.target = "以上".into();
        let outcome = run_check(
            sequence::check_night_sequence_form,
            &rule,
            &[staff],
            &[Vec::new()],
            &[sequence_rule],
            &[],
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn mandatory_global_recommend_pattern_is_rejected() {
        let rule = make_rule();
        let staff = make_staff("佐藤");
        let mut pattern_rule = constraint("必須", "シフトパターン");
        pattern_rule.sub_category = "推奨".into();
        pattern_rule.count = "早番".into();
        pattern_rule.target = "日勤".into();
        let outcome = run_check(
            pattern::check_global_shift_pattern_form,
            &rule,
            &[staff],
            &[Vec::new()],
            &[pattern_rule],
            &[],
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn analyzer_is_idempotent() {
        let rule = make_rule();
        let staff = make_staff("佐藤");
        let hopes = vec![hope("佐藤", 5, ShiftCode::NightOut)];
        let constraints = vec![Vec::new()];
        let (first, first_notes) = run(&rule, std::slice::from_ref(&staff), &constraints, &[], &hopes);
        let (second, second_notes) = run(&rule, std::slice::from_ref(&staff), &constraints, &[], &hopes);
        assert!(first.is_err() && second.is_err());
        assert_eq!(first_notes, second_notes);
    }

    #[test]
    fn clean_input_passes() {
        let rule = make_rule();
        let staff = make_staff("佐藤");
        let constraints = vec![Vec::new()];
        let (outcome, notes) = run(&rule, &[staff], &constraints, &[], &[]);
        assert!(outcome.is_ok());
        assert!(notes.is_empty());
    }
}
