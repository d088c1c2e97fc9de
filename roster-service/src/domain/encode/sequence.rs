//! Sequence rules: the hard consecutive-work limit, maximal-run patterns
//! over rests and working days, and the global night-cluster counter.

use selen::prelude::*;
use shared::vocabulary::{ShiftCode, kanji_count, normalize_label};

use crate::domain::catalog::{Bound, Category, Constraint, ConstraintKind};

use super::{EncoderContext, RuleEncoder};

/// Longest rest run the pattern scan considers.
const MAX_HOLIDAY_RUN: usize = 7;

pub struct SequenceRules;

impl RuleEncoder for SequenceRules {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn encode(&self, cx: &mut EncoderContext<'_>) {
        consecutive_work_limit(cx);
        local_holiday_patterns(cx);
        global_holiday_patterns(cx);
        local_work_patterns(cx);
        global_work_patterns(cx);
        global_consecutive_shift(cx);
    }
}

/// Hard limit: every `limit + 1`-day window holds at least one rest. A
/// night-in on the window's closing day counts twice, because it commits
/// the following day as well.
fn consecutive_work_limit(cx: &mut EncoderContext<'_>) {
    let days = cx.grid.days();
    let limit = cx.rule.consecutive_work_limit as usize;
    if limit == 0 || days < limit {
        return;
    }
    let codes: Vec<ShiftCode> = cx.grid.codes().to_vec();
    for s in 0..cx.grid.staff_count() {
        for start in 0..=(days - limit) {
            let window = (limit + 1).min(days - start);
            let mut vars = Vec::new();
            for offset in 0..window {
                let d = start + offset;
                for &code in &codes {
                    if code != ShiftCode::Rest {
                        vars.push(cx.grid.var(s, d, code));
                    }
                }
                if d == days - 1 {
                    vars.push(cx.grid.var(s, d, ShiftCode::NightIn));
                }
            }
            cx.count_le(&vars, limit as i32);
        }
    }
}

// region: rest-run helpers

/// Forbid a maximal rest run of exactly `len` starting at `start`:
/// `boundary ∨ ¬rest[start] ∨ … ∨ boundary` as one clause.
fn forbid_exact_rest_run(cx: &mut EncoderContext<'_>, s: usize, start: usize, len: usize) {
    let days = cx.grid.days();
    let mut pos = Vec::new();
    if start > 0 {
        pos.push(cx.grid.var(s, start - 1, ShiftCode::Rest));
    }
    if start + len < days {
        pos.push(cx.grid.var(s, start + len, ShiftCode::Rest));
    }
    let neg: Vec<VarId> = (start..start + len)
        .map(|d| cx.grid.var(s, d, ShiftCode::Rest))
        .collect();
    cx.model.bool_clause(&pos, &neg);
}

/// Fresh boolean ⇔ a maximal rest run of exactly `len` starts at `start`.
fn exact_rest_run_reif(cx: &mut EncoderContext<'_>, s: usize, start: usize, len: usize) -> VarId {
    let days = cx.grid.days();
    let mut parts = Vec::new();
    if start > 0 {
        let prev = cx.grid.var(s, start - 1, ShiftCode::Rest);
        parts.push(cx.not(prev));
    }
    for d in start..start + len {
        parts.push(cx.grid.var(s, d, ShiftCode::Rest));
    }
    if start + len < days {
        let next = cx.grid.var(s, start + len, ShiftCode::Rest);
        parts.push(cx.not(next));
    }
    cx.all_of(&parts)
}

// endregion: rest-run helpers

/// 連続休暇 for one staff. `weight` is resolved by the caller: the flat
/// category value for per-staff records, the record's own weight for
/// roster-level ones.
fn holiday_pattern(cx: &mut EncoderContext<'_>, s: usize, constraint: &Constraint, weight: i64) {
    let days = cx.grid.days();
    let base = if constraint.count.is_empty() {
        1
    } else {
        kanji_count(&constraint.count).unwrap_or(1)
    } as usize;
    if base == 0 || base > days {
        return;
    }
    let Some(bound) = constraint.target_bound() else {
        cx.warn(format!(
            "{}: 連続休暇 with unknown relation {:?}, skipped",
            cx.staff[s].name, constraint.target
        ));
        return;
    };

    match constraint.kind {
        ConstraintKind::Mandatory if constraint.is_affinity() => match bound {
            Bound::Exact => {
                // Split the whole rest budget into runs of exactly `base`.
                let budget = cx.staff[s]
                    .holiday_override
                    .unwrap_or(cx.rule.holiday_count) as usize;
                let wanted = budget / base;
                if wanted == 0 || days < base {
                    return;
                }
                let starts: Vec<VarId> = (0..=days - base)
                    .map(|d| exact_rest_run_reif(cx, s, d, base))
                    .collect();
                cx.count_eq(&starts, wanted as i32);
            }
            Bound::AtMost => {
                // No stretch of base+1 rests anywhere.
                for start in 0..days.saturating_sub(base) {
                    let run: Vec<VarId> = (start..=start + base)
                        .map(|d| cx.grid.var(s, d, ShiftCode::Rest))
                        .collect();
                    cx.forbid_all_of(&run);
                }
            }
            Bound::AtLeast => {
                // Maximal runs shorter than base cannot occur.
                for len in 1..base {
                    for start in 0..=days.saturating_sub(len) {
                        forbid_exact_rest_run(cx, s, start, len);
                    }
                }
            }
        },
        ConstraintKind::Mandatory => match bound {
            Bound::AtLeast => {
                // No `base` consecutive rests at all.
                for start in 0..=days.saturating_sub(base) {
                    let run: Vec<VarId> = (start..start + base)
                        .map(|d| cx.grid.var(s, d, ShiftCode::Rest))
                        .collect();
                    cx.forbid_all_of(&run);
                }
            }
            Bound::AtMost => {
                for len in 1..=base {
                    for start in 0..=days.saturating_sub(len) {
                        forbid_exact_rest_run(cx, s, start, len);
                    }
                }
            }
            Bound::Exact => {
                if base == 1 {
                    // Forbid isolated rests on interior days.
                    for day in 1..days.saturating_sub(1) {
                        let prev = cx.grid.var(s, day - 1, ShiftCode::Rest);
                        let here = cx.grid.var(s, day, ShiftCode::Rest);
                        let next = cx.grid.var(s, day + 1, ShiftCode::Rest);
                        cx.model.bool_clause(&[prev, next], &[here]);
                    }
                }
            }
        },
        ConstraintKind::Preference => {
            let signed = if constraint.is_affinity() {
                weight
            } else {
                -weight
            };
            let lengths: Vec<usize> = match bound {
                Bound::AtMost => (1..=base).collect(),
                Bound::AtLeast => (base..=MAX_HOLIDAY_RUN).collect(),
                Bound::Exact => vec![base],
            };
            for len in lengths {
                if len == 0 || len > days {
                    continue;
                }
                for start in 0..=days - len {
                    let run = exact_rest_run_reif(cx, s, start, len);
                    cx.add_term(run, signed);
                }
            }
        }
    }
}

fn local_holiday_patterns(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::ConsecutiveHoliday)
            .cloned()
            .collect();
        for constraint in records {
            let weight = i64::from(cx.category_weight(cx.weights.holiday_pattern));
            holiday_pattern(cx, s, &constraint, weight);
        }
    }
}

fn global_holiday_patterns(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ConsecutiveHoliday && c.applies_to_everyone())
        .cloned()
        .collect();
    for constraint in records {
        let weight = i64::from(cx.own_weight(&constraint));
        for s in 0..cx.staff.len() {
            if !cx.staff[s].global_rule_excluded {
                holiday_pattern(cx, s, &constraint, weight);
            }
        }
    }
}

// region: work-run helpers

/// Per-day indicator: any code of `set` assigned on (s, day).
fn work_day_indicator(cx: &mut EncoderContext<'_>, s: usize, day: usize, set: &[ShiftCode]) -> VarId {
    let cells: Vec<VarId> = set.iter().map(|&code| cx.grid.var(s, day, code)).collect();
    cx.any_of(&cells)
}

/// The working codes for the 連続勤務 family: everything but rest and the
/// unset sentinel.
fn full_work_set(cx: &EncoderContext<'_>) -> Vec<ShiftCode> {
    cx.grid
        .codes()
        .iter()
        .copied()
        .filter(|&c| c != ShiftCode::Rest && c != ShiftCode::Unset)
        .collect()
}

/// The 日勤帯連勤 set: the night legs reset the run as well.
fn day_only_work_set(cx: &EncoderContext<'_>) -> Vec<ShiftCode> {
    cx.grid
        .codes()
        .iter()
        .copied()
        .filter(|&c| {
            c != ShiftCode::Rest
                && c != ShiftCode::Unset
                && c != ShiftCode::NightIn
                && c != ShiftCode::NightOut
        })
        .collect()
}

// endregion: work-run helpers

/// 連続勤務 / 日勤帯連勤 for one staff over one working set. `weight` is
/// resolved by the caller, as for [`holiday_pattern`].
fn work_pattern(
    cx: &mut EncoderContext<'_>,
    s: usize,
    constraint: &Constraint,
    set: &[ShiftCode],
    weight: i64,
) {
    let days = cx.grid.days();
    let limit = cx.rule.consecutive_work_limit as usize;
    let base = if constraint.count.is_empty() {
        1
    } else {
        kanji_count(&constraint.count).unwrap_or(1)
    } as usize;
    if base == 0 || base > days {
        return;
    }
    let Some(bound) = constraint.target_bound() else {
        cx.warn(format!(
            "{}: {} with unknown relation {:?}, skipped",
            cx.staff[s].name,
            constraint.category,
            constraint.target
        ));
        return;
    };

    // Fresh boolean ⇔ a maximal run of exactly `len` working days at `start`.
    fn run_reif(
        cx: &mut EncoderContext<'_>,
        s: usize,
        start: usize,
        len: usize,
        set: &[ShiftCode],
    ) -> VarId {
        let days = cx.grid.days();
        let mut parts = Vec::new();
        if start > 0 {
            let prev = work_day_indicator(cx, s, start - 1, set);
            parts.push(cx.not(prev));
        }
        for d in start..start + len {
            parts.push(work_day_indicator(cx, s, d, set));
        }
        if start + len < days {
            let next = work_day_indicator(cx, s, start + len, set);
            parts.push(cx.not(next));
        }
        cx.all_of(&parts)
    }

    match constraint.kind {
        ConstraintKind::Mandatory if constraint.is_affinity() => match bound {
            Bound::Exact => {
                // The whole working month splits into runs of exactly `base`.
                let budget = cx.staff[s]
                    .holiday_override
                    .unwrap_or(cx.rule.holiday_count) as usize;
                let work_days = days.saturating_sub(budget);
                let wanted = work_days / base;
                if wanted == 0 || days < base {
                    return;
                }
                let starts: Vec<VarId> = (0..=days - base)
                    .map(|d| run_reif(cx, s, d, base, set))
                    .collect();
                cx.count_eq(&starts, wanted as i32);
            }
            Bound::AtMost => {
                for start in 0..days.saturating_sub(base) {
                    let window: Vec<VarId> = (start..=start + base)
                        .map(|d| work_day_indicator(cx, s, d, set))
                        .collect();
                    cx.forbid_all_of(&window);
                }
            }
            Bound::AtLeast => {
                for len in 1..base {
                    for start in 0..=days.saturating_sub(len) {
                        let run = run_reif(cx, s, start, len, set);
                        cx.pin_false(run);
                    }
                }
            }
        },
        ConstraintKind::Mandatory => match bound {
            Bound::AtLeast => {
                for start in 0..=days.saturating_sub(base) {
                    let window: Vec<VarId> = (start..start + base)
                        .map(|d| work_day_indicator(cx, s, d, set))
                        .collect();
                    cx.forbid_all_of(&window);
                }
            }
            Bound::AtMost => {
                for len in 1..=base {
                    for start in 0..=days.saturating_sub(len) {
                        let run = run_reif(cx, s, start, len, set);
                        cx.pin_false(run);
                    }
                }
            }
            Bound::Exact => {
                for start in 0..=days.saturating_sub(base) {
                    let run = run_reif(cx, s, start, base, set);
                    cx.pin_false(run);
                }
            }
        },
        ConstraintKind::Preference => {
            let signed = if constraint.is_affinity() {
                weight
            } else {
                -weight
            };
            let lengths: Vec<usize> = match bound {
                Bound::AtMost => (1..=base).collect(),
                Bound::AtLeast => (base..=limit.max(base)).collect(),
                Bound::Exact => vec![base],
            };
            for len in lengths {
                if len == 0 || len > days {
                    continue;
                }
                for start in 0..=days - len {
                    let run = run_reif(cx, s, start, len, set);
                    cx.add_term(run, signed);
                }
            }
        }
    }
}

fn local_work_patterns(cx: &mut EncoderContext<'_>) {
    let full = full_work_set(cx);
    let day_only = day_only_work_set(cx);
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| {
                matches!(
                    c.category,
                    Category::ConsecutiveWork | Category::DayOnlyConsecutiveWork
                )
            })
            .cloned()
            .collect();
        for constraint in records {
            match constraint.category {
                Category::ConsecutiveWork => {
                    let weight = i64::from(cx.category_weight(cx.weights.work_pattern));
                    work_pattern(cx, s, &constraint, &full, weight);
                }
                _ => {
                    let weight = i64::from(cx.category_weight(cx.weights.day_only_work_pattern));
                    work_pattern(cx, s, &constraint, &day_only, weight);
                }
            }
        }
    }
}

fn global_work_patterns(cx: &mut EncoderContext<'_>) {
    let full = full_work_set(cx);
    let day_only = day_only_work_set(cx);
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| {
            matches!(
                c.category,
                Category::ConsecutiveWork | Category::DayOnlyConsecutiveWork
            ) && c.applies_to_everyone()
        })
        .cloned()
        .collect();
    for constraint in records {
        let weight = i64::from(cx.own_weight(&constraint));
        for s in 0..cx.staff.len() {
            if cx.staff[s].global_rule_excluded {
                continue;
            }
            match constraint.category {
                Category::ConsecutiveWork => {
                    work_pattern(cx, s, &constraint, &full, weight);
                }
                _ => {
                    work_pattern(cx, s, &constraint, &day_only, weight);
                }
            }
        }
    }
}

/// 連続シフト (roster level). For 夜勤 the sequence count lives in a night
/// cluster: it opens on `×`, survives `／`/`×`/`公`, and any day-shift code
/// resets it. For other codes a plain N-in-a-row window applies.
fn global_consecutive_shift(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ConsecutiveShift)
        .cloned()
        .collect();
    for constraint in records {
        let Some(code) = normalize_label(&constraint.count).filter(|&c| cx.grid.has_code(c)) else {
            cx.warn(format!(
                "連続シフト with unknown code {:?}, skipped",
                constraint.count
            ));
            continue;
        };
        let Some(n) = kanji_count(&constraint.final_).filter(|&n| n > 0) else {
            cx.warn(format!(
                "連続シフト without a usable count {:?}, skipped",
                constraint.final_
            ));
            continue;
        };
        let n = n as i32;
        let is_night = constraint.count == "夜勤";

        for s in 0..cx.staff.len() {
            if cx.staff[s].global_rule_excluded {
                continue;
            }
            if is_night {
                if constraint.kind == ConstraintKind::Preference {
                    // Rejected in pre-analysis; never encoded.
                    cx.warn("連続シフト (夜勤) in preference form is unsupported".to_string());
                    break;
                }
                night_cluster_counter(cx, s, n, constraint.target_bound());
            } else {
                plain_consecutive_code(cx, s, code, n, &constraint);
            }
        }
    }
}

/// Integer counter automaton over night clusters. Domain caps double as the
/// 以上 bound; 丁度 forbids a cluster closing at exactly `n`.
fn night_cluster_counter(cx: &mut EncoderContext<'_>, s: usize, n: i32, bound: Option<Bound>) {
    let days = cx.grid.days();
    let reset_codes: Vec<ShiftCode> = [
        ShiftCode::Late,
        ShiftCode::Day,
        ShiftCode::Early,
        ShiftCode::Special,
        ShiftCode::Unset,
    ]
    .into_iter()
    .filter(|&c| cx.grid.has_code(c))
    .collect();

    let cap = match bound {
        Some(Bound::AtLeast) => n - 1,
        _ => n,
    };
    let cap = cap.max(1);

    let counts: Vec<VarId> = (0..days).map(|_| cx.model.int(0, cap)).collect();

    // Opening day: 1 on an inherited night-out, 0 otherwise.
    let first_out = cx.grid.var(s, 0, ShiftCode::NightOut);
    let is_one = cx.model.bool();
    cx.model.int_lin_eq_reif(&[1], &[counts[0]], 1, is_one);
    cx.imply(first_out, is_one);
    let is_zero = cx.model.bool();
    cx.model.int_lin_eq_reif(&[1], &[counts[0]], 0, is_zero);
    let not_first_out = cx.not(first_out);
    cx.imply(not_first_out, is_zero);

    for d in 1..days {
        let reset_cells: Vec<VarId> = reset_codes
            .iter()
            .map(|&code| cx.grid.var(s, d, code))
            .collect();
        let is_reset = cx.any_of(&reset_cells);
        let night = cx.grid.var(s, d, ShiftCode::NightIn);

        let zeroed = cx.model.bool();
        cx.model.int_lin_eq_reif(&[1], &[counts[d]], 0, zeroed);
        cx.imply(is_reset, zeroed);

        let not_reset = cx.not(is_reset);
        let stepped = cx.model.bool();
        cx.model
            .int_lin_eq_reif(&[1, -1], &[counts[d], counts[d - 1]], 1, stepped);
        let step_cond = cx.all_of(&[not_reset, night]);
        cx.imply(step_cond, stepped);

        let held = cx.model.bool();
        cx.model
            .int_lin_eq_reif(&[1, -1], &[counts[d], counts[d - 1]], 0, held);
        let no_night = cx.not(night);
        let hold_cond = cx.all_of(&[not_reset, no_night]);
        cx.imply(hold_cond, held);

        if bound == Some(Bound::Exact) {
            // A reset may not land while the counter sits at exactly n.
            let at_n = cx.model.bool();
            cx.model.int_lin_eq_reif(&[1], &[counts[d - 1]], n, at_n);
            cx.forbid_all_of(&[is_reset, at_n]);
        }
    }
}

fn plain_consecutive_code(
    cx: &mut EncoderContext<'_>,
    s: usize,
    code: ShiftCode,
    n: i32,
    constraint: &Constraint,
) {
    let days = cx.grid.days();
    let n = n as usize;
    if n == 0 || days < n {
        return;
    }
    for start in 0..=days - n {
        let window: Vec<VarId> = (start..start + n)
            .map(|d| cx.grid.var(s, d, code))
            .collect();
        match constraint.kind {
            ConstraintKind::Mandatory => cx.forbid_all_of(&window),
            ConstraintKind::Preference => {
                let run = cx.all_of(&window);
                let penalty = -i64::from(cx.own_weight(constraint));
                cx.add_term(run, penalty);
            }
        }
    }
}
