//! Alternative rules: shift-interval spacing and day-specific attendance.

use selen::prelude::*;
use shared::vocabulary::{ShiftCode, normalize_label};

use crate::domain::catalog::{Category, Constraint, ConstraintKind};

use super::{EncoderContext, RuleEncoder};

pub struct AlternativeRules;

impl RuleEncoder for AlternativeRules {
    fn name(&self) -> &'static str {
        "alternative"
    }

    fn encode(&self, cx: &mut EncoderContext<'_>) {
        local_shift_intervals(cx);
        global_shift_intervals(cx);
        day_specific_shifts(cx);
    }
}

fn local_shift_intervals(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::ShiftInterval)
            .cloned()
            .collect();
        for constraint in records {
            let weight = i64::from(cx.category_weight(cx.weights.shift_interval));
            shift_interval(cx, s, &constraint, weight);
        }
    }
}

fn global_shift_intervals(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ShiftInterval && c.applies_to_everyone())
        .cloned()
        .collect();
    for constraint in records {
        let weight = i64::from(cx.own_weight(&constraint));
        for s in 0..cx.staff.len() {
            if !cx.staff[s].global_rule_excluded {
                shift_interval(cx, s, &constraint, weight);
            }
        }
    }
}

/// シフト間隔: spacing between occurrences of one code.
///
/// 嫌悪 keeps repeats strictly more than `interval` days apart; 愛好 pulls
/// every repeat within `interval` days of a previous occurrence (the first
/// occurrence of the month is exempt). `weight` is resolved by the caller:
/// the flat category value for per-staff records, the record's own weight
/// for roster-level ones.
fn shift_interval(cx: &mut EncoderContext<'_>, s: usize, constraint: &Constraint, weight: i64) {
    let days = cx.grid.days();
    let Some(code) = normalize_label(&constraint.count).filter(|&c| cx.grid.has_code(c)) else {
        cx.warn(format!(
            "{}: シフト間隔 with unknown code {:?}, skipped",
            cx.staff[s].name, constraint.count
        ));
        return;
    };
    let Ok(interval) = constraint.target.parse::<usize>() else {
        cx.warn(format!(
            "{}: シフト間隔 with unusable interval {:?}, skipped",
            cx.staff[s].name, constraint.target
        ));
        return;
    };
    if interval == 0 {
        return;
    }

    match (constraint.kind, constraint.sub_category.as_str()) {
        (ConstraintKind::Mandatory, "嫌悪") => {
            for start in 0..days {
                let start_var = cx.grid.var(s, start, code);
                let window_end = (start + interval + 1).min(days);
                for d in start + 1..window_end {
                    let repeat = cx.grid.var(s, d, code);
                    cx.forbid_all_of(&[start_var, repeat]);
                }
            }
        }
        (ConstraintKind::Mandatory, "愛好") => {
            for current in 1..days {
                let here = cx.grid.var(s, current, code);
                let all_past: Vec<VarId> = (0..current).map(|d| cx.grid.var(s, d, code)).collect();
                let recent: Vec<VarId> = (current.saturating_sub(interval)..current)
                    .map(|d| cx.grid.var(s, d, code))
                    .collect();
                let had_any = cx.any_of(&all_past);
                let had_recent = cx.any_of(&recent);
                // A non-first occurrence needs a predecessor inside the window.
                let needs_recent = cx.all_of(&[here, had_any]);
                cx.imply(needs_recent, had_recent);
            }
        }
        (ConstraintKind::Preference, leaning @ ("嫌悪" | "愛好")) => {
            for start in 0..days {
                let window_end = (start + interval + 1).min(days);
                if window_end <= start + 1 {
                    continue;
                }
                let start_var = cx.grid.var(s, start, code);
                let repeats: Vec<VarId> = (start + 1..window_end)
                    .map(|d| cx.grid.var(s, d, code))
                    .collect();
                let has_repeat = cx.any_of(&repeats);
                let met = cx.all_of(&[start_var, has_repeat]);
                let signed = if leaning == "嫌悪" { -weight } else { weight };
                cx.add_term(met, signed);
            }
        }
        (_, other) => {
            cx.warn(format!(
                "{}: シフト間隔 with unknown leaning {other:?}, skipped",
                cx.staff[s].name
            ));
        }
    }
}

/// 出シフト: on the named day, the staff must hold one of the working codes
/// and nothing else.
fn day_specific_shifts(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| {
                c.category == Category::DaySpecificShift
                    && c.is_mandatory()
                    && c.target == "出勤"
            })
            .cloned()
            .collect();
        for constraint in records {
            let token = constraint.sub_category.replace("日", "");
            let Ok(day) = token.parse::<usize>() else {
                cx.warn(format!(
                    "{}: 出シフト with unusable day {:?}, skipped",
                    cx.staff[s].name, constraint.sub_category
                ));
                continue;
            };
            if day == 0 || day > cx.grid.days() {
                cx.warn(format!(
                    "{}: 出シフト day {} outside the month, skipped",
                    cx.staff[s].name, day
                ));
                continue;
            }
            let day = day - 1;
            let codes: Vec<ShiftCode> = cx.grid.codes().to_vec();
            for code in codes {
                if !code.is_working() {
                    let var = cx.grid.var(s, day, code);
                    cx.pin_false(var);
                }
            }
            let working = cx.grid.working_vars(s, day);
            cx.require_any_of(&working);
        }
    }
}
