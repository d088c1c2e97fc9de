//! Basic rules: per-day counts, monthly rest totals, work-count bounds,
//! pre-assigned cells, reliability, and the shift-wish preference.

use selen::prelude::*;
use shared::vocabulary::{ShiftCode, WORKING_CODES, normalize_label};

use crate::domain::catalog::{Category, Constraint, ConstraintKind};
use crate::domain::staffing_band;

use super::{EncoderContext, RuleEncoder};

/// Dominated fallback so an unset cell can never beat a real assignment.
pub const UNSET_CELL_PENALTY: i64 = -10000;

pub struct BasicRules;

impl RuleEncoder for BasicRules {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn encode(&self, cx: &mut EncoderContext<'_>) {
        one_code_per_day(cx);
        required_staffing(cx);
        monthly_rest_totals(cx);
        hope_entries(cx);
        work_count_bounds(cx);
        reliability_floor(cx);
        aptitude_constraints(cx);
        special_discipline(cx);
        unset_discipline(cx);
        shift_wishes(cx);
        numbered_preferences(cx);
    }
}

/// Exactly one code per (staff, day).
fn one_code_per_day(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.grid.staff_count() {
        for d in 0..cx.grid.days() {
            let cells = cx.grid.day_vars(s, d);
            cx.count_eq(&cells, 1);
        }
    }
}

/// Daily staffing: exact counts for early/late and both night legs, a
/// possibly half-open band for the day shift.
fn required_staffing(cx: &mut EncoderContext<'_>) {
    for d in 0..cx.grid.days() {
        let column = |cx: &EncoderContext<'_>, code: ShiftCode| -> Vec<VarId> {
            (0..cx.grid.staff_count())
                .map(|s| cx.grid.var(s, d, code))
                .collect()
        };

        let early = column(cx, ShiftCode::Early);
        cx.count_eq(&early, cx.rule.early_staff as i32);
        let late = column(cx, ShiftCode::Late);
        cx.count_eq(&late, cx.rule.late_staff as i32);
        let night_in = column(cx, ShiftCode::NightIn);
        cx.count_eq(&night_in, cx.rule.night_staff as i32);
        let night_out = column(cx, ShiftCode::NightOut);
        cx.count_eq(&night_out, cx.rule.night_staff as i32);

        let required = if cx.grid.month.is_sunday(d) {
            cx.rule.sunday_staff
        } else {
            cx.rule.weekday_staff
        };
        let (lo, hi) = staffing_band(required);
        let day = column(cx, ShiftCode::Day);
        if lo == hi {
            cx.count_eq(&day, lo);
        } else {
            cx.count_ge(&day, lo);
            cx.count_le(&day, hi);
        }
    }
}

/// Per staff, the month holds exactly the agreed number of rests.
fn monthly_rest_totals(cx: &mut EncoderContext<'_>) {
    for (s, staff) in cx.staff.iter().enumerate() {
        let rests = cx.grid.month_vars(s, ShiftCode::Rest);
        let total = staff.holiday_override.unwrap_or(cx.rule.holiday_count);
        cx.count_eq(&rests, total as i32);
    }
}

/// Every pre-assigned cell is a hard equality.
fn hope_entries(cx: &mut EncoderContext<'_>) {
    for entry in cx.hopes {
        let Some(s) = cx.grid.staff_index(&entry.staff_name) else {
            continue;
        };
        let day = entry.day as usize - 1;
        if day < cx.grid.days() && cx.grid.has_code(entry.shift_code) {
            let var = cx.grid.var(s, day, entry.shift_code);
            cx.pin_true(var);
        }
    }
}

/// Per-staff per-code monthly occurrence bounds.
fn work_count_bounds(cx: &mut EncoderContext<'_>) {
    for (s, staff) in cx.staff.iter().enumerate() {
        for (label, bounds) in &staff.shift_counts {
            let Some(code) = normalize_label(label) else {
                cx.warn(format!(
                    "{}: unknown shift label {label:?} in shift_counts, skipped",
                    staff.name
                ));
                continue;
            };
            if !cx.grid.has_code(code) {
                continue;
            }
            let month = cx.grid.month_vars(s, code);
            cx.count_ge(&month, bounds.min as i32);
            cx.count_le(&month, bounds.max as i32);
        }
    }
}

fn reliability_terms(cx: &EncoderContext<'_>, day: usize) -> (Vec<i32>, Vec<VarId>) {
    let mut coeffs = Vec::new();
    let mut vars = Vec::new();
    for s in 0..cx.grid.staff_count() {
        let score = cx.grid.reliability(s);
        for &code in &WORKING_CODES {
            coeffs.push(score);
            vars.push(cx.grid.var(s, day, code));
        }
    }
    (coeffs, vars)
}

/// Hard floor on the day-staff reliability sum, weekday and Sunday targets
/// configured separately.
fn reliability_floor(cx: &mut EncoderContext<'_>) {
    if cx.rule.weekday_reliability.is_none() && cx.rule.sunday_reliability.is_none() {
        return;
    }
    for d in 0..cx.grid.days() {
        let target = if cx.grid.month.is_sunday(d) {
            cx.rule.sunday_reliability
        } else {
            cx.rule.weekday_reliability
        };
        let Some(target) = target else { continue };
        let (coeffs, vars) = reliability_terms(cx, d);
        let negated: Vec<i32> = coeffs.iter().map(|c| -c).collect();
        cx.model.int_lin_le(&negated, &vars, -target);
    }
}

/// シフト適性 records from the roster rule: a day-class filtered floor,
/// hard or as a shortfall penalty.
fn aptitude_constraints(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ShiftAptitude)
        .cloned()
        .collect();
    for constraint in records {
        let sundays_only = match constraint.sub_category.as_str() {
            "日曜" => true,
            "通常" => false,
            other => {
                cx.warn(format!("シフト適性: unknown day class {other:?}, skipped"));
                continue;
            }
        };
        let Ok(target) = constraint.target.parse::<i32>() else {
            cx.warn(format!(
                "シフト適性: target {:?} is not a number, skipped",
                constraint.target
            ));
            continue;
        };
        for d in 0..cx.grid.days() {
            if cx.grid.month.is_sunday(d) != sundays_only {
                continue;
            }
            let (coeffs, vars) = reliability_terms(cx, d);
            let negated: Vec<i32> = coeffs.iter().map(|c| -c).collect();
            match constraint.kind {
                ConstraintKind::Mandatory => {
                    cx.model.int_lin_le(&negated, &vars, -target);
                }
                ConstraintKind::Preference => {
                    let reached = cx.model.bool();
                    cx.model.int_lin_le_reif(&negated, &vars, -target, reached);
                    let shortfall = cx.not(reached);
                    let weight = i64::from(cx.own_weight(&constraint));
                    cx.add_term(shortfall, -weight);
                }
            }
        }
    }
}

/// `☆` is usable only where a hope entry pins it; a pinned cell excludes
/// every other code.
fn special_discipline(cx: &mut EncoderContext<'_>) {
    let pinned: Vec<(usize, usize)> = cx
        .hopes
        .iter()
        .filter(|e| e.shift_code == ShiftCode::Special)
        .filter_map(|e| {
            cx.grid
                .staff_index(&e.staff_name)
                .map(|s| (s, e.day as usize - 1))
        })
        .filter(|&(_, d)| d < cx.grid.days())
        .collect();

    let codes: Vec<ShiftCode> = cx.grid.codes().to_vec();
    for s in 0..cx.grid.staff_count() {
        for d in 0..cx.grid.days() {
            let star = cx.grid.var(s, d, ShiftCode::Special);
            if pinned.contains(&(s, d)) {
                cx.pin_true(star);
                for &code in &codes {
                    if code != ShiftCode::Special {
                        let other = cx.grid.var(s, d, code);
                        cx.pin_false(other);
                    }
                }
            } else {
                cx.pin_false(star);
            }
        }
    }
}

/// `_` is forbidden outright and additionally dominated in the objective.
fn unset_discipline(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.grid.staff_count() {
        for d in 0..cx.grid.days() {
            let unset = cx.grid.var(s, d, ShiftCode::Unset);
            cx.pin_false(unset);
            cx.add_term(unset, UNSET_CELL_PENALTY);
        }
    }
}

/// 勤務希望: mandatory pins the monthly count to the staff's own bound,
/// preference tilts the objective per assigned day.
fn shift_wishes(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let wishes: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::ShiftWish)
            .cloned()
            .collect();
        for constraint in wishes {
            let Some(code) = normalize_label(&constraint.target) else {
                cx.warn(format!(
                    "{}: 勤務希望 with unknown label {:?}, skipped",
                    cx.staff[s].name, constraint.target
                ));
                continue;
            };
            if !cx.grid.has_code(code) {
                continue;
            }
            let month = cx.grid.month_vars(s, code);
            match constraint.kind {
                ConstraintKind::Mandatory => {
                    let bounds = cx.staff[s].bounds(&constraint.target);
                    match constraint.sub_category.as_str() {
                        "愛好" => cx.count_eq(&month, bounds.max as i32),
                        "嫌悪" => cx.count_eq(&month, bounds.min as i32),
                        other => {
                            cx.warn(format!(
                                "{}: 勤務希望 with unknown leaning {other:?}, skipped",
                                cx.staff[s].name
                            ));
                        }
                    }
                }
                ConstraintKind::Preference => {
                    let weight = i64::from(cx.category_weight(cx.weights.shift_wish));
                    let signed = if constraint.sub_category == "嫌悪" {
                        -weight
                    } else {
                        weight
                    };
                    for var in month {
                        cx.add_term(var, signed);
                    }
                }
            }
        }
    }
}

/// Numbered glyph wishes: a straight per-cell reward.
fn numbered_preferences(cx: &mut EncoderContext<'_>) {
    for entry in cx.preference_entries {
        let Some(s) = cx.grid.staff_index(&entry.staff_name) else {
            continue;
        };
        let day = entry.day as usize - 1;
        if day < cx.grid.days() && cx.grid.has_code(entry.shift_code) {
            let var = cx.grid.var(s, day, entry.shift_code);
            cx.add_term(var, entry.weight.unwrap_or(1));
        }
    }
}
