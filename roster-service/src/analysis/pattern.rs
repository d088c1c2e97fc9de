//! Pattern feasibility: weekday obligations, cross-staff constraints, the
//! night macro-pattern over confirmed cells, and shift-pattern conflicts.

use std::collections::BTreeSet;

use shared::vocabulary::{ShiftCode, kanji_count, normalize_label};

use crate::domain::catalog::{Category, Constraint, ConstraintKind};

use super::AnalysisInput;

fn weekday_of(token: &str) -> Option<u32> {
    let stripped = token.replace("曜日", "");
    "月火水木金土日"
        .chars()
        .position(|c| c.to_string() == stripped)
        .map(|p| p as u32)
}

fn nth_index(count: &str) -> Option<usize> {
    ["第一", "第二", "第三", "第四", "第五"]
        .iter()
        .position(|&t| t == count)
}

/// Days (0-based) a single-weekday mandatory wish pins for this month.
fn wish_days(input: &AnalysisInput<'_>, constraint: &Constraint) -> Vec<usize> {
    let Some(weekday) = weekday_of(&constraint.target) else {
        return Vec::new();
    };
    if constraint.count == "全て" {
        input.month.days_on_weekday(weekday)
    } else {
        nth_index(&constraint.count)
            .and_then(|n| input.month.nth_weekday(weekday, n))
            .map(|d| vec![d])
            .unwrap_or_default()
    }
}

/// Staffing room for one code on one day; `None` means unbounded.
fn daily_capacity(input: &AnalysisInput<'_>, day: usize, code: ShiftCode) -> Option<i64> {
    let rule = input.rule;
    let day_value = if input.month.is_sunday(day) {
        rule.sunday_staff
    } else {
        rule.weekday_staff
    };
    match code {
        ShiftCode::Early => Some(i64::from(rule.early_staff)),
        ShiftCode::Late => Some(i64::from(rule.late_staff)),
        ShiftCode::NightIn | ShiftCode::NightOut => Some(i64::from(rule.night_staff)),
        ShiftCode::Day => Some(day_value.floor() as i64),
        ShiftCode::Rest | ShiftCode::Leave => {
            let working = i64::from(rule.early_staff)
                + i64::from(rule.late_staff)
                + 2 * i64::from(rule.night_staff)
                + day_value.floor() as i64;
            Some(input.staff.len() as i64 - working)
        }
        _ => None,
    }
}

/// P1/P2: mandatory weekday wishes may not oversubscribe a day, nor
/// contradict a confirmed cell of the same staff.
pub(super) fn check_weekday_obligations(input: &AnalysisInput<'_>) -> Result<(), String> {
    for day in 0..input.month.days {
        let mut obligated: Vec<(ShiftCode, BTreeSet<usize>)> = Vec::new();
        let push = |code: ShiftCode, staff: usize, obligated: &mut Vec<(ShiftCode, BTreeSet<usize>)>| {
            if let Some((_, set)) = obligated.iter_mut().find(|(c, _)| *c == code) {
                set.insert(staff);
            } else {
                let mut set = BTreeSet::new();
                set.insert(staff);
                obligated.push((code, set));
            }
        };

        for s in 0..input.staff.len() {
            if let Some(code) = input.confirmed(s, day) {
                push(code, s, &mut obligated);
            }
            for constraint in &input.staff_constraints[s] {
                if constraint.category != Category::WeekdayWish
                    || constraint.kind != ConstraintKind::Mandatory
                    || constraint.sub_category == "嫌悪"
                    || constraint.times == "出勤"
                {
                    continue;
                }
                let Some(code) = normalize_label(&constraint.times) else {
                    continue;
                };
                if wish_days(input, constraint).contains(&day) {
                    // A confirmed cell of the same staff must agree.
                    if let Some(confirmed) = input.confirmed(s, day)
                        && confirmed != code
                    {
                        return Err(format!(
                            "{}: the mandatory {}{} wish wants {} on day {}, but {} is \
                             already confirmed there.",
                            input.staff[s].name,
                            constraint.count,
                            constraint.target,
                            code,
                            day + 1,
                            confirmed
                        ));
                    }
                    push(code, s, &mut obligated);
                }
            }
        }

        for (code, members) in obligated {
            let Some(capacity) = daily_capacity(input, day, code) else {
                continue;
            };
            if members.len() as i64 > capacity {
                let names: Vec<&str> = members
                    .iter()
                    .map(|&s| input.staff[s].name.as_str())
                    .collect();
                return Err(format!(
                    "Day {}: {} staff are pinned to {} ({}), but only {} slot(s) exist.",
                    day + 1,
                    members.len(),
                    code,
                    names.join(", "),
                    capacity
                ));
            }
        }
    }
    Ok(())
}

/// P3: a mandatory pairing must fit inside both staff's maximums.
pub(super) fn check_pairing_feasible(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in &input.staff_constraints[s] {
            if constraint.category != Category::Pairing
                || constraint.kind != ConstraintKind::Mandatory
            {
                continue;
            }
            let Some(peer) = input
                .staff
                .iter()
                .find(|m| m.name == constraint.sub_category)
            else {
                continue; // reported by the existence check
            };
            // 明け rides on the night allowance.
            let source_label = if matches!(constraint.count.as_str(), "夜勤明け" | "明け") {
                "夜勤"
            } else {
                constraint.count.as_str()
            };
            let target_label = if matches!(constraint.target.as_str(), "夜勤明け" | "明け") {
                "夜勤"
            } else {
                constraint.target.as_str()
            };
            let source_max = i64::from(staff.bounds(source_label).max);
            let target_max = i64::from(peer.bounds(target_label).max);

            if constraint.times == "全て" {
                if source_max == 0 || target_max == 0 {
                    return Err(format!(
                        "{}: the mandatory pairing with {} can never happen — {} allows \
                         {source_max} {} and {} allows {target_max} {}.",
                        staff.name,
                        peer.name,
                        staff.name,
                        constraint.count,
                        peer.name,
                        constraint.target
                    ));
                }
            } else {
                let stripped = constraint.times.replace("まで", "");
                let Some(wanted) = kanji_count(&stripped).filter(|&n| n > 0) else {
                    continue;
                };
                if source_max < i64::from(wanted) || target_max < i64::from(wanted) {
                    return Err(format!(
                        "{}: the mandatory pairing with {} needs {wanted} shared days, but \
                         {} allows {source_max} {} and {} allows {target_max} {}.",
                        staff.name,
                        peer.name,
                        staff.name,
                        constraint.count,
                        peer.name,
                        constraint.target
                    ));
                }
            }
        }
    }
    Ok(())
}

/// P4: names referenced by pairing/separation/preset constraints must exist.
pub(super) fn check_referenced_staff_exist(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in &input.staff_constraints[s] {
            if !matches!(
                constraint.category,
                Category::Pairing | Category::Separation | Category::CustomPreset
            ) {
                continue;
            }
            if !input
                .staff
                .iter()
                .any(|m| m.name == constraint.sub_category)
            {
                return Err(format!(
                    "{}: the {} constraint references staff {:?}, who does not exist.",
                    staff.name,
                    constraint.category,
                    constraint.sub_category
                ));
            }
        }
    }
    Ok(())
}

/// P5/P6: confirmed cells must not break the night triple, and `×` is
/// impossible for staff whose night allowance is zero.
pub(super) fn check_confirmed_night_pattern(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        if staff.bounds("夜勤").max == 0 {
            let offending: Vec<usize> = input
                .confirmed_cells(s)
                .into_iter()
                .filter(|&(_, code)| code == ShiftCode::NightOut)
                .map(|(d, _)| d + 1)
                .collect();
            if !offending.is_empty() {
                return Err(format!(
                    "{}: night allowance is zero but night-out (×) is confirmed on day(s) {:?}.",
                    staff.name, offending
                ));
            }
        }

        for (day, code) in input.confirmed_cells(s) {
            match code {
                ShiftCode::NightIn => {
                    if let Some(next) = input.confirmed(s, day + 1)
                        && next != ShiftCode::NightOut
                    {
                        return Err(format!(
                            "{}: ／ on day {} must be followed by ×, not {}.",
                            staff.name,
                            day + 1,
                            next
                        ));
                    }
                    if let Some(after) = input.confirmed(s, day + 2)
                        && after != ShiftCode::Rest
                    {
                        return Err(format!(
                            "{}: ／ on day {} must rest on day {}, not {}.",
                            staff.name,
                            day + 1,
                            day + 3,
                            after
                        ));
                    }
                }
                ShiftCode::NightOut => {
                    if day == 0 {
                        if let Some(second) = input.confirmed(s, 1)
                            && second != ShiftCode::Rest
                        {
                            return Err(format!(
                                "{}: × on day 1 must be followed by 公 on day 2, not {}.",
                                staff.name, second
                            ));
                        }
                    } else if let Some(prev) = input.confirmed(s, day - 1)
                        && prev != ShiftCode::NightIn
                    {
                        return Err(format!(
                            "{}: × on day {} must follow ／, not {}.",
                            staff.name,
                            day + 1,
                            prev
                        ));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// P7: a mandatory pair-overlap rule already violated by confirmed cells.
pub(super) fn check_pair_overlap(input: &AnalysisInput<'_>) -> Result<(), String> {
    let members: Vec<usize> = (0..input.staff.len())
        .filter(|&s| !input.staff[s].global_rule_excluded)
        .collect();
    if members.len() < 2 {
        return Ok(());
    }
    for constraint in input.rule_constraints {
        if constraint.category != Category::PairOverlap
            || constraint.kind != ConstraintKind::Mandatory
        {
            continue;
        }
        let Some(code) = normalize_label(&constraint.count) else {
            continue;
        };
        let Some(limit) = kanji_count(&constraint.final_).filter(|&n| n > 0) else {
            continue;
        };

        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                let mut shared = 0u32;
                for day in 0..input.month.days {
                    if input.confirmed(a, day) == Some(code)
                        && input.confirmed(b, day) == Some(code)
                    {
                        shared += 1;
                    }
                }
                let a_name = &input.staff[a].name;
                let b_name = &input.staff[b].name;
                if constraint.target == "以上" {
                    if shared >= limit {
                        return Err(format!(
                            "{a_name} and {b_name} already share {code} on {shared} confirmed \
                             days; {limit} or more is forbidden."
                        ));
                    }
                } else if shared == limit {
                    // 丁度 is only hopeless when neither side can move.
                    let label = &constraint.count;
                    let a_current = input
                        .confirmed_cells(a)
                        .iter()
                        .filter(|&&(_, c)| c == code)
                        .count() as i64;
                    let b_current = input
                        .confirmed_cells(b)
                        .iter()
                        .filter(|&&(_, c)| c == code)
                        .count() as i64;
                    let a_done = a_current >= i64::from(input.staff[a].bounds(label).max)
                        || input.confirmed_cells(a).len() == input.month.days;
                    let b_done = b_current >= i64::from(input.staff[b].bounds(label).max)
                        || input.confirmed_cells(b).len() == input.month.days;
                    if a_done || b_done {
                        return Err(format!(
                            "{a_name} and {b_name} share {code} on exactly {shared} confirmed \
                             days, which is forbidden, and neither roster can still change."
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

/// P8: a mandatory separation already violated by confirmed cells, or
/// impossible given the two staff's allowances.
pub(super) fn check_separation(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in &input.staff_constraints[s] {
            if constraint.category != Category::Separation
                || constraint.kind != ConstraintKind::Mandatory
            {
                continue;
            }
            let Some(peer_idx) = input
                .staff
                .iter()
                .position(|m| m.name == constraint.sub_category)
            else {
                continue;
            };
            let peer = &input.staff[peer_idx];
            let Some(source) = normalize_label(&constraint.count) else {
                continue;
            };
            let Some(peer_code) = normalize_label(&constraint.target) else {
                continue;
            };

            let overlap_days: Vec<usize> = (0..input.month.days)
                .filter(|&d| {
                    input.confirmed(s, d) == Some(source)
                        && input.confirmed(peer_idx, d) == Some(peer_code)
                })
                .map(|d| d + 1)
                .collect();
            let allowed = if constraint.times == "全て" {
                0
            } else {
                kanji_count(&constraint.times.replace("まで", "")).unwrap_or(0) as usize
            };
            if !overlap_days.is_empty() && overlap_days.len() > allowed {
                return Err(format!(
                    "{}: the separation from {} ({} vs {}) is already broken on day(s) {:?} \
                     (allowance {allowed}).",
                    staff.name, peer.name, source, peer_code, overlap_days
                ));
            }

            // Capacity estimate: the subject's separated shifts must fit into
            // the peer's other shifts, holidays, and the overlap allowance.
            let source_available =
                input.month.days as i64 - i64::from(input.holiday_budget(s));
            let peer_available =
                input.month.days as i64 - i64::from(input.holiday_budget(peer_idx));
            let source_max = i64::from(staff.bounds(&constraint.count).max);
            let source_other_max: i64 = staff
                .shift_counts
                .iter()
                .filter(|(label, _)| *label != &constraint.count)
                .map(|(_, b)| i64::from(b.max))
                .sum();
            let peer_other_max: i64 = peer
                .shift_counts
                .iter()
                .filter(|(label, _)| *label != &constraint.target)
                .map(|(label, b)| i64::from(b.max) * if label == "夜勤" { 2 } else { 1 })
                .sum();
            let peer_holidays = i64::from(input.holiday_budget(peer_idx));

            // Day 1 can absorb an inherited night-out for the peer.
            let first_day_open = input.confirmed(peer_idx, 0) == Some(ShiftCode::NightOut) || {
                let confirmed_first_outs = (0..input.staff.len())
                    .filter(|&m| input.confirmed(m, 0) == Some(ShiftCode::NightOut))
                    .count() as i64;
                confirmed_first_outs < i64::from(input.rule.night_staff)
            };

            let source_cap = (source_max - source_other_max).min(source_available);
            let peer_cap = peer_other_max.min(peer_available) + peer_holidays;
            if source_cap > peer_cap + allowed as i64 + i64::from(first_day_open) {
                return Err(format!(
                    "{}: the separation from {} ({} vs {}) cannot hold — {} may work {} up \
                     to {source_cap} times while {} can only be elsewhere on {} days \
                     (allowance {allowed}).",
                    staff.name,
                    peer.name,
                    source,
                    peer_code,
                    staff.name,
                    source,
                    peer.name,
                    peer_cap
                ));
            }
        }
    }
    Ok(())
}

fn mandatory_patterns(list: &[Constraint]) -> Vec<&Constraint> {
    list.iter()
        .filter(|c| c.category == Category::ShiftPattern && c.kind == ConstraintKind::Mandatory)
        .collect()
}

/// P9: transition patterns must not contradict one another, globally,
/// locally, or across the two levels.
pub(super) fn check_shift_pattern_conflicts(input: &AnalysisInput<'_>) -> Result<(), String> {
    let globals = mandatory_patterns(input.rule_constraints);

    let conflicting = |a: &Constraint, b: &Constraint| -> Option<String> {
        if a.count == b.count && a.target == b.target {
            if (a.is_affinity() && b.is_aversion()) || (a.is_aversion() && b.is_affinity()) {
                return Some(format!(
                    "{}→{} is both {} and {}",
                    a.count, a.target, a.sub_category, b.sub_category
                ));
            }
        } else if a.count == b.count && a.is_affinity() && b.is_affinity() {
            return Some(format!(
                "{} cannot lead to both {} and {} as a forced follow-up",
                a.count, a.target, b.target
            ));
        }
        None
    };

    for (i, a) in globals.iter().enumerate() {
        for b in &globals[i + 1..] {
            if let Some(reason) = conflicting(a, b) {
                return Err(format!("Conflicting roster-level shift patterns: {reason}."));
            }
        }
    }

    for (s, staff) in input.staff.iter().enumerate() {
        let locals = mandatory_patterns(&input.staff_constraints[s]);
        for (i, a) in locals.iter().enumerate() {
            for b in &locals[i + 1..] {
                if let Some(reason) = conflicting(a, b) {
                    return Err(format!(
                        "{}: conflicting shift patterns: {reason}.",
                        staff.name
                    ));
                }
            }
        }
        if staff.global_rule_excluded {
            continue;
        }
        for g in &globals {
            for l in &locals {
                if let Some(reason) = conflicting(g, l) {
                    return Err(format!(
                        "{}: a personal shift pattern conflicts with the roster rule: {reason}.",
                        staff.name
                    ));
                }
            }
        }
    }
    Ok(())
}

/// P10: a forced `from → to` needs at least as many `to` slots as forced
/// `from` days; a last-day `from` is exempt when the month can still end
/// on it.
pub(super) fn check_shift_pattern_counts(input: &AnalysisInput<'_>) -> Result<(), String> {
    let last_day = input.month.days - 1;
    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in &input.staff_constraints[s] {
            if constraint.category != Category::ShiftPattern
                || constraint.kind != ConstraintKind::Mandatory
                || constraint.sub_category != "愛好"
            {
                continue;
            }
            let from_min = i64::from(staff.bounds(&constraint.count).min);
            let to_max = i64::from(staff.bounds(&constraint.target).max);

            let from_code = normalize_label(&constraint.count);
            let last_cell = input.confirmed(s, last_day);
            let last_day_open = match (last_cell, from_code) {
                (Some(code), Some(from)) => code == from,
                (Some(_), None) => false,
                (None, from) => {
                    let required = match constraint.count.as_str() {
                        "早番" => i64::from(input.rule.early_staff),
                        "遅番" => i64::from(input.rule.late_staff),
                        "夜勤" => i64::from(input.rule.night_staff),
                        _ => input.rule.weekday_staff.floor() as i64,
                    };
                    let confirmed_last = from
                        .map(|code| {
                            (0..input.staff.len())
                                .filter(|&m| input.confirmed(m, last_day) == Some(code))
                                .count() as i64
                        })
                        .unwrap_or(0);
                    confirmed_last < required
                }
            };

            let effective_min = from_min - i64::from(last_day_open);
            if effective_min > to_max {
                return Err(format!(
                    "{}: the forced pattern {}→{} cannot hold — at least {from_min} {} days \
                     must be followed by {}, but only {to_max} are allowed.",
                    staff.name,
                    constraint.count,
                    constraint.target,
                    constraint.count,
                    constraint.target
                ));
            }
        }
    }
    Ok(())
}

/// P11: the roster level accepts 回避 or preference transitions only.
pub(super) fn check_global_shift_pattern_form(input: &AnalysisInput<'_>) -> Result<(), String> {
    let offending: Vec<String> = input
        .rule_constraints
        .iter()
        .filter(|c| {
            c.category == Category::ShiftPattern
                && c.kind == ConstraintKind::Mandatory
                && c.sub_category == "推奨"
        })
        .map(|c| format!("{}→{}", c.count, c.target))
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Roster-level shift patterns cannot be mandatory 推奨 (got: {}); use 回避 or a \
             preference form.",
            offending.join(", ")
        ))
    }
}
