//! Sequence feasibility: confirmed runs against the work limit, run-length
//! constraint shapes and ranges, and the night/holiday budget arithmetic.

use shared::vocabulary::{ShiftCode, kanji_count};

use crate::domain::catalog::{Bound, Category, Constraint, ConstraintKind};

use super::AnalysisInput;

const MAX_HOLIDAY_RUN: i64 = 7;

fn is_rest(code: ShiftCode) -> bool {
    matches!(code, ShiftCode::Rest | ShiftCode::Leave)
}

fn run_length(constraint: &Constraint) -> i64 {
    if constraint.count.is_empty() {
        1
    } else {
        i64::from(kanji_count(&constraint.count).unwrap_or(1))
    }
}

/// S1: confirmed cells must not already exceed the consecutive-work limit,
/// and every rest-free span must still be coverable by the holiday budget.
pub(super) fn check_confirmed_work_limit(input: &AnalysisInput<'_>) -> Result<(), String> {
    let limit = input.rule.consecutive_work_limit as i64;
    if limit == 0 {
        return Ok(());
    }
    for (s, staff) in input.staff.iter().enumerate() {
        let mut remaining_holidays = i64::from(input.holiday_budget(s));
        // -1 rest, 0 blank, 1 confirmed work
        let cells: Vec<i8> = (0..input.month.days)
            .map(|d| match input.confirmed(s, d) {
                None => 0,
                Some(code) if is_rest(code) => -1,
                Some(_) => 1,
            })
            .collect();
        remaining_holidays -= cells.iter().filter(|&&c| c == -1).count() as i64;

        let mut i = 0usize;
        while i < cells.len() {
            if cells[i] < 0 {
                i += 1;
                continue;
            }
            let start = i;
            let mut confirmed_work = 0i64;
            let mut blanks = 0i64;
            let mut consecutive = 0i64;
            let mut longest = 0i64;
            while i < cells.len() && cells[i] >= 0 {
                if cells[i] == 0 {
                    blanks += 1;
                    consecutive = 0;
                } else {
                    confirmed_work += 1;
                    consecutive += 1;
                    longest = longest.max(consecutive);
                }
                i += 1;
            }

            if longest > limit {
                return Err(format!(
                    "{}: {longest} consecutive confirmed working days start on day {} \
                     (limit {limit}).",
                    staff.name,
                    start + 1
                ));
            }

            let span = confirmed_work + blanks;
            if span > limit {
                let needed = span / (limit + 1);
                if needed > remaining_holidays {
                    return Err(format!(
                        "{}: the span from day {} runs {span} days without a confirmed rest \
                         and needs {needed} rest day(s), but only {remaining_holidays} remain \
                         in the budget.",
                        staff.name,
                        start + 1
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Shape rules for 連続休暇 records (the combinations the encoders accept).
pub(super) fn check_holiday_constraint_shape(input: &AnalysisInput<'_>) -> Result<(), String> {
    for constraint in input.rule_constraints {
        if constraint.category != Category::ConsecutiveHoliday
            || !constraint.applies_to_everyone()
            || constraint.kind != ConstraintKind::Mandatory
        {
            continue;
        }
        let base = run_length(constraint);
        match constraint.sub_category.as_str() {
            "回避" => {
                if base == 1 {
                    return Err(
                        "A mandatory 回避 of 単休 cannot apply to everyone.".to_string()
                    );
                }
                if constraint.target == "以下" {
                    return Err(format!(
                        "A mandatory 回避 of {base}連休 cannot use 以下 for everyone."
                    ));
                }
            }
            "推奨" => {
                if base == 1 && constraint.target != "丁度" {
                    return Err(
                        "A mandatory 推奨 of 単休 for everyone only supports 丁度.".to_string()
                    );
                }
                if base > 1 && constraint.target != "以下" {
                    return Err(format!(
                        "A mandatory 推奨 of {base}連休 for everyone only supports 以下."
                    ));
                }
            }
            _ => {}
        }
    }

    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in &input.staff_constraints[s] {
            if constraint.category != Category::ConsecutiveHoliday
                || constraint.kind != ConstraintKind::Mandatory
            {
                continue;
            }
            let base = run_length(constraint);
            if constraint.sub_category == "嫌悪"
                && base == 1
                && matches!(constraint.target.as_str(), "以上" | "以下")
            {
                return Err(format!(
                    "{}: a mandatory 嫌悪 of 単休 supports neither 以上 nor 以下.",
                    staff.name
                ));
            }
            if constraint.sub_category == "愛好" && base == 1 && constraint.target != "丁度" {
                return Err(format!(
                    "{}: a mandatory 愛好 of 単休 only supports 丁度.",
                    staff.name
                ));
            }
        }
    }
    Ok(())
}

/// Allowed run-length interval implied by one 連続休暇 record.
fn holiday_range(constraint: &Constraint) -> Option<(i64, i64)> {
    let count = run_length(constraint);
    let bound = constraint.target_bound()?;
    if constraint.is_affinity() {
        match bound {
            Bound::AtLeast => Some((count, MAX_HOLIDAY_RUN)),
            Bound::Exact => Some((count, count)),
            Bound::AtMost => Some((1, count)),
        }
    } else if constraint.is_aversion() {
        match bound {
            Bound::AtLeast => Some((1, count - 1)),
            Bound::Exact => Some((if count == 1 { 2 } else { 1 }, MAX_HOLIDAY_RUN)),
            Bound::AtMost => Some((count + 1, MAX_HOLIDAY_RUN)),
        }
    } else {
        None
    }
}

fn ranges_overlap(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0.max(b.0) <= a.1.min(b.1)
}

fn holiday_conflict(a: &Constraint, b: &Constraint) -> bool {
    let (Some(ra), Some(rb)) = (holiday_range(a), holiday_range(b)) else {
        return false;
    };
    if !ranges_overlap(ra, rb) {
        return true;
    }
    // Overlapping ranges still clash when an exact length is both loved and
    // hated.
    if (a.target == "丁度" || b.target == "丁度")
        && a.count == b.count
        && ((a.is_affinity() && b.is_aversion()) || (a.is_aversion() && b.is_affinity()))
    {
        return true;
    }
    false
}

/// S2: mandatory 連続休暇 ranges must stay satisfiable together.
pub(super) fn check_holiday_constraint_ranges(input: &AnalysisInput<'_>) -> Result<(), String> {
    let globals: Vec<&Constraint> = input
        .rule_constraints
        .iter()
        .filter(|c| {
            c.category == Category::ConsecutiveHoliday && c.kind == ConstraintKind::Mandatory
        })
        .collect();

    for (s, staff) in input.staff.iter().enumerate() {
        let locals: Vec<&Constraint> = input.staff_constraints[s]
            .iter()
            .filter(|c| {
                c.category == Category::ConsecutiveHoliday && c.kind == ConstraintKind::Mandatory
            })
            .collect();

        if !staff.global_rule_excluded {
            for local in &locals {
                for global in &globals {
                    if holiday_conflict(local, global) {
                        return Err(format!(
                            "{}: the personal {}{} {} rest-run constraint conflicts with the \
                             roster rule {}{} {}.",
                            staff.name,
                            local.count,
                            local.target,
                            local.sub_category,
                            global.count,
                            global.target,
                            global.sub_category
                        ));
                    }
                }
            }
        }
        for (i, a) in locals.iter().enumerate() {
            for b in &locals[i + 1..] {
                if holiday_conflict(a, b) {
                    return Err(format!(
                        "{}: rest-run constraints conflict with each other: {}{} {} vs {}{} {}.",
                        staff.name,
                        a.count,
                        a.target,
                        a.sub_category,
                        b.count,
                        b.target,
                        b.sub_category
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Rest runs already present in the confirmed cells; a run is `closed` when
/// confirmed non-rest cells (or month edges next to confirmed cells) bound
/// it on both sides.
fn confirmed_rest_runs(input: &AnalysisInput<'_>, s: usize) -> Vec<(usize, usize, bool)> {
    let days = input.month.days;
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut before_confirmed = true;
    for day in 0..=days {
        let cell = if day < days {
            input.confirmed(s, day)
        } else {
            None
        };
        let resting = cell.is_some_and(is_rest);
        if resting {
            if start.is_none() {
                start = Some(day);
                before_confirmed = day == 0 || input.confirmed(s, day - 1).is_some();
            }
        } else if let Some(run_start) = start.take() {
            let after_confirmed = day == days || cell.is_some();
            runs.push((run_start, day - run_start, before_confirmed && after_confirmed));
        }
    }
    runs
}

/// S2 (confirmed side): rest runs in the hopes must not violate a mandatory
/// 連続休暇 record.
pub(super) fn check_confirmed_holiday_runs(input: &AnalysisInput<'_>) -> Result<(), String> {
    let globals: Vec<Constraint> = input
        .rule_constraints
        .iter()
        .filter(|c| {
            c.category == Category::ConsecutiveHoliday && c.kind == ConstraintKind::Mandatory
        })
        .cloned()
        .collect();

    for (s, staff) in input.staff.iter().enumerate() {
        let mut constraints: Vec<Constraint> = input.staff_constraints[s]
            .iter()
            .filter(|c| {
                c.category == Category::ConsecutiveHoliday && c.kind == ConstraintKind::Mandatory
            })
            .cloned()
            .collect();
        if !staff.global_rule_excluded {
            constraints.extend(globals.iter().cloned());
        }
        if constraints.is_empty() {
            continue;
        }

        for (start, length, closed) in confirmed_rest_runs(input, s) {
            let length = length as i64;
            for constraint in &constraints {
                let count = run_length(constraint);
                let Some(bound) = constraint.target_bound() else {
                    continue;
                };
                let violated = if constraint.is_affinity() {
                    match bound {
                        Bound::AtLeast => closed && length < count,
                        Bound::AtMost | Bound::Exact => length > count,
                    }
                } else {
                    match bound {
                        Bound::AtLeast => length >= count,
                        Bound::AtMost => closed && length <= count,
                        Bound::Exact => closed && length == count,
                    }
                };
                if violated {
                    return Err(format!(
                        "{}: the confirmed {length}-day rest run starting day {} violates the \
                         {}{} {} constraint.",
                        staff.name,
                        start + 1,
                        constraint.count,
                        constraint.target,
                        constraint.sub_category
                    ));
                }
            }
        }
    }
    Ok(())
}

/// S3: every night but the last drags a rest run behind it; that must fit
/// the holiday budget.
pub(super) fn check_night_holiday_budget(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        let night_min = i64::from(staff.bounds("夜勤").min);
        if night_min == 0 {
            continue;
        }
        let holidays = i64::from(input.holiday_budget(s));

        let mut min_run = 1i64;
        let mut reason = "no rest-run constraint".to_string();
        let mut constraints: Vec<&Constraint> = input.staff_constraints[s].iter().collect();
        if !staff.global_rule_excluded {
            constraints.extend(input.rule_constraints.iter());
        }
        for constraint in constraints {
            if constraint.kind != ConstraintKind::Mandatory
                || constraint.category != Category::ConsecutiveHoliday
            {
                continue;
            }
            let count = run_length(constraint);
            if constraint.is_aversion() && constraint.count == "単休" && constraint.target == "丁度"
            {
                if min_run < 2 {
                    min_run = 2;
                    reason = "isolated rests are forbidden".to_string();
                }
            } else if constraint.is_aversion() && constraint.target == "以下" {
                if count + 1 > min_run {
                    min_run = count + 1;
                    reason = format!("rest runs of {count} or fewer are forbidden");
                }
            } else if constraint.is_affinity()
                && matches!(constraint.target.as_str(), "丁度" | "以上")
                && count > min_run
            {
                min_run = count;
                reason = format!("rest runs must be {count} days ({})", constraint.target);
            }
        }

        let required = (night_min - 1) * min_run;
        if required > holidays {
            return Err(format!(
                "{}: {night_min} nights each need a trailing rest run of {min_run} day(s) \
                 ({reason}); that costs {required} rest days but the budget is {holidays}.",
                staff.name
            ));
        }
    }
    Ok(())
}

/// S4: the preference form of the night consecutive-shift rule is not
/// supported.
pub(super) fn check_night_sequence_form(input: &AnalysisInput<'_>) -> Result<(), String> {
    let offending = input.rule_constraints.iter().any(|c| {
        c.category == Category::ConsecutiveShift
            && c.kind == ConstraintKind::Preference
            && c.count == "夜勤"
    });
    if offending {
        Err("連続シフト for 夜勤 only exists in its mandatory form; the preference form is \
             not supported."
            .to_string())
    } else {
        Ok(())
    }
}

/// Confirmed-cell walk for mandatory 連続シフト records: the night cluster
/// counter and plain same-code runs.
pub(super) fn check_confirmed_shift_sequences(input: &AnalysisInput<'_>) -> Result<(), String> {
    let records: Vec<&Constraint> = input
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ConsecutiveShift && c.kind == ConstraintKind::Mandatory)
        .collect();
    if records.is_empty() {
        return Ok(());
    }

    for (s, staff) in input.staff.iter().enumerate() {
        if staff.global_rule_excluded {
            continue;
        }
        let cells = input.confirmed_cells(s);
        if cells.is_empty() {
            continue;
        }

        for constraint in &records {
            let Some(limit) = kanji_count(&constraint.final_).filter(|&n| n > 0) else {
                continue;
            };
            let limit = i64::from(limit);
            if constraint.target != "以上" {
                continue;
            }

            if constraint.count == "夜勤" {
                // Walk clusters: open on ×, survive ／/×/公, close elsewhere
                // or on any gap.
                let mut i = 0usize;
                while i < cells.len() {
                    let (day, code) = cells[i];
                    if code != ShiftCode::NightOut {
                        i += 1;
                        continue;
                    }
                    let mut count = 1i64;
                    let mut j = i + 1;
                    let mut prev_day = day;
                    while j < cells.len() {
                        let (next_day, next_code) = cells[j];
                        if next_day != prev_day + 1 {
                            break;
                        }
                        if !matches!(
                            next_code,
                            ShiftCode::NightIn | ShiftCode::NightOut | ShiftCode::Rest
                        ) {
                            break;
                        }
                        if next_code == ShiftCode::NightIn {
                            count += 1;
                        }
                        prev_day = next_day;
                        j += 1;
                    }
                    if count >= limit {
                        return Err(format!(
                            "{}: the confirmed night cluster starting day {} already chains \
                             {count} nights ({limit} or more is forbidden).",
                            staff.name,
                            day + 1
                        ));
                    }
                    i = j;
                }
            } else {
                let Some(code) = shared::vocabulary::normalize_label(&constraint.count) else {
                    continue;
                };
                let mut consecutive = 0i64;
                let mut run_start = 0usize;
                for (idx, &(day, cell)) in cells.iter().enumerate() {
                    if idx > 0 && cells[idx - 1].0 + 1 != day {
                        consecutive = 0;
                        continue;
                    }
                    if cell == code {
                        if consecutive == 0 {
                            run_start = day;
                        }
                        consecutive += 1;
                        if consecutive >= limit {
                            return Err(format!(
                                "{}: {} is already confirmed {consecutive} days in a row from \
                                 day {} ({limit} or more is forbidden).",
                                staff.name,
                                constraint.count,
                                run_start + 1
                            ));
                        }
                    } else {
                        consecutive = 0;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Allowed maximal-run intervals implied by one 連続勤務/日勤帯連勤 record.
fn work_ranges(constraint: &Constraint, work_limit: i64) -> Option<Vec<(i64, i64)>> {
    let count = run_length(constraint);
    let bound = constraint.target_bound()?;
    if constraint.is_affinity() {
        match bound {
            Bound::AtLeast => Some(vec![(count, work_limit)]),
            Bound::AtMost => Some(vec![(1, count.min(work_limit))]),
            Bound::Exact => (count <= work_limit).then_some(vec![(count, count)]),
        }
    } else if constraint.is_aversion() {
        match bound {
            Bound::AtLeast => Some(vec![(1, (count - 1).min(work_limit))]),
            Bound::AtMost => Some(vec![((count + 1).min(work_limit), work_limit)]),
            Bound::Exact => {
                if count == 1 {
                    Some(vec![(2, work_limit)])
                } else {
                    Some(vec![(1, count - 1), ((count + 1).min(work_limit), work_limit)])
                }
            }
        }
    } else {
        None
    }
}

fn work_ranges_overlap(a: &[(i64, i64)], b: &[(i64, i64)]) -> bool {
    a.iter()
        .any(|&ra| b.iter().any(|&rb| ranges_overlap(ra, rb)))
}

/// S5: 連続勤務 / 日勤帯連勤 constraints must fit the work limit and leave
/// a common satisfiable run length.
pub(super) fn check_work_pattern_ranges(input: &AnalysisInput<'_>) -> Result<(), String> {
    let work_limit = i64::from(input.rule.consecutive_work_limit);
    let is_work_run = |c: &&Constraint| {
        matches!(
            c.category,
            Category::ConsecutiveWork | Category::DayOnlyConsecutiveWork
        ) && c.kind == ConstraintKind::Mandatory
    };
    let globals: Vec<&Constraint> = input.rule_constraints.iter().filter(is_work_run).collect();

    for (s, staff) in input.staff.iter().enumerate() {
        if staff.global_rule_excluded {
            continue;
        }
        let locals: Vec<&Constraint> = input.staff_constraints[s]
            .iter()
            .filter(is_work_run)
            .collect();

        for &constraint in locals.iter().chain(globals.iter()) {
            let count = run_length(constraint);
            if constraint.is_affinity() && count > work_limit {
                return Err(format!(
                    "{}: the {} constraint asks for {count}-day runs but the consecutive-work \
                     limit is {work_limit}.",
                    staff.name,
                    constraint.category
                ));
            }
        }

        let mut pairs: Vec<(&Constraint, &Constraint)> = Vec::new();
        for (i, &a) in locals.iter().enumerate() {
            for &b in &locals[i + 1..] {
                pairs.push((a, b));
            }
        }
        for &l in &locals {
            for &g in &globals {
                pairs.push((l, g));
            }
        }
        for (a, b) in pairs {
            let (Some(ra), Some(rb)) = (work_ranges(a, work_limit), work_ranges(b, work_limit))
            else {
                continue;
            };
            if !work_ranges_overlap(&ra, &rb) {
                return Err(format!(
                    "{}: the {} {}{} {} constraint conflicts with the {} {}{} {} constraint.",
                    staff.name,
                    a.category,
                    a.count,
                    a.target,
                    a.sub_category,
                    b.category,
                    b.count,
                    b.target,
                    b.sub_category
                ));
            }
        }
    }
    Ok(())
}

/// Confirmed working runs for one staff; `day_only` additionally breaks on
/// the night legs.
fn confirmed_work_runs(
    input: &AnalysisInput<'_>,
    s: usize,
    day_only: bool,
) -> Vec<(usize, usize, bool)> {
    let days = input.month.days;
    let in_set = |code: ShiftCode| {
        if is_rest(code) {
            return false;
        }
        if day_only && matches!(code, ShiftCode::NightIn | ShiftCode::NightOut) {
            return false;
        }
        true
    };
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut before_confirmed = true;
    for day in 0..=days {
        let cell = if day < days {
            input.confirmed(s, day)
        } else {
            None
        };
        let working = cell.is_some_and(in_set);
        if working {
            if start.is_none() {
                start = Some(day);
                before_confirmed = day == 0 || input.confirmed(s, day - 1).is_some();
            }
        } else if let Some(run_start) = start.take() {
            let after_confirmed = day == days || cell.is_some();
            runs.push((run_start, day - run_start, before_confirmed && after_confirmed));
        }
    }
    runs
}

/// S6: confirmed working runs must not violate a mandatory work pattern.
pub(super) fn check_confirmed_work_patterns(input: &AnalysisInput<'_>) -> Result<(), String> {
    let globals: Vec<Constraint> = input
        .rule_constraints
        .iter()
        .filter(|c| {
            matches!(
                c.category,
                Category::ConsecutiveWork | Category::DayOnlyConsecutiveWork
            ) && c.kind == ConstraintKind::Mandatory
        })
        .cloned()
        .collect();

    for (s, staff) in input.staff.iter().enumerate() {
        let mut constraints: Vec<Constraint> = input.staff_constraints[s]
            .iter()
            .filter(|c| {
                matches!(
                    c.category,
                    Category::ConsecutiveWork | Category::DayOnlyConsecutiveWork
                ) && c.kind == ConstraintKind::Mandatory
            })
            .cloned()
            .collect();
        if !staff.global_rule_excluded {
            constraints.extend(globals.iter().cloned());
        }
        if constraints.is_empty() {
            continue;
        }

        for constraint in &constraints {
            let day_only = constraint.category == Category::DayOnlyConsecutiveWork;
            let count = run_length(constraint);
            let Some(bound) = constraint.target_bound() else {
                continue;
            };
            for (start, length, closed) in confirmed_work_runs(input, s, day_only) {
                let length = length as i64;
                let violated = if constraint.is_affinity() {
                    match bound {
                        Bound::AtLeast => closed && length < count,
                        Bound::AtMost | Bound::Exact => length > count,
                    }
                } else {
                    match bound {
                        Bound::AtLeast => length >= count,
                        Bound::AtMost => closed && length <= count,
                        Bound::Exact => closed && length == count,
                    }
                };
                if violated {
                    return Err(format!(
                        "{}: the confirmed {length}-day working run starting day {} violates \
                         the {} {}{} {} constraint.",
                        staff.name,
                        start + 1,
                        constraint.category,
                        constraint.count,
                        constraint.target,
                        constraint.sub_category
                    ));
                }
            }
        }
    }
    Ok(())
}
