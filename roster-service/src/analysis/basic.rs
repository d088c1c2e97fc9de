//! Basic feasibility: slot arithmetic over staff, days, and shift counts.

use shared::vocabulary::ShiftCode;

use super::AnalysisInput;

pub(super) fn check_staff_present(input: &AnalysisInput<'_>) -> Result<(), String> {
    if input.staff.is_empty() {
        return Err("Staff list is empty; nothing to roster.".to_string());
    }
    Ok(())
}

/// Per staff: min ≤ max for every label, and the min/max totals must bracket
/// the working days. A night costs two cells; `☆` cells are off the books.
pub(super) fn check_shift_count_conflicts(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        let stars = input.star_count(s);
        let holidays = input.holiday_budget(s) as usize;
        let working_days = input.month.days.saturating_sub(holidays + stars) as i64;

        let mut total_min = 0i64;
        let mut total_max = 0i64;
        for (label, bounds) in &staff.shift_counts {
            if bounds.min > bounds.max {
                return Err(format!(
                    "{}: {label} has min {} above max {}.",
                    staff.name, bounds.min, bounds.max
                ));
            }
            let slots = if label == "夜勤" { 2 } else { 1 };
            total_min += i64::from(bounds.min) * slots;
            total_max += i64::from(bounds.max) * slots;
        }

        if total_min > working_days {
            return Err(format!(
                "{}: the shift-count minimums need {total_min} cells but only {working_days} \
                 working days remain ({stars} ☆ cells excluded, nights cost two cells).",
                staff.name
            ));
        }
        if total_max < working_days {
            return Err(format!(
                "{}: the shift-count maximums cover {total_max} cells but {working_days} \
                 working days must be filled ({stars} ☆ cells excluded, nights cost two cells).",
                staff.name
            ));
        }
    }
    Ok(())
}

fn floor_staff(value: f64) -> i64 {
    value.floor() as i64
}

fn is_half(value: f64) -> bool {
    (value.fract() - 0.5).abs() < 0.01
}

/// Month-wide slot demand at the day-staff minimum.
fn required_slots(input: &AnalysisInput<'_>) -> i64 {
    let rule = input.rule;
    let base =
        i64::from(rule.early_staff) + i64::from(rule.late_staff) + 2 * i64::from(rule.night_staff);
    let weekday = (base + floor_staff(rule.weekday_staff)) * input.month.weekday_count() as i64;
    let sunday = (base + floor_staff(rule.sunday_staff)) * input.month.sunday_count() as i64;
    weekday + sunday
}

/// Month-wide slot supply: every staff's non-rest days, minus ☆ cells.
fn total_slots(input: &AnalysisInput<'_>) -> i64 {
    let mut total = 0i64;
    for s in 0..input.staff.len() {
        total += input.month.days as i64 - i64::from(input.holiday_budget(s));
        total -= input.star_count(s) as i64;
    }
    total
}

pub(super) fn check_total_slots(input: &AnalysisInput<'_>) -> Result<(), String> {
    let total = total_slots(input);
    let min_required = required_slots(input);
    let mut max_required = min_required;
    if is_half(input.rule.weekday_staff) {
        max_required += input.month.weekday_count() as i64;
    }
    if is_half(input.rule.sunday_staff) {
        max_required += input.month.sunday_count() as i64;
    }

    if total < min_required {
        return Err(format!(
            "Total workable slots ({total}) fall short of the required {min_required}; \
             the roster cannot be staffed."
        ));
    }
    if total > max_required {
        return Err(format!(
            "Total workable slots ({total}) exceed the required {max_required} by {}; \
             raise the holiday count or the required staffing.",
            total - max_required
        ));
    }
    Ok(())
}

/// Per shift family: the staff maximums must reach the monthly demand, and
/// the minimums must not exceed it.
pub(super) fn check_shift_type_requirements(input: &AnalysisInput<'_>) -> Result<(), String> {
    let month = input.month;
    let rule = input.rule;
    let day_required = floor_staff(rule.weekday_staff) * month.weekday_count() as i64
        + floor_staff(rule.sunday_staff) * month.sunday_count() as i64;
    let required: [(&str, i64); 4] = [
        ("早番", i64::from(rule.early_staff) * month.days as i64),
        ("遅番", i64::from(rule.late_staff) * month.days as i64),
        ("夜勤", i64::from(rule.night_staff) * month.days as i64),
        ("日勤", day_required),
    ];

    for (label, needed) in required {
        let supply_max: i64 = input
            .staff
            .iter()
            .map(|s| i64::from(s.bounds(label).max))
            .sum();
        let supply_min: i64 = input
            .staff
            .iter()
            .map(|s| i64::from(s.bounds(label).min))
            .sum();
        if supply_max < needed {
            return Err(format!(
                "{label}: {needed} slots are required but the staff maximums only cover \
                 {supply_max} ({} short).",
                needed - supply_max
            ));
        }
        if supply_min > needed {
            return Err(format!(
                "{label}: {needed} slots are required but the staff minimums already demand \
                 {supply_min} ({} over).",
                supply_min - needed
            ));
        }
    }
    Ok(())
}

/// Per day: confirmed cells must fit the staffing plan, and enough blank
/// cells must remain to cover what is still owed.
pub(super) fn check_daily_slots(input: &AnalysisInput<'_>) -> Result<(), String> {
    let rule = input.rule;
    for day in 0..input.month.days {
        let day_number = day + 1;
        let mut early = 0i64;
        let mut day_duty = 0i64;
        let mut late = 0i64;
        let mut night_in = 0i64;
        let mut night_out = 0i64;
        let mut holidays = 0i64;
        for s in 0..input.staff.len() {
            match input.confirmed(s, day) {
                Some(ShiftCode::Early) => early += 1,
                Some(ShiftCode::Day) => day_duty += 1,
                Some(ShiftCode::Late) => late += 1,
                Some(ShiftCode::NightIn) => night_in += 1,
                Some(ShiftCode::NightOut) => night_out += 1,
                Some(ShiftCode::Rest | ShiftCode::Leave) => holidays += 1,
                _ => {}
            }
        }

        let day_value = if input.month.is_sunday(day) {
            rule.sunday_staff
        } else {
            rule.weekday_staff
        };
        let day_floor = day_value.floor() as i64;
        let day_ceil = day_value.ceil() as i64;

        if early > i64::from(rule.early_staff) {
            return Err(format!(
                "Day {day_number}: {early} early cells are confirmed but only {} are required.",
                rule.early_staff
            ));
        }
        if late > i64::from(rule.late_staff) {
            return Err(format!(
                "Day {day_number}: {late} late cells are confirmed but only {} are required.",
                rule.late_staff
            ));
        }
        if night_in > i64::from(rule.night_staff) {
            return Err(format!(
                "Day {day_number}: {night_in} night-in (／) cells are confirmed but only {} \
                 are required.",
                rule.night_staff
            ));
        }
        if night_out > i64::from(rule.night_staff) {
            return Err(format!(
                "Day {day_number}: {night_out} night-out (×) cells are confirmed but only {} \
                 are required.",
                rule.night_staff
            ));
        }
        if day_duty > day_ceil {
            return Err(format!(
                "Day {day_number}: {day_duty} day cells are confirmed but at most {day_ceil} \
                 are allowed."
            ));
        }

        let needed = (i64::from(rule.early_staff) - early)
            + (day_floor - day_duty).max(0)
            + (i64::from(rule.late_staff) - late)
            + (i64::from(rule.night_staff) - night_in)
            + (i64::from(rule.night_staff) - night_out);
        let remaining = input.staff.len() as i64
            - (early + day_duty + late + night_in + night_out + holidays);
        if needed > remaining {
            return Err(format!(
                "Day {day_number}: {remaining} unassigned cells remain but {needed} are still \
                 required across the shift families."
            ));
        }
    }
    Ok(())
}

/// Per staff: confirmed cells must respect the maximums and holiday budget,
/// and the blanks left must still be able to cover the minimums.
pub(super) fn check_staff_slots(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        let mut confirmed: [(&str, i64); 5] = [
            ("早番", 0),
            ("日勤", 0),
            ("遅番", 0),
            ("夜勤", 0),
            ("休み", 0),
        ];
        for (_, code) in input.confirmed_cells(s) {
            let bucket = match code {
                ShiftCode::Early => 0,
                ShiftCode::Day => 1,
                ShiftCode::Late => 2,
                ShiftCode::NightIn => 3,
                ShiftCode::Rest | ShiftCode::Leave => 4,
                _ => continue,
            };
            confirmed[bucket].1 += 1;
        }

        for (label, bounds) in &staff.shift_counts {
            let current = confirmed
                .iter()
                .find(|(name, _)| name == label)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            if current > i64::from(bounds.max) {
                return Err(format!(
                    "{}: {label} is confirmed {current} times, above the maximum {}.",
                    staff.name, bounds.max
                ));
            }
        }

        let holiday_limit = i64::from(input.holiday_budget(s));
        let confirmed_rest = confirmed[4].1;
        if confirmed_rest > holiday_limit {
            return Err(format!(
                "{}: {confirmed_rest} rest cells are confirmed, above the holiday budget of \
                 {holiday_limit}.",
                staff.name
            ));
        }

        let total_confirmed: i64 = confirmed.iter().map(|(_, n)| n).sum();
        let remaining = input.month.days as i64 - total_confirmed;
        if confirmed_rest + remaining < holiday_limit {
            return Err(format!(
                "{}: only {remaining} blank cells remain but {} more rest days are owed.",
                staff.name,
                holiday_limit - confirmed_rest
            ));
        }

        let available = remaining - (holiday_limit - confirmed_rest);
        for (label, bounds) in &staff.shift_counts {
            if bounds.min == 0 {
                continue;
            }
            let current = confirmed
                .iter()
                .find(|(name, _)| name == label)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            let outstanding = i64::from(bounds.min) - current;
            let needed = if label == "夜勤" {
                2 * outstanding
            } else {
                outstanding
            };
            if needed > 0 && available < needed {
                return Err(format!(
                    "{}: {label} still needs {outstanding} assignments ({needed} cells{}), \
                     but only {available} cells stay free after reserving holidays.",
                    staff.name,
                    if label == "夜勤" {
                        ", nights cost two cells"
                    } else {
                        ""
                    }
                ));
            }
        }
    }
    Ok(())
}
