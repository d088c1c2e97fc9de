//! Shift-interval feasibility: confirmed spacing, opposing constraints, and
//! the month-length arithmetic against the minimum count.

use shared::vocabulary::normalize_label;

use crate::domain::catalog::{Category, Constraint, ConstraintKind};

use super::AnalysisInput;

fn mandatory_intervals<'a>(
    input: &'a AnalysisInput<'_>,
    s: usize,
) -> impl Iterator<Item = &'a Constraint> {
    input.staff_constraints[s].iter().filter(|c| {
        c.category == Category::ShiftInterval && c.kind == ConstraintKind::Mandatory
    })
}

/// Confirmed cells must not already break a mandatory 嫌悪 spacing. The 愛好
/// form is left alone here: partial rosters can still be filled in between.
pub(super) fn check_confirmed_intervals(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in mandatory_intervals(input, s) {
            if constraint.sub_category != "嫌悪" {
                continue;
            }
            let Some(code) = normalize_label(&constraint.count) else {
                continue;
            };
            let Ok(interval) = constraint.target.parse::<usize>() else {
                continue;
            };
            let occurrences: Vec<usize> = input
                .confirmed_cells(s)
                .into_iter()
                .filter(|&(_, c)| c == code)
                .map(|(d, _)| d)
                .collect();
            for pair in occurrences.windows(2) {
                let gap = pair[1] - pair[0];
                if gap <= interval {
                    return Err(format!(
                        "{}: {} repeats {gap} day(s) apart (days {} and {}), but the spacing \
                         constraint forbids repeats within {interval} day(s).",
                        staff.name,
                        constraint.count,
                        pair[0] + 1,
                        pair[1] + 1
                    ));
                }
            }
        }
    }
    Ok(())
}

/// A 愛好 window no wider than a 嫌悪 window on the same code can never be
/// satisfied.
pub(super) fn check_interval_conflicts(input: &AnalysisInput<'_>) -> Result<(), String> {
    for (s, staff) in input.staff.iter().enumerate() {
        let records: Vec<&Constraint> = mandatory_intervals(input, s).collect();
        for (i, a) in records.iter().enumerate() {
            for b in &records[i + 1..] {
                if a.count != b.count || a.sub_category == b.sub_category {
                    continue;
                }
                let (hate, like) = if a.sub_category == "嫌悪" {
                    (a, b)
                } else {
                    (b, a)
                };
                let (Ok(hate_days), Ok(like_days)) =
                    (hate.target.parse::<i64>(), like.target.parse::<i64>())
                else {
                    continue;
                };
                if like_days <= hate_days {
                    return Err(format!(
                        "{}: {} must recur within {like_days} day(s) yet is forbidden to recur \
                         within {hate_days}; the two spacing constraints cannot coexist.",
                        staff.name, hate.count
                    ));
                }
            }
        }
    }
    Ok(())
}

/// A 嫌悪 spacing with a minimum count must still fit the month:
/// `1 + (interval + 1) · (min − 1)` days are needed.
pub(super) fn check_interval_counts(input: &AnalysisInput<'_>) -> Result<(), String> {
    let month_days = input.month.days as i64;
    for (s, staff) in input.staff.iter().enumerate() {
        for constraint in mandatory_intervals(input, s) {
            if constraint.sub_category != "嫌悪" {
                continue;
            }
            if normalize_label(&constraint.count).is_none() {
                continue;
            }
            let Ok(interval) = constraint.target.parse::<i64>() else {
                continue;
            };
            let min_count = i64::from(staff.bounds(&constraint.count).min);
            if min_count == 0 {
                continue;
            }
            let required = 1 + (interval + 1) * (min_count - 1);
            if required > month_days {
                return Err(format!(
                    "{}: {} must appear at least {min_count} times, spaced more than \
                     {interval} day(s) apart; that needs {required} days but the month has \
                     {month_days}.",
                    staff.name, constraint.count
                ));
            }
        }
    }
    Ok(())
}
