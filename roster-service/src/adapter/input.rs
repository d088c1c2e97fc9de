//! Input adapter: validates the wire request and produces the parsed domain
//! view the analyzer and encoders work on. Unknown entry data fails fast;
//! unknown constraint records are skipped with a warning.

use std::collections::HashSet;
use std::time::Duration;

use shared::time::MonthContext;
use shared::types::{
    GlobalRule, HopeEntry, Notification, PreferenceEntry, RosterRequest, SolveMode, Staff,
    WeightConfig,
};

use crate::domain::catalog::{self, Constraint};
use crate::domain::sink::NotificationSink;
use crate::error::GenerationError;

/// A validated request with constraints parsed into the typed catalog.
#[derive(Clone, Debug)]
pub struct ParsedRequest {
    pub month: MonthContext,
    pub staff: Vec<Staff>,
    /// Typed constraints per staff, same index order as `staff`.
    pub staff_constraints: Vec<Vec<Constraint>>,
    pub rule: GlobalRule,
    pub rule_constraints: Vec<Constraint>,
    pub hopes: Vec<HopeEntry>,
    pub preference_entries: Vec<PreferenceEntry>,
    pub weights: WeightConfig,
    pub search_time: Duration,
    pub mode: SolveMode,
}

pub fn parse_request(
    request: &RosterRequest,
    notifier: &dyn NotificationSink,
) -> Result<ParsedRequest, GenerationError> {
    let month = MonthContext::new(request.year, request.month).ok_or_else(|| {
        GenerationError::InvalidInput(format!(
            "{}-{:02} is not a valid roster month",
            request.year, request.month
        ))
    })?;

    let mut names = HashSet::new();
    for staff in &request.staff_list {
        if staff.name.trim().is_empty() {
            return Err(GenerationError::InvalidInput(
                "a staff record has an empty name".to_string(),
            ));
        }
        if !names.insert(staff.name.as_str()) {
            return Err(GenerationError::InvalidInput(format!(
                "duplicate staff name {:?}",
                staff.name
            )));
        }
    }

    for entry in &request.hope_entries {
        if !names.contains(entry.staff_name.as_str()) {
            return Err(GenerationError::InvalidInput(format!(
                "hope entry references unknown staff {:?}",
                entry.staff_name
            )));
        }
        if entry.day == 0 || entry.day as usize > month.days {
            return Err(GenerationError::InvalidInput(format!(
                "hope entry for {} names day {}, outside 1..={}",
                entry.staff_name, entry.day, month.days
            )));
        }
    }
    for entry in &request.preference_entries {
        if !names.contains(entry.staff_name.as_str()) {
            return Err(GenerationError::InvalidInput(format!(
                "preference entry references unknown staff {:?}",
                entry.staff_name
            )));
        }
        if entry.day == 0 || entry.day as usize > month.days {
            return Err(GenerationError::InvalidInput(format!(
                "preference entry for {} names day {}, outside 1..={}",
                entry.staff_name, entry.day, month.days
            )));
        }
    }

    let mut staff_constraints = Vec::with_capacity(request.staff_list.len());
    for staff in &request.staff_list {
        let (parsed, skipped) = catalog::parse_list(&staff.constraints);
        for idx in skipped {
            notifier.notify(Notification::warning(format!(
                "{}: constraint #{} has an unknown kind or category ({:?} / {:?}); skipped",
                staff.name,
                idx + 1,
                staff.constraints[idx].kind,
                staff.constraints[idx].category
            )));
        }
        staff_constraints.push(parsed);
    }

    let (rule_constraints, skipped) = catalog::parse_list(&request.rule.preference_constraints);
    for idx in skipped {
        notifier.notify(Notification::warning(format!(
            "roster rule constraint #{} has an unknown kind or category ({:?} / {:?}); skipped",
            idx + 1,
            request.rule.preference_constraints[idx].kind,
            request.rule.preference_constraints[idx].category
        )));
    }

    Ok(ParsedRequest {
        month,
        staff: request.staff_list.clone(),
        staff_constraints,
        rule: request.rule.clone(),
        rule_constraints,
        hopes: request.hope_entries.clone(),
        preference_entries: request.preference_entries.clone(),
        weights: request.weights.clone().unwrap_or_default(),
        search_time: Duration::from_secs(request.search_time_seconds),
        mode: request.mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sink::MemoryNotificationSink;
    use shared::types::RawConstraint;
    use shared::vocabulary::ShiftCode;
    use std::collections::BTreeMap;

    fn make_staff(name: &str) -> Staff {
        Staff {
            name: name.into(),
            role: "介護".into(),
            day_shift_only: false,
            part_time: false,
            global_rule_excluded: false,
            shift_counts: BTreeMap::new(),
            holiday_override: None,
            reliability_override: None,
            constraints: Vec::new(),
        }
    }

    fn make_rule() -> GlobalRule {
        GlobalRule {
            holiday_count: 9,
            consecutive_work_limit: 5,
            weekday_staff: 1.0,
            sunday_staff: 1.0,
            early_staff: 1,
            late_staff: 1,
            night_staff: 1,
            weekday_reliability: None,
            sunday_reliability: None,
            preference_constraints: Vec::new(),
        }
    }

    fn make_request() -> RosterRequest {
        RosterRequest {
            staff_list: vec![make_staff("佐藤"), make_staff("田中")],
            rule: make_rule(),
            hope_entries: Vec::new(),
            preference_entries: Vec::new(),
            weights: None,
            search_time_seconds: 10,
            year: 2026,
            month: 2,
            mode: SolveMode::Turbo,
        }
    }

    #[test]
    fn parses_a_clean_request() {
        let sink = MemoryNotificationSink::new();
        let parsed = parse_request(&make_request(), &sink).unwrap();
        assert_eq!(parsed.month.days, 28);
        assert_eq!(parsed.staff.len(), 2);
        assert_eq!(parsed.search_time, Duration::from_secs(10));
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut request = make_request();
        request.staff_list.push(make_staff("佐藤"));
        let sink = MemoryNotificationSink::new();
        let err = parse_request(&request, &sink).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn rejects_out_of_month_hope_entries() {
        let mut request = make_request();
        request.hope_entries.push(HopeEntry {
            staff_name: "佐藤".into(),
            day: 29,
            shift_code: ShiftCode::Rest,
            role: String::new(),
            part_time: false,
        });
        let sink = MemoryNotificationSink::new();
        let err = parse_request(&request, &sink).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn rejects_unknown_staff_in_entries() {
        let mut request = make_request();
        request.preference_entries.push(PreferenceEntry {
            staff_name: "誰か".into(),
            day: 3,
            shift_code: ShiftCode::Numbered(1),
            weight: None,
        });
        let sink = MemoryNotificationSink::new();
        assert!(parse_request(&request, &sink).is_err());
    }

    #[test]
    fn unknown_constraint_categories_warn_but_do_not_fail() {
        let mut request = make_request();
        request.staff_list[0].constraints.push(RawConstraint {
            kind: "必須".into(),
            category: "未知カテゴリ".into(),
            ..RawConstraint::default()
        });
        request.staff_list[0].constraints.push(RawConstraint {
            kind: "必須".into(),
            category: "勤務希望".into(),
            target: "早番".into(),
            sub_category: "愛好".into(),
            ..RawConstraint::default()
        });
        let sink = MemoryNotificationSink::new();
        let parsed = parse_request(&request, &sink).unwrap();
        assert_eq!(parsed.staff_constraints[0].len(), 1);
        assert_eq!(sink.snapshot().len(), 1);
    }

    #[test]
    fn invalid_month_is_invalid_input() {
        let mut request = make_request();
        request.month = 13;
        let sink = MemoryNotificationSink::new();
        assert!(matches!(
            parse_request(&request, &sink),
            Err(GenerationError::InvalidInput(_))
        ));
    }
}
