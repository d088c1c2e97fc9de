//! Output adapter: shapes a solved assignment list into the roster document
//! and the annotated flat records.

use std::collections::BTreeMap;

use shared::time::MonthContext;
use shared::types::{AssignmentRecord, RosterDocument, Staff};

use crate::solver::Assignment;

/// Width of a document row: day 1 sits at index 0, trailing cells past the
/// month end stay empty.
const ROW_WIDTH: usize = 31;

pub fn build_document(
    month: &MonthContext,
    staff: &[Staff],
    assignments: &[Assignment],
) -> (RosterDocument, Vec<AssignmentRecord>) {
    let mut shifts: BTreeMap<String, Vec<String>> = staff
        .iter()
        .map(|s| (s.name.clone(), vec![String::new(); ROW_WIDTH]))
        .collect();

    let mut records = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let day_index = assignment.day as usize - 1;
        if let Some(row) = shifts.get_mut(&assignment.staff_name)
            && day_index < ROW_WIDTH
        {
            row[day_index] = assignment.shift_code.to_string();
        }
        let (role, part_time) = staff
            .iter()
            .find(|s| s.name == assignment.staff_name)
            .map(|s| (s.role.clone(), s.part_time))
            .unwrap_or_default();
        records.push(AssignmentRecord {
            staff_name: assignment.staff_name.clone(),
            day: assignment.day,
            shift_code: assignment.shift_code,
            role,
            part_time,
        });
    }

    let document = RosterDocument {
        year: month.year,
        month: month.month,
        shifts,
    };
    (document, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::vocabulary::ShiftCode;
    use std::collections::BTreeMap as Map;

    fn make_staff(name: &str, role: &str, part_time: bool) -> Staff {
        Staff {
            name: name.into(),
            role: role.into(),
            day_shift_only: false,
            part_time,
            global_rule_excluded: false,
            shift_counts: Map::new(),
            holiday_override: None,
            reliability_override: None,
            constraints: Vec::new(),
        }
    }

    #[test]
    fn document_rows_are_31_wide_with_day_one_at_index_zero() {
        let month = MonthContext::new(2026, 2).unwrap();
        let staff = vec![make_staff("佐藤", "介護", false)];
        let assignments = vec![
            Assignment {
                staff_name: "佐藤".into(),
                day: 1,
                shift_code: ShiftCode::Early,
            },
            Assignment {
                staff_name: "佐藤".into(),
                day: 28,
                shift_code: ShiftCode::Rest,
            },
        ];
        let (document, records) = build_document(&month, &staff, &assignments);

        let row = &document.shifts["佐藤"];
        assert_eq!(row.len(), 31);
        assert_eq!(row[0], "▲");
        assert_eq!(row[27], "公");
        assert_eq!(row[28], "");
        assert_eq!(row[30], "");
        assert_eq!(document.year, 2026);
        assert_eq!(document.month, 2);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn records_carry_role_and_part_time_annotations() {
        let month = MonthContext::new(2026, 2).unwrap();
        let staff = vec![make_staff("田中", "看護", true)];
        let assignments = vec![Assignment {
            staff_name: "田中".into(),
            day: 5,
            shift_code: ShiftCode::NightIn,
        }];
        let (_, records) = build_document(&month, &staff, &assignments);
        assert_eq!(records[0].role, "看護");
        assert!(records[0].part_time);
        assert_eq!(records[0].shift_code, ShiftCode::NightIn);
    }

    #[test]
    fn staff_without_assignments_still_get_a_row() {
        let month = MonthContext::new(2026, 2).unwrap();
        let staff = vec![make_staff("佐藤", "介護", false), make_staff("田中", "看護", false)];
        let (document, _) = build_document(&month, &staff, &[]);
        assert_eq!(document.shifts.len(), 2);
        assert!(document.shifts["田中"].iter().all(String::is_empty));
    }
}
