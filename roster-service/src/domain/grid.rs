use std::collections::HashMap;

use selen::prelude::*;
use shared::time::MonthContext;
use shared::types::{HopeEntry, PreferenceEntry, Staff};
use shared::vocabulary::{BASE_CODES, ShiftCode};

/// Reliability score assumed for staff without an override.
pub const DEFAULT_RELIABILITY: i32 = 30;

/// The boolean assignment universe `x[staff][day][code]`.
///
/// Built once at model-assembly entry. Staff names are resolved to stable
/// indices here so cross-staff constraints can carry indices instead of
/// references into each other's records. Columns are the nine named codes
/// plus whichever numbered glyphs the request actually references.
pub struct ShiftGrid {
    pub month: MonthContext,
    codes: Vec<ShiftCode>,
    code_index: HashMap<ShiftCode, usize>,
    staff_names: Vec<String>,
    name_index: HashMap<String, usize>,
    reliability: Vec<i32>,
    vars: Vec<VarId>,
}

impl ShiftGrid {
    pub fn new(
        model: &mut Model,
        month: MonthContext,
        staff: &[Staff],
        hope_entries: &[HopeEntry],
        preference_entries: &[PreferenceEntry],
    ) -> Self {
        let mut codes: Vec<ShiftCode> = BASE_CODES.to_vec();
        let mut numbered: Vec<ShiftCode> = preference_entries
            .iter()
            .map(|e| e.shift_code)
            .chain(hope_entries.iter().map(|e| e.shift_code))
            .filter(|c| matches!(c, ShiftCode::Numbered(_)))
            .collect();
        numbered.sort();
        numbered.dedup();
        codes.extend(numbered);

        let code_index = codes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let staff_names: Vec<String> = staff.iter().map(|s| s.name.clone()).collect();
        let name_index = staff_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let reliability = staff
            .iter()
            .map(|s| s.reliability_override.unwrap_or(DEFAULT_RELIABILITY))
            .collect();

        let vars = model.bools(staff.len() * month.days * codes.len());

        Self {
            month,
            codes,
            code_index,
            staff_names,
            name_index,
            reliability,
            vars,
        }
    }

    pub fn days(&self) -> usize {
        self.month.days
    }

    pub fn staff_count(&self) -> usize {
        self.staff_names.len()
    }

    pub fn staff_name(&self, staff: usize) -> &str {
        &self.staff_names[staff]
    }

    pub fn staff_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn reliability(&self, staff: usize) -> i32 {
        self.reliability[staff]
    }

    /// All column codes, named first, then numbered.
    pub fn codes(&self) -> &[ShiftCode] {
        &self.codes
    }

    pub fn has_code(&self, code: ShiftCode) -> bool {
        self.code_index.contains_key(&code)
    }

    /// The cell variable for `(staff, 0-based day, code)`.
    ///
    /// # Panics
    ///
    /// Panics if the code is not a column of this grid; callers gate payload
    /// codes through [`Self::has_code`] first.
    pub fn var(&self, staff: usize, day: usize, code: ShiftCode) -> VarId {
        let col = self.code_index[&code];
        self.vars[(staff * self.month.days + day) * self.codes.len() + col]
    }

    /// Every cell variable of one day for one staff.
    pub fn day_vars(&self, staff: usize, day: usize) -> Vec<VarId> {
        self.codes
            .iter()
            .map(|&code| self.var(staff, day, code))
            .collect()
    }

    /// One code across the whole month for one staff.
    pub fn month_vars(&self, staff: usize, code: ShiftCode) -> Vec<VarId> {
        (0..self.month.days)
            .map(|day| self.var(staff, day, code))
            .collect()
    }

    /// The working-set cells (▲/日/▼) of one day for one staff.
    pub fn working_vars(&self, staff: usize, day: usize) -> Vec<VarId> {
        shared::vocabulary::WORKING_CODES
            .iter()
            .map(|&code| self.var(staff, day, code))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn grid_indexes_every_cell_uniquely() {
        let mut model = Model::default();
        let month = MonthContext::new(2026, 2).unwrap();
        let staff = vec![make_staff("佐藤"), make_staff("田中")];
        let grid = ShiftGrid::new(&mut model, month, &staff, &[], &[]);

        assert_eq!(grid.staff_count(), 2);
        assert_eq!(grid.days(), 28);
        assert_eq!(grid.codes().len(), BASE_CODES.len());

        let mut seen = std::collections::HashSet::new();
        for s in 0..grid.staff_count() {
            for d in 0..grid.days() {
                for &code in grid.codes() {
                    assert!(seen.insert(grid.var(s, d, code)));
                }
            }
        }
    }

    #[test]
    fn numbered_columns_follow_preference_entries() {
        let mut model = Model::default();
        let month = MonthContext::new(2026, 2).unwrap();
        let staff = vec![make_staff("佐藤")];
        let prefs = vec![
            PreferenceEntry {
                staff_name: "佐藤".into(),
                day: 3,
                shift_code: ShiftCode::Numbered(2),
                weight: None,
            },
            PreferenceEntry {
                staff_name: "佐藤".into(),
                day: 4,
                shift_code: ShiftCode::Numbered(2),
                weight: None,
            },
        ];
        let grid = ShiftGrid::new(&mut model, month, &staff, &[], &prefs);
        assert!(grid.has_code(ShiftCode::Numbered(2)));
        assert!(!grid.has_code(ShiftCode::Numbered(7)));
        assert_eq!(grid.codes().len(), BASE_CODES.len() + 1);
    }

    #[test]
    fn reliability_defaults_and_overrides() {
        let mut model = Model::default();
        let month = MonthContext::new(2026, 2).unwrap();
        let mut veteran = make_staff("佐藤");
        veteran.reliability_override = Some(50);
        let staff = vec![veteran, make_staff("田中")];
        let grid = ShiftGrid::new(&mut model, month, &staff, &[], &[]);
        assert_eq!(grid.reliability(0), 50);
        assert_eq!(grid.reliability(1), DEFAULT_RELIABILITY);
    }
}
