//! Constraint encoders.
//!
//! Each encoder walks the typed catalog, matches the categories it owns, and
//! attaches hard clauses to the shared model plus weighted terms to the
//! shared objective list. Encoders are order-independent; the driver runs
//! them in the declared order below.

pub mod alternative;
pub mod basic;
pub mod pattern;
pub mod sequence;

use selen::prelude::*;
use shared::types::{GlobalRule, HopeEntry, Notification, PreferenceEntry, Staff, WeightConfig};

use crate::domain::catalog::Constraint;
use crate::domain::grid::ShiftGrid;
use crate::domain::sink::NotificationSink;

/// Everything an encoder needs: the model under construction, the variable
/// universe, the parsed input, and the shared objective accumulator.
pub struct EncoderContext<'a> {
    pub model: &'a mut Model,
    pub grid: &'a ShiftGrid,
    pub staff: &'a [Staff],
    /// Parsed constraints per staff, same index order as `staff`.
    pub staff_constraints: &'a [Vec<Constraint>],
    pub rule: &'a GlobalRule,
    /// Parsed roster-level constraints, in declaration order.
    pub rule_constraints: &'a [Constraint],
    pub hopes: &'a [HopeEntry],
    pub preference_entries: &'a [PreferenceEntry],
    pub weights: &'a WeightConfig,
    pub notifier: &'a dyn NotificationSink,
    /// Flat `(variable, weight)` objective terms; the driver sums them once.
    pub objective: Vec<(VarId, i32)>,
}

impl EncoderContext<'_> {
    pub fn warn(&self, message: impl Into<String>) {
        self.notifier.notify(Notification::warning(message));
    }

    /// Weight for a per-staff preference constraint: always the flat
    /// category value. Per-staff records do not carry a weight of their own.
    pub fn category_weight(&self, value: i64) -> i32 {
        clamp_weight(value)
    }

    /// Weight for a roster-level preference constraint: always the record's
    /// own weight, zero when absent. The category value is never consulted.
    pub fn own_weight(&self, constraint: &Constraint) -> i32 {
        clamp_weight(constraint.weight.unwrap_or(0))
    }

    pub fn add_term(&mut self, var: VarId, weight: i64) {
        self.objective.push((var, clamp_weight(weight)));
    }

    // region: clause helpers

    pub fn pin_true(&mut self, var: VarId) {
        let _ = self.model.new(var.eq(1));
    }

    pub fn pin_false(&mut self, var: VarId) {
        let _ = self.model.new(var.eq(0));
    }

    /// `a ⇒ b` over booleans.
    pub fn imply(&mut self, a: VarId, b: VarId) {
        self.model.bool_clause(&[b], &[a]);
    }

    /// Forbid the conjunction: at least one of `vars` is false.
    pub fn forbid_all_of(&mut self, vars: &[VarId]) {
        self.model.bool_clause(&[], vars);
    }

    /// Require the disjunction: at least one of `vars` is true.
    pub fn require_any_of(&mut self, vars: &[VarId]) {
        self.model.bool_clause(vars, &[]);
    }

    pub fn count_eq(&mut self, vars: &[VarId], n: i32) {
        let coeffs = vec![1; vars.len()];
        self.model.int_lin_eq(&coeffs, vars, n);
    }

    pub fn count_le(&mut self, vars: &[VarId], n: i32) {
        let coeffs = vec![1; vars.len()];
        self.model.int_lin_le(&coeffs, vars, n);
    }

    pub fn count_ge(&mut self, vars: &[VarId], n: i32) {
        let coeffs = vec![-1; vars.len()];
        self.model.int_lin_le(&coeffs, vars, -n);
    }

    pub fn count_ne(&mut self, vars: &[VarId], n: i32) {
        let coeffs = vec![1; vars.len()];
        self.model.int_lin_ne(&coeffs, vars, n);
    }

    // endregion: clause helpers

    // region: reified helpers

    /// Fresh boolean equivalent to `Σ vars ≥ n`.
    pub fn count_ge_reif(&mut self, vars: &[VarId], n: i32) -> VarId {
        let b = self.model.bool();
        let coeffs = vec![-1; vars.len()];
        self.model.int_lin_le_reif(&coeffs, vars, -n, b);
        b
    }

    /// Fresh boolean equivalent to `Σ vars ≤ n`.
    pub fn count_le_reif(&mut self, vars: &[VarId], n: i32) -> VarId {
        let b = self.model.bool();
        let coeffs = vec![1; vars.len()];
        self.model.int_lin_le_reif(&coeffs, vars, n, b);
        b
    }

    /// Fresh boolean equivalent to `Σ vars = n`.
    pub fn count_eq_reif(&mut self, vars: &[VarId], n: i32) -> VarId {
        let b = self.model.bool();
        let coeffs = vec![1; vars.len()];
        self.model.int_lin_eq_reif(&coeffs, vars, n, b);
        b
    }

    /// Fresh boolean equivalent to the conjunction of `vars`.
    pub fn all_of(&mut self, vars: &[VarId]) -> VarId {
        self.model.bool_and(vars)
    }

    /// Fresh boolean equivalent to the disjunction of `vars`.
    pub fn any_of(&mut self, vars: &[VarId]) -> VarId {
        self.model.bool_or(vars)
    }

    pub fn not(&mut self, var: VarId) -> VarId {
        self.model.bool_not(var)
    }

    pub fn constant(&mut self, value: i32) -> VarId {
        self.model.int(value, value)
    }

    // endregion: reified helpers
}

fn clamp_weight(weight: i64) -> i32 {
    weight.clamp(i64::from(i32::MIN / 2), i64::from(i32::MAX / 2)) as i32
}

/// One encoder family; the driver calls each in the declared order.
pub trait RuleEncoder {
    fn name(&self) -> &'static str;
    fn encode(&self, cx: &mut EncoderContext<'_>);
}

/// The default active-constraint list.
pub fn default_encoders() -> Vec<Box<dyn RuleEncoder>> {
    vec![
        Box::new(basic::BasicRules),
        Box::new(pattern::PatternRules),
        Box::new(sequence::SequenceRules),
        Box::new(alternative::AlternativeRules),
    ]
}
