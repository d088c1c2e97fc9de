use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vocabulary::ShiftCode;

// region: Staff and rules

/// Per-code monthly occurrence bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftBounds {
    pub min: u32,
    pub max: u32,
}

/// One roster member. `shift_counts` is keyed by the payload labels
/// (早番/日勤/遅番/夜勤); normalization to codes happens at the encoders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub name: String,
    pub role: String,
    #[serde(rename = "is_day_shift_only")]
    pub day_shift_only: bool,
    #[serde(rename = "is_part_time")]
    pub part_time: bool,
    /// When set, roster-level rules skip this staff.
    #[serde(rename = "is_global_rule")]
    pub global_rule_excluded: bool,
    pub shift_counts: BTreeMap<String, ShiftBounds>,
    #[serde(default)]
    pub holiday_override: Option<u32>,
    #[serde(default)]
    pub reliability_override: Option<i32>,
    #[serde(default)]
    pub constraints: Vec<RawConstraint>,
}

impl Staff {
    /// Bounds for a payload label, `0..=0` when the label is absent.
    pub fn bounds(&self, label: &str) -> ShiftBounds {
        self.shift_counts
            .get(label)
            .copied()
            .unwrap_or(ShiftBounds { min: 0, max: 0 })
    }
}

/// Untyped constraint record as it arrives on the wire. The generator parses
/// this into its typed catalog; fields a category does not use stay empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawConstraint {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub count: String,
    #[serde(default, rename = "final")]
    pub final_: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub times: String,
    #[serde(default)]
    pub weight: Option<i64>,
}

/// Roster-level rule. The `day` staffing numbers may carry a half step
/// (e.g. `2.5`), read as the allowed band `[floor, ceil]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalRule {
    pub holiday_count: u32,
    pub consecutive_work_limit: u32,
    pub weekday_staff: f64,
    pub sunday_staff: f64,
    pub early_staff: u32,
    pub late_staff: u32,
    pub night_staff: u32,
    #[serde(default)]
    pub weekday_reliability: Option<i32>,
    #[serde(default)]
    pub sunday_reliability: Option<i32>,
    #[serde(default)]
    pub preference_constraints: Vec<RawConstraint>,
}

// endregion: Staff and rules

// region: Shift entries

/// A pre-assigned cell; honored as a hard constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HopeEntry {
    pub staff_name: String,
    /// 1-based day of month.
    pub day: u32,
    #[serde(rename = "shift_type")]
    pub shift_code: ShiftCode,
    #[serde(default)]
    pub role: String,
    #[serde(default, rename = "is_part_time")]
    pub part_time: bool,
}

/// A soft per-cell wish for a numbered glyph; rewarded, never forced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceEntry {
    pub staff_name: String,
    /// 1-based day of month.
    pub day: u32,
    #[serde(rename = "shift_type")]
    pub shift_code: ShiftCode,
    #[serde(default)]
    pub weight: Option<i64>,
}

// endregion: Shift entries

/// Preference weights per category. Wire keys are the payload's own wording;
/// anything absent falls back to the catalog defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeightConfig {
    #[serde(rename = "曜日希望")]
    pub weekday_wish: i64,
    #[serde(rename = "勤務希望")]
    pub shift_wish: i64,
    #[serde(rename = "連続休暇")]
    pub holiday_pattern: i64,
    #[serde(rename = "連続勤務")]
    pub work_pattern: i64,
    #[serde(rename = "日勤帯連勤")]
    pub day_only_work_pattern: i64,
    #[serde(rename = "連休保証")]
    pub holiday_guarantee: i64,
    #[serde(rename = "シフトパターン")]
    pub shift_pattern: i64,
    #[serde(rename = "ペアリング")]
    pub pairing: i64,
    #[serde(rename = "セパレート")]
    pub separation: i64,
    #[serde(rename = "カスタムプリセット")]
    pub custom_preset: i64,
    #[serde(rename = "シフトバランス")]
    pub balance: i64,
    #[serde(rename = "シフト間隔")]
    pub shift_interval: i64,
    #[serde(rename = "夜勤ペア重複")]
    pub pair_overlap: i64,
    #[serde(rename = "夜勤ペア重複3回以上")]
    pub triple_pair_overlap: i64,
    #[serde(rename = "同一勤務の3連続")]
    pub same_shift_triple: i64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            weekday_wish: 200,
            shift_wish: 100,
            holiday_pattern: 200,
            work_pattern: 200,
            day_only_work_pattern: 100,
            holiday_guarantee: 200,
            shift_pattern: 200,
            pairing: 100,
            separation: 200,
            custom_preset: 200,
            balance: 300,
            shift_interval: 200,
            pair_overlap: -333,
            triple_pair_overlap: -10000,
            same_shift_triple: -10000,
        }
    }
}

// region: Request / document

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SolveMode {
    /// Solve on the caller's thread; the caller blocks until done.
    Turbo,
    /// Solve on a blocking pool and poll channels so the caller's event loop
    /// stays responsive.
    Balanced,
}

/// The full generation request as accepted from the input adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRequest {
    pub staff_list: Vec<Staff>,
    pub rule: GlobalRule,
    #[serde(default)]
    pub hope_entries: Vec<HopeEntry>,
    #[serde(default)]
    pub preference_entries: Vec<PreferenceEntry>,
    #[serde(default)]
    pub weights: Option<WeightConfig>,
    pub search_time_seconds: u64,
    pub year: i32,
    pub month: u32,
    pub mode: SolveMode,
}

/// One assigned cell of a finished roster, annotated for the output side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentRecord {
    pub staff_name: String,
    /// 1-based day of month.
    pub day: u32,
    #[serde(rename = "shift_type")]
    pub shift_code: ShiftCode,
    pub role: String,
    #[serde(rename = "is_part_time")]
    pub part_time: bool,
}

/// The output document: one 31-cell row per staff, day 1 at index 0,
/// empty strings past the end of the month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterDocument {
    pub year: i32,
    pub month: u32,
    pub shifts: BTreeMap<String, Vec<String>>,
}

// endregion: Request / document

// region: Channels

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Error,
    Warning,
    Info,
}

/// One diagnostic line for the notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub category: NotificationCategory,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: NotificationCategory::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            category: NotificationCategory::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            category: NotificationCategory::Info,
            message: message.into(),
        }
    }
}

/// Progress events for the incumbent stream. `Reset` is emitted once at
/// pipeline start; incumbents arrive in increasing `(index, elapsed)` order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Reset,
    Incumbent {
        solution_index: u32,
        elapsed_seconds: f64,
        objective_value: i64,
    },
}

// endregion: Channels

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_defaults_match_catalog() {
        let weights = WeightConfig::default();
        assert_eq!(weights.weekday_wish, 200);
        assert_eq!(weights.shift_wish, 100);
        assert_eq!(weights.balance, 300);
        assert_eq!(weights.pair_overlap, -333);
        assert_eq!(weights.triple_pair_overlap, -10000);
        assert_eq!(weights.day_only_work_pattern, 100);
    }

    #[test]
    fn weight_wire_keys_are_payload_wording() {
        let weights: WeightConfig =
            serde_json::from_str(r#"{"曜日希望": 50, "ペアリング": 10}"#).unwrap();
        assert_eq!(weights.weekday_wish, 50);
        assert_eq!(weights.pairing, 10);
        assert_eq!(weights.separation, 200);
    }

    #[test]
    fn hope_entry_uses_wire_field_names() {
        let entry: HopeEntry = serde_json::from_str(
            r#"{"staff_name": "佐藤", "day": 10, "shift_type": "／", "role": "介護", "is_part_time": false}"#,
        )
        .unwrap();
        assert_eq!(entry.shift_code, ShiftCode::NightIn);
        assert_eq!(entry.day, 10);
    }

    #[test]
    fn mode_tokens_are_lowercase() {
        assert_eq!(
            serde_json::from_str::<SolveMode>(r#""turbo""#).unwrap(),
            SolveMode::Turbo
        );
        assert_eq!(
            serde_json::from_str::<SolveMode>(r#""balanced""#).unwrap(),
            SolveMode::Balanced
        );
    }

    #[test]
    fn missing_bounds_default_to_zero() {
        let staff = Staff {
            name: "田中".into(),
            role: "看護".into(),
            day_shift_only: false,
            part_time: false,
            global_rule_excluded: false,
            shift_counts: BTreeMap::new(),
            holiday_override: None,
            reliability_override: None,
            constraints: Vec::new(),
        };
        assert_eq!(staff.bounds("夜勤"), ShiftBounds { min: 0, max: 0 });
    }
}
