//! Typed constraint catalog.
//!
//! A constraint arrives as an untyped record; the catalog tags it with a
//! closed category so each encoder can match the tags it owns and ignore the
//! rest. Which fields carry meaning depends on the category:
//!
//! | category            | sub_category      | count          | final | target        | times       |
//! |---------------------|-------------------|----------------|-------|---------------|-------------|
//! | 曜日希望            | 愛好/嫌悪         | 全て/第一..第五 |       | weekday/土／日 | code/出勤   |
//! | 勤務希望            | 愛好/嫌悪         |                |       | code label    |             |
//! | シフトパターン      | 愛好/嫌悪/推奨/回避 | from label    |       | to label      |             |
//! | 連続勤務/日勤帯連勤 | 愛好/嫌悪/推奨/回避 | N連勤         |       | 丁度/以上/以下 | 全員 (global) |
//! | 連続休暇            | 愛好/嫌悪/推奨/回避 | N連休         |       | 丁度/以上/以下 | 全員 (global) |
//! | 連休保証            | N連休 (local)     | N連休 (global) |       | N回まで       |             |
//! | シフトバランス      |                   |                |       | 丁度/±1/早＋1/遅＋1 |       |
//! | ペアリング/セパレート | peer staff name | source label   | N/全て | peer label   | N回/全て    |
//! | ペア重複            |                   | code label     | N     | 以上/丁度     |             |
//! | 連続シフト          |                   | code label     | N     | 以上/丁度     | 全員 (global) |
//! | シフト間隔          | 愛好/嫌悪         | code label     |       | interval days | 全員 (global) |
//! | 出シフト            | N日               |                |       | 出勤          |             |
//! | カスタムプリセット  | peer staff name   |                |       | preset name   |             |
//! | シフト適性          | 通常/日曜         |                |       | threshold     |             |

use std::fmt;

use shared::types::RawConstraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// 必須 — added as hard clauses.
    Mandatory,
    /// 選好 — contributes a weighted objective term.
    Preference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    WeekdayWish,
    ShiftWish,
    ShiftPattern,
    ConsecutiveWork,
    DayOnlyConsecutiveWork,
    ConsecutiveHoliday,
    HolidayGuarantee,
    ShiftBalance,
    Pairing,
    Separation,
    PairOverlap,
    ConsecutiveShift,
    ShiftInterval,
    DaySpecificShift,
    CustomPreset,
    ShiftAptitude,
}

impl Category {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "曜日希望" => Some(Self::WeekdayWish),
            "勤務希望" => Some(Self::ShiftWish),
            "シフトパターン" => Some(Self::ShiftPattern),
            "連続勤務" => Some(Self::ConsecutiveWork),
            "日勤帯連勤" => Some(Self::DayOnlyConsecutiveWork),
            "連続休暇" => Some(Self::ConsecutiveHoliday),
            "連休保証" => Some(Self::HolidayGuarantee),
            "シフトバランス" => Some(Self::ShiftBalance),
            "ペアリング" => Some(Self::Pairing),
            "セパレート" => Some(Self::Separation),
            "ペア重複" => Some(Self::PairOverlap),
            "連続シフト" => Some(Self::ConsecutiveShift),
            "シフト間隔" => Some(Self::ShiftInterval),
            "出シフト" => Some(Self::DaySpecificShift),
            "カスタムプリセット" => Some(Self::CustomPreset),
            "シフト適性" => Some(Self::ShiftAptitude),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::WeekdayWish => "曜日希望",
            Self::ShiftWish => "勤務希望",
            Self::ShiftPattern => "シフトパターン",
            Self::ConsecutiveWork => "連続勤務",
            Self::DayOnlyConsecutiveWork => "日勤帯連勤",
            Self::ConsecutiveHoliday => "連続休暇",
            Self::HolidayGuarantee => "連休保証",
            Self::ShiftBalance => "シフトバランス",
            Self::Pairing => "ペアリング",
            Self::Separation => "セパレート",
            Self::PairOverlap => "ペア重複",
            Self::ConsecutiveShift => "連続シフト",
            Self::ShiftInterval => "シフト間隔",
            Self::DaySpecificShift => "出シフト",
            Self::CustomPreset => "カスタムプリセット",
            Self::ShiftAptitude => "シフト適性",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Comparison token carried by run-length style categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// 丁度
    Exact,
    /// 以上
    AtLeast,
    /// 以下
    AtMost,
}

impl Bound {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "丁度" => Some(Self::Exact),
            "以上" => Some(Self::AtLeast),
            "以下" => Some(Self::AtMost),
            _ => None,
        }
    }
}

/// A parsed constraint record, in declaration order within its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub category: Category,
    pub sub_category: String,
    pub count: String,
    pub final_: String,
    pub target: String,
    pub times: String,
    pub weight: Option<i64>,
}

impl Constraint {
    /// Parse a wire record. `None` means the kind or category is unknown; the
    /// caller logs a warning and skips it (never fatal, per the catalog
    /// contract).
    pub fn from_raw(raw: &RawConstraint) -> Option<Self> {
        let kind = match raw.kind.as_str() {
            "必須" => ConstraintKind::Mandatory,
            "選好" => ConstraintKind::Preference,
            _ => return None,
        };
        let category = Category::parse(&raw.category)?;
        Some(Self {
            kind,
            category,
            sub_category: raw.sub_category.clone(),
            count: raw.count.clone(),
            final_: raw.final_.clone(),
            target: raw.target.clone(),
            times: raw.times.clone(),
            weight: raw.weight,
        })
    }

    pub fn is_mandatory(&self) -> bool {
        self.kind == ConstraintKind::Mandatory
    }

    /// 愛好 (local wording) or 推奨 (global wording).
    pub fn is_affinity(&self) -> bool {
        matches!(self.sub_category.as_str(), "愛好" | "推奨")
    }

    /// 嫌悪 (local wording) or 回避 (global wording).
    pub fn is_aversion(&self) -> bool {
        matches!(self.sub_category.as_str(), "嫌悪" | "回避")
    }

    /// Global constraints marked 全員 apply to every non-excluded staff.
    pub fn applies_to_everyone(&self) -> bool {
        self.times == "全員"
    }

    pub fn target_bound(&self) -> Option<Bound> {
        Bound::parse(&self.target)
    }
}

/// Parse a staff or rule constraint list, preserving declaration order and
/// reporting the indices of records that were skipped as unknown.
pub fn parse_list(raw: &[RawConstraint]) -> (Vec<Constraint>, Vec<usize>) {
    let mut parsed = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();
    for (idx, record) in raw.iter().enumerate() {
        match Constraint::from_raw(record) {
            Some(constraint) => parsed.push(constraint),
            None => skipped.push(idx),
        }
    }
    (parsed, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: &str, category: &str) -> RawConstraint {
        RawConstraint {
            kind: kind.into(),
            category: category.into(),
            ..RawConstraint::default()
        }
    }

    #[test]
    fn category_tokens_round_trip() {
        for token in [
            "曜日希望",
            "勤務希望",
            "シフトパターン",
            "連続勤務",
            "日勤帯連勤",
            "連続休暇",
            "連休保証",
            "シフトバランス",
            "ペアリング",
            "セパレート",
            "ペア重複",
            "連続シフト",
            "シフト間隔",
            "出シフト",
            "カスタムプリセット",
            "シフト適性",
        ] {
            let category = Category::parse(token).unwrap();
            assert_eq!(category.token(), token);
        }
    }

    #[test]
    fn unknown_records_are_skipped_not_fatal() {
        let records = vec![
            raw("必須", "曜日希望"),
            raw("必須", "謎カテゴリ"),
            raw("希望", "曜日希望"),
            raw("選好", "ペアリング"),
        ];
        let (parsed, skipped) = parse_list(&records);
        assert_eq!(parsed.len(), 2);
        assert_eq!(skipped, vec![1, 2]);
        assert_eq!(parsed[0].kind, ConstraintKind::Mandatory);
        assert_eq!(parsed[1].category, Category::Pairing);
    }

    #[test]
    fn affinity_wordings() {
        let mut record = raw("選好", "シフトパターン");
        record.sub_category = "推奨".into();
        let constraint = Constraint::from_raw(&record).unwrap();
        assert!(constraint.is_affinity());
        assert!(!constraint.is_aversion());
    }

    #[test]
    fn bound_tokens() {
        assert_eq!(Bound::parse("丁度"), Some(Bound::Exact));
        assert_eq!(Bound::parse("以上"), Some(Bound::AtLeast));
        assert_eq!(Bound::parse("以下"), Some(Bound::AtMost));
        assert_eq!(Bound::parse("くらい"), None);
    }
}
