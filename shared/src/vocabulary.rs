use std::fmt;

use serde::{Deserialize, Serialize, de};

// region: Shift codes

/// Single-glyph shift identifier. The alphabet is fixed: the eight named
/// duty/rest codes, the unset sentinel, and the numbered preference glyphs
/// `1`..`9` that custom rosters may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShiftCode {
    /// `▲` early duty (早番)
    Early,
    /// `日` day duty (日勤)
    Day,
    /// `▼` late duty (遅番)
    Late,
    /// `／` night-in (夜勤)
    NightIn,
    /// `×` night-out (夜勤明け)
    NightOut,
    /// `公` scheduled rest (公休)
    Rest,
    /// `休` personal leave (休み)
    Leave,
    /// `☆` special fixed cell, only valid where pre-assigned
    Special,
    /// `_` unset sentinel, never assigned
    Unset,
    /// `1`..`9` numbered preference glyph
    Numbered(u8),
}

/// The nine named codes, in canonical column order.
pub const BASE_CODES: [ShiftCode; 9] = [
    ShiftCode::Early,
    ShiftCode::Day,
    ShiftCode::Late,
    ShiftCode::NightIn,
    ShiftCode::NightOut,
    ShiftCode::Rest,
    ShiftCode::Leave,
    ShiftCode::Special,
    ShiftCode::Unset,
];

/// `出勤` — the working set: any of early/day/late.
pub const WORKING_CODES: [ShiftCode; 3] = [ShiftCode::Early, ShiftCode::Day, ShiftCode::Late];

impl ShiftCode {
    pub fn glyph(self) -> char {
        match self {
            Self::Early => '▲',
            Self::Day => '日',
            Self::Late => '▼',
            Self::NightIn => '／',
            Self::NightOut => '×',
            Self::Rest => '公',
            Self::Leave => '休',
            Self::Special => '☆',
            Self::Unset => '_',
            Self::Numbered(n) => char::from_digit(u32::from(n), 10).unwrap_or('_'),
        }
    }

    /// Parse a single glyph. `▽` is a legacy alias for `▼` that still shows
    /// up in pre-assigned entries.
    pub fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let glyph = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match glyph {
            '▲' => Some(Self::Early),
            '日' => Some(Self::Day),
            '▼' | '▽' => Some(Self::Late),
            '／' => Some(Self::NightIn),
            '×' => Some(Self::NightOut),
            '公' => Some(Self::Rest),
            '休' => Some(Self::Leave),
            '☆' => Some(Self::Special),
            '_' => Some(Self::Unset),
            '1'..='9' => Some(Self::Numbered(glyph as u8 - b'0')),
            _ => None,
        }
    }

    pub fn is_working(self) -> bool {
        WORKING_CODES.contains(&self)
    }

    pub fn is_rest(self) -> bool {
        self == Self::Rest
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

impl Serialize for ShiftCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShiftCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token)
            .ok_or_else(|| de::Error::custom(format!("unknown shift glyph: {token:?}")))
    }
}

/// Normalize a constraint-payload label to a shift code. Labels may be the
/// human wording (早番, 夜勤明け, ...) or a bare glyph; unknown labels yield
/// `None` and the caller decides whether that is fatal.
pub fn normalize_label(label: &str) -> Option<ShiftCode> {
    match label {
        "早番" => Some(ShiftCode::Early),
        "日勤" => Some(ShiftCode::Day),
        "遅番" => Some(ShiftCode::Late),
        "夜勤" => Some(ShiftCode::NightIn),
        "夜勤明け" | "明け" => Some(ShiftCode::NightOut),
        "公休" => Some(ShiftCode::Rest),
        "休み" => Some(ShiftCode::Leave),
        other => ShiftCode::parse(other),
    }
}

// endregion: Shift codes

// region: Kanji numerals

/// Kanji numerals used by constraint payloads. `単` means "single" and maps
/// to 1 (単休 = an isolated rest day).
pub const KANJI_NUMBERS: [(char, u32); 8] = [
    ('単', 1),
    ('一', 1),
    ('二', 2),
    ('三', 3),
    ('四', 4),
    ('五', 5),
    ('六', 6),
    ('七', 7),
];

/// Read the count at the head of a payload token. Accepts bare numerals and
/// composite tokens (`三連休`, `二連勤`, `5回まで`); whatever trails the
/// number is ignored.
pub fn kanji_count(token: &str) -> Option<u32> {
    let token = token.trim();
    let first = token.chars().next()?;
    if let Some(&(_, n)) = KANJI_NUMBERS.iter().find(|(k, _)| *k == first) {
        return Some(n);
    }
    let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

// endregion: Kanji numerals

// region: Solve status

/// Terminal state of a solver run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    ModelInvalid,
    Timeout,
    Unknown,
}

impl SolveStatus {
    /// Human wording for notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::Optimal => "optimal solution",
            Self::Feasible => "feasible solution",
            Self::Infeasible => "no solution exists",
            Self::ModelInvalid => "model is invalid",
            Self::Timeout => "timed out without a solution",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// endregion: Solve status

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_round_trip() {
        for code in BASE_CODES {
            assert_eq!(ShiftCode::parse(&code.to_string()), Some(code));
        }
        for n in 1..=9 {
            let code = ShiftCode::Numbered(n);
            assert_eq!(ShiftCode::parse(&code.to_string()), Some(code));
        }
    }

    #[test]
    fn late_legacy_alias() {
        assert_eq!(ShiftCode::parse("▽"), Some(ShiftCode::Late));
    }

    #[test]
    fn labels_normalize_to_codes() {
        assert_eq!(normalize_label("早番"), Some(ShiftCode::Early));
        assert_eq!(normalize_label("夜勤"), Some(ShiftCode::NightIn));
        assert_eq!(normalize_label("夜勤明け"), Some(ShiftCode::NightOut));
        assert_eq!(normalize_label("明け"), Some(ShiftCode::NightOut));
        assert_eq!(normalize_label("公"), Some(ShiftCode::Rest));
        assert_eq!(normalize_label("謎の勤務"), None);
    }

    #[test]
    fn kanji_counts() {
        assert_eq!(kanji_count("単休"), Some(1));
        assert_eq!(kanji_count("三連休"), Some(3));
        assert_eq!(kanji_count("二連勤"), Some(2));
        assert_eq!(kanji_count("七"), Some(7));
        assert_eq!(kanji_count("5回まで"), Some(5));
        assert_eq!(kanji_count("全て"), None);
    }

    #[test]
    fn status_labels() {
        assert!(SolveStatus::Optimal.is_solution());
        assert!(SolveStatus::Feasible.is_solution());
        assert!(!SolveStatus::Infeasible.is_solution());
        assert_eq!(SolveStatus::Infeasible.label(), "no solution exists");
    }
}
