//! Pattern rules: the night macro-pattern, cross-staff pairing/separation,
//! weekday wishes, transition patterns, balance, pair overlap, custom
//! presets, and the holiday guarantee.

use selen::prelude::*;
use shared::vocabulary::{ShiftCode, kanji_count, normalize_label};

use crate::domain::catalog::{Category, Constraint, ConstraintKind};

use super::{EncoderContext, RuleEncoder};

pub struct PatternRules;

impl RuleEncoder for PatternRules {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn encode(&self, cx: &mut EncoderContext<'_>) {
        night_macro_pattern(cx);
        pairing(cx);
        separation(cx);
        weekday_wishes(cx);
        local_shift_patterns(cx);
        global_shift_patterns(cx);
        shift_balance(cx);
        pair_overlap(cx);
        custom_presets(cx);
        local_holiday_guarantee(cx);
        global_holiday_guarantee(cx);
    }
}

/// The mandatory night triple `／ → × → 公` for everyone who can work
/// nights; staff with a zero night allowance cannot open the month on `×`.
fn night_macro_pattern(cx: &mut EncoderContext<'_>) {
    let days = cx.grid.days();

    for (s, staff) in cx.staff.iter().enumerate() {
        if staff.bounds("夜勤").max == 0 {
            let first_out = cx.grid.var(s, 0, ShiftCode::NightOut);
            cx.pin_false(first_out);
        }
    }

    for s in 0..cx.grid.staff_count() {
        for d in 0..days.saturating_sub(2) {
            let night_in = cx.grid.var(s, d, ShiftCode::NightIn);
            let night_out = cx.grid.var(s, d + 1, ShiftCode::NightOut);
            let rest = cx.grid.var(s, d + 2, ShiftCode::Rest);
            cx.imply(night_in, night_out);
            cx.imply(night_in, rest);
            cx.imply(night_out, night_in);
        }

        if days > 1 {
            let first_out = cx.grid.var(s, 0, ShiftCode::NightOut);
            let second_rest = cx.grid.var(s, 1, ShiftCode::Rest);
            cx.imply(first_out, second_rest);
        }
        if days >= 2 {
            let closing_in = cx.grid.var(s, days - 2, ShiftCode::NightIn);
            let last_out = cx.grid.var(s, days - 1, ShiftCode::NightOut);
            cx.imply(closing_in, last_out);
        }
    }
}

fn normalized_pair(cx: &EncoderContext<'_>, constraint: &Constraint) -> Option<(ShiftCode, ShiftCode)> {
    let source = normalize_label(&constraint.count)?;
    let peer = normalize_label(&constraint.target)?;
    if cx.grid.has_code(source) && cx.grid.has_code(peer) {
        Some((source, peer))
    } else {
        None
    }
}

/// ペアリング: reward or require two staff sharing specific codes on the
/// same days.
fn pairing(cx: &mut EncoderContext<'_>) {
    let days = cx.grid.days();
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::Pairing)
            .cloned()
            .collect();
        for constraint in records {
            let Some((source, peer_code)) = normalized_pair(cx, &constraint) else {
                cx.warn(format!(
                    "{}: ペアリング with unknown codes 元={:?} 対象={:?}, skipped",
                    cx.staff[s].name, constraint.count, constraint.target
                ));
                continue;
            };
            let Some(peer) = cx.grid.staff_index(&constraint.sub_category) else {
                cx.warn(format!(
                    "{}: ペアリング peer {:?} not found, skipped",
                    cx.staff[s].name, constraint.sub_category
                ));
                continue;
            };

            let pair_days: Vec<VarId> = (0..days)
                .map(|d| {
                    let own = cx.grid.var(s, d, source);
                    let theirs = cx.grid.var(peer, d, peer_code);
                    cx.all_of(&[own, theirs])
                })
                .collect();

            match constraint.kind {
                ConstraintKind::Mandatory if constraint.times == "全て" => {
                    // Deliberately asymmetric: the implication runs from the
                    // staff whose source allowance is smaller, so the other
                    // may still work the peer code alone.
                    let own_max = cx.staff[s].bounds(&constraint.count).max;
                    let peer_max = cx.staff[peer].bounds(&constraint.target).max;
                    let (base, base_code, other, other_code) = if own_max <= peer_max {
                        (s, source, peer, peer_code)
                    } else {
                        (peer, peer_code, s, source)
                    };
                    for d in 0..days {
                        let antecedent = cx.grid.var(base, d, base_code);
                        let consequent = cx.grid.var(other, d, other_code);
                        cx.imply(antecedent, consequent);
                    }
                }
                ConstraintKind::Mandatory => {
                    let stripped = constraint.times.replace("まで", "");
                    let Some(required) = kanji_count(&stripped).filter(|&n| n > 0) else {
                        cx.warn(format!(
                            "{}: ペアリング without a usable count {:?}, skipped",
                            cx.staff[s].name, constraint.times
                        ));
                        continue;
                    };
                    cx.count_ge(&pair_days, required as i32);
                }
                ConstraintKind::Preference => {
                    let cap = if constraint.times == "全て" {
                        days as i32
                    } else {
                        let stripped = constraint.times.replace("まで", "");
                        match kanji_count(&stripped).filter(|&n| n > 0) {
                            Some(n) => n as i32,
                            None => {
                                cx.warn(format!(
                                    "{}: ペアリング without a usable count {:?}, skipped",
                                    cx.staff[s].name, constraint.times
                                ));
                                continue;
                            }
                        }
                    };
                    // Reward achieved days only up to the cap.
                    let total = cx.model.sum(&pair_days);
                    let cap_var = cx.constant(cap);
                    let Ok(achieved) = cx.model.min(&[total, cap_var]) else {
                        continue;
                    };
                    let weight = i64::from(cx.category_weight(cx.weights.pairing));
                    cx.add_term(achieved, weight);
                }
            }
        }
    }
}

/// セパレート: keep two staff's codes from landing on the same day, fully
/// or beyond a budget.
fn separation(cx: &mut EncoderContext<'_>) {
    let days = cx.grid.days();
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::Separation)
            .cloned()
            .collect();
        for constraint in records {
            let Some(peer) = cx.grid.staff_index(&constraint.sub_category) else {
                cx.warn(format!(
                    "{}: セパレート peer {:?} not found, skipped",
                    cx.staff[s].name, constraint.sub_category
                ));
                continue;
            };
            let Some((source, peer_code)) = normalized_pair(cx, &constraint) else {
                cx.warn(format!(
                    "{}: セパレート with unknown codes 主体={:?} 客体={:?}, skipped",
                    cx.staff[s].name, constraint.count, constraint.target
                ));
                continue;
            };

            if constraint.times == "全て" {
                for d in 0..days {
                    let own = cx.grid.var(s, d, source);
                    let theirs = cx.grid.var(peer, d, peer_code);
                    match constraint.kind {
                        ConstraintKind::Mandatory => cx.count_le(&[own, theirs], 1),
                        ConstraintKind::Preference => {
                            let overlap = cx.model.bool();
                            // own + theirs <= 1 + overlap
                            cx.model.int_lin_le(&[1, 1, -1], &[own, theirs, overlap], 1);
                            let weight =
                                i64::from(cx.category_weight(cx.weights.separation));
                            cx.add_term(overlap, -weight);
                        }
                    }
                }
                continue;
            }

            let stripped = constraint.times.replace("まで", "");
            let Some(budget) = kanji_count(&stripped).filter(|&n| n > 0) else {
                cx.warn(format!(
                    "{}: セパレート without a usable count {:?}, skipped",
                    cx.staff[s].name, constraint.times
                ));
                continue;
            };

            let overlaps: Vec<VarId> = (0..days)
                .map(|d| {
                    let own = cx.grid.var(s, d, source);
                    let theirs = cx.grid.var(peer, d, peer_code);
                    cx.all_of(&[own, theirs])
                })
                .collect();

            match constraint.kind {
                ConstraintKind::Mandatory => cx.count_le(&overlaps, budget as i32),
                ConstraintKind::Preference => {
                    // excess >= overlaps - budget, penalized per day over.
                    let excess = cx.model.int(0, days as i32);
                    let mut coeffs = vec![1; overlaps.len()];
                    coeffs.push(-1);
                    let mut vars = overlaps.clone();
                    vars.push(excess);
                    cx.model.int_lin_le(&coeffs, &vars, budget as i32);
                    let weight = i64::from(cx.category_weight(cx.weights.separation));
                    cx.add_term(excess, -weight);
                }
            }
        }
    }
}

/// 曜日希望: single weekdays (all or the Nth occurrence) and the 土／日
/// weekend-pair form; `出勤` targets the whole working set.
fn weekday_wishes(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::WeekdayWish)
            .cloned()
            .collect();
        for constraint in records {
            let wants_working = constraint.times == "出勤";
            let code = if wants_working {
                None
            } else {
                match normalize_label(&constraint.times).filter(|&c| cx.grid.has_code(c)) {
                    Some(code) => Some(code),
                    None => {
                        cx.warn(format!(
                            "{}: 曜日希望 with unknown code {:?}, skipped",
                            cx.staff[s].name, constraint.times
                        ));
                        continue;
                    }
                }
            };

            if constraint.target == "土／日" {
                weekend_pair_wish(cx, s, &constraint, code);
            } else {
                single_weekday_wish(cx, s, &constraint, code);
            }
        }
    }
}

fn nth_from_count(count: &str) -> Option<usize> {
    ["第一", "第二", "第三", "第四", "第五"]
        .iter()
        .position(|&t| t == count)
}

/// Cells that satisfy the wish on one day: the working set or one code.
fn wish_cells(cx: &EncoderContext<'_>, s: usize, day: usize, code: Option<ShiftCode>) -> Vec<VarId> {
    match code {
        Some(code) => vec![cx.grid.var(s, day, code)],
        None => cx.grid.working_vars(s, day),
    }
}

fn weekend_pair_wish(
    cx: &mut EncoderContext<'_>,
    s: usize,
    constraint: &Constraint,
    code: Option<ShiftCode>,
) {
    let pairs = cx.grid.month.weekend_pairs();
    let selected: Vec<(usize, usize)> = if constraint.count == "全て" {
        pairs
    } else {
        match nth_from_count(&constraint.count).and_then(|n| pairs.get(n).copied()) {
            Some(pair) => vec![pair],
            None => {
                cx.warn(format!(
                    "{}: 曜日希望 has no matching 土／日 pair for {:?}",
                    cx.staff[s].name, constraint.count
                ));
                return;
            }
        }
    };

    let dislikes = constraint.sub_category == "嫌悪";
    for (sat, sun) in selected {
        let sat_cells = wish_cells(cx, s, sat, code);
        let sun_cells = wish_cells(cx, s, sun, code);
        let sat_hit = cx.any_of(&sat_cells);
        let sun_hit = cx.any_of(&sun_cells);
        match (constraint.kind, dislikes) {
            (ConstraintKind::Mandatory, false) => {
                // At least one of the pair carries the wish.
                cx.require_any_of(&[sat_hit, sun_hit]);
            }
            (ConstraintKind::Mandatory, true) => {
                // At most one of the pair carries it.
                cx.forbid_all_of(&[sat_hit, sun_hit]);
            }
            (ConstraintKind::Preference, false) => {
                let any = cx.any_of(&[sat_hit, sun_hit]);
                let weight = i64::from(cx.category_weight(cx.weights.weekday_wish));
                cx.add_term(any, weight);
            }
            (ConstraintKind::Preference, true) => {
                let both = cx.all_of(&[sat_hit, sun_hit]);
                let weight = i64::from(cx.category_weight(cx.weights.weekday_wish));
                cx.add_term(both, -weight);
            }
        }
    }
}

fn single_weekday_wish(
    cx: &mut EncoderContext<'_>,
    s: usize,
    constraint: &Constraint,
    code: Option<ShiftCode>,
) {
    let weekday_token = constraint.target.replace("曜日", "");
    let Some(weekday) = "月火水木金土日"
        .chars()
        .position(|c| c.to_string() == weekday_token)
    else {
        cx.warn(format!(
            "{}: 曜日希望 with unknown weekday {:?}, skipped",
            cx.staff[s].name, constraint.target
        ));
        return;
    };
    let weekday = weekday as u32;

    let days: Vec<usize> = if constraint.count == "全て" {
        cx.grid.month.days_on_weekday(weekday)
    } else {
        match nth_from_count(&constraint.count)
            .and_then(|n| cx.grid.month.nth_weekday(weekday, n))
        {
            Some(day) => vec![day],
            None => {
                cx.warn(format!(
                    "{}: 曜日希望 has no {}{} in {}-{:02}",
                    cx.staff[s].name,
                    constraint.count,
                    constraint.target,
                    cx.grid.month.year,
                    cx.grid.month.month
                ));
                return;
            }
        }
    };

    let dislikes = constraint.sub_category == "嫌悪";
    for day in days {
        let cells = wish_cells(cx, s, day, code);
        match (constraint.kind, dislikes) {
            (ConstraintKind::Mandatory, false) => match code {
                Some(code) => {
                    let var = cx.grid.var(s, day, code);
                    cx.pin_true(var);
                }
                None => cx.require_any_of(&cells),
            },
            (ConstraintKind::Mandatory, true) => {
                for var in cells {
                    cx.pin_false(var);
                }
            }
            (ConstraintKind::Preference, averse) => {
                let weight = i64::from(cx.category_weight(cx.weights.weekday_wish));
                let signed = if averse { -weight } else { weight };
                match code {
                    Some(code) => {
                        let var = cx.grid.var(s, day, code);
                        cx.add_term(var, signed);
                    }
                    None => {
                        let working = cx.any_of(&cells);
                        cx.add_term(working, signed);
                    }
                }
            }
        }
    }
}

/// Shared body for transition patterns (from@d drives to@d+1).
fn transition_pattern(
    cx: &mut EncoderContext<'_>,
    s: usize,
    from: ShiftCode,
    to: ShiftCode,
    kind: ConstraintKind,
    affinity: bool,
    weight: i64,
) {
    let days = cx.grid.days();
    for d in 0..days.saturating_sub(1) {
        let from_var = cx.grid.var(s, d, from);
        let to_var = cx.grid.var(s, d + 1, to);
        match (kind, affinity) {
            (ConstraintKind::Mandatory, true) => cx.imply(from_var, to_var),
            (ConstraintKind::Mandatory, false) => cx.forbid_all_of(&[from_var, to_var]),
            (ConstraintKind::Preference, liked) => {
                let holds = cx.all_of(&[from_var, to_var]);
                let signed = if liked { weight } else { -weight };
                cx.add_term(holds, signed);
            }
        }
    }
}

fn transition_codes(cx: &EncoderContext<'_>, constraint: &Constraint) -> Option<(ShiftCode, ShiftCode)> {
    let from = normalize_label(&constraint.count)?;
    let to = normalize_label(&constraint.target)?;
    (cx.grid.has_code(from) && cx.grid.has_code(to)).then_some((from, to))
}

fn local_shift_patterns(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::ShiftPattern)
            .cloned()
            .collect();
        for constraint in records {
            let Some((from, to)) = transition_codes(cx, &constraint) else {
                cx.warn(format!(
                    "{}: シフトパターン with unknown codes {:?}→{:?}, skipped",
                    cx.staff[s].name, constraint.count, constraint.target
                ));
                continue;
            };
            let weight = i64::from(cx.category_weight(cx.weights.shift_pattern));
            transition_pattern(
                cx,
                s,
                from,
                to,
                constraint.kind,
                constraint.is_affinity(),
                weight,
            );
        }
    }
}

fn global_shift_patterns(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ShiftPattern)
        .cloned()
        .collect();
    for constraint in records {
        let Some((from, to)) = transition_codes(cx, &constraint) else {
            cx.warn(format!(
                "シフトパターン (global) with unknown codes {:?}→{:?}, skipped",
                constraint.count, constraint.target
            ));
            continue;
        };
        let weight = i64::from(cx.own_weight(&constraint));
        for s in 0..cx.staff.len() {
            if cx.staff[s].global_rule_excluded {
                continue;
            }
            transition_pattern(
                cx,
                s,
                from,
                to,
                constraint.kind,
                constraint.is_affinity(),
                weight,
            );
        }
    }
}

/// シフトバランス: reward staff whose monthly early/late totals satisfy the
/// selected relation. Preference-only by contract.
fn shift_balance(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::ShiftBalance)
        .cloned()
        .collect();
    for constraint in records {
        let weight = i64::from(cx.own_weight(&constraint));
        for s in 0..cx.staff.len() {
            let satisfied = match constraint.target.as_str() {
                "丁度" => balance_delta_reif(cx, s, 0),
                "早＋1" => balance_delta_reif(cx, s, 1),
                "遅＋1" => balance_delta_reif(cx, s, -1),
                "±1" => {
                    let early_ahead = balance_delta_reif(cx, s, 1);
                    let late_ahead = balance_delta_reif(cx, s, -1);
                    cx.any_of(&[early_ahead, late_ahead])
                }
                other => {
                    cx.warn(format!("シフトバランス with unknown relation {other:?}, skipped"));
                    break;
                }
            };
            cx.add_term(satisfied, weight);
        }
    }
}

/// Fresh boolean ⇔ (Σ early − Σ late = delta) for one staff's month.
fn balance_delta_reif(cx: &mut EncoderContext<'_>, s: usize, delta: i32) -> VarId {
    let early = cx.grid.month_vars(s, ShiftCode::Early);
    let late = cx.grid.month_vars(s, ShiftCode::Late);
    let mut coeffs = vec![1; early.len()];
    coeffs.extend(std::iter::repeat_n(-1, late.len()));
    let mut vars = early;
    vars.extend(late);
    let b = cx.model.bool();
    cx.model.int_lin_eq_reif(&coeffs, &vars, delta, b);
    b
}

/// ペア重複: bound how often two non-excluded staff share a code on the
/// same day. The day conjunction reifies the `≥ 2` reading.
fn pair_overlap(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::PairOverlap)
        .cloned()
        .collect();
    if records.is_empty() {
        return;
    }

    let members: Vec<usize> = (0..cx.staff.len())
        .filter(|&s| !cx.staff[s].global_rule_excluded)
        .collect();
    if members.len() < 2 {
        return;
    }

    for constraint in records {
        let Some(code) = normalize_label(&constraint.count).filter(|&c| cx.grid.has_code(c)) else {
            cx.warn(format!(
                "ペア重複 with unknown code {:?}, skipped",
                constraint.count
            ));
            continue;
        };
        let Some(limit) = kanji_count(&constraint.final_).filter(|&n| n > 0) else {
            cx.warn(format!(
                "ペア重複 without a usable count {:?}, skipped",
                constraint.final_
            ));
            continue;
        };
        let penalty = -i64::from(cx.own_weight(&constraint));

        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                let shared_days: Vec<VarId> = (0..cx.grid.days())
                    .map(|d| {
                        let first = cx.grid.var(a, d, code);
                        let second = cx.grid.var(b, d, code);
                        cx.all_of(&[first, second])
                    })
                    .collect();
                match (constraint.target.as_str(), constraint.kind) {
                    ("以上", ConstraintKind::Mandatory) => {
                        cx.count_le(&shared_days, limit as i32 - 1);
                    }
                    ("以上", ConstraintKind::Preference) => {
                        let over = cx.count_ge_reif(&shared_days, limit as i32);
                        cx.add_term(over, penalty);
                    }
                    (_, ConstraintKind::Mandatory) => {
                        cx.count_ne(&shared_days, limit as i32);
                    }
                    (_, ConstraintKind::Preference) => {
                        let exact = cx.count_eq_reif(&shared_days, limit as i32);
                        cx.add_term(exact, penalty);
                    }
                }
            }
        }
    }
}

/// カスタムプリセット: named pairwise bundles expanded to per-day clauses.
fn custom_presets(cx: &mut EncoderContext<'_>) {
    use ShiftCode::{Day, Early, Late, NightIn, NightOut};

    let days = cx.grid.days();
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::CustomPreset)
            .cloned()
            .collect();
        for constraint in records {
            let Some(peer) = cx.grid.staff_index(&constraint.sub_category) else {
                cx.warn(format!(
                    "{}: カスタムプリセット peer {:?} not found, skipped",
                    cx.staff[s].name, constraint.sub_category
                ));
                continue;
            };
            let weight = i64::from(cx.category_weight(cx.weights.custom_preset));

            match constraint.target.as_str() {
                "早＋早と入＋入を回避" => {
                    for d in 0..days {
                        let pairs = [
                            (cx.grid.var(s, d, Early), cx.grid.var(peer, d, Early)),
                            (cx.grid.var(s, d, NightIn), cx.grid.var(peer, d, NightIn)),
                        ];
                        for (own, theirs) in pairs {
                            cx.count_le(&[own, theirs], 1);
                        }
                    }
                }
                "早日遅＋早日遅と夜＋夜を回避" => {
                    for d in 0..days {
                        let own_cells = cx.grid.working_vars(s, d);
                        let peer_cells = cx.grid.working_vars(peer, d);
                        let own_working = cx.any_of(&own_cells);
                        let peer_working = cx.any_of(&peer_cells);
                        let own_night = cx.grid.var(s, d, NightIn);
                        let peer_night = cx.grid.var(peer, d, NightIn);
                        match constraint.kind {
                            ConstraintKind::Mandatory => {
                                cx.forbid_all_of(&[own_working, peer_working]);
                                cx.forbid_all_of(&[own_night, peer_night]);
                            }
                            ConstraintKind::Preference => {
                                let both_working = cx.all_of(&[own_working, peer_working]);
                                let both_night = cx.all_of(&[own_night, peer_night]);
                                cx.add_term(both_working, -weight);
                                cx.add_term(both_night, -weight);
                            }
                        }
                    }
                }
                "早＋明と遅＋入を推奨" => {
                    for d in 0..days {
                        let handovers = [
                            // Whoever comes off a night gets an early partner;
                            // whoever goes on gets a late partner.
                            (cx.grid.var(peer, d, NightOut), cx.grid.var(s, d, Early)),
                            (cx.grid.var(s, d, NightOut), cx.grid.var(peer, d, Early)),
                            (cx.grid.var(peer, d, NightIn), cx.grid.var(s, d, Late)),
                            (cx.grid.var(s, d, NightIn), cx.grid.var(peer, d, Late)),
                        ];
                        for (night_side, partner) in handovers {
                            match constraint.kind {
                                ConstraintKind::Mandatory => cx.imply(night_side, partner),
                                ConstraintKind::Preference => {
                                    let matched = cx.all_of(&[night_side, partner]);
                                    cx.add_term(matched, weight);
                                }
                            }
                        }
                    }
                }
                "早日＋明と日遅＋入を回避" => {
                    for d in 0..days {
                        let clashes = [
                            (cx.grid.var(s, d, NightOut), cx.grid.var(peer, d, Early)),
                            (cx.grid.var(s, d, NightOut), cx.grid.var(peer, d, Day)),
                            (cx.grid.var(s, d, NightIn), cx.grid.var(peer, d, Late)),
                            (cx.grid.var(s, d, NightIn), cx.grid.var(peer, d, Day)),
                            (cx.grid.var(peer, d, NightOut), cx.grid.var(s, d, Early)),
                            (cx.grid.var(peer, d, NightOut), cx.grid.var(s, d, Day)),
                            (cx.grid.var(peer, d, NightIn), cx.grid.var(s, d, Late)),
                            (cx.grid.var(peer, d, NightIn), cx.grid.var(s, d, Day)),
                        ];
                        for (night_side, day_side) in clashes {
                            match constraint.kind {
                                ConstraintKind::Mandatory => {
                                    cx.count_le(&[night_side, day_side], 1);
                                }
                                ConstraintKind::Preference => {
                                    let met = cx.all_of(&[night_side, day_side]);
                                    cx.add_term(met, -weight);
                                }
                            }
                        }
                    }
                }
                other => {
                    cx.warn(format!(
                        "{}: unknown カスタムプリセット {other:?}, skipped",
                        cx.staff[s].name
                    ));
                }
            }
        }
    }
}

/// Count variable for maximal rest runs of exactly `k` days, with runs that
/// hope entries fully pin counted statically.
fn holiday_run_count(cx: &mut EncoderContext<'_>, s: usize, k: usize) -> VarId {
    let days = cx.grid.days();
    let fixed: Vec<bool> = {
        let mut fixed = vec![false; days];
        for entry in cx.hopes {
            if entry.shift_code == ShiftCode::Rest
                && cx.grid.staff_index(&entry.staff_name) == Some(s)
            {
                let d = entry.day as usize - 1;
                if d < days {
                    fixed[d] = true;
                }
            }
        }
        fixed
    };

    // Pre-count pinned stretches of at least k rests.
    let mut fixed_runs = 0i32;
    let mut run = 0usize;
    for d in 0..=days {
        if d < days && fixed[d] {
            run += 1;
        } else {
            if run >= k {
                fixed_runs += 1;
            }
            run = 0;
        }
    }

    let mut starts: Vec<VarId> = Vec::new();
    for d in 0..=days.saturating_sub(k) {
        if (d..d + k).all(|i| fixed[i]) {
            continue; // already counted statically
        }
        let mut parts: Vec<VarId> = Vec::new();
        if d > 0 {
            let prev = cx.grid.var(s, d - 1, ShiftCode::Rest);
            parts.push(cx.not(prev));
        }
        for i in 0..k {
            parts.push(cx.grid.var(s, d + i, ShiftCode::Rest));
        }
        if d + k < days {
            let next = cx.grid.var(s, d + k, ShiftCode::Rest);
            parts.push(cx.not(next));
        }
        starts.push(cx.all_of(&parts));
    }

    // count = fixed_runs + Σ starts
    let count = cx.model.int(0, days as i32);
    let mut coeffs = vec![1];
    coeffs.extend(std::iter::repeat_n(-1, starts.len()));
    let mut vars = vec![count];
    vars.extend(starts);
    cx.model.int_lin_eq(&coeffs, &vars, fixed_runs);
    count
}

fn holiday_guarantee_for(
    cx: &mut EncoderContext<'_>,
    s: usize,
    constraint: &Constraint,
    k: usize,
    target: u32,
    weight: i64,
) {
    let count = holiday_run_count(cx, s, k);
    match constraint.kind {
        ConstraintKind::Mandatory => {
            let _ = cx.model.new(count.ge(target as i32));
        }
        ConstraintKind::Preference => {
            // Diminishing returns: each "i-th run achieved" pays out once.
            for i in 1..=target {
                let threshold = cx.constant(i as i32);
                let achieved = cx.model.bool();
                cx.model.int_ge_reif(count, threshold, achieved);
                cx.add_term(achieved, weight);
            }
        }
    }
}

fn local_holiday_guarantee(cx: &mut EncoderContext<'_>) {
    for s in 0..cx.staff.len() {
        let records: Vec<Constraint> = cx.staff_constraints[s]
            .iter()
            .filter(|c| c.category == Category::HolidayGuarantee)
            .cloned()
            .collect();
        for constraint in records {
            let Some(k) = kanji_count(&constraint.sub_category).filter(|&n| n > 0) else {
                cx.warn(format!(
                    "{}: 連休保証 with unknown run length {:?}, skipped",
                    cx.staff[s].name, constraint.sub_category
                ));
                continue;
            };
            let Some(target) = kanji_count(&constraint.target).filter(|&n| n > 0) else {
                cx.warn(format!(
                    "{}: 連休保証 with unknown target count {:?}, skipped",
                    cx.staff[s].name, constraint.target
                ));
                continue;
            };
            let weight = i64::from(cx.category_weight(cx.weights.holiday_guarantee));
            holiday_guarantee_for(cx, s, &constraint, k as usize, target, weight);
        }
    }
}

fn global_holiday_guarantee(cx: &mut EncoderContext<'_>) {
    let records: Vec<Constraint> = cx
        .rule_constraints
        .iter()
        .filter(|c| c.category == Category::HolidayGuarantee)
        .cloned()
        .collect();
    for constraint in records {
        let Some(k) = kanji_count(&constraint.count).filter(|&n| n > 0) else {
            cx.warn(format!(
                "連休保証 (global) with unknown run length {:?}, skipped",
                constraint.count
            ));
            continue;
        };
        let Some(target) = kanji_count(&constraint.target).filter(|&n| n > 0) else {
            cx.warn(format!(
                "連休保証 (global) with unknown target count {:?}, skipped",
                constraint.target
            ));
            continue;
        };
        let weight = i64::from(cx.own_weight(&constraint));
        for s in 0..cx.staff.len() {
            if cx.staff[s].global_rule_excluded {
                continue;
            }
            holiday_guarantee_for(cx, s, &constraint, k as usize, target, weight);
        }
    }
}
