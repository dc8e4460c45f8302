use crate::config::BalanceConfig;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::model::{BloomStatistics, Module, Outcome};
use crate::outcomes::{remap_course_outcomes, OutcomeGenerator};
use crate::types::BloomLevel;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Balance check
// ---------------------------------------------------------------------------

/// Tie-break order when several target levels are equally empty.
const REPAIR_PREFERENCE: [BloomLevel; BloomLevel::COUNT] = [
    BloomLevel::Apply,
    BloomLevel::Analyze,
    BloomLevel::Evaluate,
    BloomLevel::Understand,
    BloomLevel::Create,
    BloomLevel::Remember,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceRule {
    /// One level holds more than the per-level ceiling.
    LevelCeiling,
    /// Remember + Understand exceed the lower-levels ceiling (course level only).
    LowerLevelsCeiling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub outcome_id: String,
    pub rule: BalanceRule,
    pub current_level: BloomLevel,
    pub suggested_level: BloomLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub violations: Vec<Violation>,
}

impl BalanceReport {
    pub fn is_balanced(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn offending_ids(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.outcome_id.clone()).collect()
    }

    pub fn suggestion_for(&self, outcome_id: &str) -> Option<BloomLevel> {
        self.violations
            .iter()
            .find(|v| v.outcome_id == outcome_id)
            .map(|v| v.suggested_level)
    }
}

/// Check both scopes against the configured ceilings.
///
/// Module-level outcomes are checked as one population, course-level
/// outcomes as another. Suggested levels are chosen so that applying all of
/// them at once removes every violation whenever that is possible.
pub fn check_balance(module_outcomes: &[&Outcome], course_outcomes: &[Outcome], cfg: &BalanceConfig) -> BalanceReport {
    let mut violations = check_scope(module_outcomes, cfg, false);
    let course: Vec<&Outcome> = course_outcomes.iter().collect();
    violations.extend(check_scope(&course, cfg, true));
    BalanceReport { violations }
}

/// `floor(pct * n / 100)`, never below one so a small scope stays fixable.
fn allowance(pct: u32, n: usize) -> usize {
    ((pct as usize * n) / 100).max(1)
}

fn check_scope(outcomes: &[&Outcome], cfg: &BalanceConfig, course_scope: bool) -> Vec<Violation> {
    let n = outcomes.len();
    if n == 0 {
        return Vec::new();
    }
    let allowed = allowance(cfg.level_ceiling_pct, n);

    // Simulated levels: where each outcome ends up once suggestions apply.
    let mut levels: Vec<BloomLevel> = outcomes.iter().map(|o| o.bloom_level).collect();
    let mut counts = [0usize; BloomLevel::COUNT];
    for l in &levels {
        counts[l.index()] += 1;
    }
    let mut flagged: Vec<Option<BalanceRule>> = vec![None; n];

    // Rule (a): per-level ceiling. The latest outcomes at a level go first.
    for &level in BloomLevel::all() {
        let mut excess = counts[level.index()].saturating_sub(allowed);
        for i in (0..n).rev() {
            if excess == 0 {
                break;
            }
            if levels[i] != level {
                continue;
            }
            let target = pick_target(&counts, allowed, level, false);
            counts[level.index()] -= 1;
            counts[target.index()] += 1;
            levels[i] = target;
            flagged[i] = Some(BalanceRule::LevelCeiling);
            excess -= 1;
        }
    }

    // Rule (b): lower levels combined, course scope only.
    if course_scope {
        let lower_allowed = allowance(cfg.lower_levels_ceiling_pct, n);
        let lower = counts[BloomLevel::Remember.index()] + counts[BloomLevel::Understand.index()];
        let mut excess = lower.saturating_sub(lower_allowed);
        for i in (0..n).rev() {
            if excess == 0 {
                break;
            }
            if !levels[i].is_lower_order() {
                continue;
            }
            let from = levels[i];
            let target = pick_target(&counts, allowed, from, true);
            counts[from.index()] -= 1;
            counts[target.index()] += 1;
            levels[i] = target;
            flagged[i] = Some(BalanceRule::LowerLevelsCeiling);
            excess -= 1;
        }
    }

    outcomes
        .iter()
        .zip(levels)
        .zip(flagged)
        .filter_map(|((o, level), rule)| {
            rule.map(|rule| Violation {
                outcome_id: o.id.clone(),
                rule,
                current_level: o.bloom_level,
                suggested_level: level,
            })
        })
        // An outcome moved away and back again needs no repair.
        .filter(|v| v.current_level != v.suggested_level)
        .collect()
}

/// Least-populated level with room under the ceiling, ties by preference.
/// Falls back to the least-populated level at all when every level is full.
fn pick_target(counts: &[usize; BloomLevel::COUNT], allowed: usize, from: BloomLevel, higher_only: bool) -> BloomLevel {
    let candidates: Vec<BloomLevel> = REPAIR_PREFERENCE
        .iter()
        .copied()
        .filter(|l| *l != from && (!higher_only || !l.is_lower_order()))
        .collect();
    let with_room = candidates
        .iter()
        .copied()
        .filter(|l| counts[l.index()] < allowed)
        .min_by_key(|l| counts[l.index()]);
    with_room
        .or_else(|| candidates.iter().copied().min_by_key(|l| counts[l.index()]))
        .unwrap_or(BloomLevel::Apply)
}

// ---------------------------------------------------------------------------
// Repair loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RepairSummary {
    /// Rounds of regeneration actually run.
    pub iterations: u32,
    /// Violations left in the accepted distribution; empty when balanced.
    pub remaining: Vec<Violation>,
}

impl RepairSummary {
    pub fn is_balanced(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Check, regenerate offending outcomes at their suggested levels, and
/// re-check, at most `max_repair_iterations` times.
///
/// The distribution with the fewest violations seen is the one kept.
/// Course-outcome mappings are refreshed after every round since module
/// levels may have moved.
pub fn repair_balance(
    generator: &OutcomeGenerator<'_>,
    modules: &mut [Module],
    course_outcomes: &mut Vec<Outcome>,
    cfg: &BalanceConfig,
    rng: &mut impl Rng,
) -> Result<RepairSummary> {
    let check = |modules: &[Module], course: &[Outcome]| {
        let module_outcomes: Vec<&Outcome> = modules.iter().flat_map(|m| m.learning_outcomes.iter()).collect();
        check_balance(&module_outcomes, course, cfg)
    };

    let mut report = check(modules, course_outcomes);
    let mut best = snapshot(modules, course_outcomes);
    let mut best_violations = report.violations.len();
    let mut iterations = 0;

    while !report.is_balanced() && iterations < cfg.max_repair_iterations {
        iterations += 1;
        debug!(iteration = iterations, offending = report.violations.len(), "repairing outcome balance");

        for m in 0..modules.len() {
            for o in 0..modules[m].learning_outcomes.len() {
                if let Some(level) = report.suggestion_for(&modules[m].learning_outcomes[o].id) {
                    let fresh = generator.regenerate(&modules[m].learning_outcomes[o], level, modules, rng)?;
                    modules[m].learning_outcomes[o] = fresh;
                }
            }
        }
        for i in 0..course_outcomes.len() {
            if let Some(level) = report.suggestion_for(&course_outcomes[i].id) {
                let fresh = generator.regenerate(&course_outcomes[i], level, modules, rng)?;
                course_outcomes[i] = fresh;
            }
        }
        remap_course_outcomes(course_outcomes, modules);

        report = check(modules, course_outcomes);
        if report.violations.len() < best_violations {
            best_violations = report.violations.len();
            best = snapshot(modules, course_outcomes);
        }
    }

    if report.violations.len() > best_violations {
        restore(best, modules, course_outcomes);
        report = check(modules, course_outcomes);
    }

    Ok(RepairSummary {
        iterations,
        remaining: report.violations,
    })
}

type Snapshot = (Vec<Vec<Outcome>>, Vec<Outcome>);

fn snapshot(modules: &[Module], course: &[Outcome]) -> Snapshot {
    (
        modules.iter().map(|m| m.learning_outcomes.clone()).collect(),
        course.to_vec(),
    )
}

fn restore(snapshot: Snapshot, modules: &mut [Module], course: &mut Vec<Outcome>) {
    let (module_outcomes, course_outcomes) = snapshot;
    for (m, outcomes) in modules.iter_mut().zip(module_outcomes) {
        m.learning_outcomes = outcomes;
    }
    *course = course_outcomes;
}

// ---------------------------------------------------------------------------
// Measurability
// ---------------------------------------------------------------------------

const OUTCOME_STEM: &str = "students will be able to";
const MIN_CHARS: usize = 10;
const MAX_CHARS: usize = 150;
const MIN_WORDS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCheck {
    pub outcome_id: String,
    pub bloom_level: BloomLevel,
    /// Blocking problems: missing stem, no taxonomy verb, too short.
    pub issues: Vec<String>,
    /// Advisory only.
    pub warnings: Vec<String>,
}

impl OutcomeCheck {
    pub fn is_measurable(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurabilityReport {
    pub checks: Vec<OutcomeCheck>,
    pub total: usize,
    pub measurable: usize,
    pub with_issues: usize,
    pub with_warnings: usize,
}

pub fn check_outcome(kb: &KnowledgeBase, outcome: &Outcome) -> OutcomeCheck {
    let text = outcome.outcome_text.trim();
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();

    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    if !lower.starts_with(OUTCOME_STEM) {
        issues.push("outcome should start with 'Students will be able to'".to_string());
    }
    if !words.iter().any(|w| kb.is_bloom_verb(w)) {
        issues.push("outcome has no measurable taxonomy verb".to_string());
    }
    let vague: Vec<&str> = kb
        .vague_verbs
        .iter()
        .map(String::as_str)
        .filter(|v| contains_phrase(&words, v))
        .collect();
    if !vague.is_empty() {
        warnings.push(format!("outcome uses vague verbs: {}", vague.join(", ")));
    }
    let chars = text.chars().count();
    if chars < MIN_CHARS {
        issues.push("outcome is too short".to_string());
    } else if chars > MAX_CHARS {
        warnings.push("outcome is quite long; consider simplifying".to_string());
    }
    if text.split_whitespace().count() < MIN_WORDS {
        warnings.push("outcome may lack sufficient detail".to_string());
    }

    OutcomeCheck {
        outcome_id: outcome.id.clone(),
        bloom_level: outcome.bloom_level,
        issues,
        warnings,
    }
}

fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    !needle.is_empty() && words.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Check course-level outcomes first, then module outcomes in module order.
pub fn measurability<'a>(kb: &KnowledgeBase, outcomes: impl IntoIterator<Item = &'a Outcome>) -> MeasurabilityReport {
    let checks: Vec<OutcomeCheck> = outcomes.into_iter().map(|o| check_outcome(kb, o)).collect();
    MeasurabilityReport {
        total: checks.len(),
        measurable: checks.iter().filter(|c| c.is_measurable()).count(),
        with_issues: checks.iter().filter(|c| !c.issues.is_empty()).count(),
        with_warnings: checks.iter().filter(|c| !c.warnings.is_empty()).count(),
        checks,
    }
}

// ---------------------------------------------------------------------------
// Balance recommendations
// ---------------------------------------------------------------------------

/// Advisory notes on the module-level distribution. Empty when balanced.
pub fn balance_recommendations(stats: &BloomStatistics, cfg: &BalanceConfig) -> Vec<String> {
    let d = &stats.module_level;
    if d.total == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let remember = d.percentage(BloomLevel::Remember);
    if remember > cfg.max_remember_pct {
        out.push(format!(
            "Consider reducing Remember-level outcomes (currently {remember:.1}%, above {}%)",
            cfg.max_remember_pct
        ));
    }
    let apply = d.percentage(BloomLevel::Apply);
    if apply < cfg.min_apply_pct {
        out.push(format!(
            "Consider adding more Apply-level outcomes (currently {apply:.1}%, below {}%)",
            cfg.min_apply_pct
        ));
    }
    let higher = d.percentage(BloomLevel::Analyze) + d.percentage(BloomLevel::Evaluate) + d.percentage(BloomLevel::Create);
    if higher < cfg.min_higher_order_pct {
        out.push(format!(
            "Consider adding more higher-order outcomes (Analyze/Evaluate/Create at {higher:.1}%)"
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
