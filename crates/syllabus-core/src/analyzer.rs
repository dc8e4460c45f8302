use crate::config::PipelineConfig;
use crate::knowledge::{AssessmentType, KnowledgeBase};
use crate::model::{Blueprint, LevelDistribution, Module, Outcome};
use crate::stats;
use crate::types::BloomLevel;
use crate::validator::check_balance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Issue,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Module- and course-level outcomes together.
    pub outcome_distribution: LevelDistribution,
    /// Share of the grade exercising each level, indexed by `BloomLevel::index()`.
    /// A component's weight is split evenly across the levels it exercises.
    pub assessment_weight_by_level: [f64; BloomLevel::COUNT],
    pub uncovered_levels: Vec<BloomLevel>,
    pub unassessed_outcomes: Vec<String>,
    pub level_coverage: f64,
    pub weight_sum: u32,
    pub balance_compliance: f64,
    pub continuous_weight: u32,
    pub high_stakes_weight: u32,
    pub quality_score: f64,
    pub grade: String,
    pub grade_label: String,
    pub findings: Vec<Finding>,
}

impl AnalysisReport {
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Issue)
    }
}

/// Score the finished blueprint against the outcome set. Pure: the same
/// artifacts always give the same report.
pub fn analyze(
    kb: &KnowledgeBase,
    cfg: &PipelineConfig,
    blueprint: &Blueprint,
    modules: &[Module],
    course_outcomes: &[Outcome],
) -> AnalysisReport {
    let module_outcomes: Vec<&Outcome> = modules.iter().flat_map(|m| m.learning_outcomes.iter()).collect();
    let all: Vec<&Outcome> = course_outcomes.iter().chain(module_outcomes.iter().copied()).collect();

    // Coverage of outcome levels by assessment components.
    let outcome_levels: BTreeSet<BloomLevel> = all.iter().map(|o| o.bloom_level).collect();
    let covered = blueprint.covered_levels();
    let uncovered_levels: Vec<BloomLevel> = outcome_levels.difference(&covered).copied().collect();
    let level_coverage = if outcome_levels.is_empty() {
        1.0
    } else {
        (outcome_levels.len() - uncovered_levels.len()) as f64 / outcome_levels.len() as f64
    };

    let linked: BTreeSet<&str> = blueprint
        .components
        .iter()
        .flat_map(|c| c.linked_outcomes.iter().map(String::as_str))
        .collect();
    let unassessed_outcomes: Vec<String> = all
        .iter()
        .filter(|o| !linked.contains(o.id.as_str()))
        .map(|o| o.id.clone())
        .collect();

    let weight_sum = blueprint.total_weight();
    let offending = check_balance(&module_outcomes, course_outcomes, &cfg.balance).violations.len();
    let balance_compliance = if all.is_empty() {
        1.0
    } else {
        1.0 - offending as f64 / all.len() as f64
    };

    let a = &cfg.analyzer;
    let raw = a.coverage_weight * level_coverage
        + a.weight_sum_weight * if weight_sum == 100 { 1.0 } else { 0.0 }
        + a.balance_weight * balance_compliance;
    let quality_score = (raw * 10.0).round() / 10.0;
    let letter = cfg.grading.letter(quality_score);

    let continuous_weight = weight_where(kb, blueprint, |t| t.continuous);
    let high_stakes_weight = weight_where(kb, blueprint, |t| t.high_stakes);

    let mut findings = Vec::new();
    for c in &blueprint.components {
        if c.weight_percent > a.component_issue_pct {
            findings.push(issue(format!(
                "{} has excessive weight ({}%). Consider redistributing.",
                c.component_type, c.weight_percent
            )));
        } else if c.weight_percent > a.component_warning_pct {
            findings.push(warning(format!(
                "{} has high weight ({}%). Ensure students have adequate preparation.",
                c.component_type, c.weight_percent
            )));
        }
    }
    if continuous_weight < a.min_continuous_pct {
        findings.push(warning(format!(
            "Low continuous assessment weight ({continuous_weight}%). Consider adding more formative assessments."
        )));
    }
    if high_stakes_weight > a.max_high_stakes_pct {
        findings.push(issue(format!(
            "High-stakes exams dominate ({high_stakes_weight}%)."
        )));
    }
    if weight_sum != 100 {
        findings.push(issue(format!("Component weights sum to {weight_sum}%, not 100%.")));
    }
    for level in &uncovered_levels {
        findings.push(issue(format!("{level}-level outcomes have no assessment component.")));
    }

    AnalysisReport {
        outcome_distribution: stats::distribution(all.iter().copied()),
        assessment_weight_by_level: weight_by_level(blueprint),
        uncovered_levels,
        unassessed_outcomes,
        level_coverage,
        weight_sum,
        balance_compliance,
        continuous_weight,
        high_stakes_weight,
        quality_score,
        grade: letter.to_string(),
        grade_label: grade_label(letter).to_string(),
        findings,
    }
}

/// Combined weight of components whose catalog entry satisfies `flag`.
/// Components missing from the catalog count for nothing.
fn weight_where(kb: &KnowledgeBase, blueprint: &Blueprint, flag: impl Fn(&AssessmentType) -> bool) -> u32 {
    blueprint
        .components
        .iter()
        .filter(|c| kb.assessment_type(&c.component_type).map(|t| flag(t)).unwrap_or(false))
        .map(|c| c.weight_percent)
        .sum()
}

fn weight_by_level(blueprint: &Blueprint) -> [f64; BloomLevel::COUNT] {
    let mut out = [0.0; BloomLevel::COUNT];
    for c in &blueprint.components {
        if c.bloom_levels.is_empty() {
            continue;
        }
        let share = f64::from(c.weight_percent) / c.bloom_levels.len() as f64;
        for level in &c.bloom_levels {
            out[level.index()] += share;
        }
    }
    for v in &mut out {
        *v = (*v * 10.0).round() / 10.0;
    }
    out
}

fn grade_label(letter: char) -> &'static str {
    match letter {
        'A' => "Excellent",
        'B' => "Good",
        'C' => "Satisfactory",
        'D' => "Needs Improvement",
        _ => "Poor",
    }
}

fn issue(message: String) -> Finding {
    Finding {
        severity: Severity::Issue,
        message,
    }
}

fn warning(message: String) -> Finding {
    Finding {
        severity: Severity::Warning,
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
