use crate::model::{AlignmentRow, Blueprint, CoverageGapEntry, Module, Outcome, Question};
use crate::types::{BloomLevel, Coverage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const COURSE_WIDE: &str = "Course-wide";

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    ModuleWithoutRow { module_id: u32 },
    OutcomeRowCount { outcome_id: String, rows: usize },
    DanglingQuestionModule { question_id: String, module_id: u32 },
    QuestionLevelMismatch { question_id: String, level: BloomLevel },
    UnknownMappedModule { outcome_id: String, module_id: u32 },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::ModuleWithoutRow { module_id } => {
                write!(f, "module {module_id} has no alignment row")
            }
            IntegrityIssue::OutcomeRowCount { outcome_id, rows } => {
                write!(f, "outcome {outcome_id} appears in {rows} rows (expected 1)")
            }
            IntegrityIssue::DanglingQuestionModule {
                question_id,
                module_id,
            } => write!(f, "question {question_id} references unknown module {module_id}"),
            IntegrityIssue::QuestionLevelMismatch { question_id, level } => write!(
                f,
                "question {question_id} is at {level} but its module has no outcome at that level"
            ),
            IntegrityIssue::UnknownMappedModule {
                outcome_id,
                module_id,
            } => write!(f, "course outcome {outcome_id} maps to unknown module {module_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// AlignmentMatrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentMatrix {
    pub rows: Vec<AlignmentRow>,
    /// Rows with `Coverage::Uncovered`.
    pub gaps: Vec<CoverageGapEntry>,
    pub integrity: Vec<IntegrityIssue>,
}

impl AlignmentMatrix {
    pub fn is_consistent(&self) -> bool {
        self.integrity.is_empty()
    }

    pub fn count(&self, coverage: Coverage) -> usize {
        self.rows.iter().filter(|r| r.coverage == coverage).count()
    }

    pub fn rows_for_module(&self, module_id: u32) -> impl Iterator<Item = &AlignmentRow> {
        self.rows.iter().filter(move |r| r.module_id == Some(module_id))
    }
}

/// The first `limit` question ids of a row, for compact display. The row
/// itself keeps the full list.
pub fn display_question_ids(row: &AlignmentRow, limit: usize) -> &[String] {
    &row.question_ids[..row.question_ids.len().min(limit)]
}

/// Cross-reference every outcome against the assessment components and
/// questions at its level. Pure: rebuilding from the same graph gives the
/// same matrix.
///
/// Module outcomes come first, module by module, then course outcomes with
/// a "Course-wide" label.
pub fn build(
    modules: &[Module],
    course_outcomes: &[Outcome],
    blueprint: &Blueprint,
    questions: &[Question],
) -> AlignmentMatrix {
    let mut rows = Vec::new();

    for module in modules {
        for outcome in &module.learning_outcomes {
            let question_ids = questions
                .iter()
                .filter(|q| q.module_id == module.id && q.bloom_level == outcome.bloom_level)
                .map(|q| q.id.clone())
                .collect();
            rows.push(row(Some(module.id), &module.title, outcome, blueprint, question_ids));
        }
    }

    for outcome in course_outcomes {
        let question_ids = questions
            .iter()
            .filter(|q| {
                q.bloom_level == outcome.bloom_level
                    && (outcome.mapped_modules.is_empty() || outcome.mapped_modules.contains(&q.module_id))
            })
            .map(|q| q.id.clone())
            .collect();
        rows.push(row(None, COURSE_WIDE, outcome, blueprint, question_ids));
    }

    let gaps = rows
        .iter()
        .filter(|r| r.coverage == Coverage::Uncovered)
        .map(|r| CoverageGapEntry {
            module_id: r.module_id,
            module: r.module.clone(),
            outcome_id: r.outcome_id.clone(),
        })
        .collect();

    let integrity = check_integrity(modules, course_outcomes, questions, &rows);
    AlignmentMatrix {
        rows,
        gaps,
        integrity,
    }
}

fn row(
    module_id: Option<u32>,
    module: &str,
    outcome: &Outcome,
    blueprint: &Blueprint,
    question_ids: Vec<String>,
) -> AlignmentRow {
    let assessment_types: Vec<String> = blueprint
        .components
        .iter()
        .filter(|c| c.exercises(outcome.bloom_level))
        .map(|c| c.component_type.clone())
        .collect();
    let coverage = Coverage::from_matches(!assessment_types.is_empty(), !question_ids.is_empty());
    AlignmentRow {
        module_id,
        module: module.to_string(),
        outcome_id: outcome.id.clone(),
        learning_outcome: outcome.outcome_text.clone(),
        bloom_level: outcome.bloom_level,
        coverage,
        assessment_types,
        question_ids,
    }
}

/// Referential checks over the artifact graph and its rows.
pub fn check_integrity(
    modules: &[Module],
    course_outcomes: &[Outcome],
    questions: &[Question],
    rows: &[AlignmentRow],
) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    let mut row_modules = BTreeSet::new();
    let mut row_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rows {
        if let Some(id) = r.module_id {
            row_modules.insert(id);
        }
        *row_counts.entry(r.outcome_id.as_str()).or_default() += 1;
    }

    for module in modules {
        if !row_modules.contains(&module.id) {
            issues.push(IntegrityIssue::ModuleWithoutRow {
                module_id: module.id,
            });
        }
    }

    let all_outcomes = modules
        .iter()
        .flat_map(|m| m.learning_outcomes.iter())
        .chain(course_outcomes.iter());
    for outcome in all_outcomes {
        let count = row_counts.get(outcome.id.as_str()).copied().unwrap_or(0);
        if count != 1 {
            issues.push(IntegrityIssue::OutcomeRowCount {
                outcome_id: outcome.id.clone(),
                rows: count,
            });
        }
    }

    for q in questions {
        match modules.iter().find(|m| m.id == q.module_id) {
            None => issues.push(IntegrityIssue::DanglingQuestionModule {
                question_id: q.id.clone(),
                module_id: q.module_id,
            }),
            Some(module) => {
                if !module.learning_outcomes.iter().any(|o| o.bloom_level == q.bloom_level) {
                    issues.push(IntegrityIssue::QuestionLevelMismatch {
                        question_id: q.id.clone(),
                        level: q.bloom_level,
                    });
                }
            }
        }
    }

    for outcome in course_outcomes {
        for id in &outcome.mapped_modules {
            if !modules.iter().any(|m| m.id == *id) {
                issues.push(IntegrityIssue::UnknownMappedModule {
                    outcome_id: outcome.id.clone(),
                    module_id: *id,
                });
            }
        }
    }

    issues
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
