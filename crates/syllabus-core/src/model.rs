use crate::types::{AssessmentTiming, BloomLevel, Coverage, CourseType, Difficulty, QuestionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// TopicCandidate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCandidate {
    pub phrase: String,
    pub relevance_score: f64,
}

impl TopicCandidate {
    pub fn new(phrase: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            phrase: phrase.into(),
            relevance_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeScope {
    Course,
    Module { module_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// `CLO-n` for course-level outcomes, `M{module}-LO{n}` for module-level ones.
    pub id: String,
    pub outcome_text: String,
    pub bloom_level: BloomLevel,
    pub mapped_modules: Vec<u32>,
    pub scope: OutcomeScope,
}

impl Outcome {
    pub fn module_id(&self) -> Option<u32> {
        match self.scope {
            OutcomeScope::Module { module_id } => Some(module_id),
            OutcomeScope::Course => None,
        }
    }

    pub fn is_course_level(&self) -> bool {
        matches!(self.scope, OutcomeScope::Course)
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: u32,
    pub title: String,
    /// The topic phrase the module was built from, before title decoration.
    pub topic: String,
    pub description: String,
    pub hours: u32,
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<Outcome>,
}

// ---------------------------------------------------------------------------
// Assessment blueprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub weight_percent: u32,
    pub description: String,
    pub timing: String,
    pub stage: AssessmentTiming,
    pub format: String,
    pub bloom_levels: BTreeSet<BloomLevel>,
    /// Every course- and module-level outcome id at a level this component exercises.
    pub linked_outcomes: Vec<String>,
}

impl AssessmentComponent {
    pub fn exercises(&self, level: BloomLevel) -> bool {
        self.bloom_levels.contains(&level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: String,
    pub range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub components: Vec<AssessmentComponent>,
    pub grading_scale: Vec<GradeBand>,
    pub recommendations: Vec<String>,
}

impl Blueprint {
    pub fn total_weight(&self) -> u32 {
        self.components.iter().map(|c| c.weight_percent).sum()
    }

    pub fn covered_levels(&self) -> BTreeSet<BloomLevel> {
        self.components
            .iter()
            .flat_map(|c| c.bloom_levels.iter().copied())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Question
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// `Q-M{module}-{nnn}`, numbered per module.
    pub id: String,
    pub module_id: u32,
    pub outcome_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub bloom_level: BloomLevel,
    pub difficulty: Difficulty,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rubric: Vec<RubricCriterion>,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricCriterion {
    pub criterion: String,
    pub descriptor: String,
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentRow {
    /// `None` for course-level outcomes.
    pub module_id: Option<u32>,
    pub module: String,
    pub outcome_id: String,
    pub learning_outcome: String,
    pub bloom_level: BloomLevel,
    pub coverage: Coverage,
    pub assessment_types: Vec<String>,
    pub question_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageGapEntry {
    pub module_id: Option<u32>,
    pub module: String,
    pub outcome_id: String,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDistribution {
    /// Indexed by `BloomLevel::index()`.
    pub counts: [u32; BloomLevel::COUNT],
    /// Tenths-exact percentages that sum to 100.0, or all zero when `total == 0`.
    pub percentages: [f64; BloomLevel::COUNT],
    pub total: u32,
}

impl LevelDistribution {
    pub fn count(&self, level: BloomLevel) -> u32 {
        self.counts[level.index()]
    }

    pub fn percentage(&self, level: BloomLevel) -> f64 {
        self.percentages[level.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BloomStatistics {
    pub module_level: LevelDistribution,
    pub course_level: LevelDistribution,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal findings that travel alongside a successful syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynthesisWarning {
    PartiallyBalanced {
        iterations: u32,
        offending: Vec<String>,
    },
    CoverageGap {
        pairs: Vec<CoverageGapEntry>,
    },
}

impl SynthesisWarning {
    pub fn message(&self) -> String {
        match self {
            SynthesisWarning::PartiallyBalanced {
                iterations,
                offending,
            } => format!(
                "outcome balance not reached after {iterations} repair iteration(s); {} outcome(s) still over a ceiling: {}",
                offending.len(),
                offending.join(", ")
            ),
            SynthesisWarning::CoverageGap { pairs } => {
                let listed: Vec<String> = pairs
                    .iter()
                    .map(|p| format!("{} / {}", p.module, p.outcome_id))
                    .collect();
                format!(
                    "{} outcome(s) have no assessment or question coverage: {}",
                    pairs.len(),
                    listed.join(", ")
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Syllabus (the artifact graph handed to export/presentation)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "courseTitle")]
    pub course_title: String,
    pub generated_date: String,
    pub duration: u32,
    #[serde(rename = "courseType")]
    pub course_type: CourseType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Syllabus {
    pub metadata: Metadata,
    pub modules: Vec<Module>,
    pub course_outcomes: Vec<Outcome>,
    pub bloom_statistics: BloomStatistics,
    pub blueprint: Blueprint,
    pub analysis: crate::analyzer::AnalysisReport,
    pub measurability: crate::validator::MeasurabilityReport,
    pub balance_recommendations: Vec<String>,
    pub questions: Vec<Question>,
    pub alignment: crate::alignment::AlignmentMatrix,
    pub warnings: Vec<SynthesisWarning>,
}

impl Syllabus {
    pub fn module_outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.modules.iter().flat_map(|m| m.learning_outcomes.iter())
    }

    pub fn total_hours(&self) -> u32 {
        self.modules.iter().map(|m| m.hours).sum()
    }
}
