use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BloomLevel
// ---------------------------------------------------------------------------

/// The six ordered cognitive levels. Declaration order is the taxonomy
/// order, so `Ord` compares depth of thinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomLevel {
    pub const COUNT: usize = 6;

    pub fn all() -> &'static [BloomLevel] {
        &[
            BloomLevel::Remember,
            BloomLevel::Understand,
            BloomLevel::Apply,
            BloomLevel::Analyze,
            BloomLevel::Evaluate,
            BloomLevel::Create,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<BloomLevel> {
        BloomLevel::all().get(i).copied()
    }

    /// Same level or one step away in either direction.
    pub fn is_adjacent_or_equal(self, other: BloomLevel) -> bool {
        self.index().abs_diff(other.index()) <= 1
    }

    /// Remember and Understand.
    pub fn is_lower_order(self) -> bool {
        self <= BloomLevel::Understand
    }

    pub fn question_type(self) -> QuestionType {
        match self {
            BloomLevel::Remember | BloomLevel::Understand => QuestionType::MultipleChoice,
            BloomLevel::Apply | BloomLevel::Analyze => QuestionType::ShortAnswer,
            BloomLevel::Evaluate | BloomLevel::Create => QuestionType::CaseStudy,
        }
    }

    pub fn difficulty(self) -> Difficulty {
        match self {
            BloomLevel::Remember | BloomLevel::Understand => Difficulty::Easy,
            BloomLevel::Apply | BloomLevel::Analyze => Difficulty::Medium,
            BloomLevel::Evaluate | BloomLevel::Create => Difficulty::Hard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BloomLevel::Remember => "remember",
            BloomLevel::Understand => "understand",
            BloomLevel::Apply => "apply",
            BloomLevel::Analyze => "analyze",
            BloomLevel::Evaluate => "evaluate",
            BloomLevel::Create => "create",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BloomLevel::Remember => "Remember",
            BloomLevel::Understand => "Understand",
            BloomLevel::Apply => "Apply",
            BloomLevel::Analyze => "Analyze",
            BloomLevel::Evaluate => "Evaluate",
            BloomLevel::Create => "Create",
        }
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for BloomLevel {
    type Err = crate::error::SyllabusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remember" => Ok(BloomLevel::Remember),
            "understand" => Ok(BloomLevel::Understand),
            "apply" => Ok(BloomLevel::Apply),
            "analyze" | "analyse" => Ok(BloomLevel::Analyze),
            "evaluate" => Ok(BloomLevel::Evaluate),
            "create" => Ok(BloomLevel::Create),
            _ => Err(crate::error::SyllabusError::InvalidBloomLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// QuestionType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    CaseStudy,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::CaseStudy => "case_study",
        }
    }

    /// Minutes a student needs at the lowest level, before the level multiplier.
    pub fn base_minutes(self) -> u32 {
        match self {
            QuestionType::MultipleChoice => 2,
            QuestionType::ShortAnswer => 10,
            QuestionType::CaseStudy => 30,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Covered,
    Partial,
    Uncovered,
}

impl Coverage {
    pub fn from_matches(assessed: bool, questioned: bool) -> Coverage {
        match (assessed, questioned) {
            (true, true) => Coverage::Covered,
            (false, false) => Coverage::Uncovered,
            _ => Coverage::Partial,
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Coverage::Covered => "covered",
            Coverage::Partial => "partial",
            Coverage::Uncovered => "uncovered",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// CourseType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseType {
    Technical,
    Theoretical,
    Practical,
}

impl CourseType {
    /// Tie-break order for detection.
    pub fn all() -> &'static [CourseType] {
        &[
            CourseType::Technical,
            CourseType::Theoretical,
            CourseType::Practical,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CourseType::Technical => "technical",
            CourseType::Theoretical => "theoretical",
            CourseType::Practical => "practical",
        }
    }
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssessmentTiming
// ---------------------------------------------------------------------------

/// When in the course an assessment component runs. Declaration order is
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentTiming {
    Diagnostic,
    Continuous,
    Midpoint,
    Culminating,
    Final,
}

impl AssessmentTiming {
    /// Human-readable schedule for a course of `modules` modules.
    pub fn describe(self, modules: usize) -> String {
        let modules = modules.max(1);
        match self {
            AssessmentTiming::Diagnostic => "Module 1 (start of course)".to_string(),
            AssessmentTiming::Continuous if modules >= 2 => {
                format!("Throughout (Modules 2-{modules})")
            }
            AssessmentTiming::Continuous => "Throughout the course".to_string(),
            AssessmentTiming::Midpoint => format!("After Module {}", modules.div_ceil(2)),
            AssessmentTiming::Culminating if modules >= 2 => {
                format!("Modules {}-{modules}", modules - 1)
            }
            AssessmentTiming::Culminating => format!("Module {modules}"),
            AssessmentTiming::Final => "Final session".to_string(),
        }
    }
}

impl fmt::Display for AssessmentTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssessmentTiming::Diagnostic => "diagnostic",
            AssessmentTiming::Continuous => "continuous",
            AssessmentTiming::Midpoint => "midpoint",
            AssessmentTiming::Culminating => "culminating",
            AssessmentTiming::Final => "final",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bloom_order_and_indexing() {
        assert!(BloomLevel::Remember < BloomLevel::Create);
        assert_eq!(BloomLevel::from_index(3), Some(BloomLevel::Analyze));
        assert_eq!(BloomLevel::from_index(BloomLevel::COUNT), None);
        assert!(BloomLevel::Apply.is_adjacent_or_equal(BloomLevel::Understand));
        assert!(!BloomLevel::Apply.is_adjacent_or_equal(BloomLevel::Evaluate));
        assert_eq!(BloomLevel::all().len(), BloomLevel::COUNT);
    }

    #[test]
    fn difficulty_is_monotonic_in_level() {
        let difficulties: Vec<Difficulty> =
            BloomLevel::all().iter().map(|l| l.difficulty()).collect();
        assert!(difficulties.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(BloomLevel::Remember.difficulty(), Difficulty::Easy);
        assert_eq!(BloomLevel::Create.difficulty(), Difficulty::Hard);
    }

    #[test]
    fn question_type_follows_level() {
        assert_eq!(
            BloomLevel::Understand.question_type(),
            QuestionType::MultipleChoice
        );
        assert_eq!(BloomLevel::Analyze.question_type(), QuestionType::ShortAnswer);
        assert_eq!(BloomLevel::Evaluate.question_type(), QuestionType::CaseStudy);
    }

    #[test]
    fn bloom_from_str_is_lenient() {
        assert_eq!("Analyse".parse::<BloomLevel>().unwrap(), BloomLevel::Analyze);
        assert_eq!(" CREATE ".parse::<BloomLevel>().unwrap(), BloomLevel::Create);
        assert!("synthesize".parse::<BloomLevel>().is_err());
    }

    #[test]
    fn coverage_from_matches() {
        assert_eq!(Coverage::from_matches(true, true), Coverage::Covered);
        assert_eq!(Coverage::from_matches(true, false), Coverage::Partial);
        assert_eq!(Coverage::from_matches(false, true), Coverage::Partial);
        assert_eq!(Coverage::from_matches(false, false), Coverage::Uncovered);
    }

    #[test]
    fn timing_descriptions() {
        assert_eq!(AssessmentTiming::Continuous.describe(6), "Throughout (Modules 2-6)");
        assert_eq!(AssessmentTiming::Midpoint.describe(5), "After Module 3");
        assert_eq!(AssessmentTiming::Culminating.describe(1), "Module 1");
        assert!(AssessmentTiming::Diagnostic < AssessmentTiming::Final);
    }

    #[test]
    fn bloom_serde_is_snake_case() {
        let json = serde_json::to_string(&BloomLevel::Analyze).unwrap();
        assert_eq!(json, "\"analyze\"");
        let parsed: QuestionType = serde_json::from_str("\"case_study\"").unwrap();
        assert_eq!(parsed, QuestionType::CaseStudy);
    }
}
