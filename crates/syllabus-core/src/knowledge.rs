use crate::error::{Result, SyllabusError};
use crate::model::RubricCriterion;
use crate::types::{AssessmentTiming, BloomLevel, CourseType, QuestionType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

/// Placeholders a template may reference. Anything else is a deployment bug.
pub const PLACEHOLDERS: &[&str] = &[
    "verb",
    "concept",
    "concept1",
    "concept2",
    "context",
    "scope",
    "problem",
    "goal",
    "alternative",
];

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap())
}

/// Substitute `{name}` placeholders. Unknown names are left in place.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

static ARTICLE_RE: OnceLock<Regex> = OnceLock::new();

/// Lowercase a topic phrase and drop articles so it reads naturally
/// mid-sentence.
pub fn clean_concept(phrase: &str) -> String {
    let re = ARTICLE_RE.get_or_init(|| Regex::new(r"\b(the|a|an)\b").unwrap());
    let lowered = phrase.trim().to_lowercase();
    let stripped = re.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelVocabulary {
    pub level: BloomLevel,
    pub verbs: Vec<String>,
    pub outcome_templates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTemplateSet {
    pub question_type: QuestionType,
    pub level: BloomLevel,
    pub templates: Vec<String>,
    /// Case-study framing paragraphs; ignored for other types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: u32,
    pub max: u32,
}

impl WeightRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentType {
    pub name: String,
    pub typical_weight: u32,
    pub weight_range: WeightRange,
    pub description: String,
    pub bloom_levels: BTreeSet<BloomLevel>,
    pub timing: AssessmentTiming,
    pub format: String,
    #[serde(default)]
    pub continuous: bool,
    #[serde(default)]
    pub high_stakes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalAssessment {
    pub name: String,
    pub min_modules: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseTypeProfile {
    pub course_type: CourseType,
    /// Word stems whose presence votes for this course type.
    pub indicators: Vec<String>,
    /// Relative weight of each level in the module-level outcome plan.
    pub level_weights: BTreeMap<BloomLevel, f64>,
    pub base_assessments: Vec<String>,
    #[serde(default)]
    pub conditional_assessments: Vec<ConditionalAssessment>,
    #[serde(default)]
    pub weight_overrides: BTreeMap<String, WeightRange>,
    #[serde(default)]
    pub description_overrides: BTreeMap<String, String>,
    pub middle_prefixes: Vec<String>,
    pub closing_prefix: String,
}

impl CourseTypeProfile {
    pub fn level_weight(&self, level: BloomLevel) -> f64 {
        self.level_weights.get(&level).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricTemplate {
    pub question_type: QuestionType,
    pub criteria: Vec<RubricCriterion>,
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// Static reference data every stage reads from. Built once, then shared by
/// reference; nothing mutates it after `validate()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub levels: Vec<LevelVocabulary>,
    pub question_templates: Vec<QuestionTemplateSet>,
    pub assessment_types: Vec<AssessmentType>,
    pub course_types: Vec<CourseTypeProfile>,
    pub rubrics: Vec<RubricTemplate>,
    pub mcq_options: Vec<String>,
    /// Scope-derived topics used to pad a thin extraction; `{scope}` is substituted.
    pub generic_topics: Vec<String>,
    pub vague_verbs: Vec<String>,
    pub opening_prefix: String,
}

impl KnowledgeBase {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let kb: KnowledgeBase = serde_yaml::from_str(&data)?;
        kb.validate()?;
        Ok(kb)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn vocabulary(&self, level: BloomLevel) -> Option<&LevelVocabulary> {
        self.levels.iter().find(|v| v.level == level)
    }

    pub fn verbs(&self, level: BloomLevel) -> &[String] {
        self.vocabulary(level)
            .map(|v| v.verbs.as_slice())
            .unwrap_or(&[])
    }

    pub fn question_templates(
        &self,
        question_type: QuestionType,
        level: BloomLevel,
    ) -> Option<&QuestionTemplateSet> {
        self.question_templates
            .iter()
            .find(|t| t.question_type == question_type && t.level == level && !t.templates.is_empty())
    }

    pub fn assessment_type(&self, name: &str) -> Option<&AssessmentType> {
        self.assessment_types.iter().find(|a| a.name == name)
    }

    pub fn profile(&self, course_type: CourseType) -> Option<&CourseTypeProfile> {
        self.course_types.iter().find(|p| p.course_type == course_type)
    }

    pub fn rubric(&self, question_type: QuestionType) -> &[RubricCriterion] {
        self.rubrics
            .iter()
            .find(|r| r.question_type == question_type)
            .map(|r| r.criteria.as_slice())
            .unwrap_or(&[])
    }

    /// True when `word` (lowercase) is a verb of any level.
    pub fn is_bloom_verb(&self, word: &str) -> bool {
        self.levels
            .iter()
            .any(|v| v.verbs.iter().any(|verb| verb.eq_ignore_ascii_case(word)))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Reject entries no stage could use. Errors here are deployment defects.
    pub fn validate(&self) -> Result<()> {
        let malformed = |msg: String| Err(SyllabusError::KnowledgeBase(msg));

        for &level in BloomLevel::all() {
            let Some(vocab) = self.vocabulary(level) else {
                return malformed(format!("no vocabulary for level {level}"));
            };
            if vocab.verbs.iter().all(|v| v.trim().is_empty()) {
                return malformed(format!("level {level} has no verbs"));
            }
            if vocab.outcome_templates.is_empty() {
                return malformed(format!("level {level} has no outcome templates"));
            }
            for t in &vocab.outcome_templates {
                check_placeholders(t)?;
            }
            if !self.assessment_types.iter().any(|a| a.bloom_levels.contains(&level)) {
                return malformed(format!("no assessment type exercises level {level}"));
            }
            let question_type = level.question_type();
            if self.question_templates(question_type, level).is_none() {
                return Err(SyllabusError::TemplateExhaustion {
                    question_type: question_type.as_str().to_string(),
                    level: level.as_str().to_string(),
                });
            }
        }
        if self.mcq_options.is_empty() {
            return malformed("no multiple-choice option templates".to_string());
        }
        for t in &self.mcq_options {
            check_placeholders(t)?;
        }

        for set in &self.question_templates {
            for t in set.templates.iter().chain(set.scenarios.iter()) {
                check_placeholders(t)?;
            }
        }

        let mut names = BTreeSet::new();
        for a in &self.assessment_types {
            if !names.insert(a.name.as_str()) {
                return malformed(format!("duplicate assessment type '{}'", a.name));
            }
            if a.weight_range.min > a.weight_range.max {
                return malformed(format!(
                    "assessment type '{}' has inverted weight range {}-{}",
                    a.name, a.weight_range.min, a.weight_range.max
                ));
            }
            if a.weight_range.max == 0 {
                return malformed(format!("assessment type '{}' can never carry weight", a.name));
            }
            if a.bloom_levels.is_empty() {
                return malformed(format!("assessment type '{}' exercises no level", a.name));
            }
        }

        for &course_type in CourseType::all() {
            let Some(profile) = self.profile(course_type) else {
                return malformed(format!("no profile for course type {course_type}"));
            };
            if profile.level_weights.values().any(|w| !w.is_finite() || *w < 0.0)
                || profile.level_weights.values().sum::<f64>() <= 0.0
            {
                return malformed(format!("course type {course_type} has unusable level weights"));
            }
            let referenced = profile
                .base_assessments
                .iter()
                .chain(profile.conditional_assessments.iter().map(|c| &c.name))
                .chain(profile.weight_overrides.keys());
            for name in referenced {
                if self.assessment_type(name).is_none() {
                    return malformed(format!(
                        "course type {course_type} references unknown assessment type '{name}'"
                    ));
                }
            }
            for (name, range) in &profile.weight_overrides {
                if range.min > range.max {
                    return malformed(format!(
                        "course type {course_type} has inverted range for '{name}'"
                    ));
                }
            }
            if profile.middle_prefixes.is_empty() {
                return malformed(format!("course type {course_type} has no title prefixes"));
            }
        }

        if self.generic_topics.is_empty() {
            return malformed("no generic topics for padding".to_string());
        }
        for t in &self.generic_topics {
            check_placeholders(t)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Built-in data
    // -----------------------------------------------------------------------

    pub fn builtin() -> Self {
        Self {
            levels: builtin_levels(),
            question_templates: builtin_question_templates(),
            assessment_types: builtin_assessment_types(),
            course_types: builtin_course_types(),
            rubrics: builtin_rubrics(),
            mcq_options: strings(&[
                "{concept1} serves as the primary mechanism behind {concept}",
                "It provides a framework for implementing {concept1}",
                "{concept1} enables systematic analysis of {concept}",
                "It represents an alternative approach to {concept1}",
            ]),
            generic_topics: strings(&[
                "foundations of {scope}",
                "core practices in {scope}",
                "case studies in {scope}",
                "current trends in {scope}",
            ]),
            vague_verbs: strings(&[
                "know",
                "understand",
                "learn",
                "appreciate",
                "be aware of",
                "become familiar with",
                "gain knowledge",
            ]),
            opening_prefix: "Introduction to".to_string(),
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_placeholders(template: &str) -> Result<()> {
    for caps in placeholder_re().captures_iter(template) {
        let name = &caps[1];
        if !PLACEHOLDERS.contains(&name) {
            return Err(SyllabusError::KnowledgeBase(format!(
                "template '{template}' uses unknown placeholder '{{{name}}}'"
            )));
        }
    }
    Ok(())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn levels(items: &[BloomLevel]) -> BTreeSet<BloomLevel> {
    items.iter().copied().collect()
}

fn builtin_levels() -> Vec<LevelVocabulary> {
    use BloomLevel::*;
    let entry = |level, verbs: &[&str], templates: &[&str]| LevelVocabulary {
        level,
        verbs: strings(verbs),
        outcome_templates: strings(templates),
    };
    vec![
        entry(
            Remember,
            &["define", "identify", "list", "name", "recall", "recognize", "state", "label"],
            &[
                "Students will be able to {verb} the key terms of {concept}",
                "Students will be able to {verb} the main components of {concept}",
                "Students will be able to {verb} fundamental facts about {concept}",
                "Students will be able to {verb} the core elements of {context}",
            ],
        ),
        entry(
            Understand,
            &["classify", "describe", "discuss", "explain", "interpret", "summarize", "illustrate", "paraphrase"],
            &[
                "Students will be able to {verb} the principles of {concept}",
                "Students will be able to {verb} how {concept} works",
                "Students will be able to {verb} the role of {context} in {concept}",
                "Students will be able to {verb} the main ideas behind {concept}",
            ],
        ),
        entry(
            Apply,
            &["apply", "demonstrate", "implement", "solve", "use", "execute", "calculate", "practice"],
            &[
                "Students will be able to {verb} {concept} to {context}",
                "Students will be able to {verb} {concept} in realistic settings",
                "Students will be able to {verb} {concept} to solve concrete problems",
                "Students will be able to {verb} techniques from {concept} on new tasks",
            ],
        ),
        entry(
            Analyze,
            &["analyze", "compare", "contrast", "differentiate", "examine", "investigate", "categorize", "distinguish"],
            &[
                "Students will be able to {verb} the components of {concept}",
                "Students will be able to {verb} competing approaches to {concept}",
                "Students will be able to {verb} how {context} shapes {concept}",
                "Students will be able to {verb} the structure of {concept} problems",
            ],
        ),
        entry(
            Evaluate,
            &["assess", "critique", "evaluate", "judge", "justify", "validate", "argue", "defend"],
            &[
                "Students will be able to {verb} the effectiveness of {concept}",
                "Students will be able to {verb} design decisions in {concept}",
                "Students will be able to {verb} alternative solutions for {context}",
                "Students will be able to {verb} the trade-offs of {concept} approaches",
            ],
        ),
        entry(
            Create,
            &["create", "design", "develop", "construct", "formulate", "propose", "plan", "produce"],
            &[
                "Students will be able to {verb} original solutions using {concept}",
                "Students will be able to {verb} a complete {concept} artifact",
                "Students will be able to {verb} new approaches to {context}",
                "Students will be able to {verb} an integrated project drawing on {concept}",
            ],
        ),
    ]
}

fn builtin_question_templates() -> Vec<QuestionTemplateSet> {
    use BloomLevel::*;
    use QuestionType::*;
    let set = |question_type, level, templates: &[&str], scenarios: &[&str]| QuestionTemplateSet {
        question_type,
        level,
        templates: strings(templates),
        scenarios: strings(scenarios),
    };
    vec![
        set(
            MultipleChoice,
            Remember,
            &[
                "What is the definition of {concept}?",
                "Which of the following identifies the main components of {concept}?",
                "Which of the following lists a key feature of {concept1}?",
                "Which of the following best describes {concept}?",
            ],
            &[],
        ),
        set(
            MultipleChoice,
            Understand,
            &[
                "Which statement best explains the relationship between {concept1} and {concept2}?",
                "Which of the following describes how {concept} works?",
                "Which option summarizes the main principle of {concept1}?",
                "How does {concept1} compare with {concept2}?",
            ],
            &[],
        ),
        set(
            ShortAnswer,
            Apply,
            &[
                "Apply {concept} to solve {problem}.",
                "Demonstrate how to use {concept1} in {context}.",
                "Implement {concept} to achieve {goal}.",
                "Use {concept1} to work through {problem}.",
            ],
            &[],
        ),
        set(
            ShortAnswer,
            Analyze,
            &[
                "Analyze the factors that influence {concept}.",
                "Compare and contrast {concept1} with {concept2}.",
                "Examine the relationship between {concept1} and {concept2}.",
                "Differentiate between {concept1} and {concept2} in {context}.",
            ],
            &[],
        ),
        set(
            CaseStudy,
            Evaluate,
            &[
                "Evaluate the effectiveness of the team's {concept} approach. What improvements would you recommend?",
                "Critique the way {concept1} was applied in this scenario.",
                "Justify the use of {concept} over {alternative} for this organization.",
                "Assess the advantages and disadvantages of the chosen {concept1} strategy.",
            ],
            &[
                "An organization is adopting {concept} to improve its operations. It faces challenges with {concept1}, and current metrics show weak results in key areas.",
                "A project team has used {concept1} to deliver a new service, but stakeholders are questioning whether {concept} was the right choice.",
            ],
        ),
        set(
            CaseStudy,
            Create,
            &[
                "Design a {concept} solution that addresses {problem}.",
                "Create a plan to introduce {concept1} across the organization.",
                "Develop a solution using {concept} that resolves the challenges described.",
                "Propose a new approach to {concept1} for this scenario.",
            ],
            &[
                "A growing organization needs to rebuild its {concept} capability from scratch. Previous attempts stalled on {concept1}.",
                "A client has asked for a fresh approach to {concept1}. The existing {concept} process no longer meets their needs.",
            ],
        ),
    ]
}

fn builtin_assessment_types() -> Vec<AssessmentType> {
    use AssessmentTiming::*;
    use BloomLevel::*;
    vec![
        AssessmentType {
            name: "Pre-Test".to_string(),
            typical_weight: 5,
            weight_range: WeightRange::new(0, 10),
            description: "Diagnostic assessment to gauge prior knowledge".to_string(),
            bloom_levels: levels(&[Remember, Understand]),
            timing: Diagnostic,
            format: "Multiple choice, true/false".to_string(),
            continuous: false,
            high_stakes: false,
        },
        AssessmentType {
            name: "Quizzes".to_string(),
            typical_weight: 20,
            weight_range: WeightRange::new(15, 30),
            description: "Regular assessments of module comprehension".to_string(),
            bloom_levels: levels(&[Remember, Understand, Apply]),
            timing: Continuous,
            format: "Mixed: multiple choice, short answer".to_string(),
            continuous: true,
            high_stakes: false,
        },
        AssessmentType {
            name: "Midterm Exam".to_string(),
            typical_weight: 20,
            weight_range: WeightRange::new(15, 25),
            description: "Comprehensive exam covering the first half of the course".to_string(),
            bloom_levels: levels(&[Understand, Apply, Analyze]),
            timing: Midpoint,
            format: "Mixed format".to_string(),
            continuous: false,
            high_stakes: true,
        },
        AssessmentType {
            name: "Labs/Assignments".to_string(),
            typical_weight: 25,
            weight_range: WeightRange::new(20, 35),
            description: "Hands-on practical exercises".to_string(),
            bloom_levels: levels(&[Apply, Analyze]),
            timing: Continuous,
            format: "Practical work, problem sets".to_string(),
            continuous: true,
            high_stakes: false,
        },
        AssessmentType {
            name: "Project".to_string(),
            typical_weight: 20,
            weight_range: WeightRange::new(15, 30),
            description: "Comprehensive project synthesizing course concepts".to_string(),
            bloom_levels: levels(&[Analyze, Evaluate, Create]),
            timing: Culminating,
            format: "Project deliverable with documentation".to_string(),
            continuous: false,
            high_stakes: false,
        },
        AssessmentType {
            name: "Final Exam".to_string(),
            typical_weight: 10,
            weight_range: WeightRange::new(10, 30),
            description: "Comprehensive final assessment".to_string(),
            bloom_levels: BloomLevel::all().iter().copied().collect(),
            timing: Final,
            format: "Comprehensive exam".to_string(),
            continuous: false,
            high_stakes: true,
        },
    ]
}

fn builtin_course_types() -> Vec<CourseTypeProfile> {
    let weights = |w: [f64; 6]| -> BTreeMap<BloomLevel, f64> {
        BloomLevel::all().iter().copied().zip(w).collect()
    };
    let ranges = |items: &[(&str, u32, u32)]| -> BTreeMap<String, WeightRange> {
        items
            .iter()
            .map(|(n, lo, hi)| (n.to_string(), WeightRange::new(*lo, *hi)))
            .collect()
    };
    let descriptions = |items: &[(&str, &str)]| -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(n, d)| (n.to_string(), d.to_string()))
            .collect()
    };
    vec![
        CourseTypeProfile {
            course_type: CourseType::Technical,
            indicators: strings(&["algorithm", "programming", "code", "software", "system", "data", "network", "database"]),
            level_weights: weights([0.10, 0.15, 0.30, 0.25, 0.12, 0.08]),
            base_assessments: strings(&["Pre-Test", "Quizzes", "Labs/Assignments", "Project", "Final Exam"]),
            conditional_assessments: vec![ConditionalAssessment {
                name: "Midterm Exam".to_string(),
                min_modules: 6,
            }],
            weight_overrides: ranges(&[
                ("Pre-Test", 0, 10),
                ("Quizzes", 15, 25),
                ("Midterm Exam", 15, 20),
                ("Labs/Assignments", 30, 40),
                ("Project", 15, 25),
                ("Final Exam", 10, 20),
            ]),
            description_overrides: descriptions(&[
                ("Labs/Assignments", "Hands-on practical exercises. Focus on coding exercises and algorithm implementation."),
                ("Project", "Comprehensive project synthesizing course concepts. Build a complete application demonstrating course concepts."),
            ]),
            middle_prefixes: strings(&["Practical", "Applied", "Implementing"]),
            closing_prefix: "Capstone Project:".to_string(),
        },
        CourseTypeProfile {
            course_type: CourseType::Theoretical,
            indicators: strings(&["theory", "concept", "principle", "framework", "model", "analysis"]),
            level_weights: weights([0.12, 0.22, 0.24, 0.24, 0.12, 0.06]),
            base_assessments: strings(&["Pre-Test", "Quizzes", "Midterm Exam", "Labs/Assignments", "Final Exam"]),
            conditional_assessments: vec![ConditionalAssessment {
                name: "Project".to_string(),
                min_modules: 6,
            }],
            weight_overrides: ranges(&[
                ("Pre-Test", 5, 10),
                ("Quizzes", 20, 30),
                ("Midterm Exam", 20, 30),
                ("Labs/Assignments", 10, 20),
                ("Project", 10, 15),
                ("Final Exam", 20, 30),
            ]),
            description_overrides: descriptions(&[
                ("Labs/Assignments", "Hands-on practical exercises. Problem sets and analytical exercises."),
                ("Project", "Comprehensive project synthesizing course concepts. Research-based project with written report."),
            ]),
            middle_prefixes: strings(&["Theory of", "Principles of", "Perspectives on"]),
            closing_prefix: "Advanced Topics in".to_string(),
        },
        CourseTypeProfile {
            course_type: CourseType::Practical,
            indicators: strings(&["application", "implementation", "practice", "exercise", "lab", "project", "hands-on"]),
            level_weights: weights([0.06, 0.10, 0.34, 0.25, 0.12, 0.13]),
            base_assessments: strings(&["Quizzes", "Labs/Assignments", "Project", "Final Exam"]),
            conditional_assessments: vec![ConditionalAssessment {
                name: "Midterm Exam".to_string(),
                min_modules: 7,
            }],
            weight_overrides: ranges(&[
                ("Pre-Test", 0, 5),
                ("Quizzes", 10, 20),
                ("Midterm Exam", 10, 15),
                ("Labs/Assignments", 35, 45),
                ("Project", 20, 30),
                ("Final Exam", 10, 15),
            ]),
            description_overrides: descriptions(&[
                ("Labs/Assignments", "Hands-on practical exercises. Emphasis on real-world applications and case studies."),
                ("Project", "Comprehensive project synthesizing course concepts. Apply course knowledge to solve a real-world problem."),
            ]),
            middle_prefixes: strings(&["Working with", "Hands-on", "Exploring"]),
            closing_prefix: "Capstone Project:".to_string(),
        },
    ]
}

fn builtin_rubrics() -> Vec<RubricTemplate> {
    let criteria = |items: &[(&str, &str)]| -> Vec<RubricCriterion> {
        items
            .iter()
            .map(|(c, d)| RubricCriterion {
                criterion: c.to_string(),
                descriptor: d.to_string(),
            })
            .collect()
    };
    vec![
        RubricTemplate {
            question_type: QuestionType::ShortAnswer,
            criteria: criteria(&[
                ("Excellent (9-10 pts)", "Sophisticated analysis with strong justification"),
                ("Good (7-8 pts)", "Solid grasp with reasonable justification"),
                ("Adequate (5-6 pts)", "Basic application with limited depth"),
                ("Poor (0-4 pts)", "Superficial or incorrect application"),
            ]),
        },
        RubricTemplate {
            question_type: QuestionType::CaseStudy,
            criteria: criteria(&[
                ("Analysis (30%)", "Depth of problem analysis and identification of key issues"),
                ("Solution Quality (40%)", "Effectiveness and feasibility of the proposed solution"),
                ("Justification (20%)", "Quality of reasoning and evidence provided"),
                ("Presentation (10%)", "Clarity and organization of the response"),
            ]),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtin_is_valid() {
        KnowledgeBase::builtin().validate().unwrap();
    }

    #[test]
    fn builtin_has_template_for_every_level_question_type() {
        let kb = KnowledgeBase::builtin();
        for &level in BloomLevel::all() {
            assert!(
                kb.question_templates(level.question_type(), level).is_some(),
                "missing templates for {level}"
            );
        }
    }

    #[test]
    fn render_substitutes_known_and_keeps_unknown() {
        let out = render(
            "Students will be able to {verb} {concept} ({other})",
            &[("verb", "apply"), ("concept", "graphs")],
        );
        assert_eq!(out, "Students will be able to apply graphs ({other})");
    }

    #[test]
    fn clean_concept_drops_articles() {
        assert_eq!(clean_concept("  The Design of an Operating System "), "design of operating system");
        assert_eq!(clean_concept("Graph Theory"), "graph theory");
    }

    #[test]
    fn unknown_placeholder_is_a_defect() {
        let mut kb = KnowledgeBase::builtin();
        kb.levels[0].outcome_templates.push("Students will {frobnicate}".to_string());
        let err = kb.validate().unwrap_err();
        assert!(err.is_configuration_defect());
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn inverted_weight_range_is_a_defect() {
        let mut kb = KnowledgeBase::builtin();
        kb.assessment_types[1].weight_range = WeightRange::new(30, 10);
        assert!(matches!(kb.validate(), Err(SyllabusError::KnowledgeBase(_))));
    }

    #[test]
    fn level_without_verbs_is_a_defect() {
        let mut kb = KnowledgeBase::builtin();
        kb.levels.retain(|v| v.level != BloomLevel::Evaluate);
        let err = kb.validate().unwrap_err();
        assert!(err.to_string().contains("Evaluate"));
    }

    #[test]
    fn missing_question_templates_are_exhaustion() {
        let mut kb = KnowledgeBase::builtin();
        kb.question_templates
            .retain(|t| !(t.question_type == QuestionType::ShortAnswer && t.level == BloomLevel::Analyze));
        match kb.validate() {
            Err(SyllabusError::TemplateExhaustion { question_type, level }) => {
                assert_eq!(question_type, "short_answer");
                assert_eq!(level, BloomLevel::Analyze.as_str());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn profile_referencing_unknown_assessment_is_a_defect() {
        let mut kb = KnowledgeBase::builtin();
        kb.course_types[0]
            .base_assessments
            .push("Oral Defense".to_string());
        assert!(kb.validate().is_err());
    }

    #[test]
    fn yaml_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.yaml");
        let kb = KnowledgeBase::builtin();
        kb.save(&path).unwrap();
        let loaded = KnowledgeBase::load(&path).unwrap();
        assert_eq!(loaded, kb);
    }

    #[test]
    fn bloom_verb_lookup_is_case_insensitive() {
        let kb = KnowledgeBase::builtin();
        assert!(kb.is_bloom_verb("Design"));
        assert!(!kb.is_bloom_verb("ponder"));
    }
}
