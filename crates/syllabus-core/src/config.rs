use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ModuleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_min_modules")]
    pub min_modules: usize,
    #[serde(default = "default_max_modules")]
    pub max_modules: usize,
    #[serde(default = "default_max_subtopics")]
    pub max_subtopics: usize,
}

fn default_min_modules() -> usize {
    4
}

fn default_max_modules() -> usize {
    8
}

fn default_max_subtopics() -> usize {
    4
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            min_modules: default_min_modules(),
            max_modules: default_max_modules(),
            max_subtopics: default_max_subtopics(),
        }
    }
}

// ---------------------------------------------------------------------------
// OutcomeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeConfig {
    #[serde(default = "default_min_per_module")]
    pub min_per_module: usize,
    #[serde(default = "default_max_per_module")]
    pub max_per_module: usize,
    #[serde(default = "default_min_course")]
    pub min_course: usize,
    #[serde(default = "default_max_course")]
    pub max_course: usize,
}

fn default_min_per_module() -> usize {
    2
}

fn default_max_per_module() -> usize {
    4
}

fn default_min_course() -> usize {
    3
}

fn default_max_course() -> usize {
    6
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            min_per_module: default_min_per_module(),
            max_per_module: default_max_per_module(),
            min_course: default_min_course(),
            max_course: default_max_course(),
        }
    }
}

// ---------------------------------------------------------------------------
// BalanceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// No single level may exceed this share of outcomes at its scope.
    #[serde(default = "default_level_ceiling")]
    pub level_ceiling_pct: u32,
    /// Remember + Understand may not exceed this share of course-level outcomes.
    #[serde(default = "default_lower_ceiling")]
    pub lower_levels_ceiling_pct: u32,
    #[serde(default = "default_max_repair_iterations")]
    pub max_repair_iterations: u32,
    /// Recommend fewer Remember outcomes above this module-level share.
    #[serde(default = "default_max_remember_pct")]
    pub max_remember_pct: f64,
    /// Recommend more Apply outcomes below this module-level share.
    #[serde(default = "default_min_apply_pct")]
    pub min_apply_pct: f64,
    /// Recommend more Analyze/Evaluate/Create outcomes below this combined share.
    #[serde(default = "default_min_higher_order_pct")]
    pub min_higher_order_pct: f64,
}

fn default_level_ceiling() -> u32 {
    40
}

fn default_lower_ceiling() -> u32 {
    35
}

fn default_max_repair_iterations() -> u32 {
    3
}

fn default_max_remember_pct() -> f64 {
    30.0
}

fn default_min_apply_pct() -> f64 {
    15.0
}

fn default_min_higher_order_pct() -> f64 {
    20.0
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            level_ceiling_pct: default_level_ceiling(),
            lower_levels_ceiling_pct: default_lower_ceiling(),
            max_repair_iterations: default_max_repair_iterations(),
            max_remember_pct: default_max_remember_pct(),
            min_apply_pct: default_min_apply_pct(),
            min_higher_order_pct: default_min_higher_order_pct(),
        }
    }
}

// ---------------------------------------------------------------------------
// AssessmentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Order components chronologically and fill coverage gaps with early
    /// components for lower levels and late ones for higher levels. When
    /// off, components are ordered by weight and gaps take the first match.
    #[serde(default = "default_prefer_timing_order")]
    pub prefer_timing_order: bool,
    /// Instructor advice thresholds, in percent of the grade.
    #[serde(default = "default_max_exam_pct")]
    pub max_exam_pct: u32,
    #[serde(default = "default_min_continuous_advice_pct")]
    pub min_continuous_pct: u32,
    #[serde(default = "default_min_labs_pct")]
    pub min_technical_labs_pct: u32,
    #[serde(default = "default_min_project_pct")]
    pub min_practical_project_pct: u32,
}

fn default_prefer_timing_order() -> bool {
    true
}

fn default_max_exam_pct() -> u32 {
    50
}

fn default_min_continuous_advice_pct() -> u32 {
    30
}

fn default_min_labs_pct() -> u32 {
    25
}

fn default_min_project_pct() -> u32 {
    15
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            prefer_timing_order: default_prefer_timing_order(),
            max_exam_pct: default_max_exam_pct(),
            min_continuous_pct: default_min_continuous_advice_pct(),
            min_technical_labs_pct: default_min_labs_pct(),
            min_practical_project_pct: default_min_project_pct(),
        }
    }
}

// ---------------------------------------------------------------------------
// QuestionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionConfig {
    #[serde(default = "default_min_per_outcome")]
    pub min_per_outcome: usize,
    #[serde(default = "default_max_per_outcome")]
    pub max_per_outcome: usize,
}

fn default_min_per_outcome() -> usize {
    1
}

fn default_max_per_outcome() -> usize {
    3
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            min_per_outcome: default_min_per_outcome(),
            max_per_outcome: default_max_per_outcome(),
        }
    }
}

// ---------------------------------------------------------------------------
// GradingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    #[serde(default = "default_grade_a")]
    pub a: f64,
    #[serde(default = "default_grade_b")]
    pub b: f64,
    #[serde(default = "default_grade_c")]
    pub c: f64,
    #[serde(default = "default_grade_d")]
    pub d: f64,
}

fn default_grade_a() -> f64 {
    90.0
}

fn default_grade_b() -> f64 {
    80.0
}

fn default_grade_c() -> f64 {
    70.0
}

fn default_grade_d() -> f64 {
    60.0
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            a: default_grade_a(),
            b: default_grade_b(),
            c: default_grade_c(),
            d: default_grade_d(),
        }
    }
}

impl GradingConfig {
    pub fn letter(&self, score: f64) -> char {
        if score >= self.a {
            'A'
        } else if score >= self.b {
            'B'
        } else if score >= self.c {
            'C'
        } else if score >= self.d {
            'D'
        } else {
            'F'
        }
    }

    /// Thresholds from best to worst grade, with the lower bound of each band.
    pub fn bands(&self) -> [(char, f64); 5] {
        [('A', self.a), ('B', self.b), ('C', self.c), ('D', self.d), ('F', 0.0)]
    }
}

// ---------------------------------------------------------------------------
// AnalyzerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_coverage_weight")]
    pub coverage_weight: f64,
    #[serde(default = "default_weight_sum_weight")]
    pub weight_sum_weight: f64,
    #[serde(default = "default_balance_weight")]
    pub balance_weight: f64,
    /// A single component above this weight is an issue.
    #[serde(default = "default_component_issue_pct")]
    pub component_issue_pct: u32,
    /// A single component above this weight is a warning.
    #[serde(default = "default_component_warning_pct")]
    pub component_warning_pct: u32,
    #[serde(default = "default_min_continuous_pct")]
    pub min_continuous_pct: u32,
    #[serde(default = "default_max_high_stakes_pct")]
    pub max_high_stakes_pct: u32,
}

fn default_coverage_weight() -> f64 {
    40.0
}

fn default_weight_sum_weight() -> f64 {
    30.0
}

fn default_balance_weight() -> f64 {
    30.0
}

fn default_component_issue_pct() -> u32 {
    40
}

fn default_component_warning_pct() -> u32 {
    35
}

fn default_min_continuous_pct() -> u32 {
    25
}

fn default_max_high_stakes_pct() -> u32 {
    60
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            coverage_weight: default_coverage_weight(),
            weight_sum_weight: default_weight_sum_weight(),
            balance_weight: default_balance_weight(),
            component_issue_pct: default_component_issue_pct(),
            component_warning_pct: default_component_warning_pct(),
            min_continuous_pct: default_min_continuous_pct(),
            max_high_stakes_pct: default_max_high_stakes_pct(),
        }
    }
}

// ---------------------------------------------------------------------------
// AlignmentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default = "default_display_question_limit")]
    pub display_question_limit: usize,
}

fn default_display_question_limit() -> usize {
    3
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            display_question_limit: default_display_question_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// DurationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationConfig {
    /// Contact hours per week when a duration is given in weeks.
    #[serde(default = "default_hours_per_week")]
    pub hours_per_week: u32,
}

fn default_hours_per_week() -> u32 {
    3
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            hours_per_week: default_hours_per_week(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub modules: ModuleConfig,
    #[serde(default)]
    pub outcomes: OutcomeConfig,
    #[serde(default)]
    pub balance: BalanceConfig,
    #[serde(default)]
    pub assessment: AssessmentConfig,
    #[serde(default)]
    pub questions: QuestionConfig,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub duration: DurationConfig,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: PipelineConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Ranges must be non-empty and start above zero
        let ranges = [
            ("modules", self.modules.min_modules, self.modules.max_modules),
            (
                "outcomes per module",
                self.outcomes.min_per_module,
                self.outcomes.max_per_module,
            ),
            (
                "course outcomes",
                self.outcomes.min_course,
                self.outcomes.max_course,
            ),
            (
                "questions per outcome",
                self.questions.min_per_outcome,
                self.questions.max_per_outcome,
            ),
        ];
        for (name, min, max) in ranges {
            if min == 0 {
                push_error(&mut warnings, format!("{name}: minimum must be at least 1"));
            }
            if min > max {
                push_error(&mut warnings, format!("{name}: minimum {min} exceeds maximum {max}"));
            }
        }
        if self.modules.max_subtopics < 2 {
            push_error(&mut warnings, format!(
                "max_subtopics={} leaves no room for two subtopics per module",
                self.modules.max_subtopics
            ));
        }

        // 2. Ceilings are percentages
        for (name, pct) in [
            ("level_ceiling_pct", self.balance.level_ceiling_pct),
            ("lower_levels_ceiling_pct", self.balance.lower_levels_ceiling_pct),
        ] {
            if pct == 0 || pct > 100 {
                push_error(&mut warnings, format!("balance.{name}={pct} must be within 1-100"));
            }
        }

        // 3. Grade thresholds strictly descending
        let g = &self.grading;
        if !(g.a > g.b && g.b > g.c && g.c > g.d && g.d >= 0.0 && g.a <= 100.0) {
            push_error(&mut warnings, format!(
                "grading thresholds must descend within 0-100 (A {} > B {} > C {} > D {})",
                g.a, g.b, g.c, g.d
            ));
        }

        // 4. Analyzer weights should add up to the 100-point scale
        let a = &self.analyzer;
        let weights = [a.coverage_weight, a.weight_sum_weight, a.balance_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            push_error(&mut warnings, "analyzer weights must be finite and non-negative".to_string());
        } else if (weights.iter().sum::<f64>() - 100.0).abs() > 1e-9 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "analyzer weights sum to {} (expected 100); quality scores leave the 0-100 scale",
                    weights.iter().sum::<f64>()
                ),
            });
        }

        // 5. Finding and recommendation thresholds
        if a.component_warning_pct > a.component_issue_pct {
            push_error(&mut warnings, format!(
                "analyzer.component_warning_pct={} exceeds component_issue_pct={}",
                a.component_warning_pct, a.component_issue_pct
            ));
        }
        for (name, pct) in [
            ("analyzer.component_issue_pct", a.component_issue_pct),
            ("analyzer.min_continuous_pct", a.min_continuous_pct),
            ("analyzer.max_high_stakes_pct", a.max_high_stakes_pct),
            ("assessment.max_exam_pct", self.assessment.max_exam_pct),
            ("assessment.min_continuous_pct", self.assessment.min_continuous_pct),
            ("assessment.min_technical_labs_pct", self.assessment.min_technical_labs_pct),
            ("assessment.min_practical_project_pct", self.assessment.min_practical_project_pct),
        ] {
            if pct > 100 {
                push_error(&mut warnings, format!("{name}={pct} must be within 0-100"));
            }
        }
        let b = &self.balance;
        for (name, pct) in [
            ("max_remember_pct", b.max_remember_pct),
            ("min_apply_pct", b.min_apply_pct),
            ("min_higher_order_pct", b.min_higher_order_pct),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                push_error(&mut warnings, format!("balance.{name}={pct} must be within 0-100"));
            }
        }

        // 6. Unusual but legal
        if self.balance.max_repair_iterations == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "balance.max_repair_iterations=0 disables outcome repair".to_string(),
            });
        } else if self.balance.max_repair_iterations > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "balance.max_repair_iterations={} (>10 is unusual)",
                    self.balance.max_repair_iterations
                ),
            });
        }
        if self.duration.hours_per_week == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "duration.hours_per_week must be at least 1".to_string(),
            });
        }

        warnings
    }

    pub fn has_errors(&self) -> bool {
        self.validate().iter().any(|w| w.level == WarnLevel::Error)
    }
}

fn push_error(warnings: &mut Vec<ConfigWarning>, message: String) {
    warnings.push(ConfigWarning {
        level: WarnLevel::Error,
        message,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.modules.min_modules, 4);
        assert_eq!(cfg.modules.max_modules, 8);
        assert_eq!(cfg.balance.level_ceiling_pct, 40);
        assert_eq!(cfg.balance.lower_levels_ceiling_pct, 35);
        assert_eq!(cfg.balance.max_repair_iterations, 3);
        assert_eq!(cfg.alignment.display_question_limit, 3);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "balance:\n  level_ceiling_pct: 50\ngrading:\n  a: 95\n";
        let cfg: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.balance.level_ceiling_pct, 50);
        assert_eq!(cfg.balance.lower_levels_ceiling_pct, 35);
        assert_eq!(cfg.grading.a, 95.0);
        assert_eq!(cfg.grading.b, 80.0);
        assert_eq!(cfg.outcomes.max_per_module, 4);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("syllabus.yaml");
        let mut cfg = PipelineConfig::default();
        cfg.assessment.prefer_timing_order = false;
        cfg.save(&path).unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let mut cfg = PipelineConfig::default();
        cfg.outcomes.min_per_module = 5;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("outcomes per module")));
        assert!(cfg.has_errors());
    }

    #[test]
    fn grade_thresholds_must_descend() {
        let mut cfg = PipelineConfig::default();
        cfg.grading.c = 85.0;
        assert!(cfg.has_errors());
    }

    #[test]
    fn analyzer_weights_off_scale_is_a_warning() {
        let mut cfg = PipelineConfig::default();
        cfg.analyzer.balance_weight = 50.0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(!cfg.has_errors());
    }

    #[test]
    fn finding_thresholds_are_configurable() {
        let yaml = "analyzer:\n  component_issue_pct: 50\nbalance:\n  min_apply_pct: 10\n";
        let cfg: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.analyzer.component_issue_pct, 50);
        assert_eq!(cfg.analyzer.component_warning_pct, 35);
        assert_eq!(cfg.analyzer.max_high_stakes_pct, 60);
        assert_eq!(cfg.balance.min_apply_pct, 10.0);
        assert_eq!(cfg.balance.max_remember_pct, 30.0);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn inverted_finding_thresholds_are_an_error() {
        let mut cfg = PipelineConfig::default();
        cfg.analyzer.component_warning_pct = 45;
        assert!(cfg.has_errors());

        let mut cfg = PipelineConfig::default();
        cfg.balance.min_higher_order_pct = 120.0;
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("min_higher_order_pct")));
    }

    #[test]
    fn letter_grades_follow_thresholds() {
        let g = GradingConfig::default();
        assert_eq!(g.letter(95.0), 'A');
        assert_eq!(g.letter(90.0), 'A');
        assert_eq!(g.letter(89.9), 'B');
        assert_eq!(g.letter(70.0), 'C');
        assert_eq!(g.letter(61.0), 'D');
        assert_eq!(g.letter(12.0), 'F');
    }
}
