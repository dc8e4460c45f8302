use crate::alignment::{self, AlignmentMatrix};
use crate::analyzer::analyze;
use crate::assessment::build_blueprint;
use crate::config::PipelineConfig;
use crate::error::{Result, SyllabusError};
use crate::extract::TopicExtractor;
use crate::input::CourseRequest;
use crate::knowledge::KnowledgeBase;
use crate::model::{Metadata, Outcome, Syllabus, SynthesisWarning};
use crate::outcomes::OutcomeGenerator;
use crate::questions::QuestionGenerator;
use crate::stats::bloom_statistics;
use crate::structurer::structure;
use crate::validator::{balance_recommendations, measurability, repair_balance};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runs every synthesis stage in order against one knowledge base and
/// configuration. Holds no per-request state, so one instance can serve
/// any number of requests.
pub struct SyllabusPipeline<'a, E> {
    kb: &'a KnowledgeBase,
    cfg: &'a PipelineConfig,
    extractor: E,
}

impl<'a, E: TopicExtractor> SyllabusPipeline<'a, E> {
    pub fn new(kb: &'a KnowledgeBase, cfg: &'a PipelineConfig, extractor: E) -> Self {
        Self { kb, cfg, extractor }
    }

    pub fn run(&self, request: &CourseRequest, seed: u64) -> Result<Syllabus> {
        self.run_at(request, seed, Utc::now())
    }

    /// Same as [`run`](Self::run) with the generation timestamp supplied by
    /// the caller.
    pub fn run_at(&self, request: &CourseRequest, seed: u64, now: DateTime<Utc>) -> Result<Syllabus> {
        let req = request.validate(&self.cfg.duration)?;
        self.kb.validate()?;

        let candidates = self.extractor.extract(&req.description, &req.scope)?;
        debug!(candidates = candidates.len(), "topics extracted");

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cfg = self.cfg;

        let outline = structure(
            self.kb,
            &cfg.modules,
            candidates,
            req.hours,
            &req.scope,
            &req.description,
            &mut rng,
        )?;
        let course_type = outline.course_type;
        let mut modules = outline.modules;
        info!(
            modules = modules.len(),
            hours = req.hours,
            course_type = %course_type,
            "course structured"
        );

        let generator = OutcomeGenerator::new(self.kb, &cfg.outcomes, &req.title, &req.scope);
        generator.generate_module_outcomes(&mut modules, course_type, &mut rng)?;
        let mut course_outcomes = generator.generate_course_outcomes(&modules, &mut rng)?;

        let mut warnings = Vec::new();
        let repair = repair_balance(&generator, &mut modules, &mut course_outcomes, &cfg.balance, &mut rng)?;
        if !repair.is_balanced() {
            let offending: Vec<String> = repair.remaining.iter().map(|v| v.outcome_id.clone()).collect();
            warn!(
                iterations = repair.iterations,
                offending = offending.len(),
                "outcome balance not reached"
            );
            warnings.push(SynthesisWarning::PartiallyBalanced {
                iterations: repair.iterations,
                offending,
            });
        }

        let measurability = measurability(
            self.kb,
            course_outcomes
                .iter()
                .chain(modules.iter().flat_map(|m| m.learning_outcomes.iter())),
        );

        let blueprint = build_blueprint(
            self.kb,
            &cfg.assessment,
            &cfg.grading,
            course_type,
            &modules,
            &course_outcomes,
            &mut rng,
        )?;
        let questions = QuestionGenerator::new(self.kb, &cfg.questions).generate(&modules, &mut rng)?;
        debug!(
            components = blueprint.components.len(),
            questions = questions.len(),
            "assessments generated"
        );

        let alignment = alignment::build(&modules, &course_outcomes, &blueprint, &questions);
        ensure_consistent(&alignment)?;
        if let Some(warning) = coverage_warning(&alignment) {
            warn!("{}", warning.message());
            warnings.push(warning);
        }

        let analysis = analyze(self.kb, cfg, &blueprint, &modules, &course_outcomes);
        let module_outcomes: Vec<&Outcome> = modules.iter().flat_map(|m| m.learning_outcomes.iter()).collect();
        let bloom_statistics = bloom_statistics(&module_outcomes, &course_outcomes);
        let balance_recommendations = balance_recommendations(&bloom_statistics, &cfg.balance);

        info!(
            outcomes = module_outcomes.len() + course_outcomes.len(),
            score = analysis.quality_score,
            grade = %analysis.grade,
            warnings = warnings.len(),
            "syllabus generated"
        );

        Ok(Syllabus {
            metadata: Metadata {
                course_title: req.title,
                generated_date: now.format(DATE_FORMAT).to_string(),
                duration: req.hours,
                course_type,
            },
            modules,
            course_outcomes,
            bloom_statistics,
            blueprint,
            analysis,
            measurability,
            balance_recommendations,
            questions,
            alignment,
            warnings,
        })
    }
}

/// A `CoverageGap` warning for every uncovered row, or `None` when all
/// outcomes are exercised somewhere.
pub fn coverage_warning(matrix: &AlignmentMatrix) -> Option<SynthesisWarning> {
    if matrix.gaps.is_empty() {
        None
    } else {
        Some(SynthesisWarning::CoverageGap {
            pairs: matrix.gaps.clone(),
        })
    }
}

fn ensure_consistent(matrix: &AlignmentMatrix) -> Result<()> {
    if matrix.is_consistent() {
        return Ok(());
    }
    let details: Vec<String> = matrix.integrity.iter().map(|i| i.to_string()).collect();
    Err(SyllabusError::InconsistentGraph(details.join("; ")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{KeywordExtractor, StaticExtractor};
    use crate::model::{AlignmentRow, CoverageGapEntry, Module, OutcomeScope};
    use crate::types::{BloomLevel, Coverage};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    const DESCRIPTION: &str = "This course covers cloud infrastructure, container orchestration, \
        and continuous delivery. Students build deployment pipelines, monitor distributed systems, \
        and design resilient cloud architecture.";

    fn request(hours: i64) -> CourseRequest {
        CourseRequest::new("Cloud Engineering", DESCRIPTION, "DevOps", hours)
    }

    fn eight_topics() -> StaticExtractor {
        StaticExtractor::from_pairs(&[
            ("cloud infrastructure", 0.95),
            ("container orchestration", 0.9),
            ("continuous delivery", 0.85),
            ("deployment pipelines", 0.8),
            ("distributed systems", 0.75),
            ("cloud architecture", 0.7),
            ("infrastructure as code", 0.65),
            ("observability", 0.6),
        ])
    }

    fn run_with<E: TopicExtractor>(extractor: E, hours: i64, seed: u64) -> Result<Syllabus> {
        let kb = KnowledgeBase::builtin();
        let cfg = PipelineConfig::default();
        SyllabusPipeline::new(&kb, &cfg, extractor).run(&request(hours), seed)
    }

    #[test]
    fn hours_and_weights_hold_across_seeds() {
        for seed in 0..20 {
            for hours in [1, 3, 12, 40] {
                let s = run_with(eight_topics(), hours, seed).unwrap();
                assert_eq!(s.total_hours(), hours as u32, "seed {seed} hours {hours}");
                assert!(s.modules.iter().all(|m| m.hours >= 1));
                assert_eq!(s.blueprint.total_weight(), 100, "seed {seed}");
            }
        }
    }

    #[test]
    fn every_question_matches_an_outcome_of_its_module() {
        for seed in 0..10 {
            let s = run_with(eight_topics(), 24, seed).unwrap();
            for q in &s.questions {
                let module = s.modules.iter().find(|m| m.id == q.module_id).unwrap();
                assert!(module.learning_outcomes.iter().any(|o| o.bloom_level == q.bloom_level));
                assert!(module.learning_outcomes.iter().any(|o| o.id == q.outcome_id));
            }
        }
    }

    #[test]
    fn coverage_is_derived_and_rebuild_is_identical() {
        let s = run_with(eight_topics(), 30, 9).unwrap();
        for row in &s.alignment.rows {
            let assessed = s
                .blueprint
                .components
                .iter()
                .any(|c| c.exercises(row.bloom_level));
            let questioned = !row.question_ids.is_empty();
            assert_eq!(row.coverage == Coverage::Covered, assessed && questioned);
        }
        let rebuilt = alignment::build(&s.modules, &s.course_outcomes, &s.blueprint, &s.questions);
        assert_eq!(
            serde_json::to_string(&rebuilt).unwrap(),
            serde_json::to_string(&s.alignment).unwrap()
        );
    }

    #[test]
    fn every_outcome_has_exactly_one_row() {
        let s = run_with(eight_topics(), 30, 4).unwrap();
        let ids: Vec<&str> = s
            .course_outcomes
            .iter()
            .chain(s.module_outcomes())
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(s.alignment.rows.len(), ids.len());
        let row_ids: BTreeSet<&str> = s.alignment.rows.iter().map(|r| r.outcome_id.as_str()).collect();
        assert_eq!(row_ids.len(), ids.len());
        assert!(s.alignment.is_consistent());
    }

    #[test]
    fn same_seed_same_artifacts() {
        let kb = KnowledgeBase::builtin();
        let cfg = PipelineConfig::default();
        let pipeline = SyllabusPipeline::new(&kb, &cfg, KeywordExtractor::default());
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let a = pipeline.run_at(&request(36), 1234, at).unwrap();
        let b = pipeline.run_at(&request(36), 1234, at).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.metadata.generated_date, "2026-03-01 09:30:00");

        let c = pipeline.run_at(&request(36), 4321, at).unwrap();
        assert_eq!(c.total_hours(), 36);
    }

    #[test]
    fn one_hour_with_eight_topics_collapses() {
        let s = run_with(eight_topics(), 1, 0).unwrap();
        assert_eq!(s.modules.len(), 1);
        assert_eq!(s.modules[0].hours, 1);
    }

    #[test]
    fn zero_or_negative_duration_is_rejected() {
        for hours in [0, -4] {
            let err = run_with(eight_topics(), hours, 0).unwrap_err();
            assert!(matches!(err, SyllabusError::InvalidDuration(_)), "{err:?}");
        }
    }

    #[test]
    fn missing_field_is_named() {
        let kb = KnowledgeBase::builtin();
        let cfg = PipelineConfig::default();
        let req = CourseRequest::new("Cloud Engineering", "", "DevOps", 10);
        let err = SyllabusPipeline::new(&kb, &cfg, eight_topics()).run(&req, 0).unwrap_err();
        match err {
            SyllabusError::MissingField { field } => assert_eq!(field, "description"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn three_topics_pad_to_four_modules() {
        let extractor = StaticExtractor::from_pairs(&[
            ("cloud infrastructure", 0.9),
            ("container orchestration", 0.8),
            ("continuous delivery", 0.7),
        ]);
        let s = run_with(extractor, 20, 2).unwrap();
        assert_eq!(s.modules.len(), 4);
        assert_eq!(s.total_hours(), 20);
        assert!(s.modules.iter().any(|m| m.topic.contains("devops")));
    }

    #[test]
    fn empty_extraction_is_insufficient_input() {
        let err = run_with(StaticExtractor::default(), 10, 0).unwrap_err();
        assert!(matches!(err, SyllabusError::InsufficientInput(_)));
    }

    #[test]
    fn balance_holds_or_is_reported() {
        let cfg = PipelineConfig::default();
        for seed in 0..15 {
            let s = run_with(eight_topics(), 30, seed).unwrap();
            let partial = s
                .warnings
                .iter()
                .any(|w| matches!(w, SynthesisWarning::PartiallyBalanced { .. }));
            if !partial {
                let outcomes: Vec<&Outcome> = s.module_outcomes().collect();
                let n = outcomes.len() as u32;
                let allowance = (cfg.balance.level_ceiling_pct * n / 100).max(1);
                for level in BloomLevel::all() {
                    let count = outcomes.iter().filter(|o| o.bloom_level == *level).count() as u32;
                    assert!(count <= allowance, "seed {seed}: {level} has {count} of {n}");
                }
            }
        }
    }

    #[test]
    fn statistics_percentages_sum_to_one_hundred() {
        let s = run_with(eight_topics(), 30, 6).unwrap();
        let sum: f64 = s.bloom_statistics.module_level.percentages.iter().sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert_eq!(s.measurability.total, s.alignment.rows.len());
        assert_eq!(s.blueprint.grading_scale.len(), 5);
    }

    #[test]
    fn broken_knowledge_base_is_a_configuration_defect() {
        let mut kb = KnowledgeBase::builtin();
        kb.question_templates.clear();
        let cfg = PipelineConfig::default();
        let err = SyllabusPipeline::new(&kb, &cfg, eight_topics())
            .run(&request(10), 0)
            .unwrap_err();
        assert!(err.is_configuration_defect(), "{err:?}");
    }

    #[test]
    fn uncovered_rows_become_a_coverage_gap_warning() {
        let module = Module {
            id: 3,
            title: "Module 3".to_string(),
            topic: "ethics".to_string(),
            description: String::new(),
            hours: 2,
            subtopics: Vec::new(),
            learning_outcomes: vec![Outcome {
                id: "M3-LO1".to_string(),
                outcome_text: String::new(),
                bloom_level: BloomLevel::Create,
                mapped_modules: vec![3],
                scope: OutcomeScope::Module { module_id: 3 },
            }],
        };
        let blueprint = crate::model::Blueprint {
            components: Vec::new(),
            grading_scale: Vec::new(),
            recommendations: Vec::new(),
        };
        let matrix = alignment::build(&[module], &[], &blueprint, &[]);
        let row: &AlignmentRow = &matrix.rows[0];
        assert_eq!(row.coverage, Coverage::Uncovered);

        let warning = coverage_warning(&matrix).unwrap();
        assert_eq!(
            warning,
            SynthesisWarning::CoverageGap {
                pairs: vec![CoverageGapEntry {
                    module_id: Some(3),
                    module: "Module 3".to_string(),
                    outcome_id: "M3-LO1".to_string(),
                }],
            }
        );
        assert!(warning.message().contains("Module 3"));
    }

    #[test]
    fn syllabus_serializes_with_camel_case_keys() {
        let s = run_with(eight_topics(), 12, 1).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert!(json["metadata"]["courseTitle"].is_string());
        assert!(json["metadata"]["generated_date"].is_string());
        assert!(json["courseOutcomes"].is_array());
        assert!(json["alignment"]["rows"][0]["questionIds"].is_array());
        let back: Syllabus = serde_json::from_value(json).unwrap();
        assert_eq!(back.questions.len(), s.questions.len());
        assert_eq!(back.alignment.rows.len(), s.alignment.rows.len());
    }
}
