use crate::config::{AssessmentConfig, GradingConfig};
use crate::error::{Result, SyllabusError};
use crate::knowledge::{AssessmentType, CourseTypeProfile, KnowledgeBase, WeightRange};
use crate::model::{AssessmentComponent, Blueprint, GradeBand, Module, Outcome};
use crate::stats::largest_remainder;
use crate::types::{BloomLevel, CourseType};
use rand::Rng;
use std::collections::BTreeSet;
use tracing::debug;

const LABS: &str = "Labs/Assignments";
const PROJECT: &str = "Project";

/// Build the weighted assessment blueprint for the finished outcome set.
///
/// The union of the selected components' levels covers every level any
/// outcome uses, and the weights sum to exactly 100.
pub fn build_blueprint(
    kb: &KnowledgeBase,
    cfg: &AssessmentConfig,
    grading: &GradingConfig,
    course_type: CourseType,
    modules: &[Module],
    course_outcomes: &[Outcome],
    rng: &mut impl Rng,
) -> Result<Blueprint> {
    let profile = kb.profile(course_type).ok_or_else(|| {
        SyllabusError::KnowledgeBase(format!("no profile for course type {course_type}"))
    })?;

    let outcomes: Vec<&Outcome> = course_outcomes
        .iter()
        .chain(modules.iter().flat_map(|m| m.learning_outcomes.iter()))
        .collect();
    let required: BTreeSet<BloomLevel> = outcomes.iter().map(|o| o.bloom_level).collect();

    let selected = select_types(kb, profile, modules.len(), &required, cfg.prefer_timing_order)?;
    let ranges: Vec<WeightRange> = selected.iter().map(|t| weight_range(profile, t)).collect();
    let weights = allocate_weights(&ranges, rng);

    let mut components: Vec<AssessmentComponent> = selected
        .iter()
        .zip(weights)
        .map(|(t, weight)| AssessmentComponent {
            component_type: t.name.clone(),
            weight_percent: weight,
            description: profile
                .description_overrides
                .get(&t.name)
                .cloned()
                .unwrap_or_else(|| t.description.clone()),
            timing: t.timing.describe(modules.len()),
            stage: t.timing,
            format: t.format.clone(),
            bloom_levels: t.bloom_levels.clone(),
            linked_outcomes: outcomes
                .iter()
                .filter(|o| t.bloom_levels.contains(&o.bloom_level))
                .map(|o| o.id.clone())
                .collect(),
        })
        .collect();

    if cfg.prefer_timing_order {
        components.sort_by(|a, b| a.stage.cmp(&b.stage));
    } else {
        components.sort_by(|a, b| b.weight_percent.cmp(&a.weight_percent));
    }

    let advice = recommendations(kb, cfg, course_type, &components);
    Ok(Blueprint {
        components,
        grading_scale: grading_scale(grading),
        recommendations: advice,
    })
}

/// Profile base types, conditional types the module count unlocks, then
/// whatever catalog types are needed to cover the remaining levels.
pub fn select_types<'a>(
    kb: &'a KnowledgeBase,
    profile: &CourseTypeProfile,
    module_count: usize,
    required: &BTreeSet<BloomLevel>,
    prefer_timing_order: bool,
) -> Result<Vec<&'a AssessmentType>> {
    let mut selected: Vec<&AssessmentType> = Vec::new();
    let conditional = profile
        .conditional_assessments
        .iter()
        .filter(|c| module_count >= c.min_modules)
        .map(|c| &c.name);
    for name in profile.base_assessments.iter().chain(conditional) {
        let t = kb.assessment_type(name).ok_or_else(|| {
            SyllabusError::KnowledgeBase(format!("unknown assessment type '{name}'"))
        })?;
        if !selected.iter().any(|s| s.name == t.name) {
            selected.push(t);
        }
    }

    for &level in required {
        if selected.iter().any(|t| t.bloom_levels.contains(&level)) {
            continue;
        }
        let mut candidates = kb
            .assessment_types
            .iter()
            .filter(|t| t.bloom_levels.contains(&level));
        // Early components for foundational levels, late ones for the rest.
        let pick = if !prefer_timing_order {
            candidates.next()
        } else if level.is_lower_order() {
            candidates.min_by_key(|t| t.timing)
        } else {
            candidates.rev().max_by_key(|t| t.timing)
        };
        let Some(t) = pick else {
            return Err(SyllabusError::KnowledgeBase(format!(
                "no assessment type exercises level {level}"
            )));
        };
        debug!(level = %level, component = %t.name, "adding assessment for uncovered level");
        selected.push(t);
    }
    Ok(selected)
}

fn weight_range(profile: &CourseTypeProfile, t: &AssessmentType) -> WeightRange {
    profile
        .weight_overrides
        .get(&t.name)
        .copied()
        .unwrap_or(t.weight_range)
}

/// Draw a weight inside each range (lower bound at least 1) and rescale to
/// exactly 100 with every component keeping at least one point.
pub fn allocate_weights(ranges: &[WeightRange], rng: &mut impl Rng) -> Vec<u32> {
    if ranges.is_empty() {
        return Vec::new();
    }
    let drawn: Vec<u64> = ranges
        .iter()
        .map(|r| {
            let lo = r.min.max(1);
            let hi = r.max.max(lo);
            u64::from(rng.gen_range(lo..=hi))
        })
        .collect();
    let mut weights: Vec<u32> = largest_remainder(&drawn, 100)
        .into_iter()
        .map(|w| w as u32)
        .collect();

    // Largest-remainder can round a tiny share down to zero.
    while let Some(zero) = weights.iter().position(|w| *w == 0) {
        let Some(donor) = (0..weights.len()).filter(|i| weights[*i] > 1).max_by_key(|i| weights[*i]) else {
            break;
        };
        weights[donor] -= 1;
        weights[zero] += 1;
    }
    weights
}

fn weight_of(components: &[AssessmentComponent], pred: impl Fn(&AssessmentComponent) -> bool) -> u32 {
    components.iter().filter(|c| pred(c)).map(|c| c.weight_percent).sum()
}

fn recommendations(
    kb: &KnowledgeBase,
    cfg: &AssessmentConfig,
    course_type: CourseType,
    components: &[AssessmentComponent],
) -> Vec<String> {
    let flagged = |c: &AssessmentComponent, flag: fn(&AssessmentType) -> bool| {
        kb.assessment_type(&c.component_type).map(flag).unwrap_or(false)
    };

    let mut out = Vec::new();
    if weight_of(components, |c| flagged(c, |t| t.high_stakes)) > cfg.max_exam_pct {
        out.push("Consider reducing exam weight to allow more formative assessment opportunities.".to_string());
    }
    if weight_of(components, |c| flagged(c, |t| t.continuous)) < cfg.min_continuous_pct {
        out.push("Consider adding more continuous assessment to track student progress.".to_string());
    }
    match course_type {
        CourseType::Technical if weight_of(components, |c| c.component_type == LABS) < cfg.min_technical_labs_pct => {
            out.push("For technical courses, consider increasing hands-on lab/assignment weight.".to_string());
        }
        CourseType::Practical if weight_of(components, |c| c.component_type == PROJECT) < cfg.min_practical_project_pct => {
            out.push("For practical courses, consider adding a capstone project component.".to_string());
        }
        _ => {}
    }
    if out.is_empty() {
        out.push("Assessment blueprint is well-balanced for this course type.".to_string());
    }
    out
}

/// Letter bands from the configured thresholds, best grade first.
pub fn grading_scale(grading: &GradingConfig) -> Vec<GradeBand> {
    let bands = grading.bands();
    let mut out = Vec::with_capacity(bands.len());
    let mut upper: Option<f64> = None;
    for (i, (letter, lower)) in bands.iter().enumerate() {
        let range = if i + 1 == bands.len() {
            format!("Below {}%", trim_number(grading.d))
        } else {
            match upper {
                None => format!("{}-100%", trim_number(*lower)),
                Some(hi) if hi.fract() == 0.0 && lower.fract() == 0.0 => {
                    format!("{}-{}%", trim_number(*lower), trim_number(hi - 1.0))
                }
                Some(hi) => format!("{}% to under {}%", trim_number(*lower), trim_number(hi)),
            }
        };
        out.push(GradeBand {
            grade: letter.to_string(),
            range,
        });
        upper = Some(*lower);
    }
    out
}

fn trim_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
