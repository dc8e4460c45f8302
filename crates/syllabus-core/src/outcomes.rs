use crate::config::OutcomeConfig;
use crate::error::{Result, SyllabusError};
use crate::knowledge::{clean_concept, render, CourseTypeProfile, KnowledgeBase};
use crate::model::{Module, Outcome, OutcomeScope};
use crate::stats::largest_remainder;
use crate::types::{BloomLevel, CourseType};
use rand::seq::SliceRandom;
use rand::Rng;

// ---------------------------------------------------------------------------
// OutcomeGenerator
// ---------------------------------------------------------------------------

/// Writes outcome statements from the knowledge-base vocabulary.
///
/// Every random choice (counts, templates, verbs) goes through the caller's
/// RNG, so a fixed seed reproduces the same outcome set.
pub struct OutcomeGenerator<'a> {
    kb: &'a KnowledgeBase,
    cfg: &'a OutcomeConfig,
    course_concept: String,
    course_context: String,
}

impl<'a> OutcomeGenerator<'a> {
    pub fn new(kb: &'a KnowledgeBase, cfg: &'a OutcomeConfig, course_title: &str, scope: &str) -> Self {
        Self {
            kb,
            cfg,
            course_concept: clean_concept(course_title),
            course_context: clean_concept(scope),
        }
    }

    /// Fill `learning_outcomes` for every module.
    ///
    /// Counts are drawn per module; the levels come from the course-type
    /// plan and are handed out in ascending order across the modules, so
    /// early modules carry the foundational outcomes.
    pub fn generate_module_outcomes(
        &self,
        modules: &mut [Module],
        course_type: CourseType,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let profile = self.kb.profile(course_type).ok_or_else(|| {
            SyllabusError::KnowledgeBase(format!("no profile for course type {course_type}"))
        })?;

        let (lo, hi) = ordered(self.cfg.min_per_module, self.cfg.max_per_module);
        let counts: Vec<usize> = modules.iter().map(|_| rng.gen_range(lo..=hi)).collect();
        let total: usize = counts.iter().sum();
        let plan = plan_module_levels(profile, total, modules.len());

        let mut levels = plan.into_iter();
        for (module, count) in modules.iter_mut().zip(counts) {
            let mut outcomes = Vec::with_capacity(count);
            for n in 1..=count {
                let level = levels.next().unwrap_or(BloomLevel::Apply);
                let text = self.module_text(module, level, rng)?;
                outcomes.push(Outcome {
                    id: format!("M{}-LO{n}", module.id),
                    outcome_text: text,
                    bloom_level: level,
                    mapped_modules: vec![module.id],
                    scope: OutcomeScope::Module {
                        module_id: module.id,
                    },
                });
            }
            module.learning_outcomes = outcomes;
        }
        Ok(())
    }

    /// Course-level outcomes spread evenly from Remember to Create, mapped
    /// to the modules that contribute to them.
    pub fn generate_course_outcomes(&self, modules: &[Module], rng: &mut impl Rng) -> Result<Vec<Outcome>> {
        let (lo, hi) = ordered(self.cfg.min_course, self.cfg.max_course);
        let count = rng.gen_range(lo..=hi);
        let mut outcomes = Vec::with_capacity(count);
        for (i, level) in spread_levels(count).into_iter().enumerate() {
            outcomes.push(Outcome {
                id: format!("CLO-{}", i + 1),
                outcome_text: self.course_text(level, rng)?,
                bloom_level: level,
                mapped_modules: contributing_modules(level, modules),
                scope: OutcomeScope::Course,
            });
        }
        Ok(outcomes)
    }

    /// A fresh outcome at `level` that takes over `previous`'s id and scope.
    /// The rejected outcome is discarded by the caller.
    pub fn regenerate(
        &self,
        previous: &Outcome,
        level: BloomLevel,
        modules: &[Module],
        rng: &mut impl Rng,
    ) -> Result<Outcome> {
        let (text, mapped) = match previous.module_id() {
            Some(id) => {
                let text = match modules.iter().find(|m| m.id == id) {
                    Some(module) => self.module_text(module, level, rng)?,
                    None => self.course_text(level, rng)?,
                };
                (text, vec![id])
            }
            None => (self.course_text(level, rng)?, contributing_modules(level, modules)),
        };
        Ok(Outcome {
            id: previous.id.clone(),
            outcome_text: text,
            bloom_level: level,
            mapped_modules: mapped,
            scope: previous.scope,
        })
    }

    fn module_text(&self, module: &Module, level: BloomLevel, rng: &mut impl Rng) -> Result<String> {
        let concept = clean_concept(&module.topic);
        let context = module
            .subtopics
            .get(1)
            .or_else(|| module.subtopics.first())
            .map(|s| clean_concept(s))
            .unwrap_or_else(|| concept.clone());
        self.compose(level, &concept, &context, rng)
    }

    fn course_text(&self, level: BloomLevel, rng: &mut impl Rng) -> Result<String> {
        self.compose(level, &self.course_concept, &self.course_context, rng)
    }

    fn compose(&self, level: BloomLevel, concept: &str, context: &str, rng: &mut impl Rng) -> Result<String> {
        let vocab = self.kb.vocabulary(level).ok_or_else(|| {
            SyllabusError::KnowledgeBase(format!("no vocabulary for level {level}"))
        })?;
        let template = vocab.outcome_templates.choose(rng).ok_or_else(|| {
            SyllabusError::KnowledgeBase(format!("level {level} has no outcome templates"))
        })?;
        let verb = vocab
            .verbs
            .choose(rng)
            .ok_or_else(|| SyllabusError::KnowledgeBase(format!("level {level} has no verbs")))?;
        Ok(render(
            template,
            &[("verb", verb.as_str()), ("concept", concept), ("context", context)],
        ))
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    (a.min(b).max(1), a.max(b).max(1))
}

// ---------------------------------------------------------------------------
// Level planning
// ---------------------------------------------------------------------------

/// Levels for `total` module-level outcomes, ascending.
///
/// Counts follow the profile's level weights by largest remainder. With six
/// or more outcomes every level appears at least once; with four or more
/// modules Remember and Create both appear. Missing levels borrow from the
/// most populated one.
pub fn plan_module_levels(profile: &CourseTypeProfile, total: usize, module_count: usize) -> Vec<BloomLevel> {
    let weights: Vec<u64> = BloomLevel::all()
        .iter()
        .map(|l| (profile.level_weight(*l).max(0.0) * 1_000_000.0).round() as u64)
        .collect();
    let mut counts: Vec<u64> = if weights.iter().sum::<u64>() == 0 {
        largest_remainder(&[1; BloomLevel::COUNT], total as u64)
    } else {
        largest_remainder(&weights, total as u64)
    };

    let mut required: Vec<BloomLevel> = Vec::new();
    if total >= BloomLevel::COUNT {
        required.extend(BloomLevel::all().iter().copied());
    } else if module_count >= 4 && total >= 2 {
        required.extend([BloomLevel::Remember, BloomLevel::Create]);
    }
    for level in required {
        if counts[level.index()] > 0 {
            continue;
        }
        let donor = (0..BloomLevel::COUNT)
            .filter(|i| counts[*i] > 1 || (counts[*i] == 1 && !required_contains(total, module_count, *i)))
            .max_by(|a, b| counts[*a].cmp(&counts[*b]).then(b.cmp(a)));
        if let Some(donor) = donor {
            counts[donor] -= 1;
            counts[level.index()] += 1;
        }
    }

    BloomLevel::all()
        .iter()
        .zip(counts)
        .flat_map(|(level, n)| std::iter::repeat(*level).take(n as usize))
        .collect()
}

fn required_contains(total: usize, module_count: usize, index: usize) -> bool {
    total >= BloomLevel::COUNT
        || (module_count >= 4
            && total >= 2
            && (index == BloomLevel::Remember.index() || index == BloomLevel::Create.index()))
}

/// `count` levels spread evenly from Remember to Create.
pub fn spread_levels(count: usize) -> Vec<BloomLevel> {
    let last = BloomLevel::COUNT - 1;
    (0..count)
        .map(|i| {
            let index = if count <= 1 {
                0
            } else {
                ((i * last) as f64 / (count - 1) as f64).round() as usize
            };
            BloomLevel::from_index(index.min(last)).unwrap_or(BloomLevel::Create)
        })
        .collect()
}

/// Modules owning an outcome at `level` or one step away, ascending.
pub fn contributing_modules(level: BloomLevel, modules: &[Module]) -> Vec<u32> {
    let mut ids: Vec<u32> = modules
        .iter()
        .filter(|m| m.learning_outcomes.iter().any(|o| o.bloom_level.is_adjacent_or_equal(level)))
        .map(|m| m.id)
        .collect();
    ids.sort_unstable();
    ids
}

/// Recompute every course outcome's mapping against the current modules.
pub fn remap_course_outcomes(course_outcomes: &mut [Outcome], modules: &[Module]) {
    for o in course_outcomes.iter_mut() {
        o.mapped_modules = contributing_modules(o.bloom_level, modules);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn module(id: u32, topic: &str) -> Module {
        Module {
            id,
            title: format!("Module {id}"),
            topic: topic.to_string(),
            description: String::new(),
            hours: 3,
            subtopics: vec![topic.to_string(), format!("{topic} in practice")],
            learning_outcomes: Vec::new(),
        }
    }

    fn modules(n: u32) -> Vec<Module> {
        (1..=n).map(|i| module(i, &format!("Topic {i}"))).collect()
    }

    #[test]
    fn plan_covers_every_level_with_six_or_more() {
        let kb = KnowledgeBase::builtin();
        for &ct in CourseType::all() {
            let profile = kb.profile(ct).unwrap();
            for total in 6..=32 {
                let plan = plan_module_levels(profile, total, 4);
                assert_eq!(plan.len(), total);
                for &level in BloomLevel::all() {
                    assert!(plan.contains(&level), "{ct} total={total} missing {level}");
                }
                assert!(plan.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn plan_is_skewed_to_the_middle() {
        let kb = KnowledgeBase::builtin();
        let plan = plan_module_levels(kb.profile(CourseType::Technical).unwrap(), 20, 6);
        let count = |l: BloomLevel| plan.iter().filter(|x| **x == l).count();
        assert!(count(BloomLevel::Apply) >= count(BloomLevel::Remember));
        assert!(count(BloomLevel::Analyze) >= count(BloomLevel::Create));
    }

    #[test]
    fn plan_small_totals_keep_the_extremes() {
        let kb = KnowledgeBase::builtin();
        let plan = plan_module_levels(kb.profile(CourseType::Practical).unwrap(), 4, 4);
        assert!(plan.contains(&BloomLevel::Remember));
        assert!(plan.contains(&BloomLevel::Create));
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn module_outcomes_have_ids_counts_and_stems() {
        let kb = KnowledgeBase::builtin();
        let cfg = OutcomeConfig::default();
        let gen = OutcomeGenerator::new(&kb, &cfg, "Data Structures", "undergraduate computing");
        let mut mods = modules(5);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        gen.generate_module_outcomes(&mut mods, CourseType::Technical, &mut rng).unwrap();
        for m in &mods {
            assert!((2..=4).contains(&m.learning_outcomes.len()));
            for (i, o) in m.learning_outcomes.iter().enumerate() {
                assert_eq!(o.id, format!("M{}-LO{}", m.id, i + 1));
                assert_eq!(o.module_id(), Some(m.id));
                assert_eq!(o.mapped_modules, vec![m.id]);
                assert!(o.outcome_text.starts_with("Students will be able to "));
                assert!(!o.outcome_text.contains('{'));
            }
        }
        let all: Vec<BloomLevel> = mods
            .iter()
            .flat_map(|m| m.learning_outcomes.iter().map(|o| o.bloom_level))
            .collect();
        assert!(all.contains(&BloomLevel::Remember));
        assert!(all.contains(&BloomLevel::Create));
    }

    #[test]
    fn same_seed_same_outcomes() {
        let kb = KnowledgeBase::builtin();
        let cfg = OutcomeConfig::default();
        let gen = OutcomeGenerator::new(&kb, &cfg, "Networks", "graduate");
        let run = |seed| {
            let mut mods = modules(4);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            gen.generate_module_outcomes(&mut mods, CourseType::Technical, &mut rng).unwrap();
            let course = gen.generate_course_outcomes(&mods, &mut rng).unwrap();
            (mods, course)
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn course_outcomes_span_the_range() {
        assert_eq!(
            spread_levels(3),
            vec![BloomLevel::Remember, BloomLevel::Analyze, BloomLevel::Create]
        );
        assert_eq!(spread_levels(6), BloomLevel::all().to_vec());
        assert_eq!(spread_levels(1), vec![BloomLevel::Remember]);

        let kb = KnowledgeBase::builtin();
        let cfg = OutcomeConfig::default();
        let gen = OutcomeGenerator::new(&kb, &cfg, "Networks", "graduate");
        let mut mods = modules(4);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        gen.generate_module_outcomes(&mut mods, CourseType::Technical, &mut rng).unwrap();
        let course = gen.generate_course_outcomes(&mods, &mut rng).unwrap();
        assert!((3..=6).contains(&course.len()));
        assert_eq!(course[0].id, "CLO-1");
        assert!(course.iter().all(|o| o.is_course_level()));
    }

    #[test]
    fn mapping_uses_same_or_adjacent_levels() {
        let mut mods = modules(3);
        let outcome = |m: u32, level| Outcome {
            id: format!("M{m}-LO1"),
            outcome_text: String::new(),
            bloom_level: level,
            mapped_modules: vec![m],
            scope: OutcomeScope::Module { module_id: m },
        };
        mods[0].learning_outcomes = vec![outcome(1, BloomLevel::Remember)];
        mods[1].learning_outcomes = vec![outcome(2, BloomLevel::Apply)];
        mods[2].learning_outcomes = vec![outcome(3, BloomLevel::Create)];
        assert_eq!(contributing_modules(BloomLevel::Understand, &mods), vec![1, 2]);
        assert_eq!(contributing_modules(BloomLevel::Evaluate, &mods), vec![3]);
        assert!(contributing_modules(BloomLevel::Analyze, &[]).is_empty());
    }

    #[test]
    fn regenerate_keeps_id_and_scope() {
        let kb = KnowledgeBase::builtin();
        let cfg = OutcomeConfig::default();
        let gen = OutcomeGenerator::new(&kb, &cfg, "Networks", "graduate");
        let mut mods = modules(4);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        gen.generate_module_outcomes(&mut mods, CourseType::Technical, &mut rng).unwrap();
        let old = mods[1].learning_outcomes[0].clone();
        let fresh = gen.regenerate(&old, BloomLevel::Evaluate, &mods, &mut rng).unwrap();
        assert_eq!(fresh.id, old.id);
        assert_eq!(fresh.scope, old.scope);
        assert_eq!(fresh.bloom_level, BloomLevel::Evaluate);
        let verbs = kb.verbs(BloomLevel::Evaluate);
        assert!(verbs.iter().any(|v| fresh.outcome_text.contains(v.as_str())));
    }
}
