use crate::config::QuestionConfig;
use crate::error::{Result, SyllabusError};
use crate::knowledge::{clean_concept, render, KnowledgeBase};
use crate::model::{Module, Outcome, Question};
use crate::types::{BloomLevel, QuestionType};
use rand::seq::SliceRandom;
use rand::Rng;

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Minutes a question of `question_type` at `level` is expected to take.
pub fn estimated_minutes(question_type: QuestionType, level: BloomLevel) -> u32 {
    let multiplier = match level {
        BloomLevel::Remember => 1.0,
        BloomLevel::Understand => 1.2,
        BloomLevel::Apply => 1.5,
        BloomLevel::Analyze => 1.8,
        BloomLevel::Evaluate => 2.0,
        BloomLevel::Create => 2.5,
    };
    (f64::from(question_type.base_minutes()) * multiplier).round() as u32
}

/// Fail fast when any module outcome needs a (type, level) pair the
/// knowledge base has no template for.
pub fn check_templates(kb: &KnowledgeBase, modules: &[Module]) -> Result<()> {
    for outcome in modules.iter().flat_map(|m| m.learning_outcomes.iter()) {
        let question_type = outcome.bloom_level.question_type();
        if kb.question_templates(question_type, outcome.bloom_level).is_none() {
            return Err(SyllabusError::TemplateExhaustion {
                question_type: question_type.as_str().to_string(),
                level: outcome.bloom_level.as_str().to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// QuestionGenerator
// ---------------------------------------------------------------------------

pub struct QuestionGenerator<'a> {
    kb: &'a KnowledgeBase,
    cfg: &'a QuestionConfig,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(kb: &'a KnowledgeBase, cfg: &'a QuestionConfig) -> Self {
        Self { kb, cfg }
    }

    /// Sample questions for every module-level outcome, numbered per module.
    ///
    /// Course-level outcomes have no owning module and get no questions of
    /// their own; the alignment matrix credits them with the questions of
    /// their mapped modules.
    pub fn generate(&self, modules: &[Module], rng: &mut impl Rng) -> Result<Vec<Question>> {
        check_templates(self.kb, modules)?;

        let lo = self.cfg.min_per_outcome.min(self.cfg.max_per_outcome).max(1);
        let hi = self.cfg.min_per_outcome.max(self.cfg.max_per_outcome).max(1);

        let mut questions = Vec::new();
        for module in modules {
            let mut seq = 0usize;
            for outcome in &module.learning_outcomes {
                let count = rng.gen_range(lo..=hi);
                for (i, template) in self.draw_templates(outcome, count, rng)?.into_iter().enumerate() {
                    seq += 1;
                    let id = format!("Q-M{}-{seq:03}", module.id);
                    questions.push(self.build(id, module, outcome, &template, i, rng)?);
                }
            }
        }
        Ok(questions)
    }

    /// `count` templates starting at a random index, without repeats until
    /// the set is used up.
    fn draw_templates(&self, outcome: &Outcome, count: usize, rng: &mut impl Rng) -> Result<Vec<String>> {
        let question_type = outcome.bloom_level.question_type();
        let set = self
            .kb
            .question_templates(question_type, outcome.bloom_level)
            .ok_or_else(|| SyllabusError::TemplateExhaustion {
                question_type: question_type.as_str().to_string(),
                level: outcome.bloom_level.as_str().to_string(),
            })?;
        let start = rng.gen_range(0..set.templates.len());
        Ok((0..count)
            .map(|i| set.templates[(start + i) % set.templates.len()].clone())
            .collect())
    }

    fn build(
        &self,
        id: String,
        module: &Module,
        outcome: &Outcome,
        template: &str,
        index: usize,
        rng: &mut impl Rng,
    ) -> Result<Question> {
        let level = outcome.bloom_level;
        let question_type = level.question_type();
        let slots = Slots::for_module(module, index);
        let question_text = render(template, &slots.pairs());

        let mut question = Question {
            id,
            module_id: module.id,
            outcome_id: outcome.id.clone(),
            question_type,
            bloom_level: level,
            difficulty: level.difficulty(),
            question_text,
            scenario: None,
            options: Vec::new(),
            correct_answer: None,
            rubric: Vec::new(),
            estimated_minutes: estimated_minutes(question_type, level),
        };

        match question_type {
            QuestionType::MultipleChoice => {
                question.options = self
                    .kb
                    .mcq_options
                    .iter()
                    .zip(OPTION_LETTERS)
                    .map(|(option, letter)| format!("{letter}) {}", render(option, &slots.pairs())))
                    .collect();
                let answer = rng.gen_range(0..question.options.len().max(1));
                question.correct_answer = OPTION_LETTERS.get(answer).map(|c| c.to_string());
            }
            QuestionType::ShortAnswer => {
                question.rubric = self.kb.rubric(question_type).to_vec();
            }
            QuestionType::CaseStudy => {
                question.scenario = self
                    .kb
                    .question_templates(question_type, level)
                    .and_then(|set| set.scenarios.choose(rng))
                    .map(|s| render(s, &slots.pairs()));
                question.rubric = self.kb.rubric(question_type).to_vec();
            }
        }
        Ok(question)
    }
}

/// Placeholder values drawn from a module's topic and subtopics.
struct Slots {
    concept: String,
    concept1: String,
    concept2: String,
    problem: String,
    context: String,
    goal: String,
    alternative: String,
}

impl Slots {
    /// Subtopics rotate with `index` so repeated questions on one outcome
    /// do not all mention the same pair. The first subtopic is the module's
    /// own topic, so the rotation starts one past it.
    fn for_module(module: &Module, index: usize) -> Self {
        let concept = clean_concept(&module.topic);
        let subs: Vec<String> = module.subtopics.iter().map(|s| clean_concept(s)).collect();
        let pick = |offset: usize| -> String {
            if subs.is_empty() {
                concept.clone()
            } else {
                subs[(index + offset) % subs.len()].clone()
            }
        };
        let concept1 = pick(1);
        let mut concept2 = pick(2);
        if concept2 == concept1 {
            concept2 = format!("related {concept} approaches");
        }
        Self {
            problem: format!("a real-world {concept} challenge"),
            context: format!("practical {concept1} scenarios"),
            goal: format!("effective {concept1}"),
            alternative: format!("alternative {concept} methods"),
            concept,
            concept1,
            concept2,
        }
    }

    fn pairs(&self) -> [(&str, &str); 7] {
        [
            ("concept", self.concept.as_str()),
            ("concept1", self.concept1.as_str()),
            ("concept2", self.concept2.as_str()),
            ("problem", self.problem.as_str()),
            ("context", self.context.as_str()),
            ("goal", self.goal.as_str()),
            ("alternative", self.alternative.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutcomeScope;
    use crate::types::Difficulty;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn module(id: u32, levels: &[BloomLevel]) -> Module {
        Module {
            id,
            title: format!("Module {id}"),
            topic: "Data Pipelines".to_string(),
            description: String::new(),
            hours: 3,
            subtopics: vec!["data pipelines".to_string(), "stream processing".to_string()],
            learning_outcomes: levels
                .iter()
                .enumerate()
                .map(|(i, level)| Outcome {
                    id: format!("M{id}-LO{}", i + 1),
                    outcome_text: String::new(),
                    bloom_level: *level,
                    mapped_modules: vec![id],
                    scope: OutcomeScope::Module { module_id: id },
                })
                .collect(),
        }
    }

    fn generate(modules: &[Module], seed: u64) -> Vec<Question> {
        let kb = KnowledgeBase::builtin();
        let cfg = QuestionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        QuestionGenerator::new(&kb, &cfg).generate(modules, &mut rng).unwrap()
    }

    #[test]
    fn type_and_difficulty_follow_level() {
        let modules = vec![module(1, BloomLevel::all())];
        for q in generate(&modules, 7) {
            assert_eq!(q.question_type, q.bloom_level.question_type());
            assert_eq!(q.difficulty, q.bloom_level.difficulty());
            assert_eq!(q.module_id, 1);
        }
    }

    #[test]
    fn one_to_three_per_outcome_without_repeats() {
        let modules = vec![module(1, &[BloomLevel::Apply, BloomLevel::Evaluate])];
        let questions = generate(&modules, 11);
        for outcome in &modules[0].learning_outcomes {
            let texts: Vec<&str> = questions
                .iter()
                .filter(|q| q.outcome_id == outcome.id)
                .map(|q| q.question_text.as_str())
                .collect();
            assert!((1..=3).contains(&texts.len()));
            let mut unique = texts.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), texts.len());
        }
    }

    #[test]
    fn ids_are_numbered_per_module() {
        let modules = vec![module(1, &[BloomLevel::Remember]), module(2, &[BloomLevel::Remember])];
        let questions = generate(&modules, 3);
        assert!(questions.iter().any(|q| q.id == "Q-M1-001"));
        assert!(questions.iter().any(|q| q.id == "Q-M2-001"));
        assert!(questions.iter().all(|q| q.id.starts_with(&format!("Q-M{}-", q.module_id))));
    }

    #[test]
    fn type_specific_details() {
        let modules = vec![module(
            1,
            &[BloomLevel::Understand, BloomLevel::Analyze, BloomLevel::Create],
        )];
        for q in generate(&modules, 5) {
            match q.question_type {
                QuestionType::MultipleChoice => {
                    assert_eq!(q.options.len(), 4);
                    assert!(q.options[0].starts_with("A) "));
                    let answer = q.correct_answer.as_deref().unwrap();
                    assert!(["A", "B", "C", "D"].contains(&answer));
                    assert!(q.rubric.is_empty());
                    assert_eq!(q.difficulty, Difficulty::Easy);
                }
                QuestionType::ShortAnswer => {
                    assert!(q.options.is_empty());
                    assert_eq!(q.rubric.len(), 4);
                    assert!(q.scenario.is_none());
                }
                QuestionType::CaseStudy => {
                    assert!(q.scenario.as_deref().unwrap().contains("data pipelines"));
                    assert_eq!(q.rubric.len(), 4);
                }
            }
            assert!(!q.question_text.contains('{'), "unrendered: {}", q.question_text);
        }
    }

    #[test]
    fn estimated_minutes_scale_with_level() {
        assert_eq!(estimated_minutes(QuestionType::MultipleChoice, BloomLevel::Remember), 2);
        assert_eq!(estimated_minutes(QuestionType::MultipleChoice, BloomLevel::Understand), 2);
        assert_eq!(estimated_minutes(QuestionType::ShortAnswer, BloomLevel::Apply), 15);
        assert_eq!(estimated_minutes(QuestionType::ShortAnswer, BloomLevel::Analyze), 18);
        assert_eq!(estimated_minutes(QuestionType::CaseStudy, BloomLevel::Evaluate), 60);
        assert_eq!(estimated_minutes(QuestionType::CaseStudy, BloomLevel::Create), 75);
    }

    #[test]
    fn missing_template_is_a_configuration_defect() {
        let mut kb = KnowledgeBase::builtin();
        kb.question_templates
            .retain(|t| !(t.question_type == QuestionType::CaseStudy && t.level == BloomLevel::Create));
        let cfg = QuestionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = QuestionGenerator::new(&kb, &cfg)
            .generate(&[module(1, &[BloomLevel::Create])], &mut rng)
            .unwrap_err();
        assert!(matches!(err, SyllabusError::TemplateExhaustion { .. }));
        assert!(err.is_configuration_defect());
    }

    #[test]
    fn same_seed_same_questions() {
        let modules = vec![module(1, BloomLevel::all())];
        assert_eq!(generate(&modules, 42), generate(&modules, 42));
    }
}
