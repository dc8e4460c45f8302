use crate::config::ModuleConfig;
use crate::error::{Result, SyllabusError};
use crate::knowledge::{render, KnowledgeBase};
use crate::model::{Module, TopicCandidate};
use crate::types::CourseType;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Modules plus the course type detected while building them.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseOutline {
    pub modules: Vec<Module>,
    pub course_type: CourseType,
}

/// Turn ranked topic candidates into a module outline whose hours sum to
/// `total_hours`.
///
/// Candidates are sanitized, ranked by score (ties keep extraction order),
/// truncated to `max_modules` and padded to `min_modules` with scope-derived
/// topics. When there are more topics than hours, the lowest-ranked ones
/// collapse into subtopics so every module keeps at least one hour.
pub fn structure(
    kb: &KnowledgeBase,
    cfg: &ModuleConfig,
    candidates: Vec<TopicCandidate>,
    total_hours: u32,
    scope: &str,
    description: &str,
    rng: &mut impl Rng,
) -> Result<CourseOutline> {
    if total_hours == 0 {
        return Err(SyllabusError::InsufficientInput(
            "course duration must be at least one hour".to_string(),
        ));
    }

    let mut ranked = sanitize(candidates);
    if ranked.is_empty() {
        return Err(SyllabusError::InsufficientInput(
            "no usable topic candidates in the description".to_string(),
        ));
    }
    // Stable: equal scores stay in extraction order.
    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    let max_modules = cfg.max_modules.max(1);
    let mut overflow: Vec<String> = ranked
        .split_off(ranked.len().min(max_modules))
        .into_iter()
        .map(|c| c.phrase)
        .collect();

    if ranked.len() < cfg.min_modules {
        pad_with_generic_topics(kb, &mut ranked, cfg.min_modules, scope);
    }

    let module_count = ranked.len().min(total_hours as usize);
    if module_count < ranked.len() {
        debug!(
            topics = ranked.len(),
            hours = total_hours,
            "collapsing topics into {module_count} module(s)"
        );
        let mut collapsed: Vec<String> =
            ranked.split_off(module_count).into_iter().map(|c| c.phrase).collect();
        collapsed.append(&mut overflow);
        overflow = collapsed;
    }

    let phrases: Vec<String> = ranked.iter().map(|c| c.phrase.clone()).collect();
    let course_type = detect_course_type(kb, &phrases, description);

    let scores: Vec<f64> = ranked.iter().map(|c| c.relevance_score).collect();
    let hours = allocate_hours(&scores, total_hours);
    let subtopics = fold_subtopics(&phrases, overflow, cfg.max_subtopics);

    let count = ranked.len();
    let mut modules = Vec::with_capacity(count);
    for (i, ((topic, hours), subtopics)) in phrases.into_iter().zip(hours).zip(subtopics).enumerate() {
        let title = module_title(kb, course_type, i, count, &topic, rng);
        let description = module_description(&subtopics);
        modules.push(Module {
            id: i as u32 + 1,
            title,
            topic,
            description,
            hours,
            subtopics,
            learning_outcomes: Vec::new(),
        });
    }

    Ok(CourseOutline {
        modules,
        course_type,
    })
}

fn sanitize(candidates: Vec<TopicCandidate>) -> Vec<TopicCandidate> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::with_capacity(candidates.len());
    for c in candidates {
        let phrase = c.phrase.trim();
        if phrase.is_empty() || !c.relevance_score.is_finite() {
            continue;
        }
        let key = phrase.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(TopicCandidate::new(phrase, c.relevance_score.clamp(0.0, 1.0)));
    }
    out
}

fn pad_with_generic_topics(
    kb: &KnowledgeBase,
    ranked: &mut Vec<TopicCandidate>,
    min_modules: usize,
    scope: &str,
) {
    let lowest = ranked
        .iter()
        .map(|c| c.relevance_score)
        .fold(f64::INFINITY, f64::min);
    let score = if lowest.is_finite() { lowest / 2.0 } else { 0.0 };
    let scope = scope.trim().to_lowercase();

    let mut attempt = 0usize;
    while ranked.len() < min_modules && !kb.generic_topics.is_empty() {
        let template = &kb.generic_topics[attempt % kb.generic_topics.len()];
        let round = attempt / kb.generic_topics.len();
        let mut phrase = render(template, &[("scope", scope.as_str())]);
        if round > 0 {
            phrase = format!("{phrase} {}", round + 1);
        }
        attempt += 1;
        if ranked.iter().any(|c| c.phrase.eq_ignore_ascii_case(&phrase)) {
            continue;
        }
        debug!(topic = %phrase, "padding outline with generic topic");
        ranked.push(TopicCandidate::new(phrase, score));
    }
}

/// Count topic phrases and description words that contain each course
/// type's indicator stems. Ties resolve in `CourseType::all()` order.
pub fn detect_course_type(kb: &KnowledgeBase, phrases: &[String], description: &str) -> CourseType {
    let words: Vec<String> = description
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    let lowered: Vec<String> = phrases.iter().map(|p| p.to_lowercase()).collect();

    let mut best = (CourseType::Technical, 0usize);
    for &course_type in CourseType::all() {
        let Some(profile) = kb.profile(course_type) else {
            continue;
        };
        let votes = lowered
            .iter()
            .chain(words.iter())
            .filter(|w| profile.indicators.iter().any(|i| w.contains(i.as_str())))
            .count();
        if votes > best.1 {
            best = (course_type, votes);
        }
    }
    best.0
}

/// Split `total` hours in proportion to `scores`, each module getting at
/// least one hour. Requires `1 <= scores.len() <= total`.
///
/// Shares are rounded half away from zero; the rounding remainder goes to
/// the highest-scored module, spilling to the next-highest ones when that
/// module would otherwise drop below one hour. Equal scores get equal
/// rounded shares; the remainder still lands on the first of them.
pub fn allocate_hours(scores: &[f64], total: u32) -> Vec<u32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let sum: f64 = scores.iter().sum();
    let weights: Vec<f64> = if sum > 0.0 {
        scores.to_vec()
    } else {
        vec![1.0; scores.len()]
    };
    let weight_sum: f64 = weights.iter().sum();

    let mut hours: Vec<u32> = weights
        .iter()
        .map(|w| ((w / weight_sum) * f64::from(total)).round().max(1.0) as u32)
        .collect();

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| weights[*b].total_cmp(&weights[*a]));

    let assigned: u32 = hours.iter().sum();
    if assigned < total {
        hours[order[0]] += total - assigned;
    } else {
        let mut excess = assigned - total;
        for &i in &order {
            if excess == 0 {
                break;
            }
            let take = excess.min(hours[i] - 1);
            hours[i] -= take;
            excess -= take;
        }
    }
    hours
}

/// Each module starts with its own topic; overflow topics are dealt out
/// round-robin until every module is full. Modules left with fewer than two
/// subtopics get a practice subtopic.
fn fold_subtopics(topics: &[String], overflow: Vec<String>, max_subtopics: usize) -> Vec<Vec<String>> {
    let cap = max_subtopics.max(2);
    let mut subtopics: Vec<Vec<String>> = topics.iter().map(|t| vec![t.clone()]).collect();
    let n = subtopics.len();
    if n > 0 {
        let mut slot = 0usize;
        for extra in overflow {
            if subtopics.iter().all(|s| s.len() >= cap) {
                break;
            }
            while subtopics[slot % n].len() >= cap {
                slot += 1;
            }
            subtopics[slot % n].push(extra);
            slot += 1;
        }
    }
    for (topic, list) in topics.iter().zip(subtopics.iter_mut()) {
        if list.len() < 2 {
            list.push(format!("{topic} in practice"));
        }
    }
    subtopics
}

fn module_title(
    kb: &KnowledgeBase,
    course_type: CourseType,
    index: usize,
    count: usize,
    topic: &str,
    rng: &mut impl Rng,
) -> String {
    let profile = kb.profile(course_type);
    let prefix = if index == 0 {
        kb.opening_prefix.clone()
    } else if index + 1 == count {
        profile.map(|p| p.closing_prefix.clone()).unwrap_or_default()
    } else {
        profile
            .and_then(|p| p.middle_prefixes.choose(rng).cloned())
            .unwrap_or_default()
    };
    let mut name = title_case(topic);
    if !prefix.is_empty() && name.to_lowercase().starts_with(&prefix.to_lowercase()) {
        if let Some(rest) = name.get(prefix.len()..) {
            name = rest.trim().to_string();
        }
    }
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix} {name}")
    }
}

fn module_description(subtopics: &[String]) -> String {
    let listed: Vec<&str> = subtopics.iter().take(3).map(String::as_str).collect();
    let focus = subtopics.first().map(String::as_str).unwrap_or_default();
    format!(
        "This module covers {}, providing a comprehensive understanding of {focus}.",
        listed.join(", ")
    )
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
