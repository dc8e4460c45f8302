use crate::error::Result;
use crate::model::TopicCandidate;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// TopicExtractor
// ---------------------------------------------------------------------------

/// Turns free-text course prose into ranked topic phrases.
///
/// Implementations return candidates best-first with scores in `[0, 1]`.
/// An empty list is a valid answer; a hard failure should surface as
/// `SyllabusError::ExtractionFailed`.
pub trait TopicExtractor {
    fn extract(&self, text: &str, scope: &str) -> Result<Vec<TopicCandidate>>;
}

impl<T: TopicExtractor + ?Sized> TopicExtractor for &T {
    fn extract(&self, text: &str, scope: &str) -> Result<Vec<TopicCandidate>> {
        (**self).extract(text, scope)
    }
}

impl<T: TopicExtractor + ?Sized> TopicExtractor for Box<T> {
    fn extract(&self, text: &str, scope: &str) -> Result<Vec<TopicCandidate>> {
        (**self).extract(text, scope)
    }
}

// ---------------------------------------------------------------------------
// StaticExtractor
// ---------------------------------------------------------------------------

/// Hands back a fixed candidate list regardless of the text.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    candidates: Vec<TopicCandidate>,
}

impl StaticExtractor {
    pub fn new(candidates: Vec<TopicCandidate>) -> Self {
        Self { candidates }
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(p, s)| TopicCandidate::new(*p, *s))
                .collect(),
        )
    }
}

impl TopicExtractor for StaticExtractor {
    fn extract(&self, _text: &str, _scope: &str) -> Result<Vec<TopicCandidate>> {
        Ok(self.candidates.clone())
    }
}

// ---------------------------------------------------------------------------
// KeywordExtractor
// ---------------------------------------------------------------------------

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "basic", "be",
    "been", "both", "but", "by", "can", "course", "cover", "covers", "each", "for", "from",
    "fundamental", "has", "have", "how", "in", "include", "including", "into", "introduction",
    "is", "it", "its", "learn", "learning", "more", "most", "of", "on", "or", "other", "over",
    "provide", "provides", "student", "students", "such", "than", "that", "the", "their",
    "them", "then", "these", "they", "this", "through", "to", "topics", "understand", "use",
    "using", "various", "well", "what", "when", "which", "while", "who", "will", "with",
    "within", "you", "your",
];

static WORD_RE: OnceLock<Regex> = OnceLock::new();

fn word_re() -> &'static Regex {
    WORD_RE.get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z0-9+#\-]*").unwrap())
}

/// Frequency-based phrase extractor: unigrams and adjacent bigrams that
/// survive stop-word filtering, scored by occurrence with bigrams boosted,
/// normalized so the best phrase scores 1.0.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    pub max_candidates: usize,
    pub bigram_boost: f64,
    pub min_word_len: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            max_candidates: 15,
            bigram_boost: 1.5,
            min_word_len: 3,
        }
    }
}

impl KeywordExtractor {
    fn is_content_word(&self, w: &str) -> bool {
        w.len() >= self.min_word_len && !STOP_WORDS.contains(&w)
    }
}

impl TopicExtractor for KeywordExtractor {
    fn extract(&self, text: &str, _scope: &str) -> Result<Vec<TopicCandidate>> {
        // phrase -> (score, first position)
        let mut tally: HashMap<String, (f64, usize)> = HashMap::new();
        let mut position = 0usize;

        // Bigrams never span sentence or clause punctuation.
        for clause in text.split(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '\n' | '(' | ')')) {
            let words: Vec<String> = word_re()
                .find_iter(clause)
                .map(|m| m.as_str().to_lowercase())
                .collect();
            for (i, w) in words.iter().enumerate() {
                if self.is_content_word(w) {
                    let entry = tally.entry(w.clone()).or_insert((0.0, position));
                    entry.0 += 1.0;
                }
                if let Some(next) = words.get(i + 1) {
                    if self.is_content_word(w) && self.is_content_word(next) {
                        let phrase = format!("{w} {next}");
                        let entry = tally.entry(phrase).or_insert((0.0, position));
                        entry.0 += self.bigram_boost;
                    }
                }
                position += 1;
            }
        }

        let mut ranked: Vec<(String, f64, usize)> = tally
            .into_iter()
            .map(|(p, (s, pos))| (p, s, pos))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));

        // A unigram already inside a higher-ranked bigram adds nothing.
        let mut picked: Vec<(String, f64)> = Vec::new();
        for (phrase, score, _) in ranked {
            if picked.len() >= self.max_candidates {
                break;
            }
            let redundant = !phrase.contains(' ')
                && picked
                    .iter()
                    .any(|(p, _)| p.split(' ').any(|part| part == phrase));
            if !redundant {
                picked.push((phrase, score));
            }
        }

        let best = picked.first().map(|(_, s)| *s).unwrap_or(1.0);
        Ok(picked
            .into_iter()
            .map(|(p, s)| TopicCandidate::new(p, (s / best).clamp(0.0, 1.0)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
