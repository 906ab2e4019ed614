//! Content-based event recommendations.
//!
//! Every call builds a fresh TF-IDF vector space over the event descriptions
//! plus the user's preference text, then ranks events by cosine similarity to
//! the preference vector.

use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Event;
use crate::services::stop_words::is_stop_word;

/// Number of recommendations returned when the caller doesn't ask for a count
pub const DEFAULT_TOP_N: usize = 5;

lazy_static! {
    /// Runs of two or more word characters
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\b\w\w+\b").expect("token pattern is valid");
}

/// TF-IDF vectorizer with English stop-word removal
///
/// ```text
/// tfidf(t, d) = tf(t, d) × idf(t)
/// idf(t)      = ln((1 + n) / (1 + df(t))) + 1
/// ```
///
/// Rows are L2-normalised. The vocabulary lives only for the duration of a
/// single [`TfidfVectorizer::fit_transform`] call.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer;

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self
    }

    /// Lowercases `text` and splits it into non-stop-word tokens
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !is_stop_word(token))
            .map(str::to_string)
            .collect()
    }

    /// Terms of `documents` in column order
    pub fn vocabulary<S: AsRef<str>>(&self, documents: &[S]) -> Vec<String> {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| self.tokenize(doc.as_ref()))
            .collect();
        sorted_terms(&tokenized)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Builds a vocabulary from `documents` and returns one weighted row per
    /// document
    ///
    /// When no document contributes a token, every row is empty.
    pub fn fit_transform<S: AsRef<str>>(&self, documents: &[S]) -> Vec<Vec<f64>> {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| self.tokenize(doc.as_ref()))
            .collect();

        let vocabulary: HashMap<&str, usize> = sorted_terms(&tokenized)
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();

        let mut doc_freq = vec![0usize; vocabulary.len()];
        let counts: Vec<HashMap<usize, usize>> = tokenized
            .iter()
            .map(|tokens| {
                let mut tf: HashMap<usize, usize> = HashMap::new();
                for token in tokens {
                    *tf.entry(vocabulary[token.as_str()]).or_insert(0) += 1;
                }
                for column in tf.keys() {
                    doc_freq[*column] += 1;
                }
                tf
            })
            .collect();

        let n_docs = documents.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        counts
            .into_iter()
            .map(|tf| {
                let mut row = vec![0.0; vocabulary.len()];
                for (column, count) in tf {
                    row[column] = count as f64 * idf[column];
                }
                l2_normalize(&mut row);
                row
            })
            .collect()
    }
}

/// Distinct terms, sorted so column order is deterministic across calls
fn sorted_terms(tokenized: &[Vec<String>]) -> BTreeSet<&str> {
    tokenized
        .iter()
        .flat_map(|tokens| tokens.iter().map(String::as_str))
        .collect()
}

fn l2_normalize(row: &mut [f64]) {
    let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        row.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity; a zero vector is orthogonal to everything
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Ranks catalog events against a free-text preference
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    vectorizer: TfidfVectorizer,
}

impl Recommender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Similarity of each event's description to `preferences`, in catalog
    /// order
    pub fn similarity_scores(&self, preferences: &str, events: &[Event]) -> Vec<f64> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut documents: Vec<&str> = events.iter().map(|e| e.description.as_str()).collect();
        documents.push(preferences);

        let matrix = self.vectorizer.fit_transform(&documents);
        let Some((query, descriptions)) = matrix.split_last() else {
            return Vec::new();
        };

        descriptions
            .iter()
            .map(|row| cosine_similarity(query, row))
            .collect()
    }

    /// Returns up to `top_n` events, most similar first
    ///
    /// Ties keep catalog order. Events are returned unchanged.
    pub fn recommend(&self, preferences: &str, events: &[Event], top_n: usize) -> Vec<Event> {
        let scores = self.similarity_scores(preferences, events);

        let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
        // sort_by is stable, so equal scores stay in catalog order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::debug!(
            candidates = events.len(),
            top_n,
            best_score = ranked.first().map(|(_, score)| *score),
            "Ranked events"
        );

        ranked
            .into_iter()
            .take(top_n)
            .map(|(index, _)| events[index].clone())
            .collect()
    }
}
