//! Topic clustering of item titles.
//!
//! Titles are vectorised with TF-IDF over the 50 most frequent non-stop-word
//! terms, then partitioned with k-means (`k = min(5, n)`). Seeding is
//! farthest-point from the first title, so the result is deterministic for a
//! given input order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use channelscope_shared::ItemRecord;

use crate::content::{ClusterOutcome, TopicCluster};

/// Below this many items clustering is skipped.
const MIN_ITEMS: usize = 3;

/// Upper bound on the number of clusters.
const MAX_CLUSTERS: usize = 5;

/// Vocabulary size kept after stop-word removal.
const MAX_FEATURES: usize = 50;

/// Lloyd iterations before giving up on convergence.
const MAX_ITERATIONS: usize = 100;

/// Titles reported per cluster.
const SAMPLE_TITLES: usize = 3;

/// Common English function words, ignored when building the vocabulary.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "almost", "alone", "along", "already",
    "also", "although", "always", "am", "among", "an", "and", "another", "any", "anyhow",
    "anyone", "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be",
    "became", "because", "become", "becomes", "been", "before", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "both", "but", "by", "can", "cannot", "could",
    "did", "do", "does", "done", "down", "due", "during", "each", "either", "else", "enough",
    "even", "ever", "every", "everyone", "everything", "except", "few", "first", "for", "from",
    "further", "get", "give", "go", "had", "has", "have", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "however", "if", "in", "into", "is", "it", "its", "itself",
    "just", "keep", "last", "least", "less", "made", "many", "may", "me", "might", "mine",
    "more", "most", "mostly", "much", "must", "my", "myself", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "nor", "not", "nothing", "now", "of", "off",
    "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise", "our",
    "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please", "put", "rather",
    "re", "same", "see", "seem", "seemed", "seems", "several", "she", "should", "since", "so",
    "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere", "still",
    "such", "take", "than", "that", "the", "their", "them", "themselves", "then", "there",
    "therefore", "these", "they", "this", "those", "though", "through", "throughout", "thus",
    "to", "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very",
    "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
    "where", "whether", "which", "while", "who", "whole", "whom", "whose", "why", "will",
    "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

/// Group item titles into at most five topics.
///
/// Clusters that end up empty are not reported. Keys are `topic_<label>`.
pub fn cluster_topics(items: &[ItemRecord]) -> (BTreeMap<String, TopicCluster>, ClusterOutcome) {
    if items.len() < MIN_ITEMS {
        return (BTreeMap::new(), ClusterOutcome::TooFewItems);
    }
    if items.iter().all(|i| i.title.trim().is_empty()) {
        return (BTreeMap::new(), ClusterOutcome::NoTitles);
    }

    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    let vectors = match tfidf(&titles) {
        Ok(v) => v,
        Err(reason) => {
            tracing::warn!(%reason, "topic clustering failed");
            return (BTreeMap::new(), ClusterOutcome::Failed { reason });
        }
    };

    let k = MAX_CLUSTERS.min(items.len());
    let labels = kmeans(&vectors, k);

    let mut topics = BTreeMap::new();
    for label in 0..k {
        let members: Vec<&str> = titles
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l == label)
            .map(|(t, _)| *t)
            .collect();
        if members.is_empty() {
            continue;
        }
        topics.insert(
            format!("topic_{label}"),
            TopicCluster {
                count: members.len(),
                sample_titles: members
                    .iter()
                    .take(SAMPLE_TITLES)
                    .map(|t| (*t).to_string())
                    .collect(),
            },
        );
    }

    (topics, ClusterOutcome::Clustered)
}

// ---------------------------------------------------------------------------
// TF-IDF
// ---------------------------------------------------------------------------

fn tokenize(text: &str) -> Vec<String> {
    static TOKEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// L2-normalised TF-IDF rows, one per document.
///
/// IDF is smoothed: `ln((1 + n) / (1 + df)) + 1`.
fn tfidf(docs: &[&str]) -> Result<Vec<Vec<f64>>, String> {
    let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d)).collect();

    let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        for t in tokens {
            *corpus_counts.entry(t.as_str()).or_default() += 1;
        }
    }
    if corpus_counts.is_empty() {
        return Err("empty vocabulary; titles contain only stop words".into());
    }

    let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(MAX_FEATURES);

    let mut vocabulary: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
    vocabulary.sort_unstable();
    let index: HashMap<&str, usize> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, i))
        .collect();

    let n = docs.len();
    let mut counts = vec![vec![0.0; vocabulary.len()]; n];
    let mut doc_freq = vec![0usize; vocabulary.len()];
    for (row, tokens) in counts.iter_mut().zip(&tokenized) {
        for t in tokens {
            if let Some(&col) = index.get(t.as_str()) {
                row[col] += 1.0;
            }
        }
        for (col, value) in row.iter().enumerate() {
            if *value > 0.0 {
                doc_freq[col] += 1;
            }
        }
    }

    let idf: Vec<f64> = doc_freq
        .iter()
        .map(|&df| ((1 + n) as f64 / (1 + df) as f64).ln() + 1.0)
        .collect();

    for row in &mut counts {
        for (value, weight) in row.iter_mut().zip(&idf) {
            *value *= weight;
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
    }

    Ok(counts)
}

// ---------------------------------------------------------------------------
// k-means
// ---------------------------------------------------------------------------

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Farthest-point seeding starting from the first row.
fn seed_centroids(points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[0].clone()];
    let mut min_dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[0]))
        .collect();

    while centroids.len() < k {
        let mut pick = 0;
        for (i, d) in min_dist.iter().enumerate() {
            if *d > min_dist[pick] {
                pick = i;
            }
        }
        let chosen = points[pick].clone();
        for (d, p) in min_dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

/// Cluster label per row. `points` must be non-empty and `1 <= k <= points.len()`.
pub(crate) fn kmeans(points: &[Vec<f64>], k: usize) -> Vec<usize> {
    let dims = points[0].len();
    let mut centroids = seed_centroids(points, k);
    let mut labels: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();

    for _ in 0..MAX_ITERATIONS {
        let mut sums = vec![vec![0.0; dims]; k];
        let mut sizes = vec![0usize; k];
        for (p, &label) in points.iter().zip(&labels) {
            sizes[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(p) {
                *s += v;
            }
        }
        for ((centroid, sum), size) in centroids.iter_mut().zip(sums).zip(&sizes) {
            // Empty clusters keep their previous centroid.
            if *size > 0 {
                *centroid = sum.into_iter().map(|s| s / *size as f64).collect();
            }
        }

        let next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();
        if next == labels {
            break;
        }
        labels = next;
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(titles: &[&str]) -> Vec<ItemRecord> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| ItemRecord::new(format!("v{i}"), *t, 10, 1, 0))
            .collect()
    }

    #[test]
    fn tokenize_drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize("The Rust book: a guide to Async"),
            vec!["rust", "book", "guide", "async"]
        );
    }

    #[test]
    fn tfidf_rows_are_unit_length() {
        let rows = tfidf(&["rust async tokio", "rust traits", "sourdough bread"]).expect("tfidf");
        for row in rows {
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn tfidf_caps_vocabulary() {
        let doc: String = (0..80).map(|i| format!("term{i:02} ")).collect();
        let rows = tfidf(&[doc.as_str()]).expect("tfidf");
        assert_eq!(rows[0].len(), MAX_FEATURES);
    }

    #[test]
    fn kmeans_separates_disjoint_groups() {
        let rows = tfidf(&[
            "rust async tokio",
            "rust async runtime",
            "rust async executor",
            "baking bread sourdough",
            "baking bread rye",
            "baking bread flour",
        ])
        .expect("tfidf");
        let labels = kmeans(&rows, 2);
        assert!(labels[..3].iter().all(|l| *l == labels[0]));
        assert!(labels[3..].iter().all(|l| *l == labels[3]));
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn clusters_cover_every_item() {
        let items = items(&[
            "Rust async deep dive",
            "Rust async in production",
            "Sourdough bread at home",
            "Rye bread baking",
            "Mechanical keyboard build",
            "Keyboard switch comparison",
            "Rust traits explained",
        ]);
        let (topics, outcome) = cluster_topics(&items);
        assert_eq!(outcome, ClusterOutcome::Clustered);
        assert!(topics.len() <= MAX_CLUSTERS);
        assert_eq!(topics.values().map(|c| c.count).sum::<usize>(), items.len());
        assert!(topics.values().all(|c| c.sample_titles.len() <= SAMPLE_TITLES));
        assert!(topics.keys().all(|k| k.starts_with("topic_")));

        let (again, _) = cluster_topics(&items);
        assert_eq!(topics, again);
    }

    #[test]
    fn one_cluster_per_item_when_k_equals_n() {
        let (topics, _) = cluster_topics(&items(&["rust", "bread", "keyboard"]));
        assert_eq!(topics.len(), 3);
        assert!(topics.values().all(|c| c.count == 1));
    }

    #[test]
    fn stop_word_titles_fail_softly() {
        let (topics, outcome) = cluster_topics(&items(&["the and", "of the", "an other"]));
        assert!(topics.is_empty());
        assert!(matches!(outcome, ClusterOutcome::Failed { .. }));
    }

    #[test]
    fn blank_titles_are_skipped() {
        let (topics, outcome) = cluster_topics(&items(&["", "  ", ""]));
        assert!(topics.is_empty());
        assert_eq!(outcome, ClusterOutcome::NoTitles);
    }
}
