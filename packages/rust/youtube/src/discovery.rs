//! Comparison-channel discovery from a channel's own titles.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use channelscope_shared::{ComparisonChannel, ItemRecord, Result};
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::YouTubeClient;

/// Keywords extracted from titles.
const KEYWORD_LIMIT: usize = 10;

/// Keywords actually searched.
const SEARCHED_KEYWORDS: usize = 5;

/// Channels requested per keyword search.
const CHANNELS_PER_KEYWORD: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "a", "an", "in", "on", "at", "to", "for", "of", "with", "by", "is", "was",
    "are", "were", "be", "been", "being",
];

/// Most frequent title words (three or more letters), most common first.
///
/// Ties keep first-seen order.
pub fn discovery_keywords(items: &[ItemRecord], limit: usize) -> Vec<String> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("valid regex"));

    let titles = items
        .iter()
        .map(|i| i.title.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, m) in WORD_RE.find_iter(&titles).enumerate() {
        let word = m.as_str();
        if STOP_WORDS.contains(&word) {
            continue;
        }
        counts.entry(word).or_insert((0, order)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(w, (n, first))| (w, n, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(w, _, _)| w.to_string())
        .collect()
}

/// Search for channels similar to the subject channel.
///
/// Searches the top keywords, de-duplicates by channel ID, excludes the
/// subject channel, and caps the result at `max_channels`. A failed search for
/// one keyword is logged and skipped. Returned channels carry no items.
#[instrument(skip(client, items), fields(items = items.len()))]
pub async fn discover_comparison_channels(
    client: &YouTubeClient,
    channel_id: &str,
    items: &[ItemRecord],
    max_channels: usize,
) -> Result<Vec<ComparisonChannel>> {
    let keywords = discovery_keywords(items, KEYWORD_LIMIT);

    let mut seen: HashSet<String> = HashSet::from([channel_id.to_string()]);
    let mut found = Vec::new();
    for keyword in keywords.iter().take(SEARCHED_KEYWORDS) {
        let channels = match client.search_channels(keyword, CHANNELS_PER_KEYWORD).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(%keyword, error = %e, "channel search failed, skipping keyword");
                continue;
            }
        };
        for channel in channels {
            if seen.insert(channel.id.clone()) {
                found.push(channel);
            }
        }
    }
    found.truncate(max_channels);

    info!(count = found.len(), "discovered comparison channels");
    Ok(found)
}
