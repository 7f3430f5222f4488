//! Title, duration and topic profile of a channel's items.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use channelscope_shared::ItemRecord;

use crate::cluster;
use crate::metrics::mean;

/// Duration assumed for items whose duration is missing or unparseable.
pub const DEFAULT_DURATION_SECS: u64 = 300;

/// Size and representative titles of one topic cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCluster {
    pub count: usize,
    pub sample_titles: Vec<String>,
}

/// How the topic map was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusterOutcome {
    Clustered,
    /// Fewer than three items; clustering skipped.
    TooFewItems,
    /// Every title is blank; clustering skipped.
    NoTitles,
    /// Vectorisation or partitioning failed; the map is empty.
    Failed { reason: String },
}

/// Content-level aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProfile {
    /// Mean title length in characters.
    pub avg_title_length: f64,
    /// Mean duration in seconds, unparseable durations counted as the default.
    pub avg_duration_seconds: f64,
    /// `topic_<n>` → cluster.
    pub topics: BTreeMap<String, TopicCluster>,
    pub clustering: ClusterOutcome,
    /// Items whose duration fell back to [`DEFAULT_DURATION_SECS`].
    pub unparsed_durations: usize,
}

/// Compute title/duration averages and topic clusters.
pub fn compute_content_profile(items: &[ItemRecord]) -> ContentProfile {
    let avg_title_length = mean(items.iter().map(|i| i.title.chars().count() as f64));

    let mut unparsed_durations = 0;
    let durations: Vec<f64> = items
        .iter()
        .map(|i| match parse_duration(i.duration.as_deref()) {
            Some(secs) => secs as f64,
            None => {
                unparsed_durations += 1;
                DEFAULT_DURATION_SECS as f64
            }
        })
        .collect();

    let (topics, clustering) = cluster::cluster_topics(items);

    ContentProfile {
        avg_title_length,
        avg_duration_seconds: mean(durations.into_iter()),
        topics,
        clustering,
        unparsed_durations,
    }
}

/// Parse an ISO 8601 `PT#H#M#S` duration into seconds.
///
/// Any subset of the components may be present. Returns `None` for missing or
/// malformed input.
pub fn parse_duration(raw: Option<&str>) -> Option<u64> {
    static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("valid regex")
    });

    let caps = DURATION_RE.captures(raw?)?;
    let component = |idx: usize| -> Option<u64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let hours = component(1)?;
    let minutes = component(2)?;
    let seconds = component(3)?;
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}
