//! Channel-level totals, item ranking, and trending keywords.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use channelscope_shared::ItemRecord;

/// Only titles published within this many days feed the trending keywords.
const RECENT_WINDOW_DAYS: i64 = 100;

/// Number of trending keywords reported, and size of the fallback title pool.
const KEYWORD_LIMIT: usize = 10;

/// Tokens that say nothing about a channel's topics.
const KEYWORD_STOP_WORDS: &[&str] = &[
    "video",
    "watch",
    "youtube",
    "channel",
    "subscribe",
    "episode",
    "part",
    "full",
    "review",
    "react",
    "reaction",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity and counters of one item, as referenced from a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub engagement_rate: f64,
}

impl From<&ItemRecord> for ItemSummary {
    fn from(item: &ItemRecord) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            views: item.views,
            likes: item.likes,
            comments: item.comments,
            engagement_rate: item.engagement_rate,
        }
    }
}

/// The best item of a set together with its composite performance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: ItemSummary,
    /// Composite score in `[0, 1]`.
    pub performance_score: f64,
}

/// Title and engagement rate, as shown in the top/recent views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEngagement {
    pub id: String,
    pub title: String,
    pub engagement_rate: f64,
}

impl From<&ItemRecord> for ItemEngagement {
    fn from(item: &ItemRecord) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            engagement_rate: item.engagement_rate,
        }
    }
}

/// Which titles the trending keywords were drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordWindow {
    /// Items published within the recent window.
    Recent,
    /// No usable recent items; the first items of the input were used.
    FirstItemsFallback,
}

/// Totals and averages over a channel's items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub total_items: usize,
    pub total_views: u64,
    pub avg_views: f64,
    pub avg_likes: f64,
    pub avg_comments: f64,
    pub avg_engagement_rate: f64,
    pub best_item: Option<RankedItem>,
    pub worst_item: Option<ItemSummary>,
    pub trending_keywords: Vec<String>,
    pub keyword_window: KeywordWindow,
}

// ---------------------------------------------------------------------------
// Channel metrics
// ---------------------------------------------------------------------------

/// Compute totals, averages, best/worst items and trending keywords.
///
/// `now` anchors the recent-keyword window.
pub fn compute_channel_metrics(items: &[ItemRecord], now: DateTime<Utc>) -> ChannelMetrics {
    let (trending_keywords, keyword_window) = trending_keywords(items, now);

    ChannelMetrics {
        total_items: items.len(),
        total_views: items.iter().fold(0u64, |acc, i| acc.saturating_add(i.views)),
        avg_views: mean(items.iter().map(|i| i.views as f64)),
        avg_likes: mean(items.iter().map(|i| i.likes as f64)),
        avg_comments: mean(items.iter().map(|i| i.comments as f64)),
        avg_engagement_rate: mean(items.iter().map(|i| i.engagement_rate)),
        best_item: best_item(items),
        worst_item: worst_item(items),
        trending_keywords,
        keyword_window,
    }
}

/// Arithmetic mean; zero for an empty sequence.
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

// ---------------------------------------------------------------------------
// Best / worst
// ---------------------------------------------------------------------------

/// Per-dimension maxima used to normalise the composite score.
/// A zero maximum is replaced by 1.
#[derive(Debug, Clone, Copy)]
pub struct ScoreScale {
    views: f64,
    likes: f64,
    comments: f64,
}

impl ScoreScale {
    /// Derive the scale from a set of items.
    pub fn of(items: &[ItemRecord]) -> Self {
        let max_or_one = |f: fn(&ItemRecord) -> u64| {
            let max = items.iter().map(f).max().unwrap_or(0);
            if max == 0 { 1.0 } else { max as f64 }
        };
        Self {
            views: max_or_one(|i| i.views),
            likes: max_or_one(|i| i.likes),
            comments: max_or_one(|i| i.comments),
        }
    }

    /// `0.4·views/maxViews + 0.3·likes/maxLikes + 0.3·comments/maxComments`.
    pub fn score(&self, item: &ItemRecord) -> f64 {
        0.4 * item.views as f64 / self.views
            + 0.3 * item.likes as f64 / self.likes
            + 0.3 * item.comments as f64 / self.comments
    }
}

/// Highest composite score wins; the first item wins ties.
pub fn best_item(items: &[ItemRecord]) -> Option<RankedItem> {
    let scale = ScoreScale::of(items);
    let mut best: Option<(&ItemRecord, f64)> = None;

    for item in items {
        let score = scale.score(item);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((item, score)),
        }
    }

    best.map(|(item, score)| RankedItem {
        item: ItemSummary::from(item),
        performance_score: score,
    })
}

/// Lowest engagement among items viewed more than the 10th percentile.
///
/// Falls back to the global lowest engagement when no item clears the
/// percentile. The first item wins ties.
pub fn worst_item(items: &[ItemRecord]) -> Option<ItemSummary> {
    let mut views: Vec<f64> = items.iter().map(|i| i.views as f64).collect();
    views.sort_by(f64::total_cmp);
    let cutoff = quantile(&views, 0.1)?;

    let pool: Vec<&ItemRecord> = items.iter().filter(|i| i.views as f64 > cutoff).collect();
    let candidates: Vec<&ItemRecord> = if pool.is_empty() {
        items.iter().collect()
    } else {
        pool
    };

    min_engagement(&candidates).map(ItemSummary::from)
}

fn min_engagement<'a>(items: &[&'a ItemRecord]) -> Option<&'a ItemRecord> {
    let mut worst: Option<&ItemRecord> = None;
    for &item in items {
        match worst {
            Some(w) if item.engagement_rate >= w.engagement_rate => {}
            _ => worst = Some(item),
        }
    }
    worst
}

/// Linearly interpolated quantile of an ascending-sorted slice.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

// ---------------------------------------------------------------------------
// Views over items
// ---------------------------------------------------------------------------

/// The `n` most engaging items, descending by engagement rate.
pub fn top_items_by_engagement(items: &[ItemRecord], n: usize) -> Vec<ItemEngagement> {
    let mut sorted: Vec<&ItemRecord> = items.iter().collect();
    sorted.sort_by(|a, b| b.engagement_rate.total_cmp(&a.engagement_rate));
    sorted.into_iter().take(n).map(ItemEngagement::from).collect()
}

/// The `n` most recently published items.
///
/// Keeps input order when any present timestamp fails to parse; items without
/// a timestamp sort last.
pub fn recent_engagement(items: &[ItemRecord], n: usize) -> Vec<ItemEngagement> {
    let stamped: Option<Vec<(Option<DateTime<Utc>>, &ItemRecord)>> = items
        .iter()
        .map(|item| match &item.published_at {
            None => Some((None, item)),
            Some(_) => item.published_at_utc().map(|ts| (Some(ts), item)),
        })
        .collect();

    match stamped {
        Some(mut stamped) => {
            stamped.sort_by(|a, b| b.0.cmp(&a.0));
            stamped
                .into_iter()
                .take(n)
                .map(|(_, item)| ItemEngagement::from(item))
                .collect()
        }
        None => items.iter().take(n).map(ItemEngagement::from).collect(),
    }
}

// ---------------------------------------------------------------------------
// Trending keywords
// ---------------------------------------------------------------------------

/// Most frequent title tokens of recently published items.
pub fn trending_keywords(items: &[ItemRecord], now: DateTime<Utc>) -> (Vec<String>, KeywordWindow) {
    let (titles, window) = match recent_items(items, now) {
        Some(recent) if !recent.is_empty() => (recent, KeywordWindow::Recent),
        _ => (
            items.iter().take(KEYWORD_LIMIT).collect(),
            KeywordWindow::FirstItemsFallback,
        ),
    };

    let text = titles
        .iter()
        .map(|i| i.title.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    (top_tokens(&text, KEYWORD_LIMIT), window)
}

/// Items inside the recent window, or `None` when timestamps are unusable.
fn recent_items(items: &[ItemRecord], now: DateTime<Utc>) -> Option<Vec<&ItemRecord>> {
    if items.iter().all(|i| i.published_at.is_none()) {
        return None;
    }

    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let mut recent = Vec::new();
    for item in items {
        if item.published_at.is_none() {
            continue;
        }
        let ts = item.published_at_utc()?;
        if ts > cutoff {
            recent.push(item);
        }
    }
    Some(recent)
}

/// Count alphabetic tokens of length ≥ 4, most frequent first, first-seen on ties.
fn top_tokens(text: &str, limit: usize) -> Vec<String> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").expect("valid regex"));

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, m) in WORD_RE.find_iter(text).enumerate() {
        let word = m.as_str();
        if KEYWORD_STOP_WORDS.contains(&word) {
            continue;
        }
        counts.entry(word).or_insert((0, order)).0 += 1;
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(w, _)| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, views: u64, likes: u64, comments: u64) -> ItemRecord {
        ItemRecord::new(id, format!("Title {id}"), views, likes, comments)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn concrete_example_engagement_and_best() {
        let items = vec![item("a", 100, 10, 2), item("b", 50, 5, 1), item("c", 10, 1, 0)];
        let rates: Vec<f64> = items.iter().map(|i| i.engagement_rate).collect();
        assert!((rates[0] - 0.12).abs() < 1e-12);
        assert!((rates[1] - 0.12).abs() < 1e-12);
        assert!((rates[2] - 0.10).abs() < 1e-12);

        let best = best_item(&items).expect("best");
        assert_eq!(best.item.id, "a");
        assert!((best.performance_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn best_item_tie_prefers_first() {
        let items = vec![item("a", 10, 1, 1), item("b", 10, 1, 1)];
        assert_eq!(best_item(&items).unwrap().item.id, "a");
    }

    #[test]
    fn best_item_all_zero_counters() {
        let items = vec![item("a", 0, 0, 0), item("b", 0, 0, 0)];
        let best = best_item(&items).unwrap();
        assert_eq!(best.item.id, "a");
        assert_eq!(best.performance_score, 0.0);
        assert!(best_item(&[]).is_none());
    }

    #[test]
    fn dominating_item_is_best_and_scores_in_unit_range() {
        let items = vec![
            item("a", 300, 20, 4),
            item("b", 900, 70, 30),
            item("c", 500, 60, 10),
        ];
        let scale = ScoreScale::of(&items);
        for i in &items {
            let s = scale.score(i);
            assert!((0.0..=1.0).contains(&s));
        }
        assert_eq!(best_item(&items).unwrap().item.id, "b");
    }

    #[test]
    fn worst_item_excludes_low_view_tail() {
        // The 5-view item has the lowest engagement but sits under the 10th percentile.
        let items = vec![
            item("tiny", 5, 0, 0),
            item("mid", 1000, 100, 0),
            item("weak", 2000, 20, 0),
            item("strong", 3000, 600, 0),
        ];
        assert_eq!(worst_item(&items).unwrap().id, "weak");
    }

    #[test]
    fn worst_item_falls_back_to_global_minimum() {
        // Equal views: nobody is strictly above the percentile.
        let items = vec![item("a", 100, 10, 0), item("b", 100, 1, 0)];
        assert_eq!(worst_item(&items).unwrap().id, "b");

        let single = vec![item("only", 10, 1, 0)];
        assert_eq!(worst_item(&single).unwrap().id, "only");
        assert!(worst_item(&[]).is_none());
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&sorted, 0.1), Some(4.0));
        assert_eq!(quantile(&sorted, 0.0), Some(0.0));
        assert_eq!(quantile(&[7.0], 0.1), Some(7.0));
        assert_eq!(quantile(&[], 0.1), None);
    }

    #[test]
    fn top_items_sorted_descending_and_truncated() {
        let items = vec![item("a", 100, 1, 0), item("b", 100, 9, 0), item("c", 100, 5, 0)];
        let top = top_items_by_engagement(&items, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "b");
        assert_eq!(top[1].id, "c");
        assert_eq!(top_items_by_engagement(&items, 10).len(), 3);
    }

    #[test]
    fn recent_engagement_orders_by_publish_time() {
        let items = vec![
            item("old", 10, 1, 0).with_published_at(Some("2025-01-01T00:00:00Z".into())),
            item("none", 10, 1, 0),
            item("new", 10, 1, 0).with_published_at(Some("2025-05-01T00:00:00Z".into())),
        ];
        let recent = recent_engagement(&items, 5);
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "none"]);
    }

    #[test]
    fn recent_engagement_keeps_order_on_bad_timestamp() {
        let items = vec![
            item("a", 10, 1, 0).with_published_at(Some("garbage".into())),
            item("b", 10, 1, 0).with_published_at(Some("2025-05-01T00:00:00Z".into())),
        ];
        let recent = recent_engagement(&items, 1);
        assert_eq!(recent[0].id, "a");
    }

    #[test]
    fn trending_keywords_from_recent_window() {
        let items = vec![
            ItemRecord::new("1", "Rust async tutorial", 1, 0, 0)
                .with_published_at(Some("2025-05-20T00:00:00Z".into())),
            ItemRecord::new("2", "Async Rust deep dive", 1, 0, 0)
                .with_published_at(Some("2025-05-10T00:00:00Z".into())),
            ItemRecord::new("3", "Ancient python video", 1, 0, 0)
                .with_published_at(Some("2020-01-01T00:00:00Z".into())),
        ];
        let (words, window) = trending_keywords(&items, now());
        assert_eq!(window, KeywordWindow::Recent);
        assert_eq!(words[0], "rust");
        assert_eq!(words[1], "async");
        assert!(words.contains(&"tutorial".to_string()));
        assert!(!words.contains(&"python".to_string()));
        // "dive" is 4 letters and kept; "deep" too
        assert!(words.contains(&"deep".to_string()));
    }

    #[test]
    fn trending_keywords_fall_back_without_timestamps() {
        let items = vec![
            ItemRecord::new("1", "Watch this full review of cameras", 1, 0, 0),
            ItemRecord::new("2", "Cameras compared", 1, 0, 0),
        ];
        let (words, window) = trending_keywords(&items, now());
        assert_eq!(window, KeywordWindow::FirstItemsFallback);
        assert_eq!(words[0], "cameras");
        assert!(!words.iter().any(|w| w == "watch" || w == "full" || w == "review"));
        assert!(words.contains(&"this".to_string()));
    }

    #[test]
    fn trending_keywords_fall_back_when_window_empty() {
        let items = vec![
            ItemRecord::new("1", "Old stuff", 1, 0, 0)
                .with_published_at(Some("2019-01-01T00:00:00Z".into())),
        ];
        let (words, window) = trending_keywords(&items, now());
        assert_eq!(window, KeywordWindow::FirstItemsFallback);
        assert_eq!(words, vec!["stuff".to_string()]);
    }

    #[test]
    fn total_views_saturate_on_extreme_counters() {
        let items = vec![item("a", u64::MAX, 0, 0), item("b", 10, 0, 0)];
        let metrics = compute_channel_metrics(&items, now());
        assert_eq!(metrics.total_views, u64::MAX);
        assert!(metrics.avg_views.is_finite());
    }

    #[test]
    fn channel_metrics_averages() {
        let items = vec![item("a", 100, 10, 2), item("b", 50, 5, 1), item("c", 10, 1, 0)];
        let m = compute_channel_metrics(&items, now());
        assert_eq!(m.total_items, 3);
        assert_eq!(m.total_views, 160);
        assert!((m.avg_views - 160.0 / 3.0).abs() < 1e-9);
        assert!((m.avg_engagement_rate - (0.12 + 0.12 + 0.10) / 3.0).abs() < 1e-9);
        assert_eq!(m.best_item.unwrap().item.id, "a");

        let empty = compute_channel_metrics(&[], now());
        assert_eq!(empty.avg_views, 0.0);
        assert!(empty.best_item.is_none());
        assert!(empty.trending_keywords.is_empty());
    }
}
