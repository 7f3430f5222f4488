//! Plain-text suggestions derived from the analysis sections.

use crate::compare::ComparisonReport;
use crate::content::ContentProfile;
use crate::metrics::ChannelMetrics;
use crate::temporal::TemporalProfile;

/// A topic needs more than this many items to be suggested.
const POPULAR_TOPIC_MIN: usize = 2;

/// Assemble suggestions in a fixed order: popular topics, publish slot,
/// best item, worst item, then outperforming comparison channels.
pub fn derive_heuristic_recommendations(
    metrics: &ChannelMetrics,
    content: &ContentProfile,
    temporal: &TemporalProfile,
    comparison: &ComparisonReport,
) -> Vec<String> {
    let mut out = Vec::new();

    for topic in content.topics.values() {
        if topic.count <= POPULAR_TOPIC_MIN {
            continue;
        }
        if let Some(sample) = topic.sample_titles.first() {
            out.push(format!("Create more content similar to: {sample}"));
        }
    }

    if let (Some(day), Some(hour)) = (temporal.best_day, temporal.best_hour) {
        out.push(format!("Publish on {day} at {hour}:00 for better engagement"));
    }

    if let Some(best) = &metrics.best_item {
        out.push(format!(
            "Create more videos like '{}' (high performance)",
            best.item.title
        ));
    }

    if let Some(worst) = &metrics.worst_item {
        out.push(format!(
            "Avoid topics/approaches similar to '{}' (low engagement)",
            worst.title
        ));
    }

    for channel in &comparison.channels {
        if channel.avg_views <= metrics.avg_views {
            continue;
        }
        let Some(best) = &channel.best_item else {
            continue;
        };
        out.push(format!(
            "Analyze {}'s successful content strategies. Its best performing video is {} with description as {}.",
            channel.channel_title, best.item.title, best.item.description
        ));
    }

    out
}
