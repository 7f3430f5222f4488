//! Analysis engine for ChannelScope.
//!
//! Pure computation over a snapshot of a channel's items (plus optional
//! comparison channels). Nothing here performs I/O; the pipeline in
//! `channelscope-core` feeds it and caches the [`AnalysisResult`].

pub mod cluster;
pub mod compare;
pub mod content;
pub mod heuristics;
pub mod metrics;
pub mod temporal;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use channelscope_shared::{ComparisonChannel, ItemRecord};

pub use compare::{ChannelComparison, ComparisonReport, compare_with_channels};
pub use content::{
    ClusterOutcome, ContentProfile, DEFAULT_DURATION_SECS, TopicCluster, compute_content_profile,
    parse_duration,
};
pub use heuristics::derive_heuristic_recommendations;
pub use metrics::{
    ChannelMetrics, ItemEngagement, ItemSummary, KeywordWindow, RankedItem, best_item,
    compute_channel_metrics, recent_engagement, top_items_by_engagement, worst_item,
};
pub use temporal::{DayOfWeek, TemporalDegradation, TemporalProfile, compute_temporal_profile};

/// Everything the engine derives from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Identifies this result; recommendation sets are keyed by it.
    pub analysis_id: Uuid,
    pub channel_id: String,
    pub generated_at: DateTime<Utc>,
    pub channel_metrics: ChannelMetrics,
    pub content_profile: ContentProfile,
    pub temporal_profile: TemporalProfile,
    pub comparison_report: ComparisonReport,
    /// Heuristic suggestions, see [`derive_heuristic_recommendations`].
    pub recommendations: Vec<String>,
}

/// Run every analysis pass and compose the result.
///
/// `now` anchors the trending-keyword window and stamps `generated_at`.
#[instrument(skip_all, fields(channel_id = %channel_id, items = items.len(), comparisons = comparisons.len()))]
pub fn analyze(
    channel_id: &str,
    items: &[ItemRecord],
    comparisons: &[ComparisonChannel],
    now: DateTime<Utc>,
) -> AnalysisResult {
    let channel_metrics = compute_channel_metrics(items, now);
    let content_profile = compute_content_profile(items);
    let temporal_profile = compute_temporal_profile(items);
    let comparison_report = compare_with_channels(items, comparisons);

    if let ClusterOutcome::Failed { reason } = &content_profile.clustering {
        tracing::warn!(%reason, "content profile degraded");
    }
    if let Some(reason) = temporal_profile.degradation {
        tracing::warn!(?reason, "temporal profile degraded");
    }

    let recommendations = derive_heuristic_recommendations(
        &channel_metrics,
        &content_profile,
        &temporal_profile,
        &comparison_report,
    );

    tracing::debug!(
        topics = content_profile.topics.len(),
        compared = comparison_report.channels.len(),
        suggestions = recommendations.len(),
        "analysis complete"
    );

    AnalysisResult {
        analysis_id: Uuid::now_v7(),
        channel_id: channel_id.to_string(),
        generated_at: now,
        channel_metrics,
        content_profile,
        temporal_profile,
        comparison_report,
        recommendations,
    }
}
