//! Seams between the orchestrator and the outside world.
//!
//! Production implementations: [`YouTubeClient`] for [`ChannelSource`],
//! [`OllamaOracle`] for [`RecommendationOracle`],
//! [`StoryboardRenderer`](crate::render::StoryboardRenderer) for [`Renderer`] and
//! [`JsonArtifactStore`](crate::artifacts::JsonArtifactStore) for
//! [`ArtifactSink`]. Tests substitute counting stubs.

use std::path::PathBuf;

use async_trait::async_trait;

use channelscope_analysis::AnalysisResult;
use channelscope_oracle::OllamaOracle;
use channelscope_shared::{
    ChannelSummary, ComparisonChannel, ItemRecord, Recommendation, Result, Script,
};
use channelscope_youtube::YouTubeClient;

/// Where items and channel metadata come from.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Up to `limit` items of a channel, newest first. Empty when the channel
    /// is unknown or has no uploads.
    async fn fetch_items(&self, channel_id: &str, limit: usize) -> Result<Vec<ItemRecord>>;

    async fn channel_summary(&self, channel_id: &str) -> Result<Option<ChannelSummary>>;

    /// Channels comparable to `channel_id`, without their items.
    async fn discover_comparison_channels(
        &self,
        channel_id: &str,
        items: &[ItemRecord],
        max_channels: usize,
    ) -> Result<Vec<ComparisonChannel>>;
}

/// Turns analyses into recommendations and recommendations into scripts.
#[async_trait]
pub trait RecommendationOracle: Send + Sync {
    async fn generate_recommendations(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<Vec<Recommendation>>;

    async fn generate_script(&self, recommendation: &Recommendation) -> Result<Script>;
}

/// Produces a publishable artifact from a script; returns its path or URL.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, script: &Script) -> Result<String>;
}

/// Persists generated recommendations and scripts.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn persist_recommendations(&self, recommendations: &[Recommendation])
    -> Result<PathBuf>;

    async fn persist_script(&self, script: &Script) -> Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// Production implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ChannelSource for YouTubeClient {
    async fn fetch_items(&self, channel_id: &str, limit: usize) -> Result<Vec<ItemRecord>> {
        YouTubeClient::fetch_items(self, channel_id, limit).await
    }

    async fn channel_summary(&self, channel_id: &str) -> Result<Option<ChannelSummary>> {
        YouTubeClient::channel_summary(self, channel_id).await
    }

    async fn discover_comparison_channels(
        &self,
        channel_id: &str,
        items: &[ItemRecord],
        max_channels: usize,
    ) -> Result<Vec<ComparisonChannel>> {
        channelscope_youtube::discover_comparison_channels(self, channel_id, items, max_channels)
            .await
    }
}

#[async_trait]
impl RecommendationOracle for OllamaOracle {
    async fn generate_recommendations(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<Vec<Recommendation>> {
        self.recommend(analysis).await
    }

    async fn generate_script(&self, recommendation: &Recommendation) -> Result<Script> {
        self.script(recommendation).await
    }
}
