//! Pipeline orchestrator.
//!
//! One run walks `Running → Waiting` (collect, analyse, recommend) and, when a
//! selection is given, continues through `Generating → Completed` (script,
//! persistence, optional rendering). Every visible step is written to the
//! [`SharedState`]; pollers never talk to the orchestrator directly.
//!
//! A selection combined with a cached analysis for the same channel skips
//! collection and analysis entirely (fast-track).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use channelscope_analysis::{AnalysisResult, recent_engagement, top_items_by_engagement};
use channelscope_shared::{ChannelScopeError, PipelineOptions, Recommendation, Result};

use crate::collaborators::{ArtifactSink, ChannelSource, RecommendationOracle, Renderer};
use crate::state::{FailureReason, Phase, RecommendationSet, SharedState};

/// The external services a run depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ChannelSource>,
    pub oracle: Arc<dyn RecommendationOracle>,
    pub renderer: Arc<dyn Renderer>,
    pub sink: Arc<dyn ArtifactSink>,
}

/// Sequences the stages of a run and owns the write side of the state record.
#[derive(Clone)]
pub struct Orchestrator {
    collaborators: Collaborators,
    state: SharedState,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, state: SharedState, options: PipelineOptions) -> Self {
        Self {
            collaborators,
            state,
            options,
        }
    }

    /// Handle for pollers.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Execute one run.
    ///
    /// Stage failures do not surface as `Err`: they end the run in
    /// [`Phase::Error`] or [`Phase::Failed`] with the message in the state's
    /// `detail`, and the returned phase says which. `Err` is returned only when
    /// another run is already in flight on the same state.
    #[instrument(skip_all, fields(channel_id = %self.options.channel_id, selection = ?selection))]
    pub async fn run(&self, selection: Option<usize>) -> Result<Phase> {
        self.begin()?;

        let phase = match self.execute(selection).await {
            Ok(phase) => phase,
            Err(e @ ChannelScopeError::DataUnavailable { .. }) => {
                warn!(error = %e, "run failed");
                let phase = Phase::Failed {
                    reason: FailureReason::NoData,
                };
                self.state.transition(phase, e.to_string());
                phase
            }
            Err(e) => {
                error!(error = %e, "run aborted");
                self.state.transition(Phase::Error, e.to_string());
                Phase::Error
            }
        };

        info!(%phase, "run finished");
        Ok(phase)
    }

    /// Claim the state record for this run.
    fn begin(&self) -> Result<()> {
        self.state.update(|s| {
            if s.phase.is_busy() {
                return Err(ChannelScopeError::validation(format!(
                    "a run is already in progress ({})",
                    s.phase
                )));
            }
            s.phase = Phase::Running;
            s.detail = "starting".into();
            Ok(())
        })
    }

    async fn execute(&self, selection: Option<usize>) -> Result<Phase> {
        let channel_id = self.options.channel_id.trim();
        if channel_id.is_empty() {
            return Err(ChannelScopeError::config(
                "no channel configured; pass --channel or set defaults.channel_id",
            ));
        }

        let cached = self.state.read(|s| {
            s.analysis
                .as_ref()
                .filter(|a| a.channel_id == channel_id)
                .cloned()
        });

        let analysis = match (selection, cached) {
            (Some(_), Some(analysis)) => {
                info!(analysis_id = %analysis.analysis_id, "fast-track: reusing cached analysis");
                analysis
            }
            _ => self.collect_and_analyze(channel_id).await?,
        };

        let recommendations = self.ensure_recommendations(&analysis).await?;

        let Some(index) = selection else {
            let count = recommendations.len();
            self.state.update(|s| {
                s.phase = Phase::Waiting;
                s.detail = format!("{count} recommendations ready; select one to generate");
                s.last_run = Some(Utc::now());
            });
            return Ok(Phase::Waiting);
        };

        let recommendation = recommendations.get(index).cloned().ok_or(
            ChannelScopeError::SelectionOutOfRange {
                index,
                available: recommendations.len(),
            },
        )?;

        self.generate(index, &recommendation).await
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Fetch items, summary and comparison channels, then analyse.
    #[instrument(skip(self))]
    async fn collect_and_analyze(&self, channel_id: &str) -> Result<AnalysisResult> {
        let source = &self.collaborators.source;

        self.state
            .transition(Phase::Running, format!("collecting items for {channel_id}"));
        let items = source.fetch_items(channel_id, self.options.max_items).await?;
        let summary = match source.channel_summary(channel_id).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "channel summary unavailable");
                None
            }
        };

        // Published before the empty check so a no-data run still names the channel.
        self.state.update(|s| {
            if s.channel_id.as_deref() != Some(channel_id) {
                s.avg_engagement_rate = None;
                s.top_items.clear();
                s.recent_items.clear();
            }
            s.channel_id = Some(channel_id.to_string());
            s.channel_summary = summary;
        });

        if items.is_empty() {
            return Err(ChannelScopeError::DataUnavailable {
                channel_id: channel_id.to_string(),
            });
        }
        info!(count = items.len(), "collected items");

        self.state
            .transition(Phase::Running, "discovering comparison channels");
        let mut comparisons = match source
            .discover_comparison_channels(channel_id, &items, self.options.max_comparison_channels)
            .await
        {
            Ok(channels) => channels,
            Err(e) => {
                warn!(error = %e, "comparison discovery failed, continuing without");
                Vec::new()
            }
        };
        for channel in &mut comparisons {
            match source
                .fetch_items(&channel.id, self.options.comparison_items)
                .await
            {
                Ok(fetched) => channel.items = fetched,
                Err(e) => {
                    warn!(comparison = %channel.id, error = %e, "skipping comparison channel");
                }
            }
        }

        self.state.transition(Phase::Running, "analysing");
        let analysis = channelscope_analysis::analyze(channel_id, &items, &comparisons, Utc::now());
        let top = top_items_by_engagement(&items, self.options.top_items);
        let recent = recent_engagement(&items, self.options.top_items);

        self.state.update(|s| {
            s.clear_results();
            s.avg_engagement_rate = Some(analysis.channel_metrics.avg_engagement_rate);
            s.top_items = top;
            s.recent_items = recent;
            s.analysis = Some(analysis.clone());
        });

        Ok(analysis)
    }

    /// Recommendations for `analysis`, generated at most once and persisted
    /// at most once.
    #[instrument(skip_all, fields(analysis_id = %analysis.analysis_id))]
    async fn ensure_recommendations(&self, analysis: &AnalysisResult) -> Result<Vec<Recommendation>> {
        let cached = self.state.read(|s| {
            s.recommendations
                .as_ref()
                .filter(|set| set.analysis_id == analysis.analysis_id)
                .cloned()
        });

        let set = match cached {
            Some(set) => {
                debug!(count = set.items.len(), "reusing cached recommendations");
                set
            }
            None => {
                self.state
                    .transition(Phase::Running, "generating recommendations");
                let items = self
                    .collaborators
                    .oracle
                    .generate_recommendations(analysis)
                    .await?;
                info!(count = items.len(), "received recommendations");
                let set = RecommendationSet {
                    analysis_id: analysis.analysis_id,
                    items,
                    persisted: false,
                };
                self.state
                    .update(|s| s.recommendations = Some(set.clone()));
                set
            }
        };

        if !set.persisted {
            self.collaborators
                .sink
                .persist_recommendations(&set.items)
                .await?;
            self.state.update(|s| {
                if let Some(stored) = s.recommendations.as_mut() {
                    if stored.analysis_id == set.analysis_id {
                        stored.persisted = true;
                    }
                }
            });
        }

        Ok(set.items)
    }

    /// Script, persistence and optional rendering for one recommendation.
    #[instrument(skip_all, fields(index = index, topic = %recommendation.recommended_topic))]
    async fn generate(&self, index: usize, recommendation: &Recommendation) -> Result<Phase> {
        self.state.update(|s| {
            s.phase = Phase::Generating;
            s.detail = format!("writing script for recommendation {}", index + 1);
            s.selected_index = Some(index);
            s.script = None;
            s.script_path = None;
            s.artifact = None;
        });

        let script = self
            .collaborators
            .oracle
            .generate_script(recommendation)
            .await?;
        let script_path = self.collaborators.sink.persist_script(&script).await?;
        self.state.update(|s| {
            s.script = Some(script.clone());
            s.script_path = Some(script_path);
        });

        let artifact = if self.options.render {
            self.state
                .transition(Phase::Generating, "rendering storyboard");
            Some(self.collaborators.renderer.render(&script).await?)
        } else {
            debug!("rendering disabled");
            None
        };

        let detail = match &artifact {
            Some(artifact) => format!("generated \"{}\" ({artifact})", script.video_title),
            None => format!("generated script \"{}\"", script.video_title),
        };
        self.state.update(|s| {
            s.artifact = artifact;
            s.phase = Phase::Completed;
            s.detail = detail;
            s.last_run = Some(Utc::now());
        });

        Ok(Phase::Completed)
    }
}
