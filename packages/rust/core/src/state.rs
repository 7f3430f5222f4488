//! Shared pipeline state record.
//!
//! The orchestrator is the only writer; any number of pollers read through
//! [`SharedState::snapshot`]. The lock is never held across an `.await`.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use channelscope_analysis::{AnalysisResult, ItemEngagement};
use channelscope_shared::{ChannelSummary, Recommendation, Script};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Why a run ended in [`Phase::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Item collection returned nothing for the channel.
    NoData,
}

/// Where the pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Collecting items and analysing them.
    Running,
    /// Recommendations are ready; waiting for a selection.
    Waiting,
    /// Producing a script (and artifact) for the selected recommendation.
    Generating,
    Completed,
    Error,
    Failed { reason: FailureReason },
}

impl Phase {
    /// Whether a run is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Running | Self::Generating)
    }

    /// Short label used in run history and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed {
                reason: FailureReason::NoData,
            } => f.write_str("failed (no data)"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Recommendations generated for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    /// The analysis these recommendations were generated from.
    pub analysis_id: Uuid,
    pub items: Vec<Recommendation>,
    /// Set once the set has been written to the artifact sink.
    pub persisted: bool,
}

/// Everything the orchestrator exposes about the current channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub phase: Phase,
    /// When the last run reached `Waiting` or `Completed`.
    pub last_run: Option<DateTime<Utc>>,
    /// Human-readable status line.
    pub detail: String,
    pub channel_id: Option<String>,
    pub channel_summary: Option<ChannelSummary>,
    pub avg_engagement_rate: Option<f64>,
    pub top_items: Vec<ItemEngagement>,
    pub recent_items: Vec<ItemEngagement>,
    /// Cached until the next full run replaces it.
    pub analysis: Option<AnalysisResult>,
    pub recommendations: Option<RecommendationSet>,
    pub selected_index: Option<usize>,
    pub script: Option<Script>,
    pub script_path: Option<PathBuf>,
    /// Path or URL of the rendered artifact.
    pub artifact: Option<String>,
}

impl PipelineState {
    /// Reset a state loaded from disk whose run never finished.
    ///
    /// Cached analysis and recommendations are kept.
    pub fn settle(mut self) -> Self {
        if self.phase.is_busy() {
            self.detail = format!("previous run interrupted while {}", self.phase);
            self.phase = Phase::Error;
        }
        self
    }

    /// Drop everything derived from a previous analysis.
    pub(crate) fn clear_results(&mut self) {
        self.analysis = None;
        self.recommendations = None;
        self.selected_index = None;
        self.script = None;
        self.script_path = None;
        self.artifact = None;
    }
}

/// Read-only view handed to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub last_run: Option<DateTime<Utc>>,
    pub detail: String,
    pub channel_id: Option<String>,
    pub channel_summary: Option<ChannelSummary>,
    pub avg_engagement_rate: Option<f64>,
    pub top_items: Vec<ItemEngagement>,
    pub recent_items: Vec<ItemEngagement>,
    pub recommendations: Vec<Recommendation>,
    pub has_cached_analysis: bool,
    pub selected_index: Option<usize>,
    pub has_script: bool,
    pub artifact: Option<String>,
}

impl From<&PipelineState> for StatusSnapshot {
    fn from(state: &PipelineState) -> Self {
        Self {
            phase: state.phase,
            last_run: state.last_run,
            detail: state.detail.clone(),
            channel_id: state.channel_id.clone(),
            channel_summary: state.channel_summary.clone(),
            avg_engagement_rate: state.avg_engagement_rate,
            top_items: state.top_items.clone(),
            recent_items: state.recent_items.clone(),
            recommendations: state
                .recommendations
                .as_ref()
                .map(|r| r.items.clone())
                .unwrap_or_default(),
            has_cached_analysis: state.analysis.is_some(),
            selected_index: state.selected_index,
            has_script: state.script.is_some(),
            artifact: state.artifact.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Cloneable handle to the pipeline state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<PipelineState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a previously stored state.
    pub fn from_state(state: PipelineState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Polling view of the current state.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.read(|s| StatusSnapshot::from(s))
    }

    /// Full copy of the current state.
    pub fn state(&self) -> PipelineState {
        self.read(PipelineState::clone)
    }

    pub fn phase(&self) -> Phase {
        self.read(|s| s.phase)
    }

    /// Whether a run is in flight; callers should not start another.
    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&PipelineState) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut PipelineState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Move to `phase` with a new status line.
    pub(crate) fn transition(&self, phase: Phase, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::debug!(phase = %phase, %detail, "state transition");
        self.update(|s| {
            s.phase = phase;
            s.detail = detail;
        });
    }
}
