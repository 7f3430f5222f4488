//! Core of ChannelScope: the shared state record, the seams to external
//! services, and the orchestrator that drives a run through them.
//!
//! A caller builds an [`Orchestrator`] from [`Collaborators`], hands out
//! clones of its [`SharedState`] to pollers, and calls
//! [`Orchestrator::run`] with an optional recommendation index.

pub mod artifacts;
pub mod collaborators;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod state;

pub use artifacts::JsonArtifactStore;
pub use collaborators::{ArtifactSink, ChannelSource, RecommendationOracle, Renderer};
pub use pipeline::{Collaborators, Orchestrator};
pub use render::{Storyboard, StoryboardRenderer, build_storyboard};
pub use state::{
    FailureReason, Phase, PipelineState, RecommendationSet, SharedState, StatusSnapshot,
};
