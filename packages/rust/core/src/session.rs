//! Persistence of the state record between CLI invocations.
//!
//! The whole [`PipelineState`] is stored as JSON per channel, so a later
//! `generate` can fast-track from an earlier `analyze`. A process running the
//! pipeline re-saves its state every [`HEARTBEAT_EVERY`]; a busy record older
//! than [`STALE_RUN_SECS`] belongs to a run that died and loads settled.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, instrument, warn};

use channelscope_shared::{ChannelScopeError, Result};
use channelscope_storage::{Storage, StoredState};

use crate::state::{Phase, PipelineState, StatusSnapshot};

/// How often a running process refreshes its stored state.
pub const HEARTBEAT_EVERY: Duration = Duration::from_secs(5);

/// Age after which a stored busy phase is treated as interrupted.
pub const STALE_RUN_SECS: i64 = 60;

/// The stored state for `channel_id`, or a fresh one.
///
/// A record that no longer deserializes is discarded with a warning.
#[instrument(skip(storage))]
pub async fn load_state(storage: &Storage, channel_id: &str) -> Result<PipelineState> {
    let Some(stored) = storage.load_state(channel_id).await? else {
        debug!("no stored state");
        return Ok(PipelineState::default());
    };
    Ok(decode(&stored, Utc::now()).unwrap_or_default())
}

/// The most recently saved state of any channel.
pub async fn load_latest_state(storage: &Storage) -> Result<Option<PipelineState>> {
    Ok(storage
        .latest_state()
        .await?
        .and_then(|stored| decode(&stored, Utc::now())))
}

/// Load the state a new run starts from and mark the channel busy in storage.
///
/// Fails while another process holds a live run for `channel_id`. The
/// returned state keeps its loaded phase; only the stored copy says
/// `Running` until the caller saves progress over it.
#[instrument(skip(storage))]
pub async fn claim_run(storage: &Storage, channel_id: &str) -> Result<PipelineState> {
    let state = load_state(storage, channel_id).await?;
    if state.phase.is_busy() {
        return Err(ChannelScopeError::validation(format!(
            "a run for {channel_id} is already in progress ({}: {})",
            state.phase, state.detail
        )));
    }

    let claimed = PipelineState {
        phase: Phase::Running,
        detail: "starting".into(),
        ..state.clone()
    };
    save_state(storage, channel_id, &claimed).await?;
    Ok(state)
}

/// Store `state` under `channel_id`.
#[instrument(skip(storage, state), fields(phase = %state.phase))]
pub async fn save_state(storage: &Storage, channel_id: &str, state: &PipelineState) -> Result<()> {
    let json = serde_json::to_string(state)
        .map_err(|e| ChannelScopeError::validation(format!("state serialization failed: {e}")))?;
    storage.save_state(channel_id, &json).await
}

/// Close a run-history row with the outcome shown in `snapshot`.
pub async fn finish_run(storage: &Storage, run_id: &str, snapshot: &StatusSnapshot) -> Result<()> {
    storage
        .finish_run(
            run_id,
            snapshot.phase.label(),
            &snapshot.detail,
            snapshot.artifact.as_deref(),
        )
        .await
}

fn decode(stored: &StoredState, now: DateTime<Utc>) -> Option<PipelineState> {
    match serde_json::from_str::<PipelineState>(&stored.state_json) {
        Ok(state) if now - stored.updated_at > TimeDelta::seconds(STALE_RUN_SECS) => {
            Some(state.settle())
        }
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, channel_id = %stored.channel_id, "discarding unreadable stored state");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use channelscope_shared::{ItemRecord, Recommendation};

    use super::*;
    use crate::state::RecommendationSet;

    async fn test_storage() -> Storage {
        let path = std::env::temp_dir().join(format!("cs_session_{}.db", Uuid::now_v7()));
        Storage::open(&path).await.expect("open test db")
    }

    fn analysed_state() -> PipelineState {
        let items = vec![
            ItemRecord::new("v1", "Rust async basics", 100, 10, 2)
                .with_published_at(Some("2024-05-20T15:00:00Z".into())),
            ItemRecord::new("v2", "Rust traits", 50, 5, 1),
            ItemRecord::new("v3", "Rust errors", 10, 1, 0),
        ];
        let analysis = channelscope_analysis::analyze("UC1", &items, &[], Utc::now());
        PipelineState {
            phase: Phase::Waiting,
            channel_id: Some("UC1".into()),
            recommendations: Some(RecommendationSet {
                analysis_id: analysis.analysis_id,
                items: vec![Recommendation::default()],
                persisted: true,
            }),
            analysis: Some(analysis),
            ..PipelineState::default()
        }
    }

    #[tokio::test]
    async fn state_survives_a_round_trip() {
        let storage = test_storage().await;
        let state = analysed_state();
        save_state(&storage, "UC1", &state).await.expect("save");

        let loaded = load_state(&storage, "UC1").await.expect("load");
        assert_eq!(loaded.phase, Phase::Waiting);
        assert_eq!(
            loaded.analysis.as_ref().map(|a| a.analysis_id),
            state.analysis.as_ref().map(|a| a.analysis_id)
        );
        assert!(loaded.recommendations.expect("recommendations").persisted);
    }

    #[tokio::test]
    async fn missing_or_corrupt_state_starts_fresh() {
        let storage = test_storage().await;
        assert_eq!(
            load_state(&storage, "UCnone").await.expect("load"),
            PipelineState::default()
        );

        storage.save_state("UCbad", "{not json").await.expect("save");
        let loaded = load_state(&storage, "UCbad").await.expect("load");
        assert_eq!(loaded.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn live_runs_stay_busy() {
        let storage = test_storage().await;
        let state = PipelineState {
            phase: Phase::Running,
            ..analysed_state()
        };
        save_state(&storage, "UC1", &state).await.expect("save");

        let loaded = load_latest_state(&storage)
            .await
            .expect("load")
            .expect("some state");
        assert_eq!(loaded.phase, Phase::Running);
        assert!(loaded.analysis.is_some());
    }

    #[test]
    fn stale_busy_records_settle_as_interrupted() {
        let now = Utc::now();
        let stored = StoredState {
            channel_id: "UC1".into(),
            state_json: serde_json::to_string(&PipelineState {
                phase: Phase::Generating,
                ..analysed_state()
            })
            .expect("serialize"),
            updated_at: now - TimeDelta::seconds(STALE_RUN_SECS + 1),
        };

        let settled = decode(&stored, now).expect("decodes");
        assert_eq!(settled.phase, Phase::Error);
        assert!(settled.detail.contains("interrupted"));
        assert!(settled.analysis.is_some());

        let fresh = decode(
            &StoredState {
                updated_at: now,
                ..stored
            },
            now,
        )
        .expect("decodes");
        assert_eq!(fresh.phase, Phase::Generating);
    }

    #[tokio::test]
    async fn claim_marks_channel_busy_in_storage() {
        let storage = test_storage().await;
        save_state(&storage, "UC1", &analysed_state()).await.expect("save");

        let claimed = claim_run(&storage, "UC1").await.expect("claim");
        assert_eq!(claimed.phase, Phase::Waiting);
        assert!(claimed.analysis.is_some());

        let stored = load_state(&storage, "UC1").await.expect("load");
        assert_eq!(stored.phase, Phase::Running);
        assert!(stored.analysis.is_some());
    }

    #[tokio::test]
    async fn claim_rejects_a_live_run() {
        let storage = test_storage().await;
        claim_run(&storage, "UC1").await.expect("first claim");

        let err = claim_run(&storage, "UC1").await.expect_err("second claim");
        assert!(err.to_string().contains("already in progress"));

        claim_run(&storage, "UC2").await.expect("other channel is free");
    }

    #[tokio::test]
    async fn finish_run_records_outcome() {
        let storage = test_storage().await;
        let run_id = storage.insert_run("UC1", "generate").await.expect("insert");
        let snapshot = StatusSnapshot::from(&PipelineState {
            phase: Phase::Completed,
            detail: "done".into(),
            artifact: Some("/tmp/storyboard.json".into()),
            ..PipelineState::default()
        });

        finish_run(&storage, &run_id, &snapshot).await.expect("finish");
        let runs = storage.list_runs(10).await.expect("list");
        assert_eq!(runs[0].phase.as_deref(), Some("completed"));
        assert_eq!(runs[0].artifact_path.as_deref(), Some("/tmp/storyboard.json"));
    }
}
