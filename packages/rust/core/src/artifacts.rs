//! JSON artifact store for recommendations and scripts.
//!
//! Every file is named after its generation time and written atomically
//! (temp file, then rename) so a poller never observes a half-written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use channelscope_shared::{ChannelScopeError, Recommendation, Result, Script};

use crate::collaborators::ArtifactSink;

/// Timestamp format embedded in artifact file names.
const FILE_TIMESTAMP: &str = "%Y%m%d_%H%M%S_%3f";

/// Writes artifacts as pretty-printed JSON under one directory.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    output_dir: PathBuf,
}

impl JsonArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl ArtifactSink for JsonArtifactStore {
    #[instrument(skip_all, fields(count = recommendations.len()))]
    async fn persist_recommendations(
        &self,
        recommendations: &[Recommendation],
    ) -> Result<PathBuf> {
        let path = write_timestamped(&self.output_dir, "recommendations", recommendations)?;
        info!(path = %path.display(), "saved recommendations");
        Ok(path)
    }

    #[instrument(skip_all, fields(title = %script.video_title))]
    async fn persist_script(&self, script: &Script) -> Result<PathBuf> {
        let path = write_timestamped(&self.output_dir, "script", script)?;
        info!(path = %path.display(), "saved script");
        Ok(path)
    }
}

/// Write `data` to `<dir>/<prefix>_<timestamp>.json`, creating `dir` if needed.
pub(crate) fn write_timestamped<T: serde::Serialize + ?Sized>(
    dir: &Path,
    prefix: &str,
    data: &T,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| ChannelScopeError::io(dir, e))?;
    let stamp = Utc::now().format(FILE_TIMESTAMP);
    let path = dir.join(format!("{prefix}_{stamp}.json"));
    write_json(&path, data)?;
    Ok(path)
}

/// Serialize `data` as pretty JSON and move it into place atomically.
pub(crate) fn write_json<T: serde::Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| ChannelScopeError::validation(format!("JSON serialization failed: {e}")))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json).map_err(|e| ChannelScopeError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ChannelScopeError::io(path, e))?;

    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}
