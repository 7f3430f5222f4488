//! Storyboard renderer: turns a [`Script`] into a production-ready plan.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use channelscope_shared::{Result, Script, ScriptSection};

use crate::artifacts::write_timestamped;
use crate::collaborators::Renderer;

/// Section length assumed when the script gives none.
pub const DEFAULT_SECTION_SECS: u64 = 10;

/// Total length assumed when the script gives none.
const DEFAULT_TOTAL_SECS: u64 = 300;

const DEFAULT_VISUAL_PROMPT: &str = "Relevant background image";
const DEFAULT_SPEAKING_STYLE: &str = "conversational";

// ---------------------------------------------------------------------------
// Storyboard types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storyboard {
    pub metadata: StoryboardMetadata,
    pub sections: Vec<StoryboardSection>,
    pub call_to_action: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryboardMetadata {
    pub title: String,
    pub total_duration_seconds: u64,
    pub created_at: DateTime<Utc>,
}

/// One numbered scene with its narration and asset names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryboardSection {
    /// 1-based.
    pub section_number: usize,
    pub title: String,
    pub content: String,
    pub duration_seconds: u64,
    pub visual_prompt: String,
    pub speaking_style: String,
    pub audio_file: String,
    pub image_file: String,
}

/// Build a storyboard; a script without sections gets a stock three-part one.
pub fn build_storyboard(script: &Script, now: DateTime<Utc>) -> Storyboard {
    let default;
    let script = if script.sections.is_empty() {
        default = default_script();
        &default
    } else {
        script
    };

    let title = if script.video_title.trim().is_empty() {
        "Generated Video".to_string()
    } else {
        script.video_title.clone()
    };

    Storyboard {
        metadata: StoryboardMetadata {
            title,
            total_duration_seconds: script.total_duration_seconds.unwrap_or(DEFAULT_TOTAL_SECS),
            created_at: now,
        },
        sections: script
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| storyboard_section(i + 1, s))
            .collect(),
        call_to_action: script.call_to_action.clone(),
        hashtags: script.hashtags.clone(),
    }
}

fn storyboard_section(number: usize, section: &ScriptSection) -> StoryboardSection {
    let title = if section.section_title.is_empty() {
        format!("Section {number}")
    } else {
        section.section_title.clone()
    };

    StoryboardSection {
        section_number: number,
        title,
        content: section.content.clone(),
        duration_seconds: section.duration_seconds.unwrap_or(DEFAULT_SECTION_SECS),
        visual_prompt: section
            .visual_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_VISUAL_PROMPT.into()),
        speaking_style: section
            .speaking_style
            .clone()
            .unwrap_or_else(|| DEFAULT_SPEAKING_STYLE.into()),
        audio_file: format!("section_{number}.mp3"),
        image_file: format!("section_{number}.jpg"),
    }
}

fn default_script() -> Script {
    let section = |title: &str, content: &str, secs: u64, visual: &str, style: &str| ScriptSection {
        section_title: title.into(),
        content: content.into(),
        duration_seconds: Some(secs),
        visual_prompt: Some(visual.into()),
        speaking_style: Some(style.into()),
    };

    Script {
        video_title: "Generated Video".into(),
        sections: vec![
            section(
                "Introduction",
                "Welcome! Today we explore a topic worth your time.",
                30,
                "Abstract technology background",
                "energetic",
            ),
            section(
                "Main Content",
                "Here are the key points you need to know about this subject.",
                180,
                "Infographics and text overlays",
                "authoritative",
            ),
            section(
                "Conclusion",
                "Thanks for watching. Put what you learned today into practice!",
                30,
                "Clean modern background",
                "friendly",
            ),
        ],
        total_duration_seconds: Some(240),
        call_to_action: "Like and subscribe for more!".into(),
        hashtags: vec!["#Content".into(), "#Education".into()],
    }
}

// ---------------------------------------------------------------------------
// StoryboardRenderer
// ---------------------------------------------------------------------------

/// Writes `storyboard_<timestamp>.json` files into an output directory.
#[derive(Debug, Clone)]
pub struct StoryboardRenderer {
    output_dir: PathBuf,
}

impl StoryboardRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Renderer for StoryboardRenderer {
    #[instrument(skip_all, fields(title = %script.video_title))]
    async fn render(&self, script: &Script) -> Result<String> {
        let storyboard = build_storyboard(script, Utc::now());
        let path = write_timestamped(&self.output_dir, "storyboard", &storyboard)?;
        info!(
            path = %path.display(),
            sections = storyboard.sections.len(),
            "rendered storyboard"
        );
        Ok(path.display().to_string())
    }
}
