//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use channelscope_core::{
    Collaborators, JsonArtifactStore, Orchestrator, Phase, SharedState, StatusSnapshot,
    StoryboardRenderer, session,
};
use channelscope_oracle::OllamaOracle;
use channelscope_shared::{
    AppConfig, PipelineOptions, database_path, init_config, load_config, validate_api_key,
};
use channelscope_storage::{RunRecord, Storage};
use channelscope_youtube::YouTubeClient;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ChannelScope: channel analytics and content recommendations.
#[derive(Parser)]
#[command(
    name = "channelscope",
    version,
    about = "Analyse a YouTube channel, get ranked content recommendations, and turn one into a script.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect and analyse a channel, then list recommendations.
    Analyze {
        /// Channel ID (defaults to `defaults.channel_id`).
        #[arg(short, long, env = "CHANNEL_ID")]
        channel: Option<String>,
    },

    /// Generate a script for one recommendation (1-based, as listed by `analyze`).
    Generate {
        /// Recommendation number.
        #[arg(short, long)]
        index: usize,

        /// Channel ID (defaults to `defaults.channel_id`).
        #[arg(short, long, env = "CHANNEL_ID")]
        channel: Option<String>,

        /// Skip storyboard rendering.
        #[arg(long)]
        no_render: bool,
    },

    /// Show the stored pipeline status.
    Status {
        /// Channel ID (defaults to the most recently used channel).
        #[arg(short, long)]
        channel: Option<String>,

        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recent pipeline runs.
    History {
        /// Number of runs to show.
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "channelscope=info",
        1 => "channelscope=debug",
        _ => "channelscope=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze { channel } => cmd_pipeline("analyze", channel, None, false).await,
        Command::Generate {
            index,
            channel,
            no_render,
        } => {
            let selection = index
                .checked_sub(1)
                .ok_or_else(|| eyre!("--index starts at 1"))?;
            cmd_pipeline("generate", channel, Some(selection), no_render).await
        }
        Command::Status { channel, json } => cmd_status(channel.as_deref(), json).await,
        Command::History { limit } => cmd_history(limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

/// Merge config and flags into runtime options.
fn pipeline_options(
    config: &AppConfig,
    channel: Option<String>,
    no_render: bool,
) -> Result<PipelineOptions> {
    let mut options = PipelineOptions::from(config);
    if let Some(channel) = channel {
        options.channel_id = channel;
    }
    if options.channel_id.trim().is_empty() {
        return Err(eyre!(
            "no channel given: pass --channel, set CHANNEL_ID, or set defaults.channel_id"
        ));
    }
    if no_render {
        options.render = false;
    }
    Ok(options)
}

async fn cmd_pipeline(
    kind: &str,
    channel: Option<String>,
    selection: Option<usize>,
    no_render: bool,
) -> Result<()> {
    let config = load_config()?;
    let api_key = validate_api_key(&config)?;
    let options = pipeline_options(&config, channel, no_render)?;
    let channel_id = options.channel_id.clone();

    let storage = Storage::open(&database_path()?).await?;

    let collaborators = Collaborators {
        source: Arc::new(YouTubeClient::new(&config.youtube, api_key)?),
        oracle: Arc::new(OllamaOracle::new(&config.ollama)?),
        renderer: Arc::new(StoryboardRenderer::new(&options.output_dir)),
        sink: Arc::new(JsonArtifactStore::new(&options.output_dir)),
    };
    let state = SharedState::from_state(session::claim_run(&storage, &channel_id).await?);
    let orchestrator = Orchestrator::new(collaborators, state.clone(), options);

    info!(channel_id = %channel_id, kind, ?selection, "starting run");
    let run_id = storage.insert_run(&channel_id, kind).await?;

    // The run owns the write side; this task only polls and persists progress.
    let spinner = spinner();
    let mut task = tokio::spawn(async move { orchestrator.run(selection).await });
    let mut ticker = tokio::time::interval(Duration::from_millis(120));
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + session::HEARTBEAT_EVERY,
        session::HEARTBEAT_EVERY,
    );
    let outcome = loop {
        tokio::select! {
            joined = &mut task => break joined,
            _ = ticker.tick() => spinner.set_message(state.snapshot().detail),
            _ = heartbeat.tick() => {
                if let Err(e) = session::save_state(&storage, &channel_id, &state.state()).await {
                    warn!(error = %e, "failed to persist run progress");
                }
            }
        }
    };
    spinner.finish_and_clear();

    // A panicked run leaves the record busy; settle it so the channel is free.
    let final_state = state.state().settle();
    let snapshot = StatusSnapshot::from(&final_state);
    session::save_state(&storage, &channel_id, &final_state).await?;
    session::finish_run(&storage, &run_id, &snapshot).await?;

    let phase = outcome.map_err(|e| eyre!("pipeline task failed: {e}"))??;
    println!("{}", render_status(&snapshot));

    match phase {
        Phase::Error | Phase::Failed { .. } => Err(eyre!("run ended in {phase}: {}", snapshot.detail)),
        _ => Ok(()),
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// Read-only commands
// ---------------------------------------------------------------------------

async fn cmd_status(channel: Option<&str>, json: bool) -> Result<()> {
    let storage = Storage::open_readonly(&database_path()?).await?;
    let state = match channel {
        Some(channel) => Some(session::load_state(&storage, channel).await?),
        None => session::load_latest_state(&storage).await?,
    };
    let Some(state) = state else {
        println!("No pipeline state stored yet. Run `channelscope analyze` first.");
        return Ok(());
    };

    let snapshot = StatusSnapshot::from(&state);
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", render_status(&snapshot));
    }
    Ok(())
}

async fn cmd_history(limit: u32) -> Result<()> {
    let storage = Storage::open_readonly(&database_path()?).await?;
    let runs = storage.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }
    for run in &runs {
        println!("{}", render_run(run));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output formatting
// ---------------------------------------------------------------------------

/// Human-readable status block.
fn render_status(snapshot: &StatusSnapshot) -> String {
    let mut lines = vec![String::new()];

    let channel = match (&snapshot.channel_summary, &snapshot.channel_id) {
        (Some(summary), _) => format!(
            "{} ({}, {} subscribers)",
            summary.name, summary.channel_id, summary.subscriber_count
        ),
        (None, Some(id)) => id.clone(),
        (None, None) => "-".into(),
    };
    lines.push(format!("  Channel:    {channel}"));
    lines.push(format!("  Phase:      {}", snapshot.phase));
    lines.push(format!("  Detail:     {}", snapshot.detail));
    if let Some(last_run) = snapshot.last_run {
        lines.push(format!("  Last run:   {}", last_run.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    if let Some(rate) = snapshot.avg_engagement_rate {
        lines.push(format!("  Engagement: {:.2}% average", rate * 100.0));
    }

    if !snapshot.top_items.is_empty() {
        lines.push(String::new());
        lines.push("  Top items by engagement:".into());
        for item in &snapshot.top_items {
            lines.push(format!(
                "    {:>6.2}%  {}",
                item.engagement_rate * 100.0,
                item.title
            ));
        }
    }

    if !snapshot.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("  Recommendations:".into());
        for (i, rec) in snapshot.recommendations.iter().enumerate() {
            let marker = if snapshot.selected_index == Some(i) { "*" } else { " " };
            lines.push(format!(
                "   {marker}{}. {} ({})",
                i + 1,
                rec.target_title,
                rec.recommended_topic
            ));
        }
        if snapshot.phase == Phase::Waiting {
            lines.push(String::new());
            lines.push("  Run `channelscope generate --index N` to script one.".into());
        }
    }

    if let Some(artifact) = &snapshot.artifact {
        lines.push(String::new());
        lines.push(format!("  Artifact:   {artifact}"));
    }

    lines.push(String::new());
    lines.join("\n")
}

/// One history line.
fn render_run(run: &RunRecord) -> String {
    let phase = run.phase.as_deref().unwrap_or("in progress");
    let mut line = format!(
        "{}  {:<8}  {:<24}  {:<10}",
        run.started_at.format("%Y-%m-%d %H:%M:%S"),
        run.kind,
        run.channel_id,
        phase
    );
    if let Some(detail) = &run.detail {
        line.push_str("  ");
        line.push_str(detail);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use channelscope_core::PipelineState;
    use channelscope_shared::Recommendation;

    #[test]
    fn generate_parses_index_and_flags() {
        let cli = Cli::try_parse_from([
            "channelscope",
            "generate",
            "--index",
            "2",
            "--channel",
            "UC1",
            "--no-render",
        ])
        .expect("parse");
        match cli.command {
            Command::Generate {
                index,
                channel,
                no_render,
            } => {
                assert_eq!(index, 2);
                assert_eq!(channel.as_deref(), Some("UC1"));
                assert!(no_render);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["channelscope", "status", "-vv", "--json"]).expect("parse");
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        config.defaults.channel_id = Some("UCconfig".into());

        let options = pipeline_options(&config, Some("UCflag".into()), true).expect("options");
        assert_eq!(options.channel_id, "UCflag");
        assert!(!options.render);

        let options = pipeline_options(&config, None, false).expect("options");
        assert_eq!(options.channel_id, "UCconfig");
        assert!(options.render);

        assert!(pipeline_options(&AppConfig::default(), None, false).is_err());
    }

    #[test]
    fn status_lists_numbered_recommendations() {
        let state = PipelineState {
            phase: Phase::Waiting,
            channel_id: Some("UC1".into()),
            detail: "2 recommendations ready".into(),
            recommendations: Some(channelscope_core::RecommendationSet {
                analysis_id: Default::default(),
                items: vec![
                    Recommendation {
                        recommended_topic: "Async".into(),
                        target_title: "Async in 10 minutes".into(),
                        ..Recommendation::default()
                    },
                    Recommendation::default(),
                ],
                persisted: true,
            }),
            ..PipelineState::default()
        };

        let text = render_status(&StatusSnapshot::from(&state));
        assert!(text.contains("Channel:    UC1"));
        assert!(text.contains("Phase:      waiting"));
        assert!(text.contains("1. Async in 10 minutes (Async)"));
        assert!(text.contains("generate --index N"));
    }
}
