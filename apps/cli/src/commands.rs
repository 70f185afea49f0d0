//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use roadmapper_core::pipeline::{self, Collaborators, PipelineOptions, RoadmapRequest};
use roadmapper_core::{
    EnrichmentCache, EnrichmentProgress, GenerationSession, GenerationSlot, tree, tutor,
};
use roadmapper_generation::LlmGenerator;
use roadmapper_shared::{
    AppConfig, ResourceKind, RoadmapError, StudyDuration, TimeUnit, init_config, load_config,
    validate_api_key,
};
use roadmapper_storage::{DATABASE_FILE, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Roadmapper: turn a subject into an enriched learning roadmap.
#[derive(Parser)]
#[command(
    name = "roadmapper",
    version,
    about = "Generate enriched learning roadmaps and chat with a tutor.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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

/// Resource filter for `resources`.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum KindFilter {
    Video,
    Document,
}

impl From<KindFilter> for ResourceKind {
    fn from(kind: KindFilter) -> Self {
        match kind {
            KindFilter::Video => ResourceKind::Video,
            KindFilter::Document => ResourceKind::Document,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a new roadmap, replacing the stored one.
    Generate {
        /// Subject to learn.
        subject: String,

        /// Study time available.
        #[arg(short, long, default_value_t = 1)]
        time: u32,

        /// Unit for --time: minutes, hours, days, months or years.
        #[arg(short, long)]
        unit: Option<String>,
    },

    /// Expand one topic of the stored roadmap into its own sub-roadmap.
    Expand {
        /// Topic name (case-insensitive).
        topic: String,

        /// Print the sub-roadmap without attaching it.
        #[arg(long)]
        preview: bool,
    },

    /// Print the stored roadmap.
    Show {
        /// Include descriptions and links.
        #[arg(short, long)]
        details: bool,
    },

    /// List collected learning resources.
    Resources {
        /// Only show one kind.
        #[arg(short, long)]
        kind: Option<KindFilter>,
    },

    /// Ask the tutor a question.
    Chat {
        /// Question text.
        message: String,

        /// Start a new conversation instead of continuing the latest.
        #[arg(long)]
        new: bool,
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
        0 => "roadmapper=info",
        1 => "roadmapper=debug",
        _ => "roadmapper=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    dispatch(cli).await.map_err(explain)
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            subject,
            time,
            unit,
        } => cmd_generate(&subject, time, unit.as_deref()).await,
        Command::Expand { topic, preview } => cmd_expand(&topic, preview).await,
        Command::Show { details } => cmd_show(details).await,
        Command::Resources { kind } => cmd_resources(kind).await,
        Command::Chat { message, new } => cmd_chat(&message, new).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Put the student-facing wording of a domain error on top of the report.
fn explain(report: Report) -> Report {
    let message = match report.downcast_ref::<RoadmapError>() {
        Some(err) if err.user_message() != err.to_string() => err.user_message(),
        _ => return report,
    };
    report.wrap_err(message)
}

// ---------------------------------------------------------------------------
// Storage and session helpers
// ---------------------------------------------------------------------------

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    Ok(Storage::open_in(&config.data_dir()?, false).await?)
}

/// Read-only handle, or a friendly error when nothing was generated yet.
async fn open_storage_readonly(config: &AppConfig) -> Result<Storage> {
    let dir = config.data_dir()?;
    if !dir.join(DATABASE_FILE).exists() {
        return Err(eyre!(
            "no roadmap yet. Run `roadmapper generate <subject>` first"
        ));
    }
    Ok(Storage::open_in(&dir, true).await?)
}

/// Session seeded with the persisted cache and resources.
async fn load_session(storage: &Storage) -> Result<GenerationSession> {
    let cache: EnrichmentCache = storage.load_enrichment_cache().await?.into_iter().collect();
    let mut session = GenerationSession::with_cache(cache);
    session.resources.extend(storage.load_resources().await?);
    Ok(session)
}

async fn save_session(storage: &Storage, session: &GenerationSession) -> Result<()> {
    storage
        .save_enrichment_cache(&session.cache.to_sorted_vec())
        .await?;
    storage.save_resources(session.resources.entries()).await?;
    Ok(())
}

/// Save the session, then hand back the run's outcome.
///
/// Enrichments fetched before a failure or Ctrl-C are persisted too. The
/// run's own error takes precedence over a save error.
async fn settle<T>(
    storage: &Storage,
    session: &GenerationSession,
    outcome: roadmapper_shared::Result<T>,
) -> Result<T> {
    let saved = save_session(storage, session).await;
    let value = outcome?;
    saved?;
    Ok(value)
}

fn resolve_unit(config: &AppConfig, unit: Option<&str>) -> Result<TimeUnit> {
    unit.unwrap_or(&config.defaults.time_unit)
        .parse::<TimeUnit>()
        .map_err(|e| eyre!(e))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(subject: &str, time: u32, unit: Option<&str>) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let request = RoadmapRequest {
        subject: subject.to_string(),
        duration: StudyDuration {
            amount: time,
            unit: resolve_unit(&config, unit)?,
        },
    };

    let generator = LlmGenerator::from_config(&config)?;
    let storage = open_storage(&config).await?;
    let mut session = load_session(&storage).await?;
    let options = PipelineOptions::from(&config);

    info!(subject, duration = %request.duration, "generating roadmap");

    let slot = Arc::new(GenerationSlot::new());
    let _guard = CancelOnCtrlC::spawn(Arc::clone(&slot));

    let progress = CliProgress::new();
    let result = pipeline::generate_latest(
        &slot,
        &request,
        Collaborators::new(&generator),
        &mut session,
        &options,
        &progress,
    )
    .await;
    progress.finish();
    let generated = settle(&storage, &session, result).await?;

    storage.save_roadmap(&generated.root).await?;
    storage.set_current_topic(subject).await?;

    if let Some(mut profile) = storage.load_user_profile().await? {
        profile.current_topic = Some(subject.to_string());
        storage.save_user_profile(&profile).await?;
    }

    let report = &generated.report;
    println!();
    print!("{}", tree::render_outline(&generated.root, false));
    println!();
    println!("  Topics:    {}", report.topics);
    println!("  Enriched:  {}", report.enriched_nodes);
    println!("  Cached:    {}", report.cache_hits);
    println!("  Resources: {}", session.resources.len());
    if report.failed_batches > 0 {
        println!("  Failed batches: {}", report.failed_batches);
    }
    println!();

    Ok(())
}

async fn cmd_expand(topic: &str, preview: bool) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let storage = open_storage(&config).await?;
    let mut root = storage
        .load_roadmap()
        .await?
        .ok_or_else(|| eyre!("no roadmap yet. Run `roadmapper generate <subject>` first"))?;
    let target = tree::find_by_name(&root, topic)
        .ok_or_else(|| eyre!("topic '{topic}' not found in the current roadmap"))?
        .clone();

    let generator = LlmGenerator::from_config(&config)?;
    let mut session = load_session(&storage).await?;
    let options = PipelineOptions::from(&config);
    let collaborators = Collaborators::new(&generator);

    info!(topic = %target.name, preview, "expanding topic");

    let slot: Arc<GenerationSlot<()>> = Arc::new(GenerationSlot::new());
    let ticket = slot.begin();
    let _guard = CancelOnCtrlC::spawn(Arc::clone(&slot));

    let progress = CliProgress::new();
    if preview {
        let result = pipeline::generate_sub_roadmap(
            &target,
            collaborators,
            &mut session,
            &options,
            &progress,
            ticket.token(),
        )
        .await;
        progress.finish();
        let generated = settle(&storage, &session, result).await?;
        print!("{}", tree::render_outline(&generated.root, true));
        return Ok(());
    }

    let result = pipeline::expand_node(
        &mut root,
        target.id,
        collaborators,
        &mut session,
        &options,
        &progress,
        ticket.token(),
    )
    .await;
    progress.finish();
    settle(&storage, &session, result).await?;

    storage.save_roadmap(&root).await?;

    if let Some(expanded) = tree::find(&root, target.id) {
        print!("{}", tree::render_outline(expanded, false));
    }
    Ok(())
}

async fn cmd_show(details: bool) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config).await?;
    let root = storage
        .load_roadmap()
        .await?
        .ok_or_else(|| eyre!("no roadmap yet. Run `roadmapper generate <subject>` first"))?;

    print!("{}", tree::render_outline(&root, details));
    Ok(())
}

async fn cmd_resources(kind: Option<KindFilter>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config).await?;
    let wanted = kind.map(ResourceKind::from);

    let resources = storage.load_resources().await?;
    let mut shown = 0;
    for entry in resources
        .iter()
        .filter(|e| wanted.is_none_or(|k| e.kind == k))
    {
        println!("[{}] {}", entry.kind, entry.title);
        println!("    {}", entry.summary);
        println!("    {}", entry.url);
        shown += 1;
    }
    if shown == 0 {
        println!("No resources collected yet.");
    }
    Ok(())
}

async fn cmd_chat(message: &str, new: bool) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let storage = open_storage(&config).await?;
    let generator = LlmGenerator::from_config(&config)?;
    let mut log = tutor::ConversationLog::new(storage.load_conversations().await?);
    let topic = storage.current_topic().await?;

    if new || log.is_empty() {
        log.start(topic);
    }
    let Some(conversation) = log.latest_mut() else {
        return Err(eyre!("no conversation to continue"));
    };

    match tutor::ask(conversation, message, &generator).await {
        Some(reply) => println!("{}", reply.text),
        None => warn!("empty message ignored"),
    }

    storage.save_conversations(log.conversations()).await?;
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
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EnrichmentProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        let percent = if total == 0 { 100 } else { current * 100 / total };
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {percent}% ({detail})"));
    }
}

/// Cancels the slot's run in flight on Ctrl-C. Aborts its watcher on drop.
struct CancelOnCtrlC {
    handle: tokio::task::JoinHandle<()>,
}

impl CancelOnCtrlC {
    fn spawn<T: Send + 'static>(slot: Arc<GenerationSlot<T>>) -> Self {
        let handle = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling generation");
                slot.cancel();
            }
        });
        Self { handle }
    }
}

impl Drop for CancelOnCtrlC {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
