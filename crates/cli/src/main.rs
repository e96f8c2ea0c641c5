//! `voxbi` — conversational BI orchestrator for messaging channels.

use std::sync::Arc;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::EnvFilter,
};

use {
    voxbi_analytics::AnalyticsClient,
    voxbi_channel::WhatsAppGateway,
    voxbi_config::VoxbiConfig,
    voxbi_gateway::{AppState, start_gateway},
    voxbi_store::Store,
    voxbi_voice::{stt::WhisperStt, tts::OpenAiTts},
};

#[derive(Parser)]
#[command(name = "voxbi", about = "Voxbi — conversational BI over messaging channels")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook gateway (default when no subcommand is provided).
    Gateway,
    /// Check configuration and external collaborators, then exit.
    Doctor,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voxbi={level},warn")));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let mut config = voxbi_config::discover_and_load();
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command.unwrap_or(Commands::Gateway) {
        Commands::Gateway => gateway(config).await,
        Commands::Doctor => doctor(&config),
    }
}

async fn gateway(config: VoxbiConfig) -> anyhow::Result<()> {
    let store = Store::connect(&config.store.database_url).await?;
    let llm = voxbi_agents::providers::from_config(&config.llm)?;
    let stt = Arc::new(WhisperStt::new(
        config.speech.stt.api_key.clone(),
        config.speech.stt.base_url.clone(),
        Some(config.speech.stt.model.clone()),
    ));
    let tts = Arc::new(OpenAiTts::new(
        config.speech.tts.api_key.clone(),
        config.speech.tts.base_url.clone(),
        Some(config.speech.tts.voice.clone()),
        Some(config.speech.tts.model.clone()),
    ));
    let analytics = Arc::new(AnalyticsClient::from_config(&config.analytics)?);
    let outbound = Arc::new(WhatsAppGateway::new());

    info!(
        provider = llm.name(),
        model = llm.id(),
        language = %config.speech.language,
        "starting voxbi gateway"
    );

    let state = Arc::new(AppState::new(
        config, store, llm, stt, tts, outbound, analytics,
    ));
    start_gateway(state).await
}

fn doctor(config: &VoxbiConfig) -> anyhow::Result<()> {
    let mut problems = 0usize;

    let mut check = |name: &str, ok: bool, hint: &str| {
        if ok {
            println!("  ok   {name}");
        } else {
            println!("  FAIL {name} — {hint}");
            problems += 1;
        }
    };

    println!("voxbi doctor");
    check(
        "llm api key",
        config.llm.api_key.is_some(),
        "set llm.api_key in voxbi.toml",
    );
    check(
        "stt api key",
        config.speech.stt.api_key.is_some(),
        "set speech.stt.api_key for voice notes",
    );
    check(
        "tts api key",
        config.speech.tts.api_key.is_some(),
        "set speech.tts.api_key for voice replies",
    );
    check(
        "analytics endpoint",
        !config.analytics.base_url.is_empty(),
        "set analytics.base_url",
    );
    check(
        "analytics credentials",
        !config.analytics.client_id.is_empty() && config.analytics.client_secret.is_some(),
        "set analytics.client_id / client_secret",
    );

    if problems == 0 {
        println!("all checks passed");
        Ok(())
    } else {
        anyhow::bail!("{problems} check(s) failed");
    }
}
