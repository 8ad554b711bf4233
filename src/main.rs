use clap::{Parser, Subcommand};
use debate_arena::ai::{ModelCatalog, ProviderFactory};
use debate_arena::config::{self, Config};
use debate_arena::debate::{DebateOrchestrator, Speaker};
use debate_arena::error::{ArenaError, ArenaResult};
use debate_arena::server;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "debate-arena")]
#[command(about = "Two AI debaters argue, a third AI judges")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "debate-arena.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one debate in the terminal
    Debate {
        /// Subject argued by debater A
        subject_a: String,

        /// Subject argued by debater B
        subject_b: String,

        /// Number of rounds (defaults to config)
        #[arg(short, long)]
        rounds: Option<u32>,
    },

    /// List the models each provider offers
    Models,

    /// Initialize a new config file
    Init {
        /// Output path for config
        #[arg(short, long, default_value = "debate-arena.toml")]
        output: PathBuf,
    },

    /// Check configuration and API keys
    Doctor,
}

#[tokio::main]
async fn main() -> ArenaResult<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::resolve_config(&cli.config)?;
    let _log_guard = init_tracing(&config)?;

    match cli.command {
        Commands::Init { output } => {
            config::create_default_config(&output)?;
            println!("Created config at {}", output.display());
            Ok(())
        }
        Commands::Doctor => run_doctor(&cli.config, &config),
        Commands::Models => run_models(&config).await,
        Commands::Serve { port } => run_serve(config, port).await,
        Commands::Debate {
            subject_a,
            subject_b,
            rounds,
        } => run_debate(&config, &subject_a, &subject_b, rounds).await,
    }
}

/// `RUST_LOG` wins over the configured level. The returned guard flushes the log
/// file on drop and must live until exit.
fn init_tracing(config: &Config) -> ArenaResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.general.log_level.as_directive()));

    let (file_layer, guard) = match &config.general.log_directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "debate-arena.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| ArenaError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

async fn run_serve(mut config: Config, port: Option<u16>) -> ArenaResult<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    config::require_api_keys(&config)?;

    let providers = ProviderFactory::create(&config)?;
    server::serve(&config, providers).await
}

async fn run_debate(
    config: &Config,
    subject_a: &str,
    subject_b: &str,
    rounds: Option<u32>,
) -> ArenaResult<()> {
    config::require_api_keys(config)?;

    let providers = ProviderFactory::create(config)?;
    let mut orchestrator = DebateOrchestrator::from_providers(&providers, &config.debate);
    let rounds = rounds.unwrap_or(config.debate.default_rounds);
    orchestrator.start(subject_a, subject_b, rounds)?;

    println!("{} vs {} ({} rounds)\n", subject_a, subject_b, rounds);

    let mut printed = 0;
    while !orchestrator.phase().is_terminal() {
        let step = orchestrator.step().await;

        if let Some(run) = orchestrator.run_state() {
            for message in &run.transcript.messages()[printed..] {
                let subject = match message.role {
                    Speaker::DebaterA => &run.subject_a,
                    _ => &run.subject_b,
                };
                println!("[Round {}] {}: {}\n", message.round, subject, message.content);
            }
            printed = run.transcript.len();
        }

        step?;
    }

    if let Some(verdict) = orchestrator.run_state().and_then(|run| run.verdict.as_ref()) {
        println!("Judge: {}", verdict.text);
    }

    Ok(())
}

async fn run_models(config: &Config) -> ArenaResult<()> {
    let providers = ProviderFactory::create(config)?;
    let catalogs: [(&str, &dyn ModelCatalog); 3] = [
        ("OpenAI", providers.openai_models.as_ref()),
        ("Anthropic", providers.anthropic_models.as_ref()),
        ("Gemini", providers.gemini_models.as_ref()),
    ];

    for (name, catalog) in catalogs {
        println!("{}:", name);
        match catalog.list_models().await {
            Ok(models) => {
                for model in models {
                    let marker = if model.is_default { " (default)" } else { "" };
                    match &model.kind {
                        Some(kind) => println!("  {}{} [{}]", model.id, marker, kind),
                        None => println!("  {}{}", model.id, marker),
                    }
                }
            }
            Err(e) => println!("  ERROR: {}", e),
        }
    }

    Ok(())
}

fn run_doctor(config_path: &Path, config: &Config) -> ArenaResult<()> {
    println!("debate-arena - Configuration Check\n");

    println!("API keys:");
    for (var, provider) in config.providers() {
        let status = if provider.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            "OK"
        } else {
            "MISSING"
        };
        println!("  {}: {} (model {})", var, status, provider.model);
    }

    println!("\nConfiguration:");
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        match config::default_config_path().filter(|p| p.exists()) {
            Some(path) => path.display().to_string(),
            None => "Not found (using defaults)".to_string(),
        }
    };
    println!("  Config file: {}", source);
    println!("  Listen address: {}:{}", config.server.host, config.server.port);
    println!("  Environment: {:?}", config.server.environment);
    match config.server.rate_limit_per_minute {
        Some(limit) => println!("  Rate limit: {} requests/minute", limit),
        None => println!("  Rate limit: disabled"),
    }
    println!(
        "  Rounds: {} (max {})",
        config.debate.default_rounds, config.debate.max_rounds
    );

    let missing = config::missing_api_keys(config);
    if !missing.is_empty() {
        println!("\n`serve` and `debate` need: {}", missing.join(", "));
    }

    Ok(())
}
