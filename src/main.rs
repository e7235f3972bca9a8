//! Bismarck - Entry Point
//!
//! Loads configuration, checks the game is reachable, then plays one game
//! with the two-phase decision engine. Exits with status 1 only when startup
//! fails; a stopped or broken game still exits cleanly.

use bismarck::agent::{DecisionEngine, GameRunner};
use bismarck::core::config::{AgentConfig, LoggingConfig, ProviderKind};
use bismarck::core::error::Result;
use bismarck::game::{EntityClassifier, GameTransport, HttpTransport, KeywordClassifier};
use bismarck::llm::{build_provider, GatewaySettings, LlmGateway};
use bismarck::memory::MemoryStore;

use clap::{Parser, ValueEnum};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Bismarck - LLM strategy agent for 0 A.D.
#[derive(Parser, Debug)]
#[command(name = "bismarck")]
#[command(about = "Play 0 A.D. through its RL interface with a language model in command")]
struct Args {
    /// Game RL-interface host
    #[arg(long)]
    host: Option<String>,

    /// Game RL-interface port
    #[arg(long)]
    port: Option<u16>,

    /// Maximum turns to play
    #[arg(long)]
    turns: Option<u32>,

    /// Join the running game instead of starting a new one
    #[arg(long, short = 'j')]
    join: bool,

    /// Model vendor to use
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Configuration file (TOML)
    #[arg(long, default_value = "bismarck.toml")]
    config: PathBuf,

    /// Log prompts and replies
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Primary,
    Fallback,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Primary => ProviderKind::Primary,
            ProviderArg::Fallback => ProviderKind::Fallback,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.logging, args.verbose) {
        eprintln!("❌ Could not set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Could not start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(config, args.join)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// File values, then command-line overrides, then validation
fn load_config(args: &Args) -> Result<AgentConfig> {
    let mut config = AgentConfig::load(&args.config)?;
    if let Some(host) = &args.host {
        config.game.host = host.clone();
    }
    if let Some(port) = args.port {
        config.game.port = port;
    }
    if let Some(turns) = args.turns {
        config.game.max_turns = turns;
    }
    if let Some(provider) = args.provider {
        config.llm.provider = provider.into();
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bismarck={}", level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &logging.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

/// Errors returned from here are startup failures
async fn run(config: AgentConfig, join: bool) -> Result<()> {
    println!("{}", "=".repeat(60));
    println!("  BISMARCK - LLM AI Player for 0 A.D.");
    println!("  Strategic Planning | Dynamic Actions | Memory");
    println!("{}", "=".repeat(60));

    let classifier: Arc<dyn EntityClassifier> = Arc::new(KeywordClassifier);
    let transport = HttpTransport::new(&config.game, classifier.clone())?;
    if let Err(e) = transport.probe().await {
        println!("\n❌ Could not connect to 0 A.D. at {}", transport.base_url());
        println!("\nStart 0 A.D. with:");
        println!(
            "  pyrogenesis --rl-interface={}:{}",
            config.game.host, config.game.port
        );
        return Err(e);
    }
    tracing::info!("Connected to {}", transport.base_url());

    let provider = build_provider(&config.llm)?;
    let gateway = LlmGateway::new(
        provider,
        GatewaySettings::from(&config.llm),
        config.agent.seed,
    );
    let memory = MemoryStore::open(&config.memory, &config.agent.initial_strategy)?;
    let engine = DecisionEngine::new(gateway, memory, classifier, &config.agent)?
        .with_civ(config.game.civ.clone());

    let mut runner = GameRunner::new(Box::new(transport), engine, config.game.clone());

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⏹️ Stopping after this turn...");
            stop.store(true, Ordering::SeqCst);
        }
    });

    match runner.run(join).await {
        Ok(summary) => {
            println!("\n{}", summary);
            println!(
                "✓ Game {}! Final strategy: {}",
                summary.outcome,
                summary.final_strategy.to_uppercase()
            );
        }
        Err(e) => {
            tracing::error!("Game stopped: {}", e);
            println!("\n❌ Game stopped: {}", e);
        }
    }
    Ok(())
}
