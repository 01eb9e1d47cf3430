use clap::Parser;
use quorum::cli::{
    app::AppContext, dlq, extract, handle_config_init, metrics, Cli, Commands, ConfigCommands,
    DlqCommands,
};
use quorum::config::QuorumConfig;
use quorum::logging::init_logging;
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract(args) => {
            match load_context(&args.config, |config| {
                if let Some(strategy) = args.strategy {
                    config.orchestration.strategy = strategy;
                }
            }) {
                Ok(context) => match extract::handle_extract(&args, &context).await {
                    Ok(output) => {
                        println!("{}", output);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            }
        }
        Commands::Dlq(cmd) => match cmd {
            DlqCommands::List(args) => load_context(&args.config, |_| {})
                .and_then(|context| dlq::handle_dlq_list(&args, &context))
                .map(|output| println!("{}", output)),
            DlqCommands::Replay(args) => match load_context(&args.config, |_| {}) {
                Ok(context) => match dlq::handle_dlq_replay(&args, &context).await {
                    Ok(output) => {
                        println!("{}", output);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            },
            DlqCommands::ReplayBatch(args) => match load_context(&args.config, |_| {}) {
                Ok(context) => match dlq::handle_dlq_replay_batch(&args, &context).await {
                    Ok(output) => {
                        println!("{}", output);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            },
            DlqCommands::Complete(args) => load_context(&args.config, |_| {})
                .and_then(|context| dlq::handle_dlq_complete(&args, &context))
                .map(|output| println!("{}", output)),
        },
        Commands::Metrics(args) => load_context(&args.config, |_| {})
            .and_then(|context| metrics::handle_metrics(&args, &context))
            .map(|output| println!("{}", output)),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load, override, and validate configuration, then wire up the stack.
fn load_context(
    path: &Path,
    adjust: impl FnOnce(&mut QuorumConfig),
) -> Result<AppContext, Box<dyn std::error::Error>> {
    let mut config = QuorumConfig::load(Some(path))?.with_env_overrides();
    adjust(&mut config);
    config.validate()?;
    init_logging(&config.logging)?;
    Ok(AppContext::build(config)?)
}
