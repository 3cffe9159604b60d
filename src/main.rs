use clap::Parser;
use tracing_subscriber::EnvFilter;
use whereguard_core::cli::{Cli, Commands};
use whereguard_core::config::{merge_check_args, merge_generate_args, merge_init_args};
use whereguard_core::config_hierarchy::load_hierarchical_config;
use whereguard_core::{GenerateRule, GuardCheckRule, Rule, biome};

/// Builds the stderr subscriber. `RUST_LOG` wins over `default_level`,
/// e.g. `RUST_LOG=whereguard_core=debug`.
fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish()
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // `general.verbose` is only known once the config is loaded, so loading
    // itself logs through a `RUST_LOG`-only subscriber.
    let config = tracing::subscriber::with_default(subscriber("warn"), || {
        load_hierarchical_config(cli.config.as_deref())
    })?
    .merged;
    tracing::subscriber::set_global_default(subscriber(if config.general.verbose {
        "info"
    } else {
        "warn"
    }))?;

    match cli.command {
        Commands::Generate(args) => {
            GenerateRule::new().run(&merge_generate_args(&args, &config))?;
        }
        Commands::Init(args) => {
            biome::init(&merge_init_args(&args, &config))?;
        }
        Commands::PrintPath(args) => {
            biome::print_path(&args)?;
        }
        Commands::Check(args) => {
            GuardCheckRule::new().run(&merge_check_args(&args, &config))?;
        }
    }
    Ok(())
}
