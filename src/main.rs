use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use spiralscore::config::Config;
use spiralscore::error::SpiralResult;
use spiralscore::scorer::Scorer;
use std::process;
use std::sync::Arc;
use tracing::{info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, short, long, default_value = "data/population_stats.json")]
    stats: String,

    #[arg(global = true, short, long)]
    weights: Option<String>,

    /// Pipeline/threshold configuration JSON; explicit flags win over it.
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a single trace
    Score(cmd::score::ScoreArgs),
    /// Score many traces in parallel
    Batch(cmd::batch::BatchArgs),
    /// Write a synthetic spiral trace
    Synth(cmd::synth::SynthArgs),
}

/// File config first, then any value typed on the command line.
fn resolve_config(path: Option<&str>, cli_config: &Config, sub_matches: &ArgMatches) -> SpiralResult<Config> {
    let Some(path) = path else {
        cli_config.validate()?;
        return Ok(cli_config.clone());
    };

    info!("Loading config from {}", path);
    let mut config = Config::load_from_file(path)?;
    config.merge_from_cli(cli_config, sub_matches);
    config.validate()?;
    Ok(config)
}

fn build_scorer(cli: &Cli, config: &Config) -> SpiralResult<Arc<Scorer>> {
    let scorer = Scorer::from_files(config, cli.stats.as_str(), cli.weights.as_deref())?;
    Ok(Arc::new(scorer))
}

fn run(cli: Cli, matches: &ArgMatches) -> SpiralResult<()> {
    match cli.command {
        Commands::Synth(ref args) => cmd::synth::run(args.clone()),
        Commands::Score(ref args) => {
            let sub = matches.subcommand_matches("score").unwrap_or(matches);
            let config = resolve_config(cli.config.as_deref(), &args.config, sub)?;
            let scorer = build_scorer(&cli, &config)?;
            cmd::score::run(args.clone(), &config, scorer)
        }
        Commands::Batch(ref args) => {
            let sub = matches.subcommand_matches("batch").unwrap_or(matches);
            let config = resolve_config(cli.config.as_deref(), &args.config, sub)?;
            let scorer = build_scorer(&cli, &config)?;
            cmd::batch::run(args.clone(), scorer)
        }
    }
}

fn main() {
    // Raw matches distinguish user input from defaults when merging config.
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, &matches) {
        eprintln!("\n❌ FATAL ERROR: {}", e);
        process::exit(1);
    }
}
