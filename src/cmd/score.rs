use crate::reports;
use clap::Args;
use spiralscore::config::Config;
use spiralscore::error::SpiralResult;
use spiralscore::scorer::demo::apply_demo_jitter;
use spiralscore::scorer::Scorer;
use spiralscore::trace::TraceFile;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub config: Config,

    /// Trace JSON (points plus optional reference/canvas).
    pub trace: PathBuf,

    /// Reference spiral JSON overriding the one in the trace.
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Print the result as JSON instead of tables.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: ScoreArgs, config: &Config, scorer: Arc<Scorer>) -> SpiralResult<()> {
    let trace = TraceFile::load_from_file(&args.trace)?;
    let reference = super::resolve_reference(&trace, args.reference.as_deref())?;

    let mut result = scorer.score(&trace.points, &reference)?;
    if config.demo.demo_jitter {
        result = apply_demo_jitter(result, &config.demo, &config.thresholds);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        reports::print_score_report(&args.trace.display().to_string(), &result);
    }
    Ok(())
}
