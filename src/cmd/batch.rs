use crate::reports;
use clap::Args;
use rayon::prelude::*;
use spiralscore::config::Config;
use spiralscore::error::SpiralResult;
use spiralscore::scorer::{ScoreResult, Scorer};
use spiralscore::trace::TraceFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub config: Config,

    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Export every result as one CSV row.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

fn score_file(path: &Path, reference: Option<&Path>, scorer: &Scorer) -> SpiralResult<ScoreResult> {
    let trace = TraceFile::load_from_file(path)?;
    let reference = super::resolve_reference(&trace, reference)?;
    scorer.score(&trace.points, &reference)
}

pub fn run(args: BatchArgs, scorer: Arc<Scorer>) -> SpiralResult<()> {
    info!("Scoring {} traces", args.files.len());

    // Each trace fails on its own; the batch keeps going.
    let rows: Vec<(String, Result<ScoreResult, String>)> = args
        .files
        .par_iter()
        .map(|path| {
            let name = path.display().to_string();
            let outcome = score_file(path, args.reference.as_deref(), &scorer).map_err(|e| {
                warn!("{}: {}", name, e);
                e.to_string()
            });
            (name, outcome)
        })
        .collect();

    if args.json {
        let doc: Vec<serde_json::Value> = rows
            .iter()
            .map(|(name, outcome)| match outcome {
                Ok(r) => serde_json::json!({ "trace": name, "result": r }),
                Err(e) => serde_json::json!({ "trace": name, "error": e }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        reports::print_batch_summary(&rows);
    }

    if let Some(path) = &args.csv {
        reports::write_batch_csv(path, &rows)?;
        info!("CSV written to {:?}", path);
    }

    let failed = rows.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        warn!("{} of {} traces failed", failed, rows.len());
    }
    Ok(())
}
