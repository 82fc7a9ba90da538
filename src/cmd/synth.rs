use clap::Args;
use spiralscore::error::SpiralResult;
use spiralscore::geometry::ReferenceSpiral;
use spiralscore::synthetic::SyntheticSpiral;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SynthArgs {
    #[command(flatten)]
    pub spiral: SyntheticSpiral,

    pub out: PathBuf,

    #[arg(long, default_value_t = 250.0)]
    pub center_x: f64,
    #[arg(long, default_value_t = 250.0)]
    pub center_y: f64,
    #[arg(long, default_value_t = 5.0)]
    pub start_radius: f64,
    /// Radius growth per radian.
    #[arg(long, default_value_t = 10.0)]
    pub growth: f64,
}

pub fn run(args: SynthArgs) -> SpiralResult<()> {
    let reference =
        ReferenceSpiral::new(args.center_x, args.center_y, args.start_radius, args.growth)?;
    let trace = args.spiral.to_trace_file(&reference);
    trace.save_to_file(&args.out)?;

    info!("Wrote {} points to {:?}", trace.points.len(), args.out);
    println!("💾 Synthetic trace saved: {}", args.out.display());
    Ok(())
}
