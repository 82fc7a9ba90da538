pub mod batch;
pub mod score;
pub mod synth;

use spiralscore::error::{SpiralError, SpiralResult};
use spiralscore::geometry::ReferenceSpiral;
use spiralscore::trace::TraceFile;
use std::path::Path;

/// Reference precedence: explicit file, then whatever the trace embeds.
pub fn resolve_reference(
    trace: &TraceFile,
    override_path: Option<&Path>,
) -> SpiralResult<ReferenceSpiral> {
    if let Some(path) = override_path {
        return ReferenceSpiral::load_from_file(path);
    }
    trace.resolve_reference()?.ok_or_else(|| {
        SpiralError::Validation(
            "Trace carries no reference or canvas; pass --reference".to_string(),
        )
    })
}
