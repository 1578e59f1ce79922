//! Wind farm flow field post-processing
//!
//! Readers for SOWFA flow arrays, VTK image data and turbine outputs,
//! cut planes through flow fields, wind farm layouts and mean slices.
//! Figures are available with the `plot` feature.

pub mod error;
pub mod flow;
pub mod layout;
#[cfg(feature = "plot")]
pub mod plot;
pub mod slices;
pub mod sowfa;
pub mod stats;

pub use error::{Error, Result};
pub use flow::{CutPlane, CutPlaneBuilder, FlowField};
pub use layout::Layout;
pub use slices::SliceAverager;
pub use sowfa::SowfaFrame;

/// Returns false if the environment variable `WIND_TOOLS_PLOTS` is set to `NO`
pub fn plots_enabled() -> bool {
    std::env::var("WIND_TOOLS_PLOTS").map_or(true, |v| !v.eq_ignore_ascii_case("no"))
}
