#[cfg(feature = "plot")]
use crate::plot::PlotError;
use crate::{
    flow::{CutPlaneError, FlowError, VtiError},
    layout::LayoutError,
    slices::SliceError,
    sowfa::SowfaError,
    stats::StatsError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `flow` module")]
    Flow(#[from] FlowError),
    #[error("Error in the `flow::vti` module")]
    Vti(#[from] VtiError),
    #[error("Error in the `flow::cut_plane` module")]
    CutPlane(#[from] CutPlaneError),
    #[error("Error in the `sowfa` module")]
    Sowfa(#[from] SowfaError),
    #[error("Error in the `layout` module")]
    Layout(#[from] LayoutError),
    #[error("Error in the `stats` module")]
    Stats(#[from] StatsError),
    #[error("Error in the `slices` module")]
    Slices(#[from] SliceError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] PlotError),
}
pub type Result<T> = std::result::Result<T, Error>;
