use thiserror::Error;

use crate::model::window::WindowId;

/// Why the rendering side could not place a window.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("window {wid} refused its frame: {reason}")]
    Rejected { wid: WindowId, reason: String },
}

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("{} frame(s) could not be applied", .0.len())]
    FramesRejected(Vec<(WindowId, FrameError)>),
}
