pub mod engine;
mod floating;
pub(crate) mod graph;
pub mod layout;
pub mod resize;
pub mod utils;

pub use engine::{EventResponse, LayoutCommand, LayoutEngine};
pub use floating::{FloatingManager, default_floating_frame};
pub use graph::{Direction, LayoutKind, Orientation};
pub use resize::{ResizeDimension, ResizeValue};
