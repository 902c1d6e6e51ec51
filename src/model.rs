pub mod monitor;
pub mod published;
pub mod tree;
pub mod window;
pub mod workspace;

pub use monitor::{Monitor, MonitorId, MonitorRegistry, MonitorTarget};
pub use published::Published;
pub use tree::{LayoutTree, NodeId};
pub use window::WindowId;
pub use workspace::{Workspace, WorkspaceId, WorkspaceManager};
