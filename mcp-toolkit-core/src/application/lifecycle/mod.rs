mod registry;
mod shutdown;

pub use registry::ActiveToolkits;
pub use shutdown::{ShutdownCoordinator, wait_for_termination_signal};
