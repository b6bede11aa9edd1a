pub mod event_bus;
pub mod logging;
pub mod state;

pub use event_bus::*;
pub use logging::init_tracing;
pub use state::*;
