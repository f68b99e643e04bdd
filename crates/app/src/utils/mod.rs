pub mod logging;
pub mod shutdown;

pub use logging::{init_logging, open_log_file, LoggingGuard};
pub use shutdown::cancel_on_signal;
