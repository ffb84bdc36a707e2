pub mod actions;
pub mod config;
pub mod drafts;
pub mod error;
pub mod git;
pub mod session;
pub mod status;
pub mod watcher;

pub use config::Config;
pub use error::AppError;
pub use session::{NoticeLevel, Presenter, Session, SessionEvent};

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays free for the rendered pane.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("commit_pane=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
