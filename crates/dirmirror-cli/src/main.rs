use dirmirror_core::logging;
use dirmirror_core::sync::SyncError;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr-only if the state dir is unusable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = Cli::run_from_args().await {
        eprintln!("dirmirror error: {:#}", err);
        let code = err
            .downcast_ref::<SyncError>()
            .map(SyncError::exit_code)
            .unwrap_or(-1);
        std::process::exit(code);
    }
}
