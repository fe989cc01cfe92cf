use std::process::ExitCode;

use lattice_engine::{run_app, AppError};
use tracing::error;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(app.config, app.setup) {
        return report_startup_failure(&err);
    }

    ExitCode::SUCCESS
}

pub(crate) fn report_startup_failure(err: &AppError) -> ExitCode {
    error!(error = %err, "startup_failed");
    ExitCode::FAILURE
}
