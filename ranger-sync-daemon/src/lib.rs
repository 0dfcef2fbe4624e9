//! Long-running host for the event dispatcher: an in-process event bus fed
//! over a Unix socket, plus status and stop commands.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_publish, request_status, request_stop, send_request, DaemonRequest, DaemonResponse,
};
pub use runtime::{run, run_with_backend, start_blocking, DaemonStats, PublishSummary};
