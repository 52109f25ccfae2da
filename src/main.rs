//! Binary entrypoint for the chat API server.

use std::process::ExitCode;

use synapse_chat::start_synapse;

/// Start the chat server on `SYNAPSE_PORT`.
fn main() -> ExitCode {
    start_synapse::run()
}
