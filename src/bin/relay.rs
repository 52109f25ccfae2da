//! Handler relay binary.
//! Run with: cargo run --bin synapse-relay

use std::process::ExitCode;

use synapse_chat::start_synapse;

fn main() -> ExitCode {
    start_synapse::run_relay()
}
