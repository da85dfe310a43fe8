//! Command-line surface and process bootstrap for the `ticketbot` binary.

mod bootstrap_helpers;
mod cli_args;
mod cli_types;

pub use bootstrap_helpers::{build_routing_table, build_ticket_creator, init_tracing, run_cli};
pub use cli_args::Cli;
pub use cli_types::CliLogFormat;
