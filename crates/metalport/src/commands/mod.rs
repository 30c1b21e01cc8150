//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod ports;
pub mod util;
pub mod vlans;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use metalport_core::{ClientConfig, MetalService};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: &ClientConfig,
    cancel: CancellationToken,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let service = Arc::new(MetalService::from_config(config)?);
    match cmd {
        Command::Port(args) => ports::handle(service, config, cancel, args, global).await,
        Command::Vlan(args) => vlans::handle(service, config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
