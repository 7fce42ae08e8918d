use clap::Parser;

use cli::Cli;
use commands::handle_command;

mod cli;
mod commands;
mod error;
mod ipc;

pub use error::Error;

fn main() -> Result<(), crate::Error> {
  let command = Cli::parse();

  handle_command(command)
}
