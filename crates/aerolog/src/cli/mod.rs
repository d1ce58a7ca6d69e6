//! cli subcommands for aerolog.
//!
//! - `aerolog serve` - Run the telemetry backend
//! - `aerolog users create` - Create a user account
//! - `aerolog users list` - List user accounts

mod serve;
mod users;

pub use serve::ServeCommand;
pub use users::UsersCommand;

use clap::{Parser, Subcommand};

/// aerolog - self-hosted air-quality telemetry backend
#[derive(Parser, Debug)]
#[command(name = "aerolog")]
#[command(about = "Self-hosted air-quality telemetry backend", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the telemetry server
    Serve(ServeCommand),

    /// manage user accounts
    #[command(subcommand)]
    Users(UsersCommand),
}
