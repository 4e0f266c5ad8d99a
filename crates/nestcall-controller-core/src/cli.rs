//! Command-line arguments.
//!
//! Deliberately small: unlike the admin/ACL/tariff/job subcommands a full collaboration
//! controller carries, this service only ever needs to know where its config file is
//! and whether an operator wants to trigger a reload without sending a signal.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(name = "nestcall-controller")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[clap(short, long, default_value = "config.toml")]
    pub config: String,
}
