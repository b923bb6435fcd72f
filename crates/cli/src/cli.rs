// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for listing commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  rollcall init coach@example.org      Set up this device
  rollcall person add \"Ana Lima\"       Add a person
  rollcall group add \"Tuesday choir\"   Add a group
  rollcall member add <group> <person> Put a person in a group
  rollcall sync                        Push queued changes and pull updates";

#[derive(Parser, Debug)]
#[command(name = "rollcall", version)]
#[command(about = "Offline-first roster of people and groups")]
#[command(
    long_about = "Offline-first roster of people and groups.\n\n\
    Every change is saved on this device first and replicated to the remote \
    store when it is reachable."
)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Data directory (default: platform data dir)
    #[arg(long, global = true, env = "ROLLCALL_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log sync activity to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the data directory for an owner
    Init {
        /// Identity whose people and groups this device syncs
        owner: String,

        /// WebSocket URL of the remote store
        #[arg(long)]
        url: Option<String>,
    },

    /// Manage people
    #[command(subcommand)]
    Person(PersonCommand),

    /// Manage groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// Add or remove group members
    #[command(subcommand)]
    Member(MemberCommand),

    /// Replay queued changes and pull remote updates
    Sync,

    /// Show connectivity, queue and cache status
    Status,

    /// Stay running and sync whenever the remote comes back
    Watch,
}

/// Person fields settable from the command line.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct PersonFields {
    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Allergy (repeatable)
    #[arg(long = "allergy")]
    pub allergies: Vec<String>,

    /// Photo reference (repeatable)
    #[arg(long = "photo")]
    pub photos: Vec<String>,
}

/// Group fields settable from the command line.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct GroupFields {
    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    /// Guide responsible for the group
    #[arg(long)]
    pub guide: Option<String>,

    /// Notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
    /// Add a person
    #[command(after_help = "Examples:\n  \
        rollcall person add \"Ana Lima\" --email ana@example.org\n  \
        rollcall person add \"Bo\" --allergy peanuts --allergy dairy\n  \
        rollcall person add \"Scratch\" --local     Never leaves this device")]
    Add {
        name: String,

        #[command(flatten)]
        fields: PersonFields,

        /// Keep this person on this device only
        #[arg(long)]
        local: bool,
    },

    /// Edit a person; repeatable fields replace the stored list
    Edit {
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: PersonFields,
    },

    /// Delete a person and drop them from every group
    Rm { id: String },

    /// List people
    List {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Add a group
    Add {
        name: String,

        #[command(flatten)]
        fields: GroupFields,

        /// Keep this group on this device only
        #[arg(long)]
        local: bool,
    },

    /// Edit a group
    Edit {
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: GroupFields,
    },

    /// Delete a group
    Rm { id: String },

    /// List groups
    List {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Put a person in a group
    Add { group: String, person: String },

    /// Take a person out of a group
    Rm { group: String, person: String },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
