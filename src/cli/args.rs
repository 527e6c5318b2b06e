//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::NodeId;

/// Shallow mind maps: cards with up to two levels of notes, stored as JSON
#[derive(Parser, Debug)]
#[command(name = "mindmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Map file (bare names live in the data directory; default from config)
    #[arg(short, long, global = true, env = "MINDMAP_FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Config file to use instead of the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new, empty map file
    New {
        /// Map title (file name derived from it unless --file is given)
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Add a card, or a note under PARENT
    Add {
        /// Node text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Parent node id (omit for a new card)
        #[arg(short, long)]
        parent: Option<NodeId>,
    },

    /// List cards, or the children of NODE
    #[command(visible_alias = "ls")]
    List {
        /// Node whose children to list
        node: Option<NodeId>,
        /// Include all descendants
        #[arg(short = 'R', long)]
        recursive: bool,
    },

    /// Draw the map, or the subtree at NODE
    Tree {
        /// Subtree root
        node: Option<NodeId>,
    },

    /// Delete a node and everything under it
    #[command(visible_alias = "del")]
    Delete {
        /// Node id
        id: NodeId,
        /// Skip confirmation for cards
        #[arg(short, long)]
        yes: bool,
    },

    /// Find nodes whose text contains TEXT (case-insensitive)
    #[command(visible_alias = "find")]
    Search {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Replace a node's text
    Edit {
        /// Node id
        id: NodeId,
        /// New text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Re-parent a node
    #[command(visible_alias = "mv")]
    Move {
        /// Node to move
        id: NodeId,
        /// New parent id
        new_parent: NodeId,
    },

    /// Export the map as plain text (stdout when OUTPUT is omitted)
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// List map files in the data directory
    Maps,

    /// Interactive shell (default)
    Shell,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective config
    Show,

    /// Create config template
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
