//! Shallow mind maps: a forest of cards, each holding at most two levels of
//! notes, kept in a JSON file and edited from the command line or a shell.
//!
//! Layers, innermost first:
//! - [`domain`]: the tree manager ([`domain::MindMap`]) and its invariants
//! - [`application`]: storage and the editing [`application::Session`]
//! - [`infrastructure`]: filesystem, picker and prompt implementations
//! - [`cli`]: argument parsing, one-shot commands and the shell

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
