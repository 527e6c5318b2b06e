//! Interactive shell over one editing session.
//!
//! Lines are split shell-style and parsed with clap. The shell owns the
//! working location (`None` = top level); it is checked against the map
//! before every use, so a deleted location falls back to the top level.

use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::file_name_for_title;
use crate::application::Session;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::domain::NodeId;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::SelectionItem;
use crate::infrastructure::InfraError;

/// Commands accepted at the shell prompt.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "mindmap", no_binary_name = true, disable_help_subcommand = true)]
pub enum ShellCommand {
    /// Start a new map file and switch to it
    New {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        /// File to create (default: derived from the title, in the data directory)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load a map (pick from the data directory when PATH is omitted)
    Load { path: Option<PathBuf> },

    /// Save the map, optionally to another file
    Save {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Change location: a node id, `..` for the parent, `/` or nothing for the top level
    #[command(visible_alias = "cd")]
    Go { target: Option<String> },

    /// Add a node under the current location (or PARENT)
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(short, long)]
        parent: Option<NodeId>,
    },

    /// List nodes at the current location
    #[command(visible_alias = "ls")]
    List {
        #[arg(short = 'R', long)]
        recursive: bool,
    },

    /// Draw the tree at the current location
    Tree,

    /// Delete a node and its descendants
    #[command(visible_alias = "del")]
    Delete { id: NodeId },

    /// Find nodes containing TEXT
    #[command(visible_alias = "find")]
    Search {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Change a node's text (asks for it when omitted)
    Edit { id: NodeId, text: Vec<String> },

    /// Re-parent a node
    #[command(visible_alias = "mv")]
    Move { id: NodeId, new_parent: NodeId },

    /// Export as plain text (printed when PATH is omitted)
    Export { path: Option<PathBuf> },

    /// Show the current file
    #[command(visible_alias = "pwd")]
    File,

    /// Show help for all commands or one
    #[command(visible_alias = "h")]
    Help { command: Option<String> },

    /// Leave the shell
    #[command(visible_alias = "quit")]
    Exit,
}

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<'a> {
    container: &'a ServiceContainer,
    session: Session,
    location: Option<NodeId>,
}

impl<'a> Shell<'a> {
    pub fn new(container: &'a ServiceContainer) -> Self {
        Self {
            container,
            session: container.session(),
            location: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Open the startup map; failures are reported and leave nothing loaded.
    pub fn open(&mut self, path: &Path) {
        match self.session.open_or_create(path) {
            Ok(true) => output::info(&format!(
                "New map '{}' (not saved yet: {})",
                self.title(),
                path.display()
            )),
            Ok(false) => output::info(&format!(
                "Loaded '{}' ({} nodes) from {}",
                self.title(),
                self.session.map().map(|m| m.len()).unwrap_or(0),
                path.display()
            )),
            Err(e) => output::error(&e),
        }
    }

    /// Read and execute lines until `exit` or end of input.
    pub fn run(&mut self) -> CliResult<()> {
        output::header(&"mindmap shell: 'help' lists commands, 'exit' leaves");
        loop {
            let prompt = self.prompt();
            let line = self
                .container
                .prompter
                .read_line(&prompt)
                .map_err(|e| InfraError::io("read command", e))?;
            let Some(line) = line else { break };

            match self.execute_line(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) => output::error(&e),
            }
        }
        self.finish()
    }

    /// Parse and run one input line.
    #[instrument(level = "debug", skip(self))]
    pub fn execute_line(&mut self, line: &str) -> CliResult<Flow> {
        let words = split_line(line).map_err(CliError::InvalidArgs)?;
        if words.is_empty() {
            return Ok(Flow::Continue);
        }
        match ShellCommand::try_parse_from(&words) {
            Ok(command) => self.execute(command),
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                output::info(&e);
                Ok(Flow::Continue)
            }
            Err(e) => {
                let rendered = e.to_string();
                let first = rendered.lines().next().unwrap_or_default();
                Err(CliError::InvalidArgs(
                    first.strip_prefix("error: ").unwrap_or(first).to_string(),
                ))
            }
        }
    }

    pub fn execute(&mut self, command: ShellCommand) -> CliResult<Flow> {
        debug!("execute: {:?}", command);
        match command {
            ShellCommand::New { title, file, force } => self.new_map(&title.join(" "), file, force)?,
            ShellCommand::Load { path } => self.load(path)?,
            ShellCommand::Save { file } => self.save(file)?,
            ShellCommand::Go { target } => self.go(target.as_deref())?,
            ShellCommand::Add { text, parent } => self.add(&text.join(" "), parent)?,
            ShellCommand::List { recursive } => self.list(recursive)?,
            ShellCommand::Tree => self.tree()?,
            ShellCommand::Delete { id } => self.delete(&id)?,
            ShellCommand::Search { text } => self.search(&text.join(" "))?,
            ShellCommand::Edit { id, text } => self.edit(&id, &text.join(" "))?,
            ShellCommand::Move { id, new_parent } => self.move_node(&id, &new_parent)?,
            ShellCommand::Export { path } => self.export(path)?,
            ShellCommand::File => self.file(),
            ShellCommand::Help { command } => help(command.as_deref())?,
            ShellCommand::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    /// Current location, reset to the top level when its node is gone.
    pub fn location(&mut self) -> Option<NodeId> {
        let id = self.location?;
        let exists = self.session.map().is_ok_and(|map| map.contains(&id));
        if !exists {
            output::warning(&"current location no longer exists, back at top level");
            self.location = None;
        }
        self.location
    }

    fn title(&self) -> String {
        self.session
            .map()
            .map(|m| m.title().to_string())
            .unwrap_or_default()
    }

    fn prompt(&mut self) -> String {
        if !self.session.is_loaded() {
            return "mindmap>".into();
        }
        let dirty = if self.session.is_dirty() { "*" } else { "" };
        let trail = match (self.location(), self.session.map()) {
            (Some(id), Ok(map)) => map
                .path(&id)
                .map(|nodes| nodes.iter().map(|n| n.text.as_str()).join("/"))
                .unwrap_or_default(),
            _ => String::new(),
        };
        format!("{}{}:/{}>", self.title(), dirty, trail)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.container.settings.resolve_map_path(path)
    }

    /// Ask before throwing away unsaved changes.
    fn discard_ok(&self) -> CliResult<bool> {
        if !self.session.is_dirty() {
            return Ok(true);
        }
        self.container
            .prompter
            .confirm("Discard unsaved changes?")
            .map_err(|e| InfraError::io("read confirmation", e).into())
    }

    fn new_map(&mut self, title: &str, file: Option<PathBuf>, force: bool) -> CliResult<()> {
        if !self.discard_ok()? {
            return Ok(());
        }
        let path = match file {
            Some(file) => self.resolve(&file),
            None => self
                .container
                .settings
                .data_dir
                .join(file_name_for_title(title)),
        };
        self.session.new_map(&path, title, force)?;
        self.location = None;
        output::success(&format!("Created map '{}' at {}", title.trim(), path.display()));
        Ok(())
    }

    fn load(&mut self, path: Option<PathBuf>) -> CliResult<()> {
        let path = match path {
            Some(path) => self.resolve(&path),
            None => match self.pick_map()? {
                Some(path) => path,
                None => {
                    output::info(&"No map selected.");
                    return Ok(());
                }
            },
        };
        if !self.discard_ok()? {
            return Ok(());
        }
        self.session.load(&path)?;
        self.location = None;
        output::success(&format!(
            "Loaded '{}' ({} nodes) from {}",
            self.title(),
            self.session.map()?.len(),
            path.display()
        ));
        Ok(())
    }

    /// Fuzzy-pick a map file from the data directory.
    fn pick_map(&self) -> CliResult<Option<PathBuf>> {
        let data_dir = &self.container.settings.data_dir;
        let maps = self.session.storage().list_maps(data_dir)?;
        if maps.is_empty() {
            output::info(&format!("No maps in {}", data_dir.display()));
            return Ok(None);
        }
        let items: Vec<SelectionItem> = maps
            .iter()
            .map(|path| SelectionItem {
                display: pathdiff::diff_paths(path, data_dir)
                    .unwrap_or_else(|| path.clone())
                    .display()
                    .to_string(),
                value: path.display().to_string(),
            })
            .collect();
        let selected = self
            .container
            .selector
            .select_one(&items, "map> ")
            .map_err(|message| InfraError::Selector { message })?;
        Ok(selected.map(|item| PathBuf::from(item.value)))
    }

    fn save(&mut self, file: Option<PathBuf>) -> CliResult<()> {
        let target = file.map(|f| self.resolve(&f));
        let path = self.session.save(target.as_deref())?;
        output::success(&format!("Saved to {}", path.display()));
        Ok(())
    }

    fn go(&mut self, target: Option<&str>) -> CliResult<()> {
        let map = self.session.map()?;
        self.location = match target.map(str::trim) {
            None | Some("/") | Some("") => None,
            Some("..") => self
                .location
                .and_then(|id| map.get(&id))
                .and_then(|node| node.parent_id),
            Some(raw) => {
                let id: NodeId = raw.parse()?;
                Some(map.node(&id)?.id())
            }
        };
        Ok(())
    }

    fn add(&mut self, text: &str, parent: Option<NodeId>) -> CliResult<()> {
        let parent = parent.or_else(|| self.location());
        let (id, outcome) = self.session.add_node(text, parent.as_ref())?;
        output::success(&format!("Added '{}' (ID: {})", text.trim(), id));
        output::saved(&outcome);
        Ok(())
    }

    fn list(&mut self, recursive: bool) -> CliResult<()> {
        let location = self.location();
        let map = self.session.map()?;
        let show_ids = self.container.settings.show_ids;
        if location.is_none() && map.is_empty() {
            output::info(&"(empty map)");
            return Ok(());
        }
        match (recursive, location) {
            (false, location) => {
                for child in map.list_children(location.as_ref())? {
                    output::node_line(0, child, show_ids);
                }
            }
            (true, Some(id)) => {
                for (depth, node) in map.iter_subtree(&id).skip(1) {
                    output::node_line(depth - 1, node, show_ids);
                }
            }
            (true, None) => {
                for (depth, node) in map.iter() {
                    output::node_line(depth, node, show_ids);
                }
            }
        }
        Ok(())
    }

    fn tree(&mut self) -> CliResult<()> {
        let location = self.location();
        let map = self.session.map()?;
        let show_ids = self.container.settings.show_ids;
        if location.is_none() && map.is_empty() {
            output::info(&"(empty map)");
            return Ok(());
        }
        let trees = map.render_tree_with(location.as_ref(), |n| output::node_label(n, show_ids))?;
        output::trees(&trees);
        Ok(())
    }

    fn delete(&mut self, id: &NodeId) -> CliResult<()> {
        let preview = self.session.delete_preview(id)?;
        let mut confirmed = false;
        if preview.requires_confirmation {
            let question = format!(
                "Delete card '{}' and {} node(s) under it?",
                preview.text,
                preview.ids.len() - 1
            );
            confirmed = self
                .container
                .prompter
                .confirm(&question)
                .map_err(|e| InfraError::io("read confirmation", e))?;
            if !confirmed {
                output::info(&"Deletion cancelled.");
                return Ok(());
            }
        }
        let (removed, outcome) = self.session.delete_node(id, confirmed)?;
        output::success(&format!("Deleted '{}' ({} node(s))", preview.text, removed.len()));
        output::saved(&outcome);
        Ok(())
    }

    fn search(&self, text: &str) -> CliResult<()> {
        let map = self.session.map()?;
        let show_ids = self.container.settings.show_ids;
        let mut found = 0;
        for node in map.find_text(text) {
            found += 1;
            let trail = map.path(&node.id())?.iter().map(|n| n.text.as_str()).join(" > ");
            if show_ids {
                output::info(&format!("{}  (ID: {})", trail, node.id()));
            } else {
                output::info(&trail);
            }
        }
        if found == 0 {
            output::info(&format!("No nodes match '{}'", text));
        }
        Ok(())
    }

    fn edit(&mut self, id: &NodeId, text: &str) -> CliResult<()> {
        let text = if text.trim().is_empty() {
            let current = self.session.map()?.node(id)?.text.clone();
            let answer = self
                .container
                .prompter
                .read_line(&format!("New text for '{}':", current))
                .map_err(|e| InfraError::io("read text", e))?;
            match answer {
                Some(answer) if !answer.trim().is_empty() => answer,
                _ => {
                    output::info(&"Edit cancelled.");
                    return Ok(());
                }
            }
        } else {
            text.to_string()
        };
        let (old, outcome) = self.session.edit_node(id, &text)?;
        output::success(&format!("Renamed '{}' to '{}'", old, text.trim()));
        output::saved(&outcome);
        Ok(())
    }

    fn move_node(&mut self, id: &NodeId, new_parent: &NodeId) -> CliResult<()> {
        let ((), outcome) = self.session.move_node(id, new_parent)?;
        let map = self.session.map()?;
        output::success(&format!(
            "Moved '{}' under '{}'",
            map.node(id)?.text,
            map.node(new_parent)?.text
        ));
        output::saved(&outcome);
        Ok(())
    }

    fn export(&self, path: Option<PathBuf>) -> CliResult<()> {
        let map = self.session.map()?;
        match path {
            Some(path) => {
                self.session.storage().export(map, &path)?;
                output::success(&format!("Exported '{}' to {}", map.title(), path.display()));
            }
            None => print!("{}", map.export_text()?),
        }
        Ok(())
    }

    fn file(&self) {
        match (self.session.path(), self.session.map()) {
            (Some(path), Ok(map)) => {
                let state = if self.session.is_dirty() { " (unsaved changes)" } else { "" };
                output::action("File", &format!("{}{}", path.display(), state));
                output::action("Title", &map.title());
                output::action("Nodes", &map.len());
            }
            _ => output::info(&"No map loaded."),
        }
    }

    /// Offer to save pending changes on the way out.
    fn finish(&mut self) -> CliResult<()> {
        if !self.session.is_dirty() {
            return Ok(());
        }
        let save = self
            .container
            .prompter
            .confirm("Save changes before leaving?")
            .map_err(|e| InfraError::io("read confirmation", e))?;
        if save {
            let path = self.session.save(None)?;
            output::success(&format!("Saved to {}", path.display()));
        }
        Ok(())
    }
}

fn help(command: Option<&str>) -> CliResult<()> {
    let mut cmd = ShellCommand::command();
    let shown = match command {
        Some(name) => match cmd.find_subcommand_mut(name) {
            Some(sub) => sub.render_long_help(),
            None => return Err(CliError::Usage(format!("unknown command '{}'", name))),
        },
        None => cmd.render_help(),
    };
    output::info(&shown);
    Ok(())
}

/// Split a line into words; single or double quotes group words and a
/// backslash escapes the next character outside single quotes.
pub fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_word = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_word = true;
            }
            '\\' if !in_single_quote => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    in_word = true;
                }
                None => return Err("trailing backslash".into()),
            },
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_single_quote || in_double_quote {
        return Err("unterminated quote".into());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
