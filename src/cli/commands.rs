//! One-shot command dispatch: load the map, run one operation, save.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::file_name_for_title;
use crate::application::{ApplicationError, Session};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::shell::Shell;
use crate::config::{global_config_dir, global_config_path, Settings};
use crate::domain::NodeId;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the command selected on the command line.
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    let file = cli.file.as_deref();
    match &cli.command {
        None | Some(Commands::Shell) => cmd_shell(container, file),
        Some(Commands::New { title, force }) => cmd_new(container, file, &title.join(" "), *force),
        Some(Commands::Add { text, parent }) => {
            cmd_add(container, file, &text.join(" "), parent.as_ref())
        }
        Some(Commands::List { node, recursive }) => {
            cmd_list(container, file, node.as_ref(), *recursive)
        }
        Some(Commands::Tree { node }) => cmd_tree(container, file, node.as_ref()),
        Some(Commands::Delete { id, yes }) => cmd_delete(container, file, id, *yes),
        Some(Commands::Search { text }) => cmd_search(container, file, &text.join(" ")),
        Some(Commands::Edit { id, text }) => cmd_edit(container, file, id, &text.join(" ")),
        Some(Commands::Move { id, new_parent }) => cmd_move(container, file, id, new_parent),
        Some(Commands::Export { output }) => cmd_export(container, file, output.as_deref()),
        Some(Commands::Maps) => cmd_maps(container),
        Some(Commands::Config { command }) => cmd_config(container, command),
        // Completions need the clap Command; main.rs handles them before dispatch
        Some(Commands::Completion { .. }) => Err(CliError::Usage(
            "completion is generated by the binary entry point".into(),
        )),
    }
}

/// `--file` resolved against the data directory, or the configured default map.
pub fn map_path(settings: &Settings, file: Option<&Path>) -> PathBuf {
    match file {
        Some(path) => settings.resolve_map_path(path),
        None => settings.default_map_path(),
    }
}

/// One-shot commands always persist their change.
fn open_session(container: &ServiceContainer, file: Option<&Path>) -> CliResult<Session> {
    let mut session = Session::new(container.storage(), true);
    session.load(&map_path(&container.settings, file))?;
    Ok(session)
}

fn cmd_shell(container: &ServiceContainer, file: Option<&Path>) -> CliResult<()> {
    let mut shell = Shell::new(container);
    shell.open(&map_path(&container.settings, file));
    shell.run()
}

#[instrument(level = "debug", skip(container))]
fn cmd_new(
    container: &ServiceContainer,
    file: Option<&Path>,
    title: &str,
    force: bool,
) -> CliResult<()> {
    let path = match file {
        Some(path) => container.settings.resolve_map_path(path),
        None => container.settings.data_dir.join(file_name_for_title(title)),
    };
    let mut session = container.session();
    session.new_map(&path, title, force)?;
    output::success(&format!("Created map '{}' at {}", title.trim(), path.display()));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_add(
    container: &ServiceContainer,
    file: Option<&Path>,
    text: &str,
    parent: Option<&NodeId>,
) -> CliResult<()> {
    let mut session = Session::new(container.storage(), true);
    let path = map_path(&container.settings, file);
    if session.open_or_create(&path)? {
        debug!("cmd_add: starting {}", path.display());
    }
    let (id, outcome) = session.add_node(text, parent)?;
    let kind = if parent.is_some() { "note" } else { "card" };
    output::success(&format!("Added {} '{}' (ID: {})", kind, text.trim(), id));
    output::saved(&outcome);
    Ok(())
}

fn cmd_list(
    container: &ServiceContainer,
    file: Option<&Path>,
    node: Option<&NodeId>,
    recursive: bool,
) -> CliResult<()> {
    let session = open_session(container, file)?;
    let map = session.map()?;
    let show_ids = container.settings.show_ids;

    if recursive {
        match node {
            Some(id) => {
                map.node(id)?;
                // Children only; the node itself is the heading
                for (depth, child) in map.iter_subtree(id).skip(1) {
                    output::node_line(depth - 1, child, show_ids);
                }
            }
            None => {
                for (depth, n) in map.iter() {
                    output::node_line(depth, n, show_ids);
                }
            }
        }
    } else {
        for child in map.list_children(node)? {
            output::node_line(0, child, show_ids);
        }
    }
    Ok(())
}

fn cmd_tree(container: &ServiceContainer, file: Option<&Path>, node: Option<&NodeId>) -> CliResult<()> {
    let session = open_session(container, file)?;
    let map = session.map()?;
    let show_ids = container.settings.show_ids;
    if node.is_none() && map.is_empty() {
        output::info(&"(empty map)");
        return Ok(());
    }
    let trees = map.render_tree_with(node, |n| output::node_label(n, show_ids))?;
    output::trees(&trees);
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_delete(
    container: &ServiceContainer,
    file: Option<&Path>,
    id: &NodeId,
    yes: bool,
) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    let preview = session.delete_preview(id)?;

    let mut confirmed = yes;
    if preview.requires_confirmation && !confirmed {
        let question = format!(
            "Delete card '{}' and {} node(s) under it?",
            preview.text,
            preview.ids.len() - 1
        );
        confirmed = container
            .prompter
            .confirm(&question)
            .map_err(|e| InfraError::io("read confirmation", e))?;
        if !confirmed {
            output::info(&"Deletion cancelled.");
            return Ok(());
        }
    }

    let (removed, outcome) = session.delete_node(id, confirmed)?;
    output::success(&format!("Deleted '{}' ({} node(s))", preview.text, removed.len()));
    output::saved(&outcome);
    Ok(())
}

fn cmd_search(container: &ServiceContainer, file: Option<&Path>, text: &str) -> CliResult<()> {
    let session = open_session(container, file)?;
    let map = session.map()?;
    let show_ids = container.settings.show_ids;

    let mut hits = map.find_text(text).peekable();
    if hits.peek().is_none() {
        output::info(&format!("No nodes match '{}'", text));
        return Ok(());
    }
    for node in hits {
        let path = map.path(&node.id())?.iter().map(|n| n.text.as_str()).join(" > ");
        if show_ids {
            output::info(&format!("{}  (ID: {})", path, node.id()));
        } else {
            output::info(&path);
        }
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_edit(container: &ServiceContainer, file: Option<&Path>, id: &NodeId, text: &str) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    let (old, outcome) = session.edit_node(id, text)?;
    output::success(&format!("Renamed '{}' to '{}'", old, text.trim()));
    output::saved(&outcome);
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    file: Option<&Path>,
    id: &NodeId,
    new_parent: &NodeId,
) -> CliResult<()> {
    let mut session = open_session(container, file)?;
    let ((), outcome) = session.move_node(id, new_parent)?;
    let map = session.map()?;
    output::success(&format!(
        "Moved '{}' under '{}'",
        map.node(id)?.text,
        map.node(new_parent)?.text
    ));
    output::saved(&outcome);
    Ok(())
}

fn cmd_export(container: &ServiceContainer, file: Option<&Path>, target: Option<&Path>) -> CliResult<()> {
    let session = open_session(container, file)?;
    let map = session.map()?;
    match target {
        Some(path) => {
            session.storage().export(map, path)?;
            output::success(&format!("Exported '{}' to {}", map.title(), path.display()));
        }
        None => print!("{}", map.export_text()?),
    }
    Ok(())
}

fn cmd_maps(container: &ServiceContainer) -> CliResult<()> {
    let data_dir = &container.settings.data_dir;
    let maps = container.storage().list_maps(data_dir)?;
    if maps.is_empty() {
        output::info(&format!("No maps in {}", data_dir.display()));
        return Ok(());
    }
    output::header(&data_dir.display());
    for path in maps {
        let shown = pathdiff::diff_paths(&path, data_dir).unwrap_or(path);
        output::detail(&shown.display());
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            let path = global_config_path().ok_or_else(|| ApplicationError::Config {
                message: "cannot determine config directory".into(),
            })?;
            if container.fs.exists(&path) && !force {
                return Err(ApplicationError::AlreadyExists(path).into());
            }
            container
                .fs
                .ensure_parent(&path)
                .and_then(|()| container.fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created config: {}", path.display()));
        }
        ConfigCommands::Path => {
            match global_config_dir() {
                Some(dir) => output::action("Config dir", &dir.display()),
                None => output::warning(&"cannot determine config directory"),
            }
            if let Some(path) = global_config_path() {
                let state = if container.fs.exists(&path) { "" } else { " (not found)" };
                output::action("Global config", &format!("{}{}", path.display(), state));
            }
            output::action("Data dir", &container.settings.data_dir.display());
            output::action("Default map", &container.settings.default_map_path().display());
        }
    }
    Ok(())
}
