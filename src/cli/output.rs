//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::application::SaveOutcome;
use crate::domain::Node;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data/export statements)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// `text (ID: id)`, or just the text when ids are hidden.
pub fn node_label(node: &Node, show_ids: bool) -> String {
    if show_ids {
        node.to_string()
    } else {
        node.text.clone()
    }
}

/// One node per line, indented two spaces per level.
pub fn node_line(depth: usize, node: &Node, show_ids: bool) {
    println!("{}{}", "  ".repeat(depth), node_label(node, show_ids));
}

/// Print rendered trees, one after another.
pub fn trees(trees: &[Tree<String>]) {
    for tree in trees {
        print!("{}", tree);
    }
}

/// Report where a change went.
pub fn saved(outcome: &SaveOutcome) {
    match outcome {
        SaveOutcome::Saved(path) => detail(&format!("saved to {}", path.display()).dimmed()),
        SaveOutcome::Pending => detail(&"not saved yet (autosave off)".dimmed()),
    }
}
