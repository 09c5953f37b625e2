//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::{ColoredString, Colorize};

use crate::domain::{DefinitionRow, Status, TreeRow};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
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

/// Status token colored by polarity.
pub fn status_token(status: Status) -> ColoredString {
    let token = status.token();
    match status {
        Status::Included | Status::IncludedByAncestor => token.green(),
        Status::Excluded | Status::ExcludedByAncestor => token.red(),
        Status::Conflict => token.yellow().bold(),
        Status::Unknown => token.dimmed(),
    }
}

/// `├└ 73583000 Epicondylitis (disorder) (+)`
pub fn tree_row(row: &TreeRow, status: Status) {
    let label = format!("{} {}", row.code, row.term);
    let label = if row.included { label.normal() } else { label.dimmed() };
    println!("{}{} {}", row.prefix(), label, status_token(status));
}

/// Included code, then its excluded descendants indented.
pub fn definition_row(row: &DefinitionRow) {
    println!("{} {} {}", "+".green(), row.code, row.name);
    for excluded in &row.excluded_descendants {
        println!("  {} {} {}", "-".red(), excluded.code, excluded.name);
    }
}
