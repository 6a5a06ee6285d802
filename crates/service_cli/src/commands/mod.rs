//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod check;
pub mod probe;
pub mod solve;

/// Prints a boxed section title.
fn banner(title: &str) {
    println!("========================================");
    println!("{title}");
    println!("========================================");
}

/// Prints one aligned `label  value` line.
fn row(label: &str, value: impl std::fmt::Display) {
    println!("  {label:<22} {value}");
}
