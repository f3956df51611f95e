//! User-facing failures and the single-line error report printed on exit.

use std::path::PathBuf;
use thiserror::Error;

/// Failures the tool reports to the user by name. Anything else (I/O,
/// unparseable spec content) travels as a plain `anyhow::Error` with context.
#[derive(Debug, Error)]
pub enum DependError {
    #[error("malformed macro passed to --define: {}", quoted(.0))]
    MalformedDefine(Vec<String>),

    #[error("spec file name '{file}' does not match package name '{name}'")]
    NameMismatch { file: String, name: String },

    #[error("spec {} declares no binary packages", .0.display())]
    NoBinaryPackages(PathBuf),
}

fn quoted(items: &[String]) -> String {
    let parts: Vec<String> = items.iter().map(|s| format!("{:?}", s)).collect();
    format!("[{}]", parts.join(", "))
}

/// Flatten an error chain into the one line written to stderr.
pub fn error_line(err: &anyhow::Error) -> String {
    format!("error: {:#}", err)
}
