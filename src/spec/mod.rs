//! Spec layer: the read-only accessor contract the graph is built from, plus
//! the concrete `.spec` file reader and `--define` handling.
//!
//! Graph construction only ever sees `dyn Spec`-shaped values through this
//! trait; `RpmSpec` is one adapter, tests use an in-memory one.

pub mod macros;
pub mod rpm;

pub use macros::{Define, parse_defines, with_deprecated};
pub use rpm::{RpmSpec, SpecOptions};

use std::collections::BTreeSet;
use std::path::Path;

/// A package build definition as seen by the dependency graph.
pub trait Spec {
    /// Package identity (the main package's name).
    fn name(&self) -> &str;

    /// Location of the definition file itself.
    fn spec_path(&self) -> &Path;

    /// Local paths of every declared source, in declaration order.
    fn source_paths(&self) -> &[String];

    /// URLs matching `source_paths` one-to-one. Empty means not fetchable.
    fn source_urls(&self) -> &[String];

    /// The single source package (SRPM) this spec builds.
    fn source_package_path(&self) -> &str;

    /// Binary packages in declaration order.
    fn binary_package_paths(&self) -> &[String];

    fn provides(&self) -> &BTreeSet<String>;

    fn build_requires(&self) -> &BTreeSet<String>;

    /// The representative binary package: the last one declared.
    ///
    /// One rpmbuild run produces every binary package at once, so the graph
    /// uses a single node per spec rather than one per output.
    fn primary_binary_path(&self) -> Option<&str> {
        self.binary_package_paths().last().map(String::as_str)
    }
}
