// src/query/mod.rs

//! Dependency-graph queries.
//!
//! The control loop only needs two answers from the build graph: which files
//! to watch, and the metadata of the rule it is about to run. Both sit behind
//! the [`Querier`] trait; [`BazelQuerier`] answers them with `bazel query`.

pub mod bazel;
pub mod rule;
pub mod workspace;

use std::path::PathBuf;

use crate::errors::Result;
use crate::exec::BoxFuture;

pub use bazel::{label_to_path, parse_rule, BazelQuerier};
pub use rule::{Rule, NOTIFY_TAG};
pub use workspace::{find_workspace, WORKSPACE_MARKERS};

/// Source of watch lists and rule metadata.
pub trait Querier: Send + Sync {
    /// Evaluate a query expression and return the files it names.
    fn query_for_source_files(&self, query: String) -> BoxFuture<'_, Result<Vec<PathBuf>>>;

    /// Metadata (kind, tags) of a single target.
    fn query_rule(&self, target: String) -> BoxFuture<'_, Result<Rule>>;
}

/// Query naming every BUILD/.bzl file the targets' graph depends on.
pub fn build_files_query(targets: &[String]) -> String {
    format!("buildfiles(deps(set({})))", targets.join(" "))
}

/// Query naming every source file in the targets' transitive closure.
pub fn source_files_query(targets: &[String]) -> String {
    format!("kind('source file', deps(set({})))", targets.join(" "))
}
