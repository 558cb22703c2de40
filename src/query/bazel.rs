// src/query/bazel.rs

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::errors::{IbazelError, Result};
use crate::exec::{BazelCli, BoxFuture};
use crate::query::rule::Rule;
use crate::query::Querier;

/// [`Querier`] that shells out to `bazel query` inside the workspace.
#[derive(Debug, Clone)]
pub struct BazelQuerier {
    bazel: BazelCli,
    workspace: PathBuf,
}

impl BazelQuerier {
    pub fn new(bazel: BazelCli, workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            bazel: bazel.with_workspace(workspace.clone()),
            workspace,
        }
    }

    async fn query(&self, output: &str, expr: String) -> Result<String> {
        self.bazel
            .capture("query", vec![format!("--output={output}"), expr.clone()])
            .await
            .map_err(|e| IbazelError::QueryError(format!("{expr}: {e}")))
    }
}

impl Querier for BazelQuerier {
    fn query_for_source_files(&self, query: String) -> BoxFuture<'_, Result<Vec<PathBuf>>> {
        Box::pin(async move {
            let stdout = self.query("label", query).await?;
            let files: Vec<PathBuf> = stdout
                .lines()
                .filter_map(|label| label_to_path(&self.workspace, label))
                .collect();
            debug!(count = files.len(), "query resolved to files");
            Ok(files)
        })
    }

    fn query_rule(&self, target: String) -> BoxFuture<'_, Result<Rule>> {
        Box::pin(async move {
            let stdout = self.query("build", target.clone()).await?;
            parse_rule(&stdout, &target)
        })
    }
}

/// Map a main-repository file label to a path inside `workspace`.
///
/// `//pkg/sub:file.go` becomes `<workspace>/pkg/sub/file.go`. Labels in
/// external repositories cannot be edited in place and yield `None`.
pub fn label_to_path(workspace: &Path, label: &str) -> Option<PathBuf> {
    let label = label.trim();
    let label = label.strip_prefix('@').map_or(label, |rest| {
        // `@//pkg` and `@@//pkg` refer to the main repository.
        rest.trim_start_matches('@')
    });
    let rest = label.strip_prefix("//")?;

    let (package, name) = match rest.split_once(':') {
        Some((package, name)) => (package, name),
        None => (rest, rest.rsplit('/').next().unwrap_or(rest)),
    };
    if name.is_empty() {
        return None;
    }

    let mut path = workspace.to_path_buf();
    if !package.is_empty() {
        path.push(package);
    }
    path.push(name);
    Some(path)
}

/// Read the rule kind, name and tags out of `bazel query --output=build`.
pub fn parse_rule(output: &str, target: &str) -> Result<Rule> {
    let regex = |pattern: &str| {
        Regex::new(pattern).map_err(|e| IbazelError::QueryError(format!("bad pattern: {e}")))
    };
    let kind_re = regex(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\($")?;
    let name_re = regex(r#"(?m)^\s*name\s*=\s*"([^"]*)""#)?;
    let tags_re = regex(r"(?s)\btags\s*=\s*\[(.*?)\]")?;
    let string_re = regex(r#""([^"]*)""#)?;

    let kind = kind_re
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| IbazelError::QueryError(format!("no rule found for {target}")))?;

    let name = name_re
        .captures(output)
        .and_then(|c| c.get(1))
        .map_or_else(|| target.to_string(), |m| m.as_str().to_string());

    let tags = tags_re
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|list| {
            string_re
                .captures_iter(list.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(Rule { name, kind, tags })
}
