use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// What the supervisor does with its targets on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Build,
    Test,
    Run,
}

impl Verb {
    /// Form used in status lines ("Building //foo:bar").
    pub fn progressive(self) -> &'static str {
        match self {
            Verb::Build => "Building",
            Verb::Test => "Testing",
            Verb::Run => "Running",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Build => "build",
            Verb::Test => "test",
            Verb::Run => "run",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "build" => Ok(Verb::Build),
            "test" => Ok(Verb::Test),
            "run" => Ok(Verb::Run),
            other => Err(format!(
                "invalid verb: {other} (expected \"build\", \"test\" or \"run\")"
            )),
        }
    }
}

/// Which event stream a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A source file of one of the targets changed; re-run only.
    Source,
    /// A BUILD file changed; the watch lists must be re-queried.
    Graph,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Source => f.write_str("source"),
            ChangeKind::Graph => f.write_str("graph"),
        }
    }
}

/// A single file change delivered by a watcher stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Targets plus the verb applied to them; fixed for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub verb: Verb,
    pub targets: Vec<String>,
}

impl WatchTarget {
    pub fn new(verb: Verb, targets: Vec<String>) -> Self {
        Self { verb, targets }
    }

    /// Targets joined with spaces, as used in queries and status lines.
    pub fn joined(&self) -> String {
        self.targets.join(" ")
    }
}
