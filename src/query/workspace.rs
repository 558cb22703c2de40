use std::path::{Path, PathBuf};

use crate::errors::{IbazelError, Result};

/// Files marking the root of a Bazel workspace.
pub const WORKSPACE_MARKERS: [&str; 3] = ["MODULE.bazel", "WORKSPACE.bazel", "WORKSPACE"];

/// Walk up from `start` to the nearest directory holding a workspace marker.
pub fn find_workspace(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| WORKSPACE_MARKERS.iter().any(|m| dir.join(m).is_file()))
        .map(Path::to_path_buf)
        .ok_or_else(|| IbazelError::WorkspaceNotFound(start.display().to_string()))
}
