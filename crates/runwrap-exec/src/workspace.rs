//! Ephemeral per-request working directories.
//!
//! A [`Workspace`] owns its directory: dropping it removes the tree, so every
//! exit path out of the pipeline cleans up, including unwinding.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// Exclusively owned scratch directory for one execution.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    name: String,
    removed: bool,
}

impl Workspace {
    /// Create `root/name` with permissive access.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Internal`] when the directory cannot be
    /// created or its permissions cannot be set. A directory created before
    /// the permission failure is removed again.
    pub async fn open(root: &Path, name: &str) -> PipelineResult<Self> {
        let path = root.join(name);
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| PipelineError::internal("create workspace", source))?;
        let workspace = Self {
            path,
            name: name.to_string(),
            removed: false,
        };
        workspace.open_permissions().await?;
        debug!(workspace = %workspace.path.display(), "workspace opened");
        Ok(workspace)
    }

    #[cfg(unix)]
    async fn open_permissions(&self) -> PipelineResult<()> {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o777))
            .await
            .map_err(|source| PipelineError::internal("set workspace permissions", source))
    }

    #[cfg(not(unix))]
    async fn open_permissions(&self) -> PipelineResult<()> {
        Ok(())
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name, which doubles as the session id.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a caller-supplied relative filename inside the workspace.
    ///
    /// Absolute paths and parent components are refused.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let candidate = Path::new(relative);
        let confined = !relative.is_empty()
            && candidate
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        confined.then(|| self.path.join(candidate))
    }

    /// Remove the directory now.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Internal`] when removal fails for a reason other
    /// than the directory already being gone.
    pub fn close(mut self) -> PipelineResult<()> {
        self.removed = true;
        remove_tree(&self.path).map_err(|source| PipelineError::internal("remove workspace", source))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(err) = remove_tree(&self.path) {
            warn!(workspace = %self.path.display(), error = %err, "workspace cleanup failed");
        }
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
