// Resource Scope
// Scoped temporary workspace for one detector invocation: a uniquely named
// directory plus any extra paths registered during decomposition. Release is
// best-effort and idempotent; deletion failures are logged at warn and never
// surfaced as the invocation's outcome. Drop releases too, so early returns
// and panics cannot leak the workspace.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

pub struct ResourceScope {
    root: PathBuf,
    registered: Vec<PathBuf>,
    released: bool,
}

impl ResourceScope {
    /// Create a fresh workspace directory under the system temp dir.
    pub fn acquire() -> std::io::Result<Self> {
        Self::acquire_in(&std::env::temp_dir())
    }

    /// Create a fresh workspace directory under `base`. The uuid-derived name
    /// guarantees concurrent invocations never collide on temp paths.
    pub fn acquire_in(base: &Path) -> std::io::Result<Self> {
        let root = base.join(format!("deepsift-{}", Uuid::new_v4()));
        fs::create_dir_all(&root)?;
        debug!(workspace = %root.display(), "resource scope acquired");
        Ok(Self {
            root,
            registered: Vec::new(),
            released: false,
        })
    }

    /// Workspace directory for materializing temp artifacts.
    pub fn dir(&self) -> &Path {
        &self.root
    }

    /// Track an additional owned file or directory for cleanup.
    pub fn register(&mut self, path: PathBuf) {
        self.registered.push(path);
    }

    /// Delete all registered paths and the workspace directory. Safe to call
    /// more than once; later calls are no-ops.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for path in self.registered.drain(..) {
            if !path.exists() {
                continue;
            }
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "failed to remove temp artifact");
            }
        }

        if self.root.exists() {
            if let Err(e) = fs::remove_dir_all(&self.root) {
                warn!(workspace = %self.root.display(), error = %e, "failed to remove workspace");
                return;
            }
        }
        debug!(workspace = %self.root.display(), "resource scope released");
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        self.release();
    }
}
