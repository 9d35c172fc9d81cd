//! Local filesystem preparation: the backup directory, the uploads directory
//! probe, the run lock, and the maintenance sentinel.

use std::fs::File;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use fs2::FileExt;
use tracing::{info, warn};

use super::PullError;

/// Lock file created inside the backup directory for the duration of a pull.
pub const LOCK_FILE: &str = ".wp-sync.lock";

/// Marker written while maintenance mode is active.
pub const SENTINEL_FILE: &str = ".maintenance";

/// The local site root and the directories a pull writes to.
#[derive(Clone, Debug)]
pub struct LocalTree {
    root: Utf8PathBuf,
}

impl LocalTree {
    /// Creates a tree rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Site root every relative path is resolved against.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolves `relative` against the site root. Absolute paths are kept.
    #[must_use]
    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Returns `true` when `relative` names an existing directory.
    #[must_use]
    pub fn is_dir(&self, relative: &str) -> bool {
        Dir::open_ambient_dir(self.path(relative), ambient_authority()).is_ok()
    }

    /// Creates `relative`, including parents, when it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Workspace`] when the directory cannot be created.
    pub fn ensure_dir(&self, relative: &str) -> Result<Utf8PathBuf, PullError> {
        let path = self.path(relative);
        if self.is_dir(relative) {
            return Ok(path);
        }

        info!("Creating backup directory: {relative}");
        Dir::create_ambient_dir_all(&path, ambient_authority())
            .map_err(|err| workspace_error(&path, &err))?;
        Ok(path)
    }

    /// Picks the uploads directory to mirror into.
    ///
    /// The configured directory wins when it exists; otherwise `fallback` is
    /// used when it exists.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::MissingUploadDir`] when neither exists.
    pub fn effective_upload_dir(
        &self,
        configured: &str,
        fallback: &str,
    ) -> Result<String, PullError> {
        if self.is_dir(configured) {
            return Ok(configured.to_owned());
        }
        if self.is_dir(fallback) {
            info!("Uploads directory {configured} not found, using {fallback}");
            return Ok(fallback.to_owned());
        }
        Err(PullError::MissingUploadDir {
            configured: configured.to_owned(),
            fallback: fallback.to_owned(),
        })
    }

    /// Takes the exclusive run lock inside `backup_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::AlreadyRunning`] when another process holds the
    /// lock, or [`PullError::Workspace`] when the lock file cannot be opened.
    pub fn lock(&self, backup_dir: &Utf8Path) -> Result<PullLock, PullError> {
        let path = backup_dir.join(LOCK_FILE);
        let dir = Dir::open_ambient_dir(backup_dir, ambient_authority())
            .map_err(|err| workspace_error(backup_dir, &err))?;
        let file = dir
            .create(LOCK_FILE)
            .map(cap_std::fs_utf8::File::into_std)
            .map_err(|err| workspace_error(&path, &err))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(PullLock { _file: file }),
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(PullError::AlreadyRunning { path })
            }
            Err(err) => Err(workspace_error(&path, &err)),
        }
    }

    /// Maintenance sentinel kept inside `backup_dir`.
    #[must_use]
    pub fn sentinel(&self, backup_dir: &Utf8Path) -> MaintenanceSentinel {
        MaintenanceSentinel {
            path: backup_dir.join(SENTINEL_FILE),
        }
    }
}

/// Exclusive lock held for the lifetime of one pull. Released on drop.
#[derive(Debug)]
pub struct PullLock {
    _file: File,
}

/// Marker recording that a pull activated maintenance mode and has not yet
/// deactivated it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MaintenanceSentinel {
    path: Utf8PathBuf,
}

impl MaintenanceSentinel {
    /// Location of the marker.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns `true` when the marker exists.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.split()
            .is_some_and(|(dir, name)| dir.exists(name))
    }

    /// Writes the marker. Failures are logged: the marker only aids recovery.
    pub fn mark(&self) {
        let written = self
            .split()
            .map(|(dir, name)| dir.write(name, b"maintenance mode activated by wp-sync\n"));
        if !matches!(written, Some(Ok(()))) {
            warn!(path = %self.path, "could not write maintenance sentinel");
        }
    }

    /// Removes the marker if present.
    pub fn clear(&self) {
        let Some((dir, name)) = self.split() else {
            return;
        };
        if dir.exists(name) && dir.remove_file(name).is_err() {
            warn!(path = %self.path, "could not remove maintenance sentinel");
        }
    }

    fn split(&self) -> Option<(Dir, &str)> {
        let parent = self.path.parent()?;
        let name = self.path.file_name()?;
        Dir::open_ambient_dir(parent, ambient_authority())
            .ok()
            .map(|dir| (dir, name))
    }
}

fn workspace_error(path: &Utf8Path, err: &io::Error) -> PullError {
    PullError::Workspace {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
