//! Private working directory holding the adb binaries.

use crate::core::types::ExternalTool;
use crate::error::{Result, ToolkitError};
use crate::output::LogSink;
use log::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files copied from the bundle directory
#[cfg(windows)]
pub const BUNDLED_FILES: &[&str] = &["adb.exe", "fastboot.exe", "AdbWinApi.dll", "AdbWinUsbApi.dll"];
#[cfg(not(windows))]
pub const BUNDLED_FILES: &[&str] = &["adb", "fastboot"];

#[derive(Debug, Clone)]
pub struct ToolWorkspace {
    root: PathBuf,
    /// Set when `create` made the directory, so cleanup may remove all of it
    created: bool,
}

impl ToolWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            created: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed
    pub fn create(&mut self) -> Result<()> {
        if self.root.is_dir() {
            debug!("Reusing existing directory {}", self.root.display());
            return Ok(());
        }
        fs::create_dir_all(&self.root)?;
        self.created = true;
        Ok(())
    }

    /// Whether this workspace made its directory
    pub fn owns_root(&self) -> bool {
        self.created
    }

    /// Path of the provisioned adb executable
    pub fn adb_path(&self) -> PathBuf {
        self.root
            .join(format!("adb{}", std::env::consts::EXE_SUFFIX))
    }

    /// The adb tool inside this workspace, run from the workspace directory
    pub fn tool(&self) -> ExternalTool {
        ExternalTool::new(self.adb_path(), &self.root)
    }

    /// Copy bundled files that are not present yet. Returns the number copied.
    pub async fn provision(&self, bundle_dir: &Path, sink: &LogSink) -> usize {
        let mut copied = 0;
        for name in BUNDLED_FILES {
            let target = self.root.join(name);
            if target.exists() {
                debug!("{} already provisioned", target.display());
                continue;
            }

            let source = bundle_dir.join(name);
            if !source.is_file() {
                sink.error(format!("Resource '{}' not found in {}.", name, bundle_dir.display()))
                    .await;
                continue;
            }

            match fs::copy(&source, &target) {
                Ok(bytes) => {
                    debug!("Copied {} ({} bytes)", target.display(), bytes);
                    copied += 1;
                }
                Err(e) => {
                    sink.error(format!("Exception extracting resource '{}': {}", name, e))
                        .await;
                }
            }
        }
        copied
    }

    /// Delete provisioned files, then the directory. Failures are logged and
    /// skipped; returns the errors that occurred.
    ///
    /// A directory made by `create` is removed with everything in it. A
    /// directory that already existed only loses the bundled files, and is
    /// removed only if that leaves it empty.
    pub async fn cleanup(&self, sink: &LogSink) -> Vec<ToolkitError> {
        let mut errors = Vec::new();
        if !self.root.exists() {
            return errors;
        }

        let files: Vec<PathBuf> = if self.created {
            WalkDir::new(&self.root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect()
        } else {
            BUNDLED_FILES
                .iter()
                .map(|name| self.root.join(name))
                .filter(|path| path.is_file())
                .collect()
        };

        for path in files {
            match fs::remove_file(&path) {
                Ok(()) => sink.info(format!("Deleted file: {}", path.display())).await,
                Err(source) => {
                    let err = ToolkitError::Cleanup { path, source };
                    sink.error(err.to_string()).await;
                    errors.push(err);
                }
            }
        }

        let removed = if self.created {
            fs::remove_dir_all(&self.root)
        } else if is_empty_dir(&self.root) {
            fs::remove_dir(&self.root)
        } else {
            info!("Leaving {} in place, it holds other files", self.root.display());
            return errors;
        };

        match removed {
            Ok(()) => {
                sink.info(format!("Removed temporary directory: {}", self.root.display()))
                    .await
            }
            Err(source) => {
                let err = ToolkitError::Cleanup {
                    path: self.root.clone(),
                    source,
                };
                sink.error(err.to_string()).await;
                errors.push(err);
            }
        }

        errors
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_none())
}
