//! Allow-list of filesystem roots every document path must live under.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{DocxError, Result};

/// Validates requested paths against a fixed set of canonical roots.
///
/// The root set is built once and never changes; callers pass the sandbox
/// explicitly to whatever needs to touch the filesystem.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    roots: Vec<PathBuf>,
}

impl PathSandbox {
    /// Builds a sandbox from the configured roots.
    ///
    /// Roots that exist are canonicalised. A missing root is kept in its
    /// normalised absolute form so that it starts matching as soon as it is
    /// created.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut canonical: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let resolved = match fs::canonicalize(root) {
                Ok(path) => path,
                Err(err) => {
                    warn!(
                        "Allowed root {:?} cannot be canonicalised ({}), using it as given",
                        root, err
                    );
                    match absolute_normalized(root) {
                        Ok(path) => path,
                        Err(_) => continue,
                    }
                }
            };
            if !canonical.contains(&resolved) {
                canonical.push(resolved);
            }
        }
        Self { roots: canonical }
    }

    /// The canonical roots, in configuration order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolves `path` and checks it against the allowed roots.
    ///
    /// Returns the resolved path, which is what all further I/O must use.
    /// With `must_exist` the resolved path must also reference an existing
    /// filesystem entry.
    pub fn validate(&self, path: impl AsRef<Path>, must_exist: bool) -> Result<PathBuf> {
        let requested = path.as_ref();
        let resolved = resolve(requested)?;

        if !self.roots.iter().any(|root| resolved.starts_with(root)) {
            warn!("Denied access to {:?} (resolved to {:?})", requested, resolved);
            return Err(DocxError::AccessDenied {
                path: requested.to_path_buf(),
                allowed: self.describe_roots(),
            });
        }

        if must_exist && !resolved.exists() {
            return Err(DocxError::NotFound(requested.to_path_buf()));
        }

        debug!("Validated {:?} as {:?}", requested, resolved);
        Ok(resolved)
    }

    fn describe_roots(&self) -> String {
        self.roots
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Absolute form with `.` and `..` folded away, without touching the disk.
fn absolute_normalized(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Symlinks followed by hand before giving up, matching the usual kernel
/// limit.
const MAX_LINK_HOPS: usize = 40;

/// Canonicalises the longest existing ancestor and re-appends the rest, so
/// symlinks are resolved even for files that do not exist yet.
fn resolve(path: &Path) -> Result<PathBuf> {
    resolve_following(path, 0)
}

fn resolve_following(path: &Path, hops: usize) -> Result<PathBuf> {
    let normalized = absolute_normalized(path)?;

    let mut existing = normalized.as_path();
    let mut pending: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            let mut resolved = canonical;
            for name in pending.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }
        // A dangling symlink cannot be canonicalised; resolve its target
        // instead of treating the link as a plain missing file.
        if let Ok(target) = fs::read_link(existing) {
            if hops >= MAX_LINK_HOPS {
                return Err(DocxError::Io(std::io::Error::other(format!(
                    "too many levels of symbolic links at {}",
                    existing.display()
                ))));
            }
            let mut followed = match existing.parent() {
                Some(parent) => parent.join(target),
                None => target,
            };
            for name in pending.iter().rev() {
                followed.push(name);
            }
            debug!("Following dangling link {:?} to {:?}", existing, followed);
            return resolve_following(&followed, hops + 1);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                pending.push(name);
                existing = parent;
            }
            _ => return Ok(normalized.clone()),
        }
    }
}
