//! View discovery: walking the views tree and classifying files.
//!
//! Every file under the root whose name ends with the configured extension
//! is either a **page** or a **partial**:
//!
//! - A file whose base name starts with [`PARTIAL_MARKER`] is a partial.
//! - A file inside the global partial directory is never a page, marker or not.
//! - Everything else is a page.
//!
//! Pages are addressed by their render name, the path relative to the root
//! without extension, joined with `/` on every platform:
//!
//! | File | Render name |
//! |------|-------------|
//! | `app/views/home.html` | `home` |
//! | `app/views/users/show.html` | `users/show` |
//! | `app/views/users/_row.html` | (partial, not a page) |
//! | `app/views/partials/nav.html` | (partial dir, not a page) |
//!
//! Each page is compiled from its compile set:
//! `[layout, page] ++ global partials ++ local partials`, where global
//! partials are the marker files directly inside the partial directory and
//! local partials are the marker files next to the page. Both lists are
//! sorted by path.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::ViewConfig;
use crate::error::ViewError;

/// Base-name prefix that marks a file as a partial.
pub const PARTIAL_MARKER: char = '_';

/// A page discovered during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFile {
    /// Render name without extension (e.g. `"users/show"`).
    pub name: String,
    /// Path to the file as found under the root.
    pub path: PathBuf,
    /// Marker files in the same directory, sorted.
    pub local_partials: Vec<PathBuf>,
}

impl ViewFile {
    /// Assembles the compile set for this page.
    ///
    /// The layout comes first so the page and its partials are added after it.
    pub fn compile_set(&self, layout: &Path, global_partials: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(2 + global_partials.len() + self.local_partials.len());
        files.push(layout.to_path_buf());
        files.push(self.path.clone());
        files.extend(global_partials.iter().cloned());
        files.extend(self.local_partials.iter().cloned());
        files
    }
}

/// Result of walking a views tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Marker files directly inside the global partial directory, sorted.
    pub global_partials: Vec<PathBuf>,
    /// Pages in walk order (sorted by path).
    pub pages: Vec<ViewFile>,
}

/// Walks the configured views tree and classifies every view file.
///
/// A missing root is not an error: it yields an empty [`Discovery`].
///
/// # Errors
///
/// Returns [`ViewError::Walk`] if the tree exists but cannot be read.
pub fn discover(config: &ViewConfig) -> Result<Discovery, ViewError> {
    let root = config.root();
    let extension = config.extension();
    let partial_dir = relative_components(config.partial_dir());

    let global_partials = if partial_dir.as_os_str().is_empty() {
        Vec::new()
    } else {
        find_partials(&config.partial_root(), extension)?
    };
    if config.debug() {
        for partial in &global_partials {
            log_partial(root, partial, extension);
        }
    }

    // Local partials are shared by every page of a directory; scan each once.
    let mut local_cache: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let mut pages = Vec::new();

    for path in walk_views(root, extension)? {
        if is_partial(&path) {
            continue;
        }
        if in_partial_dir(root, &partial_dir, &path) {
            debug!(path = %path.display(), "skipping non-partial file in partial directory");
            continue;
        }

        let Some(name) = render_name(root, &path, extension) else {
            debug!(path = %path.display(), "skipping view without a usable name");
            continue;
        };

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let local_partials = match local_cache.get(&dir) {
            Some(found) => found.clone(),
            None => {
                let found = find_partials(&dir, extension)?;
                if config.debug() {
                    for partial in &found {
                        log_partial(root, partial, extension);
                    }
                }
                local_cache.insert(dir, found.clone());
                found
            }
        };

        if config.debug() {
            debug!("{:<6} {:<25} --> {}", "LOAD", path.display(), name);
        }

        pages.push(ViewFile {
            name,
            path,
            local_partials,
        });
    }

    Ok(Discovery {
        global_partials,
        pages,
    })
}

/// Recursively collects every file under `root` ending with `extension`.
///
/// Results are sorted by path. A missing root yields an empty list.
pub fn walk_views(root: &Path, extension: &str) -> Result<Vec<PathBuf>, ViewError> {
    if !root.is_dir() {
        debug!(root = %root.display(), "views directory not found");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| ViewError::Walk {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Collects the partials directly inside `dir` (not recursive), sorted.
///
/// A missing directory yields an empty list.
pub fn find_partials(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ViewError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut partials = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ViewError::Walk {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && has_extension(path, extension) && is_partial(path) {
            partials.push(entry.into_path());
        }
    }
    Ok(partials)
}

/// Returns true if the file's base name starts with [`PARTIAL_MARKER`].
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(PARTIAL_MARKER))
}

/// Returns true if `path` lies inside `root / partial_dir`.
///
/// Comparison is by whole path components, so `partials-extra/` is not
/// inside `partials/`. An empty `partial_dir` matches nothing.
pub fn in_partial_dir(root: &Path, partial_dir: &Path, path: &Path) -> bool {
    let partial_dir = relative_components(partial_dir);
    if partial_dir.as_os_str().is_empty() {
        return false;
    }
    match path.strip_prefix(root) {
        Ok(relative) => relative.starts_with(&partial_dir),
        Err(_) => false,
    }
}

/// Computes the render name of `path`: its path relative to `root`, without
/// `extension`, with components joined by `/`.
///
/// Returns `None` if `path` is not under `root`, does not end with the
/// extension, or would produce an empty name.
pub fn render_name(root: &Path, path: &Path, extension: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = join_components(relative)?;
    let name = joined.strip_suffix(extension)?;
    let base = name.rsplit('/').next().unwrap_or(name);
    if base.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Joins the normal components of a relative path with `/`.
pub(crate) fn join_components(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(extension))
}

/// Keeps only the normal components of a configured relative directory,
/// so `./partials/` and `partials` compare equal.
fn relative_components(dir: &Path) -> PathBuf {
    dir.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn log_partial(root: &Path, partial: &Path, extension: &str) {
    let name = render_name(root, partial, extension).unwrap_or_default();
    debug!("{:<6} {:<25} --> {}", "LOAD Partial", partial.display(), name);
}
