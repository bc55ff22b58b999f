//! Immutable registry configuration.
//!
//! [`ViewConfig`] describes where views live and how they are named. It is
//! built once at startup, either in code through the consuming `with_*`
//! methods or from a YAML/JSON document, and handed to
//! [`ViewRegistry::new`](crate::ViewRegistry::new).
//!
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | `root` | `app/views/` | Root of the views tree |
//! | `partial_dir` | `partials/` | Global partial directory, relative to `root` |
//! | `layout` | `layouts/base` | Layout file, relative to `root`, without extension |
//! | `extension` | `.html` | Extension of every view file |
//! | `debug` | `false` | Log each discovered page and partial |
//!
//! Function bindings ([`FuncMap`]) can only be set in code.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::funcs::FuncMap;

pub const DEFAULT_ROOT: &str = "app/views/";
pub const DEFAULT_PARTIAL_DIR: &str = "partials/";
pub const DEFAULT_LAYOUT: &str = "layouts/base";
pub const DEFAULT_EXTENSION: &str = ".html";

/// Configuration for view discovery and compilation.
///
/// # Example
///
/// ```rust
/// use viewset::ViewConfig;
///
/// let config = ViewConfig::new()
///     .with_root("site/views")
///     .with_extension("tmpl")
///     .with_debug(true);
///
/// assert_eq!(config.extension(), ".tmpl");
/// assert_eq!(config.layout(), "layouts/base");
/// assert!(config.layout_file().ends_with("layouts/base.tmpl"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    root: PathBuf,
    partial_dir: PathBuf,
    layout: String,
    extension: String,
    debug: bool,
    #[serde(skip)]
    funcs: FuncMap,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            partial_dir: PathBuf::from(DEFAULT_PARTIAL_DIR),
            layout: DEFAULT_LAYOUT.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            debug: false,
            funcs: FuncMap::new(),
        }
    }
}

impl ViewConfig {
    /// Creates a configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ViewError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ViewError::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ViewError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ViewError::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Reads a configuration file, choosing the format by extension.
    ///
    /// `.json` files are parsed as JSON; anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ViewError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ViewError::Config(format!("{}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_partial_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.partial_dir = dir.into();
        self
    }

    /// Sets the layout path, relative to the root and without extension.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Sets the view file extension. A leading dot is added when missing.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = normalize_extension(extension.into());
        self
    }

    /// Replaces the function bindings.
    pub fn with_funcs(mut self, funcs: FuncMap) -> Self {
        self.funcs = funcs;
        self
    }

    /// Adds a single function binding.
    pub fn with_function<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: minijinja::functions::Function<Rv, Args>,
        Rv: minijinja::value::FunctionResult,
        Args: for<'a> minijinja::value::FunctionArgs<'a>,
    {
        self.funcs.insert(name, f);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partial_dir(&self) -> &Path {
        &self.partial_dir
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn funcs(&self) -> &FuncMap {
        &self.funcs
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The layout file: `root / (layout + extension)`.
    pub fn layout_file(&self) -> PathBuf {
        self.root.join(format!("{}{}", self.layout, self.extension))
    }

    /// The global partial directory: `root / partial_dir`.
    pub fn partial_root(&self) -> PathBuf {
        self.root.join(&self.partial_dir)
    }

    fn normalized(mut self) -> Self {
        self.extension = normalize_extension(std::mem::take(&mut self.extension));
        self
    }
}

fn normalize_extension(extension: String) -> String {
    if extension.is_empty() || extension.starts_with('.') {
        extension
    } else {
        format!(".{}", extension)
    }
}
