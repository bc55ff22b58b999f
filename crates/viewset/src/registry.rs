//! The view registry: a name-keyed table of compiled views.
//!
//! [`ViewRegistry`] is built from a [`ViewConfig`] and populated once by
//! [`init`](ViewRegistry::init), which walks the views tree (see
//! [`crate::discover`]) and compiles every page with the shared layout and
//! its partials. After that the table is read-only and can be shared across
//! request threads.
//!
//! # Example
//!
//! ```rust,ignore
//! use viewset::{HtmlRender, Render, ViewConfig, ViewRegistry};
//!
//! let views = ViewRegistry::new(ViewConfig::new().with_root("app/views")).init()?;
//!
//! // app/views/users/show.html
//! let page = views.instance("users/show", &user);
//! page.render(&mut response_body)?;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use minijinja::Value;
use serde::Serialize;

use crate::compiled::CompiledTemplate;
use crate::config::ViewConfig;
use crate::discover::discover;
use crate::error::ViewError;
use crate::instance::{HtmlInstance, HtmlRender};

/// Registry of compiled views keyed by render name.
///
/// # Thread Safety
///
/// The registry is `Send + Sync`. Mutation requires `&mut self`, so once
/// initialized it can be shared (for example behind an `Arc`) and read
/// concurrently without locking.
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    config: ViewConfig,
    templates: HashMap<String, CompiledTemplate>,
}

impl ViewRegistry {
    /// Creates an empty registry for the given configuration.
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            templates: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Discovers and compiles every page under the views root.
    ///
    /// The table is rebuilt from scratch: entries registered before the call
    /// are dropped, and on error the registry is consumed so a partially
    /// populated table can never be used. A missing or empty views root
    /// produces an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateCompile`] for the first page whose
    /// compile set is missing a file or fails to parse, and
    /// [`ViewError::Walk`] if the tree cannot be traversed.
    pub fn init(self) -> Result<Self, ViewError> {
        let discovery = discover(&self.config)?;
        let layout = self.config.layout_file();

        let mut staged = Self::new(self.config);
        for page in &discovery.pages {
            let files = page.compile_set(&layout, &discovery.global_partials);
            staged.add_from_files(&page.name, &files)?;
        }

        Ok(staged)
    }

    /// Registers a compiled template. An existing entry is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::InvalidArgument`] if `name` is empty or
    /// `template` is `None`.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        template: Option<CompiledTemplate>,
    ) -> Result<(), ViewError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ViewError::invalid("template name cannot be empty"));
        }
        let Some(template) = template else {
            return Err(ViewError::invalid(format!(
                "template \"{}\" cannot be empty",
                name
            )));
        };

        self.templates.insert(name, template);
        Ok(())
    }

    /// Compiles `files` with the configured functions and registers the
    /// result under `name`. If the configured layout is among `files`, it
    /// wraps every page that does not extend another template.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::TemplateCompile`] if a file is missing,
    /// unreadable, has a syntax error or calls an unbound function, and
    /// [`ViewError::InvalidArgument`] for an empty name or file set.
    pub fn add_from_files(
        &mut self,
        name: &str,
        files: &[PathBuf],
    ) -> Result<CompiledTemplate, ViewError> {
        if name.is_empty() {
            return Err(ViewError::invalid("template name cannot be empty"));
        }

        let layout = self.config.layout_file();
        let template = CompiledTemplate::compile(
            name,
            self.config.root(),
            Some(layout.as_path()),
            files,
            self.config.funcs(),
        )?;
        self.add(name, Some(template.clone()))?;
        Ok(template)
    }

    /// Looks up a template by render name.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&CompiledTemplate, ViewError> {
        self.templates
            .get(name)
            .ok_or_else(|| ViewError::not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Renders the template registered under `name` directly to a string.
    pub fn render<S: Serialize>(&self, name: &str, data: S) -> Result<String, ViewError> {
        self.get(name)?.render(data)
    }

    /// Returns the registered render names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Iterates over `(name, template)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompiledTemplate)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl HtmlRender for ViewRegistry {
    type Instance = HtmlInstance;

    fn instance<S: Serialize + ?Sized>(&self, name: &str, data: &S) -> HtmlInstance {
        HtmlInstance::new(
            name,
            self.templates.get(name).cloned(),
            Value::from_serialize(data),
        )
    }
}
