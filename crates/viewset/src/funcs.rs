//! Function bindings made available to every compiled view.
//!
//! A [`FuncMap`] is the set of named functions (and plain global values)
//! bound into each page's template environment at compile time. Templates
//! call them like any built-in:
//!
//! ```jinja
//! <title>{{ title(page) }}</title>
//! ```

use std::collections::BTreeMap;
use std::fmt;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use minijinja::Environment;

/// Named functions and globals bound into each compiled view.
///
/// Cloning is cheap: function values are reference counted.
///
/// # Example
///
/// ```rust
/// use viewset::FuncMap;
///
/// let funcs = FuncMap::new()
///     .with("shout", |s: String| s.to_uppercase())
///     .with_value("site_name", "Example");
///
/// assert!(funcs.contains("shout"));
/// assert_eq!(funcs.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct FuncMap {
    entries: BTreeMap<String, Value>,
}

impl FuncMap {
    /// Creates an empty function map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function, returning the updated map.
    pub fn with<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert(name, f);
        self
    }

    /// Adds a plain global value, returning the updated map.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_value(name, value);
        self
    }

    /// Adds a function. An existing binding with the same name is replaced.
    pub fn insert<F, Rv, Args>(&mut self, name: impl Into<String>, f: F)
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.entries.insert(name.into(), Value::from_function(f));
    }

    /// Adds a plain global value. An existing binding with the same name is replaced.
    pub fn insert_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Merges another map into this one; bindings from `other` win.
    pub fn extend(&mut self, other: &FuncMap) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    /// Returns true if a binding with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binds every entry as a global on the environment.
    pub(crate) fn bind(&self, env: &mut Environment<'static>) {
        for (name, value) in &self.entries {
            env.add_global(name.clone(), value.clone());
        }
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
