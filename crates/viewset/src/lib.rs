//! # viewset - Layout-Aware HTML View Registry
//!
//! `viewset` discovers HTML view files on disk, compiles each one together
//! with a shared layout and the partials that apply to it, and stores the
//! result under a render name derived from the file path. A web framework
//! then asks for a view by name and writes it to the response.
//!
//! Templates are [minijinja](https://docs.rs/minijinja) (Jinja2 syntax).
//!
//! ## Core Concepts
//!
//! - [`ViewConfig`]: Immutable configuration (root, partial dir, layout, extension, functions, debug)
//! - [`ViewRegistry`]: Name-keyed table of compiled views, populated by [`ViewRegistry::init`]
//! - [`CompiledTemplate`]: One page compiled with its layout and partials
//! - [`HtmlRender`] / [`Render`]: The seam a web framework renders through
//! - [`FuncMap`]: Functions bound into every compiled view
//!
//! ## Directory Conventions
//!
//! ```text
//! app/views/
//! ├── layouts/
//! │   └── base.html          layout, also a page: "layouts/base"
//! ├── partials/
//! │   └── _nav.html          global partial, available to every page
//! ├── home.html              page: "home"
//! └── users/
//!     ├── _row.html          local partial, available to pages in users/
//!     └── show.html          page: "users/show"
//! ```
//!
//! A file whose name starts with `_` is a partial and never a page. Files in
//! the partial directory are never pages. Every other file with the
//! configured extension is a page named by its path relative to the root,
//! without extension, with `/` separators on every platform.
//!
//! Each page is compiled from `[layout, page] ++ global partials ++ local
//! partials`. The layout is the outer skeleton: a page fills in the
//! layout's blocks and pulls in partials by file name:
//!
//! ```jinja
//! {% block content %}
//!   {% include "_nav.html" %}
//!   {% for user in users %}{% include "_row.html" %}{% endfor %}
//! {% endblock %}
//! ```
//!
//! A page that declares its own `{% extends %}` keeps that parent instead.
//! Calls to functions that are neither bound through [`FuncMap`] nor
//! builtin fail the compile, so [`ViewRegistry::init`] reports them at
//! startup.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use viewset::{HtmlRender, Render, ViewConfig, ViewRegistry};
//!
//! let config = ViewConfig::new()
//!     .with_root("app/views")
//!     .with_function("year", || 2024)
//!     .with_debug(true);
//!
//! // Fails on the first page that cannot be compiled.
//! let views = ViewRegistry::new(config).init()?;
//!
//! let page = views.instance("users/show", &user);
//! response.set_header("Content-Type", page.content_type());
//! page.render(&mut response.body())?;
//! ```
//!
//! ## Inline Registration
//!
//! ```rust
//! use viewset::{CompiledTemplate, FuncMap, HtmlRender, ViewRegistry};
//!
//! let mut views = ViewRegistry::default();
//! let tmpl = CompiledTemplate::from_source("home.html", "Hello {{ name }}", &FuncMap::new()).unwrap();
//! views.add("home", Some(tmpl)).unwrap();
//!
//! let page = views.instance("home", &serde_json::json!({ "name": "World" }));
//! assert_eq!(page.render_to_string().unwrap(), "Hello World");
//! ```

pub mod compiled;
pub mod config;
pub mod discover;
mod error;
pub mod funcs;
pub mod instance;
pub mod registry;

pub use compiled::CompiledTemplate;
pub use config::ViewConfig;
pub use discover::{discover, Discovery, ViewFile, PARTIAL_MARKER};
pub use error::ViewError;
pub use funcs::FuncMap;
pub use instance::{HtmlInstance, HtmlRender, Render, HTML_CONTENT_TYPE};
pub use registry::ViewRegistry;

// Re-exported so callers can build context values without a direct dependency.
pub use minijinja::Value;
