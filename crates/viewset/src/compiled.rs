//! Compiled view templates.
//!
//! A [`CompiledTemplate`] owns a minijinja [`Environment`] holding every file
//! of one page's compile set. Files are added in compile-set order, each
//! under its path relative to the views root (`layouts/base.html`,
//! `users/show.html`). Partials are also added under their bare file name
//! (`_nav.html`), so a later partial replaces an earlier one with the same
//! name. A local partial therefore shadows a global one.
//!
//! When the set contains the configured layout, every page that does not
//! declare its own `{% extends %}` is compiled as a child of the layout:
//! the layout is the outer skeleton and the page's blocks override the
//! layout's blocks.
//!
//! ```jinja
//! {# layouts/base.html #}
//! <html><body>{% block content %}{% endblock %}</body></html>
//!
//! {# users/show.html #}
//! {% block content %}{% include "_nav.html" %}<h1>{{ user.name }}</h1>{% endblock %}
//! ```
//!
//! The entry template is the last non-partial file of the set: the page
//! itself for sets built by discovery.
//!
//! Every call in every file is checked against the bound functions when the
//! set is compiled, so a call to an unknown function fails at startup
//! rather than on first render.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Value};
use serde::Serialize;

use crate::discover::{is_partial, join_components};
use crate::error::ViewError;
use crate::funcs::FuncMap;

/// Globals minijinja provides itself, plus names the engine resolves inside
/// blocks, loops and macros.
const BUILTIN_CALLABLES: &[&str] = &[
    "range", "dict", "namespace", "debug", "super", "loop", "caller", "self", "varargs",
    "kwargs",
];

/// A page compiled together with its layout and partials.
///
/// Cheap to clone; clones share the same compiled environment.
#[derive(Clone)]
pub struct CompiledTemplate {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    entry: String,
    files: Vec<PathBuf>,
    env: Environment<'static>,
}

impl CompiledTemplate {
    /// Compiles a template set from files on disk.
    ///
    /// `root` is the views root used to name templates inside the set;
    /// files outside it are named by their full path. `name` is the render
    /// name, used only for error reporting. If `layout` is one of `files`,
    /// pages without their own `{% extends %}` are wrapped in it.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::InvalidArgument`] for an empty file set and
    /// [`ViewError::TemplateCompile`] if any file is missing, unreadable,
    /// has a syntax error or calls a function that is not bound.
    pub fn compile(
        name: &str,
        root: &Path,
        layout: Option<&Path>,
        files: &[PathBuf],
        funcs: &FuncMap,
    ) -> Result<Self, ViewError> {
        if files.is_empty() {
            return Err(ViewError::invalid(format!(
                "template \"{}\" has no files to compile",
                name
            )));
        }

        let layout = layout.filter(|layout| files.iter().any(|f| f == layout));
        let layout_name = layout.map(|layout| template_name(root, layout));

        let mut env = new_environment(funcs);
        let mut entry = None;

        for file in files {
            let mut source = std::fs::read_to_string(file)
                .map_err(|e| ViewError::compile(name, files, file, e))?;
            let set_name = template_name(root, file);

            if is_partial(file) {
                if let Some(base) = file.file_name().and_then(|n| n.to_str()) {
                    env.add_template_owned(base.to_string(), source.clone())
                        .map_err(|e| ViewError::compile(name, files, file, e))?;
                }
            } else {
                if let Some(layout_name) = &layout_name {
                    if Some(file.as_path()) != layout && !declares_extends(&source) {
                        source = format!("{{% extends \"{}\" %}}{}", layout_name, source);
                    }
                }
                entry = Some(set_name.clone());
            }

            env.add_template_owned(set_name.clone(), source)
                .map_err(|e| ViewError::compile(name, files, file, e))?;
            if let Some(function) = unknown_function(&env, &set_name, funcs) {
                return Err(ViewError::compile(
                    name,
                    files,
                    file,
                    format!("call to undefined function \"{}\"", function),
                ));
            }
        }

        // A set made only of partials renders its last file.
        let last = &files[files.len() - 1];
        let entry = entry.unwrap_or_else(|| template_name(root, last));

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                entry,
                files: files.to_vec(),
                env,
            }),
        })
    }

    /// Compiles a single in-memory template.
    ///
    /// Useful for registering views that do not live on disk.
    pub fn from_source(name: &str, source: &str, funcs: &FuncMap) -> Result<Self, ViewError> {
        let source_error = |message: String| ViewError::TemplateCompile {
            name: name.to_string(),
            files: Vec::new(),
            file: None,
            message,
        };

        let mut env = new_environment(funcs);
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| source_error(e.to_string()))?;
        if let Some(function) = unknown_function(&env, name, funcs) {
            return Err(source_error(format!(
                "call to undefined function \"{}\"",
                function
            )));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                entry: name.to_string(),
                files: Vec::new(),
                env,
            }),
        })
    }

    /// The render name this template was compiled for.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the entry template inside the set.
    pub fn entry(&self) -> &str {
        &self.inner.entry
    }

    /// The files this template was compiled from, in compile order.
    pub fn files(&self) -> &[PathBuf] {
        &self.inner.files
    }

    /// Returns true if a template with this name is part of the set.
    pub fn has_template(&self, name: &str) -> bool {
        self.inner.env.get_template(name).is_ok()
    }

    /// Returns true if both handles share the same compiled set.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Renders the entry template with `data`.
    pub fn render<S: Serialize>(&self, data: S) -> Result<String, ViewError> {
        self.render_value(&Value::from_serialize(data))
    }

    /// Renders the entry template with an already converted context.
    pub fn render_value(&self, data: &Value) -> Result<String, ViewError> {
        let tmpl = self.entry_template()?;
        tmpl.render(data)
            .map_err(|e| ViewError::render(self.name(), e))
    }

    /// Renders the entry template and writes it to `out`.
    ///
    /// Nothing is written if rendering fails.
    pub fn render_to<W: io::Write>(&self, data: &Value, mut out: W) -> Result<(), ViewError> {
        let rendered = self.render_value(data)?;
        out.write_all(rendered.as_bytes())?;
        Ok(())
    }

    fn entry_template(&self) -> Result<minijinja::Template<'_, '_>, ViewError> {
        self.inner
            .env
            .get_template(&self.inner.entry)
            .map_err(|e| ViewError::render(self.name(), e))
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.inner.name)
            .field("entry", &self.inner.entry)
            .field("files", &self.inner.files)
            .finish()
    }
}

fn new_environment(funcs: &FuncMap) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    // Views are HTML whatever their extension.
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    funcs.bind(&mut env);
    env
}

/// Returns the first name `set_name` calls that is neither bound nor a
/// builtin, in sorted order.
fn unknown_function(
    env: &Environment<'static>,
    set_name: &str,
    funcs: &FuncMap,
) -> Option<String> {
    let tmpl = env.get_template(set_name).ok()?;
    let source = tmpl.source();
    let mut unknown: Vec<String> = tmpl
        .undeclared_variables(false)
        .into_iter()
        .filter(|var| !funcs.contains(var) && !BUILTIN_CALLABLES.contains(&var.as_str()))
        .filter(|var| is_called(source, var))
        .collect();
    unknown.sort();
    unknown.into_iter().next()
}

/// Returns true if `name` appears as a call target inside an expression or
/// statement tag of `source`.
fn is_called(source: &str, name: &str) -> bool {
    tag_bodies(source).any(|(_, body)| {
        body.match_indices(name).any(|(idx, _)| {
            let before = body[..idx].chars().next_back();
            let after = body[idx + name.len()..].trim_start();
            !before.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
                && after.starts_with('(')
        })
    })
}

/// Returns true if a statement tag of `source` is `{% extends ... %}`.
fn declares_extends(source: &str) -> bool {
    tag_bodies(source).any(|(kind, body)| {
        let body = body.trim_start_matches(|c: char| c == '-' || c == '+').trim_start();
        kind == '%'
            && body
                .strip_prefix("extends")
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    })
}

/// Iterates over the bodies of `{{ }}` (kind `{`) and `{% %}` (kind `%`)
/// tags. Comments are skipped. An unclosed tag yields the rest of the
/// source.
fn tag_bodies(source: &str) -> impl Iterator<Item = (char, &str)> {
    let mut rest = source;
    std::iter::from_fn(move || loop {
        let start = rest.find('{')?;
        let after = &rest[start + 1..];
        let (kind, close) = match after.chars().next() {
            Some('{') => ('{', "}}"),
            Some('%') => ('%', "%}"),
            Some('#') => ('#', "#}"),
            _ => {
                rest = after;
                continue;
            }
        };
        let body = &after[1..];
        let (inner, remaining) = match body.find(close) {
            Some(end) => (&body[..end], &body[end + close.len()..]),
            None => (body, ""),
        };
        rest = remaining;
        if kind != '#' {
            return Some((kind, inner));
        }
    })
}

/// Name of a file inside its compiled set: root-relative with `/`
/// separators, or the full path for files outside the root.
fn template_name(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .ok()
        .and_then(join_components)
        .unwrap_or_else(|| file.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) -> PathBuf {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();
        full_path
    }

    fn compile(root: &Path, files: &[PathBuf]) -> Result<CompiledTemplate, ViewError> {
        CompiledTemplate::compile("page", root, None, files, &FuncMap::new())
    }

    // =========================================================================
    // Layout
    // =========================================================================

    #[test]
    fn test_page_extends_layout() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(
            root,
            "layouts/base.html",
            "<main>{% block content %}default{% endblock %}</main>",
        );
        let page = create_file(
            root,
            "users/show.html",
            "{% extends \"layouts/base.html\" %}{% block content %}{{ name }}{% endblock %}",
        );

        let tmpl = compile(root, &[layout, page]).unwrap();

        assert_eq!(tmpl.entry(), "users/show.html");
        assert_eq!(tmpl.render(serde_json::json!({"name": "Ada"})).unwrap(), "<main>Ada</main>");
    }

    #[test]
    fn test_layout_wraps_page_without_extends() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(
            root,
            "layouts/base.html",
            "<main>{% block content %}default{% endblock %}</main>",
        );
        let page = create_file(root, "home.html", "{% block content %}hi{% endblock %}");

        let tmpl = CompiledTemplate::compile(
            "home",
            root,
            Some(layout.as_path()),
            &[layout.clone(), page],
            &FuncMap::new(),
        )
        .unwrap();

        assert_eq!(tmpl.entry(), "home.html");
        assert_eq!(tmpl.render(()).unwrap(), "<main>hi</main>");
    }

    #[test]
    fn test_layout_does_not_wrap_itself() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(
            root,
            "layouts/base.html",
            "<main>{% block content %}x{% endblock %}</main>",
        );

        let tmpl = CompiledTemplate::compile(
            "layouts/base",
            root,
            Some(layout.as_path()),
            &[layout.clone(), layout.clone()],
            &FuncMap::new(),
        )
        .unwrap();

        assert_eq!(tmpl.render(()).unwrap(), "<main>x</main>");
    }

    #[test]
    fn test_layout_outside_file_set_is_ignored() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = root.join("layouts/base.html");
        let page = create_file(root, "plain.html", "plain");

        let tmpl = CompiledTemplate::compile(
            "plain",
            root,
            Some(layout.as_path()),
            &[page],
            &FuncMap::new(),
        )
        .unwrap();

        assert_eq!(tmpl.render(()).unwrap(), "plain");
    }

    #[test]
    fn test_declares_extends() {
        assert!(declares_extends("{% extends \"a.html\" %}"));
        assert!(declares_extends("\n{%- extends 'a.html' -%}body"));
        assert!(!declares_extends("{{ extends }}"));
        assert!(!declares_extends("{% extendsx %}"));
        assert!(!declares_extends("{# {% extends \"a.html\" %} #}"));
        assert!(!declares_extends("extends"));
    }

    // =========================================================================
    // Partials
    // =========================================================================

    #[test]
    fn test_partials_are_reachable_by_bare_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(root, "layouts/base.html", "{% block body %}{% endblock %}");
        let page = create_file(root, "home.html", "[{% include \"_nav.html\" %}]");
        let nav = create_file(root, "partials/_nav.html", "nav");

        let tmpl = compile(root, &[layout, page, nav]).unwrap();

        assert!(tmpl.has_template("_nav.html"));
        assert!(tmpl.has_template("partials/_nav.html"));
        assert_eq!(tmpl.render(()).unwrap(), "[nav]");
    }

    #[test]
    fn test_later_partial_shadows_earlier() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(root, "layouts/base.html", "");
        let page = create_file(root, "users/index.html", "{% include \"_head.html\" %}");
        let global = create_file(root, "partials/_head.html", "global");
        let local = create_file(root, "users/_head.html", "local");

        let tmpl = compile(root, &[layout, page, global, local]).unwrap();

        assert_eq!(tmpl.render(()).unwrap(), "local");
    }

    // =========================================================================
    // Compile errors
    // =========================================================================

    #[test]
    fn test_missing_file_is_compile_error() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let page = create_file(root, "home.html", "hi");
        let missing = root.join("layouts/base.html");

        let result = CompiledTemplate::compile(
            "home",
            root,
            Some(missing.as_path()),
            &[missing.clone(), page],
            &FuncMap::new(),
        );

        match result {
            Err(ViewError::TemplateCompile { name, file, files, .. }) => {
                assert_eq!(name, "home");
                assert_eq!(file, Some(missing));
                assert_eq!(files.len(), 2);
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(root, "layouts/base.html", "");
        let page = create_file(root, "broken.html", "{{ unclosed");

        let result = compile(root, &[layout, page.clone()]);

        match result {
            Err(ViewError::TemplateCompile { file, .. }) => assert_eq!(file, Some(page)),
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_function_in_partial_is_compile_error() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let page = create_file(root, "home.html", "{% include \"_clock.html\" %}");
        let partial = create_file(root, "partials/_clock.html", "{{ now( ) }}");

        let result = compile(root, &[page, partial.clone()]);

        match result {
            Err(ViewError::TemplateCompile { file, message, .. }) => {
                assert_eq!(file, Some(partial));
                assert!(message.contains("\"now\""));
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_set_is_invalid() {
        let result = compile(Path::new("v"), &[]);
        assert!(matches!(result, Err(ViewError::InvalidArgument(_))));
    }

    // =========================================================================
    // Function checks
    // =========================================================================

    #[test]
    fn test_funcs_are_bound() {
        let funcs = FuncMap::new().with("greet", |who: String| format!("hello {}", who));
        let tmpl = CompiledTemplate::from_source("greeting", "{{ greet(name) }}", &funcs).unwrap();
        assert_eq!(
            tmpl.render(serde_json::json!({"name": "Ada"})).unwrap(),
            "hello Ada"
        );
    }

    #[test]
    fn test_unknown_function_is_compile_error() {
        let result = CompiledTemplate::from_source("t", "{{ nope() }}", &FuncMap::new());
        match result {
            Err(ViewError::TemplateCompile { message, .. }) => {
                assert!(message.contains("undefined function \"nope\""));
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_builtins_and_data_are_not_unknown_functions() {
        let source = "{% for i in range(2) %}{{ loop.index }}{% endfor %}\
                      {{ user.name }} {{ user.greet() }} {{ dict(a=1).a }}\
                      {% macro m() %}{{ caller() }}{% endmacro %}{{ m() }}";
        let tmpl = CompiledTemplate::from_source("t", source, &FuncMap::new());
        assert!(tmpl.is_ok(), "{:?}", tmpl.err());
    }

    #[test]
    fn test_call_detection_is_limited_to_tags() {
        assert!(is_called("{{ now() }}", "now"));
        assert!(is_called("{% set t = now () %}", "now"));
        assert!(!is_called("now() in text", "now"));
        assert!(!is_called("{{ user.now() }}", "now"));
        assert!(!is_called("{{ snow() }}", "now"));
        assert!(!is_called("{{ now }}", "now"));
        assert!(!is_called("{# now() #}", "now"));
    }

    #[test]
    fn test_missing_include_fails_at_render() {
        let tmpl =
            CompiledTemplate::from_source("t", "{% include \"gone.html\" %}", &FuncMap::new())
                .unwrap();
        assert!(matches!(tmpl.render(()), Err(ViewError::Render { .. })));
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_html_is_escaped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let layout = create_file(root, "layouts/base.html", "");
        let page = create_file(root, "raw.html", "{{ v }}");

        let tmpl = compile(root, &[layout, page]).unwrap();
        assert_eq!(
            tmpl.render(serde_json::json!({"v": "<b>"})).unwrap(),
            "&lt;b&gt;"
        );
    }

    #[test]
    fn test_html_is_escaped_for_any_extension() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let page = create_file(root, "raw.tmpl", "{{ v }}|{{ v|safe }}");

        let tmpl = compile(root, &[page]).unwrap();
        assert_eq!(
            tmpl.render(serde_json::json!({"v": "<b>"})).unwrap(),
            "&lt;b&gt;|<b>"
        );
    }

    #[test]
    fn test_render_to_writer() {
        let tmpl = CompiledTemplate::from_source("t", "n={{ n }}", &FuncMap::new()).unwrap();
        let mut out = Vec::new();
        tmpl.render_to(&Value::from_serialize(serde_json::json!({"n": 3})), &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "n=3");
    }

    #[test]
    fn test_failed_render_writes_nothing() {
        let tmpl =
            CompiledTemplate::from_source("t", "a{% include \"gone.html\" %}", &FuncMap::new())
                .unwrap();
        let mut out = Vec::new();
        let data = Value::from_serialize(serde_json::json!({}));
        assert!(tmpl.render_to(&data, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_clones_share_set() {
        let a = CompiledTemplate::from_source("t", "x", &FuncMap::new()).unwrap();
        let b = a.clone();
        let c = CompiledTemplate::from_source("t", "x", &FuncMap::new()).unwrap();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_template_name_outside_root() {
        assert_eq!(
            template_name(Path::new("app/views"), Path::new("app/views/users/show.html")),
            "users/show.html"
        );
        assert_eq!(
            template_name(Path::new("app/views"), Path::new("shared/base.html")),
            "shared/base.html"
        );
    }
}
