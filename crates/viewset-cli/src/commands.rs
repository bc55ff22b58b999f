//! Subcommand implementations. Each writes its report to `out`.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use viewset::{HtmlRender, Render, ViewConfig, ViewRegistry};

/// Prints every render name followed by its compile set.
pub fn list(config: ViewConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let views = load(config)?;
    for name in views.names() {
        writeln!(out, "{}", name)?;
        for file in views.get(name)?.files() {
            writeln!(out, "    {}", file.display())?;
        }
    }
    Ok(())
}

/// Compiles every view; fails on the first broken one.
pub fn check(config: ViewConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let root = config.root().to_path_buf();
    let views = load(config)?;
    writeln!(
        out,
        "ok: {} views compiled from {}",
        views.len(),
        root.display()
    )?;
    Ok(())
}

/// Renders one view with data from a JSON or YAML file.
pub fn render(
    config: ViewConfig,
    name: &str,
    data: Option<&Path>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let views = load(config)?;
    let data = match data {
        Some(path) => read_data(path)?,
        None => serde_json::Value::Object(serde_json::Map::new()),
    };

    views
        .instance(name, &data)
        .render(out)
        .with_context(|| format!("rendering \"{}\"", name))?;
    Ok(())
}

fn load(config: ViewConfig) -> anyhow::Result<ViewRegistry> {
    let root = config.root().to_path_buf();
    ViewRegistry::new(config)
        .init()
        .with_context(|| format!("initializing views under {}", root.display()))
}

fn read_data(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading data file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let value = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON data from {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("parsing YAML data from {}", path.display()))?
    };
    Ok(value)
}
