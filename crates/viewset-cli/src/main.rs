//! viewset - inspect, check and render a views tree.
//!
//! Runs the same discovery and compile pass a web application runs at
//! startup, so broken templates and unexpected render names show up before
//! deploy:
//!
//! ```text
//! viewset --root app/views check
//! viewset --root app/views list
//! viewset --root app/views render users/show --data user.yaml
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use viewset::ViewConfig;

/// Inspect, check and render HTML view trees.
#[derive(Debug, Parser)]
#[command(name = "viewset", version, about)]
struct Cli {
    /// Configuration file (YAML, or JSON when the name ends in .json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Views root directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Global partial directory, relative to the root
    #[arg(long, global = true)]
    partials: Option<PathBuf>,

    /// Layout path relative to the root, without extension
    #[arg(long, global = true)]
    layout: Option<String>,

    /// View file extension
    #[arg(long = "ext", global = true)]
    extension: Option<String>,

    /// Log every discovered page and partial
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every render name and the files it is compiled from
    List,
    /// Compile every view and report the first failure
    Check,
    /// Render one view to stdout
    Render {
        /// Render name, e.g. users/show
        name: String,

        /// Data file (JSON, or YAML for any other extension)
        #[arg(long, short = 'd')]
        data: Option<PathBuf>,
    },
}

impl Cli {
    /// Builds the view configuration: defaults, then the config file, then flags.
    fn view_config(&self) -> anyhow::Result<ViewConfig> {
        let mut config = match &self.config {
            Some(path) => ViewConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ViewConfig::new(),
        };

        if let Some(root) = &self.root {
            config = config.with_root(root);
        }
        if let Some(partials) = &self.partials {
            config = config.with_partial_dir(partials);
        }
        if let Some(layout) = &self.layout {
            config = config.with_layout(layout);
        }
        if let Some(extension) = &self.extension {
            config = config.with_extension(extension);
        }
        if self.debug {
            config = config.with_debug(true);
        }

        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "viewset=debug" } else { "viewset=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.view_config()?;
    init_tracing(config.debug());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::List => commands::list(config, &mut out),
        Command::Check => commands::check(config, &mut out),
        Command::Render { name, data } => {
            commands::render(config, name, data.as_deref(), &mut out)
        }
    }
}
