//! Error types for view discovery, compilation and rendering.
//!
//! [`ViewError`] is the single error type returned by every fallible
//! operation in this crate. Initialization failures (walk and compile
//! errors) are meant to abort startup; lookup and render failures are
//! surfaced to the caller at request time.

use std::io;
use std::path::{Path, PathBuf};

/// Errors produced while building or using a [`ViewRegistry`](crate::ViewRegistry).
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// An empty name or a missing template was passed to registration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A page's compile set could not be read or parsed.
    ///
    /// `file` names the file that failed when the failure is tied to one.
    #[error("failed to compile template \"{name}\" from [{}]: {message}", join_paths(.files))]
    TemplateCompile {
        /// Render name of the page being compiled.
        name: String,
        /// The full compile set, in compile order.
        files: Vec<PathBuf>,
        /// The offending file, if known.
        file: Option<PathBuf>,
        /// Underlying error message.
        message: String,
    },

    /// No template is registered under the requested name.
    #[error("template not found: \"{name}\"")]
    NotFound {
        /// The name that was requested.
        name: String,
    },

    /// The views tree exists but could not be traversed.
    #[error("failed to walk views directory {}: {message}", .path.display())]
    Walk {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// The template engine failed while rendering.
    #[error("failed to render template \"{name}\": {message}")]
    Render {
        /// Render name of the template.
        name: String,
        /// Underlying error message.
        message: String,
    },

    /// Writing rendered output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ViewError {
    /// Create an invalid-argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a compile error tied to one file of the compile set.
    pub fn compile(
        name: impl Into<String>,
        files: &[PathBuf],
        file: &Path,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::TemplateCompile {
            name: name.into(),
            files: files.to_vec(),
            file: Some(file.to_path_buf()),
            message: format!("{}: {}", file.display(), message),
        }
    }

    /// Create a render error from a minijinja failure.
    pub(crate) fn render(name: impl Into<String>, err: minijinja::Error) -> Self {
        Self::Render {
            name: name.into(),
            message: err.to_string(),
        }
    }

    /// Returns true for errors raised during initialization.
    ///
    /// These are configuration or content problems; the registry should not
    /// be used when one of them is returned.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateCompile { .. } | Self::Walk { .. } | Self::Config(_)
        )
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
