//! Render-time handles for the host web framework.
//!
//! A framework asks the registry for an instance by render name and data,
//! then writes it to its response body. Lookup happens when the instance
//! is created; a missing name is only reported when the instance is
//! written.

use std::io;

use minijinja::Value;
use serde::Serialize;

use crate::compiled::CompiledTemplate;
use crate::error::ViewError;

/// Content type of every rendered view.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Something a framework can write to a response.
pub trait Render {
    /// Writes the rendered body.
    fn render(&self, out: &mut dyn io::Write) -> Result<(), ViewError>;

    /// Value for the response's `Content-Type` header.
    fn content_type(&self) -> &'static str {
        HTML_CONTENT_TYPE
    }
}

/// Produces renderable instances by name.
pub trait HtmlRender {
    type Instance: Render;

    /// Pairs the template registered under `name` with `data`.
    fn instance<S: Serialize + ?Sized>(&self, name: &str, data: &S) -> Self::Instance;
}

/// A compiled view paired with its data.
#[derive(Debug, Clone)]
pub struct HtmlInstance {
    name: String,
    template: Option<CompiledTemplate>,
    data: Value,
}

impl HtmlInstance {
    pub fn new(name: impl Into<String>, template: Option<CompiledTemplate>, data: Value) -> Self {
        Self {
            name: name.into(),
            template,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The looked-up template, or `None` if the name was not registered.
    pub fn template(&self) -> Option<&CompiledTemplate> {
        self.template.as_ref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Renders into a string instead of a writer.
    pub fn render_to_string(&self) -> Result<String, ViewError> {
        self.compiled()?.render_value(&self.data)
    }

    fn compiled(&self) -> Result<&CompiledTemplate, ViewError> {
        self.template
            .as_ref()
            .ok_or_else(|| ViewError::not_found(&self.name))
    }
}

impl Render for HtmlInstance {
    fn render(&self, out: &mut dyn io::Write) -> Result<(), ViewError> {
        self.compiled()?.render_to(&self.data, out)
    }
}
