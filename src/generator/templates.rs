use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use super::naming::{sql_type_to_target_type, to_camel_case, to_kebab_case, to_pascal_case};

/// A template failed to parse or render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    /// Name of the template that failed
    pub template: String,
    /// Engine error text
    pub cause: String,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template {}: {}", self.template, self.cause)
    }
}

impl std::error::Error for RenderError {}

/// Filters see `none`/undefined as the empty string so they stay total.
fn filter_text(value: &Value) -> String {
    if value.is_undefined() || value.is_none() {
        String::new()
    } else if let Some(s) = value.as_str() {
        s.to_string()
    } else {
        value.to_string()
    }
}

fn environment(undefined: UndefinedBehavior) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(undefined);
    env.add_filter("to_camel_case", |v: Value| to_camel_case(&filter_text(&v)));
    env.add_filter("to_pascal_case", |v: Value| to_pascal_case(&filter_text(&v)));
    env.add_filter("to_kebab_case", |v: Value| to_kebab_case(&filter_text(&v)));
    env.add_filter("to_java_type", |v: Value| {
        sql_type_to_target_type(&filter_text(&v)).to_string()
    });
    env
}

/// Renders template bodies, prompts and output-path patterns.
///
/// Bodies and prompts render leniently: an undefined variable prints as
/// nothing. Path patterns render strictly so that a reference to a missing
/// variable is detected and the raw pattern is used instead.
pub struct TemplateRenderer {
    lenient: Environment<'static>,
    strict: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            lenient: environment(UndefinedBehavior::Lenient),
            strict: environment(UndefinedBehavior::Strict),
        }
    }

    /// Render a template body. Errors are fatal for the generation unit.
    pub fn render_body<S: Serialize>(
        &self,
        template_name: &str,
        content: &str,
        ctx: &S,
    ) -> Result<String, RenderError> {
        self.lenient
            .render_str(content, ctx)
            .map_err(|err| RenderError {
                template: template_name.to_string(),
                cause: err.to_string(),
            })
    }

    /// Render an LLM prompt template.
    pub fn render_prompt<S: Serialize>(
        &self,
        template_name: &str,
        prompt: &str,
        ctx: &S,
    ) -> Result<String, RenderError> {
        self.render_body(template_name, prompt, ctx)
    }

    /// Render an output-path pattern, falling back to the literal pattern on
    /// any error.
    pub fn render_path<S: Serialize>(&self, pattern: &str, ctx: &S) -> String {
        match self.strict.render_str(pattern, ctx) {
            Ok(path) => {
                debug!(pattern, path = %path, "rendered output path");
                path
            }
            Err(err) => {
                warn!(pattern, error = %err, "output path did not render, using it literally");
                pattern.to_string()
            }
        }
    }
}
