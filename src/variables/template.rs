//! Template rendering on top of minijinja.
//!
//! Every render sees the variable tree as top-level names plus three ambient
//! objects: `Platform`, `Env` and `User`.  Ambient names shadow variables of
//! the same name.  References to undefined names are errors.
use std::collections::BTreeMap;

use minijinja::{Environment, UndefinedBehavior};

use super::options::Ambient;
use crate::config::Value;
use crate::error::TemplateError;

/// Renders template strings and evaluates conditions.
#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
    ambient: Vec<(&'static str, minijinja::Value)>,
}

/// Prepared render context (variables plus ambient values).
///
/// Build once with [`TemplateRenderer::context`] and reuse across many
/// renders against the same tree.
#[derive(Debug, Clone)]
pub struct RenderContext(minijinja::Value);

impl TemplateRenderer {
    /// Create a renderer exposing the given ambient values.
    #[must_use]
    pub fn new(ambient: &Ambient) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self {
            env,
            ambient: vec![
                ("Platform", minijinja::Value::from_serialize(&ambient.platform)),
                ("Env", minijinja::Value::from_serialize(&ambient.env)),
                ("User", minijinja::Value::from_serialize(&ambient.user)),
            ],
        }
    }

    /// Build a render context from a variable tree.
    ///
    /// Non-mapping trees contribute no top-level names.
    #[must_use]
    pub fn context(&self, vars: &Value) -> RenderContext {
        let mut ctx: BTreeMap<String, minijinja::Value> = vars
            .as_mapping()
            .into_iter()
            .flatten()
            .map(|(k, v)| (k.clone(), minijinja::Value::from_serialize(v)))
            .collect();
        for (name, value) in &self.ambient {
            ctx.insert((*name).to_string(), value.clone());
        }
        RenderContext(minijinja::Value::from_serialize(&ctx))
    }

    /// Render `template` against `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] naming `location` on syntax errors
    /// or undefined references.
    pub fn render(&self, location: &str, template: &str, vars: &Value) -> Result<String, TemplateError> {
        self.render_with(location, template, &self.context(vars))
    }

    /// Render `template` against a prepared context.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] naming `location` on failure.
    pub fn render_with(
        &self,
        location: &str,
        template: &str,
        ctx: &RenderContext,
    ) -> Result<String, TemplateError> {
        self.env
            .render_str(template, &ctx.0)
            .map_err(|e| TemplateError::Render {
                location: location.to_string(),
                message: e.to_string(),
            })
    }

    /// Evaluate a condition to a boolean.
    ///
    /// A condition containing template syntax is rendered and its output
    /// parsed with [`parse_bool`].  Any other condition is treated as a bare
    /// expression and evaluated for truthiness.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] if rendering fails or
    /// [`TemplateError::NotBoolean`] if the output is not boolean-like.
    pub fn eval_condition(
        &self,
        location: &str,
        condition: &str,
        vars: &Value,
    ) -> Result<bool, TemplateError> {
        let ctx = self.context(vars);
        let output = if has_template_syntax(condition) {
            self.render_with(location, condition, &ctx)?
        } else {
            let wrapped = format!("{{% if {condition} %}}true{{% else %}}false{{% endif %}}");
            self.render_with(location, &wrapped, &ctx)?
        };
        parse_bool(&output).ok_or_else(|| TemplateError::NotBoolean {
            expression: condition.to_string(),
            value: output.trim().to_string(),
        })
    }
}

/// Return `true` if `s` contains template syntax that still needs rendering.
#[must_use]
pub fn has_template_syntax(s: &str) -> bool {
    s.contains("{{") || s.contains("{%") || s.contains("{#")
}

/// Interpret rendered condition output as a boolean.
///
/// Accepts `true/false`, `yes/no`, `on/off`, `1/0` case-insensitively.
/// Empty output is `false`.
#[must_use]
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}
