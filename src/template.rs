//! Template interpolation for config values
//!
//! Handles `{{ variable }}` interpolation in remote request settings
//! (path, headers, query parameters). Supported roots:
//! - `{{ collection }}` - the configured collection name
//! - `{{ env.NAME }}` - a process environment variable
//! - `{{ vars.name }}` - extra variables supplied by the caller

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Collection being synchronized
    pub collection: Option<String>,
    /// Additional context variables
    pub vars: HashMap<String, String>,
    /// Environment overrides, consulted before the process environment
    env: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context for a collection
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: Some(collection.into()),
            ..Default::default()
        }
    }

    /// Set an additional variable
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Override an environment variable for this context only
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Get a value by path (e.g., "env.ACCESS_TOKEN")
    pub fn get(&self, path: &str) -> Option<String> {
        let mut parts = path.splitn(2, '.');
        let root = parts.next()?;
        let rest = parts.next();

        match (root, rest) {
            ("collection", None) => self.collection.clone(),
            ("env", Some(name)) => self
                .env
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok()),
            ("vars", Some(name)) => self.vars.get(name).cloned(),
            // Bare names resolve against vars
            (name, None) => self.vars.get(name).cloned(),
            _ => None,
        }
    }
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let (Some(full_match), Some(var_path)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        match ctx.get(var_path.as_str()) {
            Some(value) => {
                result = result.replace(full_match.as_str(), &value);
            }
            None => {
                errors.push(var_path.as_str().to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Render every value of a string map
pub fn render_map(
    map: &HashMap<String, String>,
    ctx: &TemplateContext,
) -> Result<HashMap<String, String>> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), render(v, ctx)?)))
        .collect()
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Reject templates that reference unknown roots before any request is made
pub fn validate(template: &str) -> Result<()> {
    for var in extract_variables(template) {
        let known = var == "collection"
            || var.starts_with("env.")
            || var.starts_with("vars.")
            || !var.contains('.');
        if !known {
            return Err(Error::template(format!(
                "unknown template variable '{var}' in '{template}'"
            )));
        }
    }
    Ok(())
}
