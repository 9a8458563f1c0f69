// Copyright 2026 PromptHub Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! engine_B: logic-less substitution. Supports only `{{ var }}` and
//! `{{ obj.field }}` interpolation; any `{%` control-flow tag is a syntax
//! error since this engine intentionally has no conditionals or loops
//!. Hand-rolled rather than pulling a second templating crate
//! for a strict subset tera already covers.

use prompthub_core::{PromptHubError, Result, TemplateErrorKind};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").unwrap())
}

pub fn render(content: &str, variables: &HashMap<String, Value>) -> Result<String> {
    if content.contains("{%") {
        return Err(PromptHubError::TemplateRender {
            kind: TemplateErrorKind::SyntaxError,
            message: "engine_b is logic-less; control-flow tags are not supported".to_string(),
        });
    }

    let mut error = None;
    let rendered = pattern().replace_all(content, |caps: &regex::Captures| {
        let path = &caps[1];
        match lookup(variables, path) {
            Some(value) => value_to_string(value),
            None => {
                if error.is_none() {
                    error = Some(PromptHubError::TemplateRender {
                        kind: TemplateErrorKind::UndefinedVariable,
                        message: format!("undefined variable '{path}'"),
                    });
                }
                String::new()
            }
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

fn lookup<'a>(variables: &'a HashMap<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = variables.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn substitutes_plain_variable() {
        let out = render("Hello {{ name }}", &vars(&[("name", json!("Ada"))])).unwrap();
        assert_eq!(out, "Hello Ada");
    }

    #[test]
    fn substitutes_dotted_path() {
        let out = render(
            "Plan: {{ user.plan }}",
            &vars(&[("user", json!({"plan": "pro"}))]),
        )
        .unwrap();
        assert_eq!(out, "Plan: pro");
    }

    #[test]
    fn control_flow_tags_are_rejected() {
        let err = render("{% if x %}y{% endif %}", &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), 42201);
    }

    #[test]
    fn undefined_variable_errors() {
        let err = render("Hi {{ missing }}", &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), 42201);
    }

    #[test]
    fn declared_but_unset_variable_renders_empty() {
        let out = render("Hi []{{ nickname }}", &vars(&[("nickname", Value::Null)])).unwrap();
        assert_eq!(out, "Hi []");
    }
}
