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

//! engine_A: Tera-backed templating with `{{ var }}` interpolation plus
//! `{% if %}/{% elif %}/{% else %}/{% endif %}` and `{% for %}/{% endfor %}`
//! control flow. Grounded on the `tera` crate, attested as the
//! templating dependency across several pack repos doing prompt/document
//! generation (`other_examples/manifests/*`).

use prompthub_core::{PromptHubError, Result, TemplateErrorKind};
use serde_json::Value;
use std::collections::HashMap;

pub fn render(content: &str, variables: &HashMap<String, Value>) -> Result<String> {
    let mut tera = tera::Tera::default();
    // `autoescape_on(&[])` disables HTML escaping: prompt text is not markup,
    // and escaping would corrupt quotes/brackets the model is meant to see.
    tera.autoescape_on(&[]);
    tera.add_raw_template("__prompt__", content)
        .map_err(|e| syntax_error(&e))?;

    let mut context = tera::Context::new();
    for (key, value) in variables {
        context.insert(key, value);
    }

    tera.render("__prompt__", &context)
        .map_err(|e| render_error(&e))
}

fn syntax_error(err: &tera::Error) -> PromptHubError {
    PromptHubError::TemplateRender {
        kind: TemplateErrorKind::SyntaxError,
        message: err.to_string(),
    }
}

fn render_error(err: &tera::Error) -> PromptHubError {
    let message = err.to_string();
    let kind = if message.contains("not found in context") || message.contains("Variable") {
        TemplateErrorKind::UndefinedVariable
    } else {
        TemplateErrorKind::SyntaxError
    };
    PromptHubError::TemplateRender { kind, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn renders_plain_interpolation() {
        let out = render("Hello {{ name }}", &vars(&[("name", json!("Ada"))])).unwrap();
        assert_eq!(out, "Hello Ada");
    }

    #[test]
    fn renders_if_elif_else() {
        let template = "{% if tier == \"gold\" %}VIP{% elif tier == \"silver\" %}Member{% else %}Guest{% endif %}";
        let out = render(template, &vars(&[("tier", json!("silver"))])).unwrap();
        assert_eq!(out, "Member");
    }

    #[test]
    fn renders_for_loop() {
        let template = "{% for item in items %}{{ item }},{% endfor %}";
        let out = render(template, &vars(&[("items", json!(["a", "b", "c"]))])).unwrap();
        assert_eq!(out, "a,b,c,");
    }

    #[test]
    fn undefined_variable_is_reported() {
        let err = render("Hi {{ missing }}", &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), 42201);
    }

    #[test]
    fn malformed_syntax_is_a_syntax_error() {
        let err = render("{% if unterminated %}", &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), 42201);
    }
}
