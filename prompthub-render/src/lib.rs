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

//! Template Renderer: three interchangeable engines behind one
//! entry point, plus variable validation shared by all of them.

pub mod engine_a;
pub mod engine_b;
pub mod none_engine;
pub mod validation;

pub use validation::{extract_variable_refs, resolve_variables};

use prompthub_core::model::{TemplateEngine, VariableDecl};
use prompthub_core::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Resolves variables against `spec` then renders `content` with the chosen
/// engine. The single call sites in `prompthub-engine` go through here so no
/// caller can skip validation.
pub fn render(
    engine: TemplateEngine,
    content: &str,
    spec: &[VariableDecl],
    provided: &HashMap<String, Value>,
) -> Result<String> {
    let resolved = resolve_variables(spec, provided)?;
    match engine {
        TemplateEngine::EngineA => engine_a::render(content, &resolved),
        TemplateEngine::EngineB => engine_b::render(content, &resolved),
        TemplateEngine::None => none_engine::render(content, &resolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompthub_core::model::VariableType;
    use serde_json::json;

    #[test]
    fn render_dispatches_to_chosen_engine() {
        let spec = vec![VariableDecl {
            name: "name".into(),
            var_type: VariableType::String,
            required: true,
            default: None,
            enum_values: None,
        }];
        let mut provided = HashMap::new();
        provided.insert("name".to_string(), json!("Ada"));

        let a = render(TemplateEngine::EngineA, "Hi {{ name }}", &spec, &provided).unwrap();
        let b = render(TemplateEngine::EngineB, "Hi {{ name }}", &spec, &provided).unwrap();
        let n = render(TemplateEngine::None, "Hi {{ name }}", &spec, &provided).unwrap();

        assert_eq!(a, "Hi Ada");
        assert_eq!(b, "Hi Ada");
        assert_eq!(n, "Hi {{ name }}");
    }
}
