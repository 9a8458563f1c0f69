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

//! Variable resolution and validation against a `variable_spec`: apply
//! defaults, enforce `required`, check type compatibility and enum
//! membership, before a template ever sees the data.

use prompthub_core::model::{VariableDecl, VariableType};
use prompthub_core::{PromptHubError, Result, TemplateErrorKind};
use serde_json::Value;
use std::collections::HashMap;

/// Merges `provided` over each declaration's `default`, enforces `required`,
/// and checks type/enum compatibility. Returns the fully-resolved variable
/// map a render engine can consume without further null-checking.
pub fn resolve_variables(
    spec: &[VariableDecl],
    provided: &HashMap<String, Value>,
) -> Result<HashMap<String, Value>> {
    let mut resolved = HashMap::with_capacity(spec.len());

    for decl in spec {
        let value = match provided.get(&decl.name) {
            Some(v) => v.clone(),
            None => match &decl.default {
                Some(d) => d.clone(),
                None => {
                    if decl.required {
                        return Err(PromptHubError::TemplateRender {
                            kind: TemplateErrorKind::MissingRequired,
                            message: format!("missing required variable '{}'", decl.name),
                        });
                    }
                    // Declared-optional-but-unset: stays in the map as `null`
                    // so engines render it as an empty string rather than
                    // treating the reference as undeclared.
                    resolved.insert(decl.name.clone(), Value::Null);
                    continue;
                }
            },
        };

        check_type(decl, &value)?;
        resolved.insert(decl.name.clone(), value);
    }

    // Variables passed by the caller but not declared in variable_spec still
    // flow through: engine_A/engine_B templates may reference ad-hoc scope
    // variables (e.g. `prior_output`) that aren't part of the prompt's own
    // declared interface.
    for (key, value) in provided {
        resolved.entry(key.clone()).or_insert_with(|| value.clone());
    }

    Ok(resolved)
}

fn check_type(decl: &VariableDecl, value: &Value) -> Result<()> {
    let matches = match decl.var_type {
        VariableType::String => value.is_string(),
        VariableType::Integer => value.is_i64() || value.is_u64(),
        VariableType::Number => value.is_number(),
        VariableType::Boolean => value.is_boolean(),
        VariableType::Object => value.is_object(),
        VariableType::Array => value.is_array(),
        VariableType::Enum => {
            let values = decl.enum_values.as_deref().unwrap_or(&[]);
            match value.as_str() {
                Some(s) => values.iter().any(|v| v == s),
                None => false,
            }
        }
    };

    if !matches {
        let kind = if decl.var_type == VariableType::Enum {
            TemplateErrorKind::EnumViolation
        } else {
            TemplateErrorKind::TypeMismatch
        };
        return Err(PromptHubError::TemplateRender {
            kind,
            message: format!(
                "variable '{}' expected {:?}, got {}",
                decl.name, decl.var_type, value
            ),
        });
    }
    Ok(())
}

/// Extracts `{{ name }}` / `{{ obj.field }}` references from template source.
/// Used by engine_B (its only lookup mechanism) and by callers that want to
/// know a template's variable surface without rendering it.
pub fn extract_variable_refs(content: &str) -> Vec<String> {
    static PATTERN: once_pattern::Lazy = once_pattern::Lazy::new();
    PATTERN.find_refs(content)
}

/// Tiny lazy-regex helper so this module doesn't need `once_cell` just for a
/// single compiled pattern.
mod once_pattern {
    use regex::Regex;
    use std::sync::OnceLock;

    pub struct Lazy(OnceLock<Regex>);

    impl Lazy {
        pub const fn new() -> Self {
            Self(OnceLock::new())
        }

        fn regex(&self) -> &Regex {
            self.0
                .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").unwrap())
        }

        pub fn find_refs(&self, content: &str) -> Vec<String> {
            self.regex()
                .captures_iter(content)
                .map(|c| c[1].to_string())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, var_type: VariableType, required: bool, default: Option<Value>) -> VariableDecl {
        VariableDecl {
            name: name.to_string(),
            var_type,
            required,
            default,
            enum_values: None,
        }
    }

    #[test]
    fn missing_required_without_default_errors() {
        let spec = vec![decl("name", VariableType::String, true, None)];
        let err = resolve_variables(&spec, &HashMap::new()).unwrap_err();
        assert_eq!(err.code(), 42201);
    }

    #[test]
    fn missing_optional_falls_back_to_default() {
        let spec = vec![decl(
            "tone",
            VariableType::String,
            false,
            Some(Value::String("neutral".into())),
        )];
        let resolved = resolve_variables(&spec, &HashMap::new()).unwrap();
        assert_eq!(resolved["tone"], Value::String("neutral".into()));
    }

    #[test]
    fn missing_optional_without_default_resolves_to_null() {
        let spec = vec![decl("nickname", VariableType::String, false, None)];
        let resolved = resolve_variables(&spec, &HashMap::new()).unwrap();
        assert_eq!(resolved["nickname"], Value::Null);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let spec = vec![decl("count", VariableType::Integer, true, None)];
        let mut provided = HashMap::new();
        provided.insert("count".to_string(), Value::String("three".into()));
        let err = resolve_variables(&spec, &provided).unwrap_err();
        assert_eq!(err.code(), 42201);
    }

    #[test]
    fn enum_outside_values_is_rejected() {
        let mut decl = decl("tone", VariableType::Enum, true, None);
        decl.enum_values = Some(vec!["formal".into(), "casual".into()]);
        let mut provided = HashMap::new();
        provided.insert("tone".to_string(), Value::String("sarcastic".into()));
        let err = resolve_variables(&[decl], &provided).unwrap_err();
        assert_eq!(err.code(), 42201);
    }

    #[test]
    fn undeclared_ad_hoc_variables_pass_through() {
        let spec: Vec<VariableDecl> = vec![];
        let mut provided = HashMap::new();
        provided.insert("prior_output".to_string(), Value::String("x".into()));
        let resolved = resolve_variables(&spec, &provided).unwrap();
        assert_eq!(resolved["prior_output"], Value::String("x".into()));
    }

    #[test]
    fn extracts_dotted_and_plain_refs() {
        let refs = extract_variable_refs("Hi {{ name }}, your {{ user.plan }} renews soon.");
        assert_eq!(refs, vec!["name".to_string(), "user.plan".to_string()]);
    }
}
