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

//! Step condition evaluation ( step 3): a three-term predicate
//! evaluated against a step's merged variable scope.

use prompthub_core::model::{Condition, ConditionOp};
use serde_json::Value;
use std::collections::HashMap;

/// `None` means the step has no condition and always runs.
pub fn evaluate(condition: Option<&Condition>, scope: &HashMap<String, Value>) -> bool {
    let Some(condition) = condition else { return true };
    let actual = scope.get(&condition.variable);

    match condition.operator {
        ConditionOp::Exists => actual.is_some(),
        ConditionOp::NotExists => actual.is_none(),
        ConditionOp::Eq => actual.map(|a| value_eq(a, condition.value.as_ref())).unwrap_or(false),
        ConditionOp::Neq => !actual.map(|a| value_eq(a, condition.value.as_ref())).unwrap_or(false),
        ConditionOp::In => match (actual, &condition.value) {
            (Some(a), Some(Value::Array(items))) => items.iter().any(|i| i == a),
            _ => false,
        },
        ConditionOp::NotIn => match (actual, &condition.value) {
            (Some(a), Some(Value::Array(items))) => !items.iter().any(|i| i == a),
            _ => true,
        },
        ConditionOp::Gt => compare(actual, condition.value.as_ref(), |a, b| a > b),
        ConditionOp::Gte => compare(actual, condition.value.as_ref(), |a, b| a >= b),
        ConditionOp::Lt => compare(actual, condition.value.as_ref(), |a, b| a < b),
        ConditionOp::Lte => compare(actual, condition.value.as_ref(), |a, b| a <= b),
    }
}

fn value_eq(a: &Value, b: Option<&Value>) -> bool {
    b.map(|b| a == b).unwrap_or(false)
}

fn compare(actual: Option<&Value>, expected: Option<&Value>, op: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(Value::as_f64), expected.and_then(Value::as_f64)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn cond(variable: &str, operator: ConditionOp, value: Option<Value>) -> Condition {
        Condition { variable: variable.to_string(), operator, value }
    }

    #[test]
    fn no_condition_always_runs() {
        assert!(evaluate(None, &HashMap::new()));
    }

    #[test]
    fn eq_matches_exact_value() {
        let scope = scope(&[("tier", json!("gold"))]);
        assert!(evaluate(Some(&cond("tier", ConditionOp::Eq, Some(json!("gold")))), &scope));
        assert!(!evaluate(Some(&cond("tier", ConditionOp::Eq, Some(json!("silver")))), &scope));
    }

    #[test]
    fn exists_and_not_exists() {
        let scope = scope(&[("tier", json!("gold"))]);
        assert!(evaluate(Some(&cond("tier", ConditionOp::Exists, None)), &scope));
        assert!(!evaluate(Some(&cond("missing", ConditionOp::Exists, None)), &scope));
        assert!(evaluate(Some(&cond("missing", ConditionOp::NotExists, None)), &scope));
    }

    #[test]
    fn numeric_comparisons() {
        let scope = scope(&[("count", json!(5))]);
        assert!(evaluate(Some(&cond("count", ConditionOp::Gt, Some(json!(3)))), &scope));
        assert!(!evaluate(Some(&cond("count", ConditionOp::Lt, Some(json!(3)))), &scope));
        assert!(evaluate(Some(&cond("count", ConditionOp::Gte, Some(json!(5)))), &scope));
    }

    #[test]
    fn in_and_not_in() {
        let scope = scope(&[("tier", json!("gold"))]);
        let values = json!(["gold", "platinum"]);
        assert!(evaluate(Some(&cond("tier", ConditionOp::In, Some(values.clone()))), &scope));
        assert!(!evaluate(Some(&cond("tier", ConditionOp::NotIn, Some(values))), &scope));
    }
}
