//! Structural edit operations
//!
//! Rendered in the go-patch format understood by `bosh interpolate` and
//! `bosh update-cloud-config -o`. An append is a replace addressed at the
//! `-` (past the end) element of an array.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Op {
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Op {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            kind: OpKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            kind: OpKind::Remove,
            path: path.into(),
            value: None,
        }
    }

    pub fn append(array_path: &str, value: Value) -> Self {
        Self::replace(format!("{}/-", array_path.trim_end_matches('/')), value)
    }
}

/// `((name))` variable reference
pub fn var(name: &str) -> Value {
    Value::String(format!("(({}))", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let ops = vec![
            Op::remove("/networks/name=default?"),
            Op::append("/networks", json!({"name": "default"})),
        ];
        let rendered = serde_yaml::to_string(&ops).unwrap();
        let parsed: serde_json::Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"type": "remove", "path": "/networks/name=default?"},
                {"type": "replace", "path": "/networks/-", "value": {"name": "default"}}
            ])
        );
    }

    #[test]
    fn test_var() {
        assert_eq!(var("z1.gateway"), json!("((z1.gateway))"));
    }
}
