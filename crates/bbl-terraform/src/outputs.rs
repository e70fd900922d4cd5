//! Infrastructure engine outputs
//!
//! Both `terraform output -json` and the `outputs` section of a v4 state file
//! map an output name to `{ "value": ..., "type": ..., "sensitive": ... }`.

use crate::error::{Result, TerraformError};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    values: BTreeMap<String, Value>,
}

impl Outputs {
    /// Parse the `{name: {value: ...}}` map
    #[cfg(test)]
    pub fn from_output_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Value> =
            serde_json::from_str(json).map_err(|e| TerraformError::InvalidState(e.to_string()))?;
        Ok(Self::from_entries(raw))
    }

    fn from_entries(raw: BTreeMap<String, Value>) -> Self {
        let values = raw
            .into_iter()
            .map(|(name, entry)| {
                let value = match entry {
                    Value::Object(mut object) => object.remove("value").unwrap_or(Value::Null),
                    other => other,
                };
                (name, value)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String output; numbers and booleans are rendered
    pub fn string(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        match self.values.get(name)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Outputs in name order, with strings unquoted
    pub fn rendered(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), rendered)
            })
            .collect()
    }
}

/// Outputs recorded in a terraform state blob; an empty blob has none
pub fn outputs_from_state(tf_state: &str) -> Result<Outputs> {
    if tf_state.trim().is_empty() {
        return Ok(Outputs::default());
    }
    let state: Value =
        serde_json::from_str(tf_state).map_err(|e| TerraformError::InvalidState(e.to_string()))?;
    let raw = match state.get("outputs") {
        Some(Value::Object(outputs)) => outputs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => BTreeMap::new(),
    };
    Ok(Outputs::from_entries(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TF_STATE: &str = r#"{
        "version": 4,
        "terraform_version": "1.5.7",
        "outputs": {
            "director_address": {"value": "https://10.0.0.6:25555", "type": "string"},
            "internal_cidr": {"value": "10.0.0.0/16", "type": "string"},
            "subnet_cidrs": {"value": ["10.0.16.0/20", "10.0.32.0/20"], "type": ["list", "string"]},
            "bosh_port": {"value": 25555, "type": "number"}
        },
        "resources": []
    }"#;

    #[test]
    fn test_outputs_from_state() {
        let outputs = outputs_from_state(TF_STATE).unwrap();
        assert_eq!(
            outputs.string("director_address").as_deref(),
            Some("https://10.0.0.6:25555")
        );
        assert_eq!(outputs.string("bosh_port").as_deref(), Some("25555"));
        assert_eq!(
            outputs.list("subnet_cidrs").unwrap(),
            vec!["10.0.16.0/20", "10.0.32.0/20"]
        );
        assert!(outputs.string("missing").is_none());
    }

    #[test]
    fn test_empty_state_has_no_outputs() {
        assert!(outputs_from_state("").unwrap().is_empty());
        assert!(outputs_from_state(r#"{"version":4}"#).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_state() {
        assert!(matches!(
            outputs_from_state("{"),
            Err(TerraformError::InvalidState(_))
        ));
    }

    #[test]
    fn test_output_json() {
        let outputs = Outputs::from_output_json(
            r#"{"jumpbox_url":{"sensitive":false,"type":"string","value":"35.1.2.3:22"}}"#,
        )
        .unwrap();
        assert_eq!(
            outputs.rendered(),
            vec![("jumpbox_url".to_string(), "35.1.2.3:22".to_string())]
        );
    }
}
