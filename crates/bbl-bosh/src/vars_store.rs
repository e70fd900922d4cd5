//! Reading and editing the YAML vars-store that `create-env` maintains

use crate::error::Result;
use serde_yaml::{Mapping, Value};

/// Value at `path` in the vars-store, rendered as a string
pub fn variable(variables: &str, path: &[&str]) -> Option<String> {
    let root: Value = serde_yaml::from_str(variables).ok()?;
    let mut current = &root;
    for key in path {
        current = current.get(*key)?;
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Drop a top-level variable so the next `create-env` regenerates it
pub fn remove_variable(variables: &str, name: &str) -> Result<String> {
    if variables.trim().is_empty() {
        return Ok(String::new());
    }
    let mut root: Mapping = serde_yaml::from_str(variables)?;
    root.remove(name);
    Ok(serde_yaml::to_string(&root)?)
}
