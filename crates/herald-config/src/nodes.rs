//! Helpers for extracting values from KDL nodes.

use kdl::KdlNode;

use crate::{ConfigError, ConfigResult};

pub(crate) fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

pub(crate) fn get_first_integer_arg(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

pub(crate) fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

pub(crate) fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub(crate) fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

/// Value of a child node's first argument, e.g. `token "abc"` inside a block.
pub(crate) fn child_string(node: &KdlNode, name: &str) -> Option<String> {
    node.children()?
        .nodes()
        .iter()
        .find(|c| c.name().value() == name)
        .and_then(get_first_string_arg)
}

pub(crate) fn child_strings(node: &KdlNode, name: &str) -> Vec<String> {
    node.children()
        .and_then(|doc| doc.nodes().iter().find(|c| c.name().value() == name))
        .map(get_all_string_args)
        .unwrap_or_default()
}

pub(crate) fn child_integer(node: &KdlNode, name: &str) -> ConfigResult<Option<u64>> {
    let Some(child) = node
        .children()
        .and_then(|doc| doc.nodes().iter().find(|c| c.name().value() == name))
    else {
        return Ok(None);
    };

    let value = get_first_integer_arg(child).ok_or_else(|| ConfigError::InvalidValue {
        field: name.to_string(),
        message: "expected an integer".to_string(),
    })?;

    u64::try_from(value)
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("{} is out of range", value),
        })
}

pub(crate) fn required_child_string(node: &KdlNode, name: &str) -> ConfigResult<String> {
    child_string(node, name)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingField(format!("{} {}", node.name().value(), name)))
}
