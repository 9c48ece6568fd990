//! Native resource -> mirror text.

use gmxsync_core::{ActionBlock, Argument, ArgKind, EventBlock, FieldValue, NativeResource};

use crate::catalog::{self, LIB_TOKEN};
use crate::PROPERTIES;

/// Render `resource` in the mirror grammar.
///
/// Output is a pure function of the input: translating an unchanged resource
/// twice yields byte-identical text.
pub fn native_to_mirror(resource: &NativeResource) -> String {
    let mut out = String::new();

    for (key, element) in PROPERTIES {
        if let Some(value) = resource.field(element) {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&render_property(value));
            out.push('\n');
        }
    }

    for event in &resource.events {
        if !out.is_empty() {
            out.push('\n');
        }
        render_event(&mut out, event);
    }
    out
}

fn render_property(value: &FieldValue) -> String {
    match value {
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Resource(None) => "none".to_string(),
        FieldValue::Resource(Some(name)) => name.clone(),
        FieldValue::Text(text) | FieldValue::Markup(text) => quote(text),
    }
}

fn render_event(out: &mut String, event: &EventBlock) {
    out.push_str("event ");
    out.push_str(&event.key.to_string());
    out.push('\n');
    for action in &event.actions {
        render_action(out, action);
    }
}

fn render_action(out: &mut String, action: &ActionBlock) {
    let entry = catalog::for_action(action);
    let head = match entry {
        Some(entry) => entry.token.to_string(),
        None => format!("{LIB_TOKEN} {} {}", action.kind.lib_id, action.kind.id),
    };

    out.push_str("  action ");
    out.push_str(&head);
    out.push(' ');
    out.push_str(action.target.as_who());
    if action.relative {
        out.push_str(" relative");
    }
    if action.negate {
        out.push_str(" not");
    }
    out.push('\n');

    if entry.is_none() {
        // Serializing a plain struct of strings, bools and ints cannot fail.
        let meta = serde_json::to_string(&action.kind).unwrap_or_default();
        out.push_str("    meta ");
        out.push_str(&meta);
        out.push('\n');
    }

    for arg in &action.args {
        render_argument(out, arg);
    }
}

fn render_argument(out: &mut String, arg: &Argument) {
    out.push_str("    arg ");
    out.push_str(arg.kind.token());

    if arg.value.contains('\n') {
        out.push('\n');
        for line in arg.value.split('\n') {
            if line.is_empty() {
                out.push_str("      |\n");
            } else {
                out.push_str("      | ");
                out.push_str(line);
                out.push('\n');
            }
        }
        return;
    }

    out.push(' ');
    out.push_str(&inline_value(arg));
    out.push('\n');
}

fn inline_value(arg: &Argument) -> String {
    match arg.kind {
        ArgKind::Boolean if arg.value == "1" => "true".to_string(),
        ArgKind::Boolean if arg.value == "0" => "false".to_string(),
        kind if kind.is_resource() && is_bare_word(&arg.value) => arg.value.clone(),
        _ => quote(&arg.value),
    }
}

/// Names GameMaker accepts for resources never need quoting.
pub(crate) fn is_bare_word(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('"')
        && !value.chars().any(|c| c.is_whitespace() || c == '#')
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
