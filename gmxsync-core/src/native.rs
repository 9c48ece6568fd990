//! Codec for native `.object.gmx` documents.
//!
//! Decoding uses `roxmltree`; encoding uses the `quick-xml` writer with the
//! two-space indentation GameMaker Studio produces. Encoding is
//! deterministic, so `write_native(parse_native(write_native(r)))` is
//! byte-identical to `write_native(r)`.

use std::io::Cursor;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use roxmltree::Node;

use crate::error::NativeError;
use crate::types::{
    ActionBlock, ActionKind, ArgKind, Argument, EventBlock, EventCategory, EventKey, EventSubtype,
    Field, FieldType, FieldValue, NativeResource, Number, Target, UNDEFINED_RESOURCE,
};

/// Comment GameMaker places at the top of every generated document.
pub const GENERATOR_COMMENT: &str =
    "This Document is generated by GameMaker, if you edit it by hand then you do so at your own risk!";

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Parse an `.object.gmx` document.
pub fn parse_native(xml: &str) -> Result<NativeResource, NativeError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "object" {
        return Err(NativeError::UnexpectedRoot(
            root.tag_name().name().to_string(),
        ));
    }

    let mut fields = Vec::new();
    let mut events_at = None;
    let mut events = Vec::new();

    for node in root.children().filter(Node::is_element) {
        let name = node.tag_name().name();
        if name == "events" && events_at.is_none() {
            events_at = Some(fields.len());
            events = parse_events(node)?;
            continue;
        }
        fields.push(Field::new(name, parse_field(xml, node)?));
    }

    Ok(NativeResource {
        events_at: events_at.unwrap_or(fields.len()),
        fields,
        events,
    })
}

fn parse_field(xml: &str, node: Node) -> Result<FieldValue, NativeError> {
    let name = node.tag_name().name();
    let has_elements = node.children().any(|c| c.is_element());
    let field_type = match FieldType::for_element(name) {
        FieldType::Text if has_elements => FieldType::Markup,
        other => other,
    };
    let text = node.text().unwrap_or("");

    let value = match field_type {
        FieldType::Bool => FieldValue::Bool(parse_gm_bool(node, text)?),
        FieldType::Number => FieldValue::Number(
            Number::parse(text).ok_or_else(|| invalid(node, format!("'{text}' is not a number")))?,
        ),
        FieldType::Resource => FieldValue::Resource(parse_resource_ref(text)),
        FieldType::Markup => FieldValue::Markup(inner_markup(xml, node).to_string()),
        FieldType::Text => FieldValue::Text(text.to_string()),
    };
    Ok(value)
}

fn parse_events(events: Node) -> Result<Vec<EventBlock>, NativeError> {
    let mut blocks = Vec::new();
    for node in events.children().filter(Node::is_element) {
        if node.tag_name().name() != "event" {
            return Err(invalid(
                node,
                format!("unexpected <{}> inside <events>", node.tag_name().name()),
            ));
        }

        let code = node
            .attribute("eventtype")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_else(|| invalid(node, "missing or non-numeric eventtype".to_string()))?;
        let category = EventCategory::from_code(code)
            .ok_or_else(|| invalid(node, format!("unknown eventtype {code}")))?;

        let subtype = if category.takes_object() {
            let name = node
                .attribute("ename")
                .ok_or_else(|| invalid(node, "collision event without ename".to_string()))?;
            EventSubtype::Object(name.to_string())
        } else {
            let number = match node.attribute("enumb") {
                Some(v) => v
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(node, format!("enumb '{v}' is not a number")))?,
                None => 0,
            };
            EventSubtype::Number(number)
        };

        let mut actions = Vec::new();
        for action in node
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "action")
        {
            actions.push(parse_action(action)?);
        }

        blocks.push(EventBlock {
            key: EventKey { category, subtype },
            actions,
        });
    }
    Ok(blocks)
}

fn parse_action(node: Node) -> Result<ActionBlock, NativeError> {
    let kind = ActionKind {
        lib_id: child_u32(node, "libid")?,
        id: child_u32(node, "id")?,
        kind: child_i32(node, "kind")?,
        use_relative: child_bool(node, "userelative")?,
        is_question: child_bool(node, "isquestion")?,
        use_apply_to: child_bool(node, "useapplyto")?,
        exe_type: child_i32(node, "exetype")?,
        function_name: child_text(node, "functionname").unwrap_or("").to_string(),
        code_string: child_text(node, "codestring").unwrap_or("").to_string(),
    };

    let mut args = Vec::new();
    if let Some(list) = child(node, "arguments") {
        for arg in list
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "argument")
        {
            let code = child_u32(arg, "kind")?;
            let arg_kind = ArgKind::from_code(code)
                .ok_or_else(|| invalid(arg, format!("unknown argument kind {code}")))?;
            let value = arg
                .children()
                .find(|c| c.is_element() && c.tag_name().name() != "kind")
                .and_then(|c| c.text())
                .unwrap_or("");
            args.push(Argument::new(arg_kind, value));
        }
    }

    Ok(ActionBlock {
        kind,
        target: Target::from_who(child_text(node, "whoName").unwrap_or("self")),
        relative: child_bool(node, "relative")?,
        negate: child_bool(node, "isnot")?,
        args,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag).map(|c| c.text().unwrap_or(""))
}

fn child_u32(node: Node, tag: &str) -> Result<u32, NativeError> {
    let text = child_text(node, tag).unwrap_or("0");
    text.trim()
        .parse()
        .map_err(|_| invalid(node, format!("<{tag}> '{text}' is not an unsigned integer")))
}

fn child_i32(node: Node, tag: &str) -> Result<i32, NativeError> {
    let text = child_text(node, tag).unwrap_or("0");
    text.trim()
        .parse()
        .map_err(|_| invalid(node, format!("<{tag}> '{text}' is not an integer")))
}

fn child_bool(node: Node, tag: &str) -> Result<bool, NativeError> {
    match child(node, tag) {
        Some(c) => parse_gm_bool(c, c.text().unwrap_or("")),
        None => Ok(false),
    }
}

/// GameMaker writes `-1` for true; any non-zero integer is accepted.
fn parse_gm_bool(node: Node, text: &str) -> Result<bool, NativeError> {
    match text.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => other
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| invalid(node, format!("'{other}' is not a boolean"))),
    }
}

fn parse_resource_ref(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == UNDEFINED_RESOURCE {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Raw source text between the start and end tags of `node`.
fn inner_markup<'a>(xml: &'a str, node: Node) -> &'a str {
    match (node.first_child(), node.last_child()) {
        (Some(first), Some(last)) => &xml[first.range().start..last.range().end],
        _ => "",
    }
}

fn invalid(node: Node, reason: String) -> NativeError {
    NativeError::InvalidValue {
        element: node.tag_name().name().to_string(),
        offset: node.range().start,
        reason,
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize `resource` as an `.object.gmx` document (trailing newline included).
pub fn write_native(resource: &NativeResource) -> Result<String, NativeError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Comment(BytesText::from_escaped(GENERATOR_COMMENT)))?;
    writer.write_event(Event::Start(BytesStart::new("object")))?;

    let split = resource.events_at.min(resource.fields.len());
    for field in &resource.fields[..split] {
        write_field(&mut writer, field)?;
    }
    write_events(&mut writer, &resource.events)?;
    for field in &resource.fields[split..] {
        write_field(&mut writer, field)?;
    }

    writer.write_event(Event::End(BytesEnd::new("object")))?;
    let mut out = String::from_utf8(writer.into_inner().into_inner())?;
    out.push('\n');
    Ok(out)
}

fn write_field(writer: &mut XmlWriter, field: &Field) -> Result<(), NativeError> {
    match &field.value {
        FieldValue::Bool(b) => write_simple(writer, &field.name, gm_bool(*b)),
        FieldValue::Number(n) => write_simple(writer, &field.name, n.as_str()),
        FieldValue::Resource(r) => write_simple(
            writer,
            &field.name,
            r.as_deref().unwrap_or(UNDEFINED_RESOURCE),
        ),
        FieldValue::Text(t) => write_simple(writer, &field.name, t),
        FieldValue::Markup(raw) if raw.is_empty() => {
            writer.write_event(Event::Empty(BytesStart::new(field.name.as_str())))?;
            Ok(())
        }
        FieldValue::Markup(raw) => {
            writer.write_event(Event::Start(BytesStart::new(field.name.as_str())))?;
            writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new(field.name.as_str())))?;
            Ok(())
        }
    }
}

fn write_events(writer: &mut XmlWriter, events: &[EventBlock]) -> Result<(), NativeError> {
    if events.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("events")))?;
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new("events")))?;
    for event in events {
        let code = event.key.category.code().to_string();
        let mut start = BytesStart::new("event");
        start.push_attribute(("eventtype", code.as_str()));
        match &event.key.subtype {
            EventSubtype::Number(n) => {
                let n = n.to_string();
                start.push_attribute(("enumb", n.as_str()));
            }
            EventSubtype::Object(name) => start.push_attribute(("ename", name.as_str())),
        }

        if event.actions.is_empty() {
            writer.write_event(Event::Empty(start))?;
            continue;
        }
        writer.write_event(Event::Start(start))?;
        for action in &event.actions {
            write_action(writer, action)?;
        }
        writer.write_event(Event::End(BytesEnd::new("event")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("events")))?;
    Ok(())
}

fn write_action(writer: &mut XmlWriter, action: &ActionBlock) -> Result<(), NativeError> {
    let kind = &action.kind;
    writer.write_event(Event::Start(BytesStart::new("action")))?;
    write_simple(writer, "libid", &kind.lib_id.to_string())?;
    write_simple(writer, "id", &kind.id.to_string())?;
    write_simple(writer, "kind", &kind.kind.to_string())?;
    write_simple(writer, "userelative", gm_bool(kind.use_relative))?;
    write_simple(writer, "isquestion", gm_bool(kind.is_question))?;
    write_simple(writer, "useapplyto", gm_bool(kind.use_apply_to))?;
    write_simple(writer, "exetype", &kind.exe_type.to_string())?;
    write_simple(writer, "functionname", &kind.function_name)?;
    write_simple(writer, "codestring", &kind.code_string)?;
    write_simple(writer, "whoName", action.target.as_who())?;
    write_simple(writer, "relative", gm_bool(action.relative))?;
    write_simple(writer, "isnot", gm_bool(action.negate))?;

    if action.args.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("arguments")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("arguments")))?;
        for arg in &action.args {
            writer.write_event(Event::Start(BytesStart::new("argument")))?;
            write_simple(writer, "kind", &arg.kind.code().to_string())?;
            write_simple(writer, arg.kind.value_element(), &arg.value)?;
            writer.write_event(Event::End(BytesEnd::new("argument")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("arguments")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("action")))?;
    Ok(())
}

/// `<name>value</name>` on one line, including when `value` is empty.
fn write_simple(writer: &mut XmlWriter, name: &str, value: &str) -> Result<(), NativeError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn gm_bool(value: bool) -> &'static str {
    if value {
        "-1"
    } else {
        "0"
    }
}
