//! Mirror text -> native resource.
//!
//! Parsing happens in two steps: [`MirrorDocument::parse`] validates the
//! grammar without looking at any native data, then
//! [`MirrorDocument::apply`] merges the parsed values onto a base resource.

use gmxsync_core::{
    ActionBlock, ActionKind, ArgKind, Argument, EventBlock, EventCategory, EventKey, EventSubtype,
    FieldType, FieldValue, NativeResource, Number, Target,
};

use crate::catalog::{self, CatalogEntry, LIB_TOKEN};
use crate::error::ParseError;
use crate::render::is_bare_word;
use crate::PROPERTIES;

/// The content of a mirror file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorDocument {
    /// `(element name, value)` for every header property present.
    pub properties: Vec<(String, FieldValue)>,
    pub events: Vec<EventBlock>,
}

/// Parse `text` and merge it onto `base`.
///
/// Properties absent from the text and native-only fields keep their `base`
/// values; the event list is replaced by the one in the text.
pub fn mirror_to_native(text: &str, base: &NativeResource) -> Result<NativeResource, ParseError> {
    Ok(MirrorDocument::parse(text)?.apply(base))
}

impl MirrorDocument {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::default();
        for (index, raw) in text.lines().enumerate() {
            parser.line(index + 1, raw)?;
        }
        parser.finish()
    }

    pub fn apply(self, base: &NativeResource) -> NativeResource {
        let mut doc = base.clone();
        for (element, value) in self.properties {
            doc.set_field(&element, value);
        }
        doc.events = self.events;
        doc
    }
}

// ---------------------------------------------------------------------------
// Line parser
// ---------------------------------------------------------------------------

struct PendingAction {
    line: usize,
    entry: Option<&'static CatalogEntry>,
    /// `(libid, id)` of a `lib` action.
    lib: Option<(u32, u32)>,
    kind: Option<ActionKind>,
    target: Target,
    relative: bool,
    negate: bool,
    args: Vec<Argument>,
}

struct PendingBlock {
    kind: ArgKind,
    lines: Vec<String>,
}

#[derive(Default)]
struct Parser {
    properties: Vec<(String, FieldValue)>,
    events: Vec<EventBlock>,
    action: Option<PendingAction>,
    block: Option<PendingBlock>,
}

impl Parser {
    fn line(&mut self, no: usize, raw: &str) -> Result<(), ParseError> {
        let line = raw.trim_start();

        if let Some(rest) = line.strip_prefix('|') {
            let Some(block) = self.block.as_mut() else {
                return Err(ParseError::new(no, "text line outside of an argument block"));
            };
            block.lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            return Ok(());
        }
        self.flush_block();

        let line = strip_comment(line).trim_end();
        if line.is_empty() {
            return Ok(());
        }

        let (word, rest) = split_word(line);
        match word {
            "event" => self.event(no, rest),
            "action" => self.action(no, rest),
            "arg" => self.argument(no, rest),
            "meta" => self.meta(no, rest),
            _ => self.property(no, line),
        }
    }

    fn finish(mut self) -> Result<MirrorDocument, ParseError> {
        self.flush_block();
        self.close_action()?;
        Ok(MirrorDocument {
            properties: self.properties,
            events: self.events,
        })
    }

    fn property(&mut self, no: usize, line: &str) -> Result<(), ParseError> {
        let Some((key, value)) = line.split_once('=') else {
            return Err(ParseError::new(
                no,
                format!("unrecognised line '{line}'"),
            ));
        };
        let key = key.trim();
        let value = value.trim();

        if !self.events.is_empty() {
            return Err(ParseError::new(
                no,
                format!("property '{key}' must appear before the first event"),
            ));
        }
        let Some((_, element)) = PROPERTIES.iter().find(|(k, _)| *k == key) else {
            return Err(ParseError::new(no, format!("unknown property '{key}'")));
        };
        if self.properties.iter().any(|(e, _)| e == *element) {
            return Err(ParseError::new(no, format!("duplicate property '{key}'")));
        }

        let parsed = match FieldType::for_element(element) {
            FieldType::Bool => match value {
                "true" => FieldValue::Bool(true),
                "false" => FieldValue::Bool(false),
                other => {
                    return Err(ParseError::new(
                        no,
                        format!("'{key}' expects true or false, got '{other}'"),
                    ))
                }
            },
            FieldType::Number => FieldValue::Number(Number::parse(value).ok_or_else(|| {
                ParseError::new(no, format!("'{key}' expects a number, got '{value}'"))
            })?),
            FieldType::Resource => match value {
                "none" => FieldValue::Resource(None),
                name if is_bare_word(name) => FieldValue::Resource(Some(name.to_string())),
                other => {
                    return Err(ParseError::new(
                        no,
                        format!("'{key}' expects a resource name or none, got '{other}'"),
                    ))
                }
            },
            FieldType::Text | FieldType::Markup => FieldValue::Text(unquote(no, value)?),
        };
        self.properties.push((element.to_string(), parsed));
        Ok(())
    }

    fn event(&mut self, no: usize, rest: &str) -> Result<(), ParseError> {
        self.close_action()?;

        let mut words = rest.split_whitespace();
        let Some(token) = words.next() else {
            return Err(ParseError::new(no, "event header without a category"));
        };
        let category = EventCategory::from_token(token)
            .ok_or_else(|| ParseError::new(no, format!("unknown event '{token}'")))?;

        let subtype = match (category.takes_object(), words.next()) {
            (true, Some(object)) => EventSubtype::Object(object.to_string()),
            (true, None) => {
                return Err(ParseError::new(
                    no,
                    format!("'{token}' event needs an object name"),
                ))
            }
            (false, Some(number)) => EventSubtype::Number(number.parse().map_err(|_| {
                ParseError::new(no, format!("event subtype '{number}' is not a number"))
            })?),
            (false, None) => EventSubtype::Number(0),
        };
        if let Some(extra) = words.next() {
            return Err(ParseError::new(
                no,
                format!("unexpected '{extra}' in event header"),
            ));
        }

        self.events.push(EventBlock {
            key: EventKey { category, subtype },
            actions: Vec::new(),
        });
        Ok(())
    }

    fn action(&mut self, no: usize, rest: &str) -> Result<(), ParseError> {
        self.close_action()?;
        if self.events.is_empty() {
            return Err(ParseError::new(no, "action outside of an event"));
        }

        let mut words = rest.split_whitespace();
        let Some(token) = words.next() else {
            return Err(ParseError::new(no, "action without a kind"));
        };

        let (entry, lib, kind) = if token == LIB_TOKEN {
            let mut number = |what: &str| -> Result<u32, ParseError> {
                let word = words
                    .next()
                    .ok_or_else(|| ParseError::new(no, format!("'lib' action needs a {what}")))?;
                word.parse()
                    .map_err(|_| ParseError::new(no, format!("{what} '{word}' is not a number")))
            };
            let lib_id = number("library id")?;
            let id = number("action id")?;
            // Incomplete until the meta line arrives.
            (None, Some((lib_id, id)), None)
        } else {
            let entry = catalog::by_token(token)
                .ok_or_else(|| ParseError::new(no, format!("unknown action '{token}'")))?;
            (Some(entry), None, Some(entry.descriptor()))
        };

        let target = words.next().map(Target::from_who).unwrap_or(Target::SelfInstance);
        let mut relative = false;
        let mut negate = false;
        for flag in words {
            match flag {
                "relative" => relative = true,
                "not" => negate = true,
                other => {
                    return Err(ParseError::new(
                        no,
                        format!("unexpected '{other}' after action target"),
                    ))
                }
            }
        }

        self.action = Some(PendingAction {
            line: no,
            entry,
            lib,
            kind,
            target,
            relative,
            negate,
            args: Vec::new(),
        });
        Ok(())
    }

    fn meta(&mut self, no: usize, rest: &str) -> Result<(), ParseError> {
        let Some(action) = self.action.as_mut() else {
            return Err(ParseError::new(no, "meta outside of an action"));
        };
        let Some((lib_id, id)) = action.lib else {
            return Err(ParseError::new(no, "meta is only allowed on 'lib' actions"));
        };
        if action.kind.is_some() || !action.args.is_empty() {
            return Err(ParseError::new(no, "meta must directly follow its 'lib' action"));
        }
        let mut kind: ActionKind = serde_json::from_str(rest)
            .map_err(|e| ParseError::new(no, format!("invalid action meta: {e}")))?;
        kind.lib_id = lib_id;
        kind.id = id;
        action.kind = Some(kind);
        Ok(())
    }

    fn argument(&mut self, no: usize, rest: &str) -> Result<(), ParseError> {
        let Some(action) = self.action.as_mut() else {
            return Err(ParseError::new(no, "arg outside of an action"));
        };
        if action.kind.is_none() {
            return Err(ParseError::new(no, "'lib' action needs a meta line before its args"));
        }

        let (token, payload) = split_word(rest);
        let kind = ArgKind::from_token(token)
            .ok_or_else(|| ParseError::new(no, format!("unknown argument type '{token}'")))?;

        if payload.is_empty() {
            self.block = Some(PendingBlock {
                kind,
                lines: Vec::new(),
            });
            return Ok(());
        }

        let value = match kind {
            _ if payload.starts_with('"') => unquote(no, payload)?,
            ArgKind::Boolean if payload == "true" => "1".to_string(),
            ArgKind::Boolean if payload == "false" => "0".to_string(),
            k if k.is_resource() && is_bare_word(payload) => payload.to_string(),
            _ => {
                return Err(ParseError::new(
                    no,
                    format!("'{token}' argument value must be quoted, got '{payload}'"),
                ))
            }
        };
        action.args.push(Argument::new(kind, value));
        Ok(())
    }

    fn flush_block(&mut self) {
        if let Some(block) = self.block.take() {
            if let Some(action) = self.action.as_mut() {
                action
                    .args
                    .push(Argument::new(block.kind, block.lines.join("\n")));
            }
        }
    }

    /// Validate the pending action and attach it to the current event.
    fn close_action(&mut self) -> Result<(), ParseError> {
        let Some(action) = self.action.take() else {
            return Ok(());
        };
        let Some(kind) = action.kind else {
            return Err(ParseError::new(action.line, "'lib' action is missing its meta line"));
        };

        if let Some(entry) = action.entry {
            if action.args.len() != entry.args.len() {
                return Err(ParseError::new(
                    action.line,
                    format!(
                        "'{}' takes {} argument(s), found {}",
                        entry.token,
                        entry.args.len(),
                        action.args.len()
                    ),
                ));
            }
            for (index, (arg, expected)) in action.args.iter().zip(entry.args).enumerate() {
                if arg.kind != *expected {
                    return Err(ParseError::new(
                        action.line,
                        format!(
                            "'{}' argument {} must be {}, found {}",
                            entry.token,
                            index + 1,
                            expected.token(),
                            arg.kind.token()
                        ),
                    ));
                }
            }
        }

        if let Some(event) = self.events.last_mut() {
            event.actions.push(ActionBlock {
                kind,
                target: action.target,
                relative: action.relative,
                negate: action.negate,
                args: action.args,
            });
        }
        Ok(())
    }
}

/// Cut a `#` comment that starts the line or follows whitespace. Quoted
/// values are skipped over, `|` lines never reach here.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut escaped = false;
    let mut after_space = true;
    for (at, c) in line.char_indices() {
        if quoted {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => {}
            }
        } else if c == '"' {
            quoted = true;
        } else if c == '#' && after_space {
            return &line[..at];
        }
        after_space = c.is_whitespace();
    }
    line
}

fn split_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    }
}

fn unquote(no: usize, value: &str) -> Result<String, ParseError> {
    serde_json::from_str::<String>(value)
        .map_err(|e| ParseError::new(no, format!("invalid quoted string {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_header_events_and_blocks() {
        let text = "\
# enemy object
sprite = spr_enemy
solid = true
depth = -10

event create
  action code self
    arg string
      | hp = 3;
      |
      |     speed = 2;
event collision obj_wall
  action destroy other
  action set_variable self relative
    arg string \"hp\"
    arg expr \"-1\"
";
        let doc = MirrorDocument::parse(text).expect("parse");
        assert_eq!(
            doc.properties,
            vec![
                (
                    "spriteName".to_string(),
                    FieldValue::Resource(Some("spr_enemy".into()))
                ),
                ("solid".to_string(), FieldValue::Bool(true)),
                ("depth".to_string(), FieldValue::Number(Number::from(-10))),
            ]
        );
        assert_eq!(doc.events.len(), 2);
        let code = &doc.events[0].actions[0];
        assert_eq!(code.args[0].value, "hp = 3;\n\n    speed = 2;");

        let collision = &doc.events[1];
        assert_eq!(collision.key, EventKey::collision("obj_wall"));
        assert_eq!(collision.actions[0].target, Target::Other);
        assert!(collision.actions[1].relative);
        assert_eq!(collision.actions[1].args[1].value, "-1");
    }

    #[test]
    fn apply_keeps_native_only_fields() {
        let mut base = NativeResource::skeleton();
        base.set_field("PhysicsObjectDensity", FieldValue::Number(Number::from(3)));
        let doc = mirror_to_native("depth = 5\n", &base).expect("merge");
        assert_eq!(
            doc.field("PhysicsObjectDensity"),
            Some(&FieldValue::Number(Number::from(3)))
        );
        assert_eq!(doc.field("depth"), Some(&FieldValue::Number(Number::from(5))));
        assert_eq!(doc.field("visible"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn lib_action_takes_descriptor_from_meta() {
        let text = "event step 2\n  action lib 7 900 obj_boss not\n    meta {\"kind\":0,\"use_relative\":false,\"is_question\":true,\"use_apply_to\":false,\"exe_type\":1,\"function_name\":\"ext_check\",\"code_string\":\"\"}\n    arg bool true\n";
        let doc = MirrorDocument::parse(text).expect("parse");
        let action = &doc.events[0].actions[0];
        assert_eq!(doc.events[0].key, EventKey::new(EventCategory::Step, 2));
        assert_eq!((action.kind.lib_id, action.kind.id), (7, 900));
        assert!(action.kind.is_question);
        assert!(action.negate);
        assert_eq!(action.args, vec![Argument::new(ArgKind::Boolean, "1")]);
    }

    #[rstest]
    #[case("event explode\n", 1, "unknown event 'explode'")]
    #[case("event create\n  action teleport self\n", 2, "unknown action 'teleport'")]
    #[case("event create\n  action destroy self\n    arg expr \"1\"\n", 2, "'destroy' takes 0 argument(s), found 1")]
    #[case("event create\n  action code self\n", 2, "'code' takes 1 argument(s), found 0")]
    #[case("event create\n  action code self\n    arg expr \"x\"\n", 2, "'code' argument 1 must be string, found expr")]
    #[case("colour = red\n", 1, "unknown property 'colour'")]
    #[case("solid = maybe\n", 1, "'solid' expects true or false, got 'maybe'")]
    #[case("event create\ndepth = 1\n", 2, "property 'depth' must appear before the first event")]
    #[case("event collision\n", 1, "'collision' event needs an object name")]
    #[case("event alarm soon\n", 1, "event subtype 'soon' is not a number")]
    #[case("| stray\n", 1, "text line outside of an argument block")]
    #[case("action code self\n", 1, "action outside of an event")]
    #[case("event create\n  action lib 1 900 self\n", 2, "'lib' action is missing its meta line")]
    #[case("event create\n  action code self\n    arg string hp\n", 3, "'string' argument value must be quoted, got 'hp'")]
    #[case("bogus line\n", 1, "unrecognised line 'bogus line'")]
    fn malformed_input_reports_line(
        #[case] text: &str,
        #[case] line: usize,
        #[case] reason: &str,
    ) {
        let err = MirrorDocument::parse(text).expect_err("should fail");
        assert_eq!(err, ParseError::new(line, reason));
    }

    #[rstest]
    #[case("sprite = spr_enemy          # resource or none", "sprite = spr_enemy          ")]
    #[case("event create  # event <category> [subtype]", "event create  ")]
    #[case("# whole line", "")]
    #[case("arg string \"a # b\"  # inline", "arg string \"a # b\"  ")]
    #[case("arg string \"say \\\"#1\\\"\"", "arg string \"say \\\"#1\\\"\"")]
    #[case("parent = obj#2", "parent = obj#2")]
    fn trailing_comments_are_cut_outside_quotes(#[case] line: &str, #[case] kept: &str) {
        assert_eq!(strip_comment(line), kept);
    }

    #[test]
    fn annotated_lines_parse_like_plain_ones() {
        let annotated = "\
sprite = spr_enemy          # resource or none
solid = false               # true | false
depth = -10                 # number

event create                # event <category> [subtype]
  action code self          # action <token> <target> [relative] [not]
    arg string
    | hp = 3; # stays in the code
  action set_variable self relative
    arg string \"hp\"         # quoted inline value
    arg expr \"x # 2\"
";
        let plain = "\
sprite = spr_enemy
solid = false
depth = -10

event create
  action code self
    arg string
    | hp = 3; # stays in the code
  action set_variable self relative
    arg string \"hp\"
    arg expr \"x # 2\"
";
        let doc = MirrorDocument::parse(annotated).expect("annotated");
        assert_eq!(doc, MirrorDocument::parse(plain).expect("plain"));

        let actions = &doc.events[0].actions;
        assert_eq!(
            actions[0].args[0],
            Argument::new(ArgKind::String, "hp = 3; # stays in the code")
        );
        assert_eq!(actions[1].args[1], Argument::new(ArgKind::Expression, "x # 2"));
    }
}
