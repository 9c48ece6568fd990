//! Domain types for GameMaker object resources.
//!
//! A [`NativeResource`] is the in-memory form of an `.object.gmx` document.
//! Element order is significant everywhere: fields keep document order, and
//! events, actions and arguments keep execution order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The literal GameMaker writes for an unset resource reference.
pub const UNDEFINED_RESOURCE: &str = "<undefined>";

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A numeric field kept in its lexical form so that `0.100000001490116`
/// survives a round trip byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// Validate `text` as a decimal number and keep it verbatim.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.parse::<f64>().is_err() {
            return None;
        }
        // `inf` and `NaN` parse as f64 but never appear in GameMaker files.
        if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Typed value of a top-level object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// GameMaker booleans: `-1` is true, `0` is false.
    Bool(bool),
    Number(Number),
    /// `None` is the `<undefined>` sentinel.
    Resource(Option<String>),
    Text(String),
    /// Raw inner XML of a structured element the mirror grammar does not model.
    Markup(String),
}

/// How a field element is interpreted, decided by its element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Number,
    Resource,
    Markup,
    Text,
}

impl FieldType {
    pub fn for_element(name: &str) -> Self {
        match name {
            "solid" | "visible" | "persistent" | "PhysicsObject" | "PhysicsObjectSensor"
            | "PhysicsObjectAwake" | "PhysicsObjectKinematic" => FieldType::Bool,
            "depth"
            | "PhysicsObjectShape"
            | "PhysicsObjectDensity"
            | "PhysicsObjectRestitution"
            | "PhysicsObjectGroup"
            | "PhysicsObjectLinearDamping"
            | "PhysicsObjectAngularDamping"
            | "PhysicsObjectFriction" => FieldType::Number,
            "spriteName" | "parentName" | "maskName" => FieldType::Resource,
            "PhysicsShapePoints" => FieldType::Markup,
            _ => FieldType::Text,
        }
    }
}

/// One top-level element of an object document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// GameMaker event categories with their `eventtype` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventCategory {
    Create,
    Destroy,
    Alarm,
    Step,
    Collision,
    Keyboard,
    Mouse,
    Other,
    Draw,
    KeyPress,
    KeyRelease,
    Trigger,
    CleanUp,
}

impl EventCategory {
    pub fn all() -> &'static [EventCategory] {
        &[
            EventCategory::Create,
            EventCategory::Destroy,
            EventCategory::Alarm,
            EventCategory::Step,
            EventCategory::Collision,
            EventCategory::Keyboard,
            EventCategory::Mouse,
            EventCategory::Other,
            EventCategory::Draw,
            EventCategory::KeyPress,
            EventCategory::KeyRelease,
            EventCategory::Trigger,
            EventCategory::CleanUp,
        ]
    }

    pub fn code(self) -> u32 {
        match self {
            EventCategory::Create => 0,
            EventCategory::Destroy => 1,
            EventCategory::Alarm => 2,
            EventCategory::Step => 3,
            EventCategory::Collision => 4,
            EventCategory::Keyboard => 5,
            EventCategory::Mouse => 6,
            EventCategory::Other => 7,
            EventCategory::Draw => 8,
            EventCategory::KeyPress => 9,
            EventCategory::KeyRelease => 10,
            EventCategory::Trigger => 11,
            EventCategory::CleanUp => 12,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.code() == code)
    }

    /// Token used by the mirror grammar.
    pub fn token(self) -> &'static str {
        match self {
            EventCategory::Create => "create",
            EventCategory::Destroy => "destroy",
            EventCategory::Alarm => "alarm",
            EventCategory::Step => "step",
            EventCategory::Collision => "collision",
            EventCategory::Keyboard => "keyboard",
            EventCategory::Mouse => "mouse",
            EventCategory::Other => "other",
            EventCategory::Draw => "draw",
            EventCategory::KeyPress => "keypress",
            EventCategory::KeyRelease => "keyrelease",
            EventCategory::Trigger => "trigger",
            EventCategory::CleanUp => "cleanup",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.token() == token)
    }

    /// Collision events are keyed by the other object's name, not a number.
    pub fn takes_object(self) -> bool {
        matches!(self, EventCategory::Collision)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventSubtype {
    /// `enumb` attribute.
    Number(u32),
    /// `ename` attribute.
    Object(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub category: EventCategory,
    pub subtype: EventSubtype,
}

impl EventKey {
    pub fn new(category: EventCategory, number: u32) -> Self {
        Self {
            category,
            subtype: EventSubtype::Number(number),
        }
    }

    pub fn collision(object: impl Into<String>) -> Self {
        Self {
            category: EventCategory::Collision,
            subtype: EventSubtype::Object(object.into()),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            EventSubtype::Number(0) => write!(f, "{}", self.category),
            EventSubtype::Number(n) => write!(f, "{} {n}", self.category),
            EventSubtype::Object(name) => write!(f, "{} {name}", self.category),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub key: EventKey,
    pub actions: Vec<ActionBlock>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Static descriptor of a drag-and-drop action, as stored in every `<action>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKind {
    #[serde(skip)]
    pub lib_id: u32,
    #[serde(skip)]
    pub id: u32,
    pub kind: i32,
    pub use_relative: bool,
    pub is_question: bool,
    pub use_apply_to: bool,
    pub exe_type: i32,
    pub function_name: String,
    pub code_string: String,
}

/// The instance an action applies to (`whoName`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    SelfInstance,
    Other,
    Object(String),
}

impl Target {
    pub fn from_who(who: &str) -> Self {
        match who {
            "self" => Target::SelfInstance,
            "other" => Target::Other,
            name => Target::Object(name.to_string()),
        }
    }

    pub fn as_who(&self) -> &str {
        match self {
            Target::SelfInstance => "self",
            Target::Other => "other",
            Target::Object(name) => name,
        }
    }
}

/// GameMaker action argument kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Expression,
    String,
    Both,
    Boolean,
    Menu,
    Sprite,
    Sound,
    Background,
    Path,
    Script,
    Object,
    Room,
    Font,
    Color,
    Timeline,
    FontString,
}

impl ArgKind {
    pub fn all() -> &'static [ArgKind] {
        &[
            ArgKind::Expression,
            ArgKind::String,
            ArgKind::Both,
            ArgKind::Boolean,
            ArgKind::Menu,
            ArgKind::Sprite,
            ArgKind::Sound,
            ArgKind::Background,
            ArgKind::Path,
            ArgKind::Script,
            ArgKind::Object,
            ArgKind::Room,
            ArgKind::Font,
            ArgKind::Color,
            ArgKind::Timeline,
            ArgKind::FontString,
        ]
    }

    pub fn code(self) -> u32 {
        Self::all()
            .iter()
            .position(|k| *k == self)
            .map(|p| p as u32)
            .unwrap_or_default()
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::all().get(code as usize).copied()
    }

    /// Mirror grammar token.
    pub fn token(self) -> &'static str {
        match self {
            ArgKind::Expression => "expr",
            ArgKind::String => "string",
            ArgKind::Both => "both",
            ArgKind::Boolean => "bool",
            ArgKind::Menu => "menu",
            ArgKind::Sprite => "sprite",
            ArgKind::Sound => "sound",
            ArgKind::Background => "background",
            ArgKind::Path => "path",
            ArgKind::Script => "script",
            ArgKind::Object => "object",
            ArgKind::Room => "room",
            ArgKind::Font => "font",
            ArgKind::Color => "color",
            ArgKind::Timeline => "timeline",
            ArgKind::FontString => "fontstring",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.token() == token)
    }

    /// Element name carrying the value inside `<argument>`.
    pub fn value_element(self) -> &'static str {
        if self.is_resource() {
            self.token()
        } else {
            "string"
        }
    }

    pub fn is_resource(self) -> bool {
        matches!(
            self,
            ArgKind::Sprite
                | ArgKind::Sound
                | ArgKind::Background
                | ArgKind::Path
                | ArgKind::Script
                | ArgKind::Object
                | ArgKind::Room
                | ArgKind::Font
                | ArgKind::Timeline
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub kind: ArgKind,
    pub value: String,
}

impl Argument {
    pub fn new(kind: ArgKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBlock {
    pub kind: ActionKind,
    pub target: Target,
    pub relative: bool,
    pub negate: bool,
    pub args: Vec<Argument>,
}

// ---------------------------------------------------------------------------
// Resource document
// ---------------------------------------------------------------------------

/// A parsed `.object.gmx` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeResource {
    pub fields: Vec<Field>,
    /// Index into `fields` where the `<events>` element sits.
    pub events_at: usize,
    pub events: Vec<EventBlock>,
}

impl NativeResource {
    /// The document GameMaker Studio creates for a fresh object.
    pub fn skeleton() -> Self {
        let undefined = || FieldValue::Resource(None);
        let number = |text: &str| FieldValue::Number(Number(text.to_string()));
        let fields = vec![
            Field::new("spriteName", undefined()),
            Field::new("solid", FieldValue::Bool(false)),
            Field::new("visible", FieldValue::Bool(true)),
            Field::new("depth", number("0")),
            Field::new("persistent", FieldValue::Bool(false)),
            Field::new("parentName", undefined()),
            Field::new("maskName", undefined()),
            Field::new("PhysicsObject", FieldValue::Bool(false)),
            Field::new("PhysicsObjectSensor", FieldValue::Bool(false)),
            Field::new("PhysicsObjectShape", number("0")),
            Field::new("PhysicsObjectDensity", number("0.5")),
            Field::new("PhysicsObjectRestitution", number("0.100000001490116")),
            Field::new("PhysicsObjectGroup", number("0")),
            Field::new("PhysicsObjectLinearDamping", number("0.100000001490116")),
            Field::new("PhysicsObjectAngularDamping", number("0.100000001490116")),
            Field::new("PhysicsObjectFriction", number("0.200000002980232")),
            Field::new("PhysicsObjectAwake", FieldValue::Bool(true)),
            Field::new("PhysicsObjectKinematic", FieldValue::Bool(false)),
            Field::new("PhysicsShapePoints", FieldValue::Markup(String::new())),
        ];
        Self {
            fields,
            events_at: 7,
            events: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Replace the value of `name`, appending the field before `<events>`
    /// when the document does not carry it yet.
    pub fn set_field(&mut self, name: &str, value: FieldValue) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = value;
            return;
        }
        self.fields.insert(self.events_at, Field::new(name, value));
        self.events_at += 1;
    }
}

/// Resource kinds that can be referenced from the project manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Object,
    Script,
}

impl ResourceKind {
    /// Element name of a manifest entry.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Object => "object",
            ResourceKind::Script => "script",
        }
    }

    /// Manifest group that holds this kind by default.
    pub fn group(self) -> &'static str {
        match self {
            ResourceKind::Object => "objects",
            ResourceKind::Script => "scripts",
        }
    }

    /// Backslash path GameMaker stores as entry text.
    pub fn entry_path(self, name: &str) -> String {
        match self {
            ResourceKind::Object => format!("objects\\{name}"),
            ResourceKind::Script => format!("scripts\\{name}.gml"),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keeps_lexical_form() {
        let n = Number::parse(" 0.100000001490116 ").expect("number");
        assert_eq!(n.as_str(), "0.100000001490116");
        assert!(Number::parse("abc").is_none());
        assert!(Number::parse("inf").is_none());
        assert!(Number::parse("1e3").is_some());
    }

    #[test]
    fn event_codes_roundtrip() {
        for category in EventCategory::all() {
            assert_eq!(EventCategory::from_code(category.code()), Some(*category));
            assert_eq!(EventCategory::from_token(category.token()), Some(*category));
        }
    }

    #[test]
    fn arg_kind_codes_are_positional() {
        assert_eq!(ArgKind::Expression.code(), 0);
        assert_eq!(ArgKind::Object.code(), 10);
        assert_eq!(ArgKind::from_code(15), Some(ArgKind::FontString));
        assert_eq!(ArgKind::from_code(16), None);
        assert_eq!(ArgKind::Object.value_element(), "object");
        assert_eq!(ArgKind::Color.value_element(), "string");
    }

    #[test]
    fn set_field_inserts_before_events() {
        let mut doc = NativeResource::skeleton();
        let before = doc.events_at;
        doc.set_field("customFlag", FieldValue::Text("1".into()));
        assert_eq!(doc.events_at, before + 1);
        assert_eq!(doc.fields[before].name, "customFlag");

        doc.set_field("depth", FieldValue::Number(Number::from(-10)));
        assert_eq!(doc.field("depth"), Some(&FieldValue::Number(Number::from(-10))));
    }

    #[test]
    fn event_key_display_omits_zero_subtype() {
        assert_eq!(EventKey::new(EventCategory::Create, 0).to_string(), "create");
        assert_eq!(EventKey::new(EventCategory::Alarm, 3).to_string(), "alarm 3");
        assert_eq!(EventKey::collision("obj_wall").to_string(), "collision obj_wall");
    }
}
