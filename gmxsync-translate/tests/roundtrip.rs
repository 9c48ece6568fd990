//! Round-trip properties of the translator and the native codec.
//!
//! Resources are generated structurally: every event category, catalogue
//! and uncatalogued actions, multi-line and quoted argument values.

use gmxsync_core::{
    parse_native, write_native, ActionBlock, ActionKind, ArgKind, Argument, EventBlock,
    EventCategory, EventKey, FieldValue, NativeResource, Number, Target,
};
use gmxsync_translate::{catalog, mirror_to_native, native_to_mirror, MirrorDocument};
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,10}".prop_filter("reserved word", |s| {
        !matches!(s.as_str(), "none" | "self" | "other" | "relative" | "not")
    })
}

fn text() -> impl Strategy<Value = String> {
    "[ -~\n\t\u{e9}\u{4e16}]{0,24}"
}

fn number() -> impl Strategy<Value = Number> {
    "-?[0-9]{1,4}(\\.[0-9]{1,3})?".prop_map(|s| Number::parse(&s).expect("generated number"))
}

fn resource_ref() -> impl Strategy<Value = FieldValue> {
    prop_oneof![Just(FieldValue::Resource(None)), ident().prop_map(|n| FieldValue::Resource(Some(n)))]
}

fn target() -> impl Strategy<Value = Target> {
    prop_oneof![
        Just(Target::SelfInstance),
        Just(Target::Other),
        ident().prop_map(|n| Target::Object(format!("obj_{n}"))),
    ]
}

fn arg_kind() -> impl Strategy<Value = ArgKind> {
    prop::sample::select(ArgKind::all().to_vec())
}

fn argument_of(kind: ArgKind) -> BoxedStrategy<Argument> {
    if kind == ArgKind::Boolean {
        prop_oneof![Just("1".to_string()), Just("0".to_string()), text()]
            .prop_map(move |v| Argument::new(kind, v))
            .boxed()
    } else if kind.is_resource() {
        prop_oneof![ident(), text()]
            .prop_map(move |v| Argument::new(kind, v))
            .boxed()
    } else {
        text().prop_map(move |v| Argument::new(kind, v)).boxed()
    }
}

fn catalog_action() -> impl Strategy<Value = ActionBlock> {
    (
        prop::sample::select(catalog::entries().iter().collect::<Vec<_>>()),
        target(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_flat_map(|(entry, target, relative, negate)| {
            let args: Vec<_> = entry.args.iter().map(|k| argument_of(*k)).collect();
            args.prop_map(move |args| ActionBlock {
                kind: entry.descriptor(),
                target: target.clone(),
                relative,
                negate,
                args,
            })
        })
}

fn lib_action() -> impl Strategy<Value = ActionBlock> {
    let kind = (
        100u32..200,
        0u32..1000,
        -2i32..8,
        any::<(bool, bool, bool)>(),
        0i32..3,
        text(),
        text(),
    )
        .prop_map(|(lib_id, id, kind, flags, exe_type, function_name, code_string)| ActionKind {
            lib_id,
            id,
            kind,
            use_relative: flags.0,
            is_question: flags.1,
            use_apply_to: flags.2,
            exe_type,
            function_name,
            code_string,
        });
    let args = prop::collection::vec(arg_kind().prop_flat_map(argument_of), 0..4);
    (kind, target(), any::<bool>(), any::<bool>(), args).prop_map(
        |(kind, target, relative, negate, args)| ActionBlock {
            kind,
            target,
            relative,
            negate,
            args,
        },
    )
}

fn event() -> impl Strategy<Value = EventBlock> {
    let key = prop::sample::select(EventCategory::all().to_vec()).prop_flat_map(|category| {
        if category.takes_object() {
            ident().prop_map(EventKey::collision).boxed()
        } else {
            (0u32..70)
                .prop_map(move |n| EventKey::new(category, n))
                .boxed()
        }
    });
    let actions = prop::collection::vec(prop_oneof![3 => catalog_action(), 1 => lib_action()], 0..4);
    (key, actions).prop_map(|(key, actions)| EventBlock { key, actions })
}

fn resource() -> impl Strategy<Value = NativeResource> {
    (
        resource_ref(),
        resource_ref(),
        resource_ref(),
        any::<(bool, bool, bool)>(),
        number(),
        prop::collection::vec(event(), 0..5),
    )
        .prop_map(|(sprite, mask, parent, flags, depth, events)| {
            let mut doc = NativeResource::skeleton();
            doc.set_field("spriteName", sprite);
            doc.set_field("maskName", mask);
            doc.set_field("parentName", parent);
            doc.set_field("solid", FieldValue::Bool(flags.0));
            doc.set_field("visible", FieldValue::Bool(flags.1));
            doc.set_field("persistent", FieldValue::Bool(flags.2));
            doc.set_field("depth", FieldValue::Number(depth));
            doc.events = events;
            doc
        })
}

proptest! {
    #[test]
    fn mirror_roundtrip_is_identity(doc in resource()) {
        let text = native_to_mirror(&doc);
        let back = mirror_to_native(&text, &doc).map_err(|e| TestCaseError::fail(format!("{e}\n{text}")))?;
        prop_assert_eq!(back, doc);
    }

    #[test]
    fn mirror_roundtrip_onto_skeleton_keeps_events(doc in resource()) {
        let text = native_to_mirror(&doc);
        let parsed = MirrorDocument::parse(&text).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(parsed.events, doc.events.clone());
    }

    #[test]
    fn rendering_is_byte_stable(doc in resource()) {
        let first = native_to_mirror(&doc);
        let again = native_to_mirror(&mirror_to_native(&first, &doc).map_err(|e| TestCaseError::fail(e.to_string()))?);
        prop_assert_eq!(first, again);
    }

    #[test]
    fn native_codec_roundtrip(doc in resource()) {
        let xml = write_native(&doc).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let back = parse_native(&xml).map_err(|e| TestCaseError::fail(format!("{e}\n{xml}")))?;
        prop_assert_eq!(&back, &doc);
        prop_assert_eq!(write_native(&back).map_err(|e| TestCaseError::fail(e.to_string()))?, xml);
    }
}
