//! Named drag-and-drop actions understood by the mirror grammar.
//!
//! An action is written with its catalogue token only when its descriptor
//! and argument kinds match the entry exactly; anything else falls back to
//! the `lib <libid> <id>` form, which carries the full descriptor.

use gmxsync_core::{ActionBlock, ActionKind, ArgKind};

#[derive(Debug)]
pub struct CatalogEntry {
    pub token: &'static str,
    pub lib_id: u32,
    pub id: u32,
    pub kind: i32,
    pub use_relative: bool,
    pub is_question: bool,
    pub use_apply_to: bool,
    pub exe_type: i32,
    pub function_name: &'static str,
    pub args: &'static [ArgKind],
}

impl CatalogEntry {
    pub fn descriptor(&self) -> ActionKind {
        ActionKind {
            lib_id: self.lib_id,
            id: self.id,
            kind: self.kind,
            use_relative: self.use_relative,
            is_question: self.is_question,
            use_apply_to: self.use_apply_to,
            exe_type: self.exe_type,
            function_name: self.function_name.to_string(),
            code_string: String::new(),
        }
    }

    fn matches(&self, action: &ActionBlock) -> bool {
        let k = &action.kind;
        k.lib_id == self.lib_id
            && k.id == self.id
            && k.kind == self.kind
            && k.use_relative == self.use_relative
            && k.is_question == self.is_question
            && k.use_apply_to == self.use_apply_to
            && k.exe_type == self.exe_type
            && k.function_name == self.function_name
            && k.code_string.is_empty()
            && action.args.len() == self.args.len()
            && action.args.iter().zip(self.args).all(|(a, kind)| a.kind == *kind)
    }
}

use ArgKind::{Expression as E, Menu, Object, Script, String as S};

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        token: "code",
        lib_id: 1,
        id: 603,
        kind: 7,
        use_relative: false,
        is_question: false,
        use_apply_to: true,
        exe_type: 2,
        function_name: "",
        args: &[S],
    },
    CatalogEntry {
        token: "comment",
        lib_id: 1,
        id: 605,
        kind: 0,
        use_relative: false,
        is_question: false,
        use_apply_to: false,
        exe_type: 0,
        function_name: "",
        args: &[S],
    },
    CatalogEntry {
        token: "script",
        lib_id: 1,
        id: 601,
        kind: 0,
        use_relative: false,
        is_question: false,
        use_apply_to: true,
        exe_type: 1,
        function_name: "action_execute_script",
        args: &[Script, E, E, E, E, E],
    },
    CatalogEntry {
        token: "set_variable",
        lib_id: 1,
        id: 611,
        kind: 0,
        use_relative: true,
        is_question: false,
        use_apply_to: true,
        exe_type: 1,
        function_name: "action_set_variable",
        args: &[S, E],
    },
    CatalogEntry {
        token: "if_variable",
        lib_id: 1,
        id: 612,
        kind: 0,
        use_relative: false,
        is_question: true,
        use_apply_to: true,
        exe_type: 1,
        function_name: "action_if_variable",
        args: &[S, E, Menu],
    },
    CatalogEntry {
        token: "create_instance",
        lib_id: 1,
        id: 201,
        kind: 0,
        use_relative: true,
        is_question: false,
        use_apply_to: true,
        exe_type: 1,
        function_name: "action_create_object",
        args: &[Object, E, E],
    },
    CatalogEntry {
        token: "destroy",
        lib_id: 1,
        id: 203,
        kind: 0,
        use_relative: false,
        is_question: false,
        use_apply_to: true,
        exe_type: 1,
        function_name: "action_kill_object",
        args: &[],
    },
    CatalogEntry {
        token: "begin",
        lib_id: 1,
        id: 422,
        kind: 1,
        use_relative: false,
        is_question: false,
        use_apply_to: false,
        exe_type: 0,
        function_name: "",
        args: &[],
    },
    CatalogEntry {
        token: "end",
        lib_id: 1,
        id: 424,
        kind: 2,
        use_relative: false,
        is_question: false,
        use_apply_to: false,
        exe_type: 0,
        function_name: "",
        args: &[],
    },
    CatalogEntry {
        token: "else",
        lib_id: 1,
        id: 421,
        kind: 3,
        use_relative: false,
        is_question: false,
        use_apply_to: false,
        exe_type: 0,
        function_name: "",
        args: &[],
    },
    CatalogEntry {
        token: "exit",
        lib_id: 1,
        id: 425,
        kind: 4,
        use_relative: false,
        is_question: false,
        use_apply_to: false,
        exe_type: 0,
        function_name: "",
        args: &[],
    },
];

/// Reserved token introducing an uncatalogued action.
pub const LIB_TOKEN: &str = "lib";

pub fn by_token(token: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.token == token)
}

pub fn for_action(action: &ActionBlock) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.matches(action))
}

pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmxsync_core::{Argument, Target};

    #[test]
    fn tokens_are_unique_and_not_reserved() {
        let mut tokens: Vec<_> = entries().iter().map(|e| e.token).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), entries().len());
        assert!(!tokens.contains(&LIB_TOKEN));
    }

    #[test]
    fn matching_requires_argument_kinds() {
        let entry = by_token("code").expect("code");
        let mut action = ActionBlock {
            kind: entry.descriptor(),
            target: Target::SelfInstance,
            relative: false,
            negate: false,
            args: vec![Argument::new(ArgKind::String, "x = 1;")],
        };
        assert_eq!(for_action(&action).map(|e| e.token), Some("code"));

        action.args[0].kind = ArgKind::Expression;
        assert!(for_action(&action).is_none());
    }
}
