//! # gmxsync-translate
//!
//! Lossless translation between native GameMaker object documents and the
//! human-editable mirror grammar.
//!
//! ```rust
//! use gmxsync_core::NativeResource;
//! use gmxsync_translate::{mirror_to_native, native_to_mirror};
//!
//! let native = NativeResource::skeleton();
//! let text = native_to_mirror(&native);
//! let back = mirror_to_native(&text, &native).expect("own output parses");
//! assert_eq!(back, native);
//! ```

pub mod catalog;
pub mod error;
pub mod parse;
pub mod render;

pub use error::ParseError;
pub use parse::{mirror_to_native, MirrorDocument};
pub use render::native_to_mirror;

/// Header properties of the mirror grammar: `(key, native element)`, in the
/// order they are rendered.
pub const PROPERTIES: [(&str, &str); 7] = [
    ("sprite", "spriteName"),
    ("mask", "maskName"),
    ("parent", "parentName"),
    ("solid", "solid"),
    ("visible", "visible"),
    ("persistent", "persistent"),
    ("depth", "depth"),
];
