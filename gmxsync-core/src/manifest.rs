//! Project manifest (`*.project.gmx`) reading and append-only editing.
//!
//! The manifest is kept as source text. Appending splices one new line into
//! that text, so every byte outside the inserted entry (comments, ordering,
//! line endings, indentation) is preserved.

use std::ops::Range;

use quick_xml::escape::escape;
use roxmltree::{Document, Node};

use crate::error::ManifestError;
use crate::types::ResourceKind;

/// A resource reference inside a manifest group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Resource name derived from the entry path (`objects\Enemy` -> `Enemy`).
    pub name: String,
    /// Element name, e.g. `object` or `script`.
    pub tag: String,
    /// Raw entry text.
    pub path: String,
}

impl ManifestEntry {
    pub fn kind(&self) -> Option<ResourceKind> {
        match self.tag.as_str() {
            "object" => Some(ResourceKind::Object),
            "script" => Some(ResourceKind::Script),
            _ => None,
        }
    }
}

/// A named group and every entry below it, nested sub-groups included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestGroup {
    pub name: String,
    pub entries: Vec<ManifestEntry>,
}

/// A validated manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeManifest {
    source: String,
}

impl NativeManifest {
    /// Validate `source` as XML and wrap it.
    pub fn parse(source: impl Into<String>) -> Result<Self, ManifestError> {
        let source = source.into();
        Document::parse(&source)?;
        Ok(Self { source })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn into_string(self) -> String {
        self.source
    }

    /// Top-level groups in document order.
    pub fn groups(&self) -> Result<Vec<ManifestGroup>, ManifestError> {
        let doc = Document::parse(&self.source)?;
        Ok(doc
            .root_element()
            .children()
            .filter(|n| n.is_element() && n.attribute("name").is_some())
            .map(|group| ManifestGroup {
                name: group.attribute("name").unwrap_or_default().to_string(),
                entries: entries_of(group),
            })
            .collect())
    }

    /// Entries of the first group named `group`.
    pub fn entries(&self, group: &str) -> Result<Vec<ManifestEntry>, ManifestError> {
        let doc = Document::parse(&self.source)?;
        let node = find_group(&doc, group)?;
        Ok(entries_of(node))
    }

    pub fn contains(&self, group: &str, name: &str) -> Result<bool, ManifestError> {
        Ok(self.entries(group)?.iter().any(|e| e.name == name))
    }

    /// Append `name` to the end of `group`. Returns an identical manifest when
    /// the group already references `name`.
    pub fn append_entry(
        &self,
        group: &str,
        name: &str,
        kind: ResourceKind,
    ) -> Result<NativeManifest, ManifestError> {
        let doc = Document::parse(&self.source)?;
        let node = find_group(&doc, group)?;
        if entries_of(node).iter().any(|e| e.name == name) {
            return Ok(self.clone());
        }

        let newline = if self.source.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        };
        let entry = format!(
            "<{tag}>{path}</{tag}>",
            tag = kind.tag(),
            path = escape(kind.entry_path(name).as_str()),
        );
        let (at, replace, insert) = splice_for(&self.source, node, &entry, newline);

        let mut source = String::with_capacity(self.source.len() + insert.len());
        source.push_str(&self.source[..at]);
        source.push_str(&insert);
        source.push_str(&self.source[at + replace..]);
        Ok(Self { source })
    }
}

/// Insert a `(name, kind)` reference at the end of `group`; idempotent.
pub fn append_manifest_entry(
    manifest: &NativeManifest,
    group: &str,
    name: &str,
    kind: ResourceKind,
) -> Result<NativeManifest, ManifestError> {
    manifest.append_entry(group, name, kind)
}

/// Resource name encoded by an entry path.
pub fn entry_name(path: &str) -> String {
    let base = path.rsplit(['\\', '/']).next().unwrap_or(path).trim();
    base.strip_suffix(".gml").unwrap_or(base).to_string()
}

fn find_group<'a, 'input>(
    doc: &'a Document<'input>,
    group: &str,
) -> Result<Node<'a, 'input>, ManifestError> {
    doc.root_element()
        .descendants()
        .find(|n| n.is_element() && n.attribute("name") == Some(group))
        .ok_or_else(|| ManifestError::UnknownGroup(group.to_string()))
}

fn entries_of(group: Node) -> Vec<ManifestEntry> {
    group
        .descendants()
        .skip(1)
        .filter(|n| {
            n.is_element() && n.attribute("name").is_none() && !n.children().any(|c| c.is_element())
        })
        .filter_map(|n| {
            let path = n.text()?.trim();
            (!path.is_empty()).then(|| ManifestEntry {
                name: entry_name(path),
                tag: n.tag_name().name().to_string(),
                path: path.to_string(),
            })
        })
        .collect()
}

/// Compute `(offset, bytes_to_replace, text_to_insert)` for appending `entry`
/// as the last child of `group`.
fn splice_for(source: &str, group: Node, entry: &str, newline: &str) -> (usize, usize, String) {
    let range: Range<usize> = group.range();
    let group_indent = line_indent(source, range.start);

    if let Some(last) = group.children().filter(Node::is_element).last() {
        let indent = line_indent(source, last.range().start);
        return (last.range().end, 0, format!("{newline}{indent}{entry}"));
    }

    let child_indent = format!("{group_indent}  ");
    let element = &source[range.clone()];
    if element.ends_with("/>") {
        let tag = group.tag_name().name();
        return (
            range.end - 2,
            2,
            format!(">{newline}{child_indent}{entry}{newline}{group_indent}</{tag}>"),
        );
    }

    match group.first_child() {
        Some(first) => (
            first.range().start,
            0,
            format!("{newline}{child_indent}{entry}"),
        ),
        None => {
            let close = format!("</{}>", group.tag_name().name());
            let at = element
                .rfind(close.as_str())
                .map(|p| range.start + p)
                .unwrap_or(range.end);
            (
                at,
                0,
                format!("{newline}{child_indent}{entry}{newline}{group_indent}"),
            )
        }
    }
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(source: &str, offset: usize) -> String {
    let line_start = source[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let prefix = &source[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<!--This Document is generated by GameMaker, if you edit it by hand then you do so at your own risk!-->
<assets>
  <Configs name="configs">
    <Config>Configs\Default</Config>
  </Configs>
  <scripts name="scripts">
    <script>scripts\scr_move.gml</script>
  </scripts>
  <objects name="objects">
    <object>objects\obj_player</object>
    <objects name="enemies">
      <object>objects\obj_bat</object>
    </objects>
  </objects>
  <rooms name="rooms"/>
</assets>
"#;

    fn manifest() -> NativeManifest {
        NativeManifest::parse(PROJECT).expect("parse")
    }

    #[test]
    fn lists_groups_and_entries() {
        let groups = manifest().groups().expect("groups");
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["configs", "scripts", "objects", "rooms"]);

        let objects = &groups[2];
        let entries: Vec<_> = objects.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(entries, ["obj_player", "obj_bat"]);
        assert_eq!(groups[1].entries[0].name, "scr_move");
        assert_eq!(groups[1].entries[0].kind(), Some(ResourceKind::Script));
    }

    #[test]
    fn append_inserts_after_last_child_only() {
        let updated = manifest()
            .append_entry("scripts", "scr_jump", ResourceKind::Script)
            .expect("append");
        let expected = PROJECT.replace(
            "    <script>scripts\\scr_move.gml</script>\n",
            "    <script>scripts\\scr_move.gml</script>\n    <script>scripts\\scr_jump.gml</script>\n",
        );
        assert_eq!(updated.as_str(), expected);
    }

    #[test]
    fn append_is_idempotent() {
        let once = manifest()
            .append_entry("objects", "Enemy", ResourceKind::Object)
            .expect("append once");
        let twice = once
            .append_entry("objects", "Enemy", ResourceKind::Object)
            .expect("append twice");
        assert_eq!(once, twice);
        let count = twice
            .entries("objects")
            .expect("entries")
            .iter()
            .filter(|e| e.name == "Enemy")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn nested_entries_count_as_present() {
        let same = manifest()
            .append_entry("objects", "obj_bat", ResourceKind::Object)
            .expect("append");
        assert_eq!(same.as_str(), PROJECT);
    }

    #[test]
    fn append_expands_self_closing_group() {
        let updated = manifest()
            .append_entry("rooms", "rm_start", ResourceKind::Object)
            .expect("append");
        assert!(updated.as_str().contains(
            "  <rooms name=\"rooms\">\n    <object>objects\\rm_start</object>\n  </rooms>\n"
        ));
    }

    #[test]
    fn append_into_empty_open_group() {
        let source = "<assets>\n  <objects name=\"objects\"></objects>\n</assets>";
        let updated = NativeManifest::parse(source)
            .expect("parse")
            .append_entry("objects", "Enemy", ResourceKind::Object)
            .expect("append");
        assert_eq!(
            updated.as_str(),
            "<assets>\n  <objects name=\"objects\">\n    <object>objects\\Enemy</object>\n  </objects>\n</assets>"
        );
    }

    #[test]
    fn append_keeps_crlf_line_endings() {
        let source = "<assets>\r\n  <objects name=\"objects\">\r\n    <object>objects\\a</object>\r\n  </objects>\r\n</assets>\r\n";
        let updated = NativeManifest::parse(source)
            .expect("parse")
            .append_entry("objects", "b", ResourceKind::Object)
            .expect("append");
        assert!(updated
            .as_str()
            .contains("<object>objects\\a</object>\r\n    <object>objects\\b</object>\r\n"));
    }

    #[test]
    fn unknown_group_is_an_error() {
        let err = manifest()
            .append_entry("sounds", "snd_hit", ResourceKind::Object)
            .expect_err("missing group");
        assert!(matches!(err, ManifestError::UnknownGroup(ref g) if g == "sounds"));
    }

    #[test]
    fn entry_name_strips_directories_and_script_suffix() {
        assert_eq!(entry_name("objects\\obj_player"), "obj_player");
        assert_eq!(entry_name("scripts/scr_move.gml"), "scr_move");
        assert_eq!(entry_name("Enemy"), "Enemy");
    }
}
