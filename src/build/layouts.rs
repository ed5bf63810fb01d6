//! Layouts: reusable wrapper templates and their inheritance chains.
//!
//! Layouts live in a flat label -> Layout arena owned by the site. A
//! layout's data may name a parent via its own `layout` key; resolving a
//! chain walks those parent links. References are label lookups into the
//! arena, never owned pointers.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde_yaml::Mapping;

use super::resource::{parse_front_matter, FrontMatterError, ResourceData};

/// A template wrapper with its own front matter and content. Content is
/// immutable after load.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Filename minus extension; the arena key
    pub label: String,
    pub relative_path: PathBuf,
    pub data: ResourceData,
    pub content: String,
}

impl Layout {
    /// Parse a layout file's raw text into front matter and content.
    pub fn from_raw(label: &str, relative_path: PathBuf, raw: &str) -> Result<Self, FrontMatterError> {
        let parsed = parse_front_matter(raw)?;
        Ok(Self {
            label: label.to_string(),
            relative_path,
            data: ResourceData::layered(parsed.front_matter, &Mapping::new()),
            content: parsed.body,
        })
    }

    /// The parent layout label, if this layout declares one.
    pub fn parent(&self) -> Option<&str> {
        self.data.string("layout")
    }

    /// Extension with leading dot, for deciding whether the layout body
    /// itself goes through the converter chain.
    pub fn extension(&self) -> String {
        self.relative_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }
}

/// The site's layout arena, keyed by label.
#[derive(Debug, Default)]
pub struct LayoutMap {
    layouts: HashMap<String, Layout>,
}

impl LayoutMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layout: Layout) {
        self.layouts.insert(layout.label.clone(), layout);
    }

    pub fn get(&self, label: &str) -> Option<&Layout> {
        self.layouts.get(label)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Resolve the ordered chain of layouts to apply, innermost first.
    ///
    /// Walks parent `layout` declarations, guarding against cycles with a
    /// used-set: a parent already in the chain terminates the walk
    /// silently. A named layout missing from the arena logs a warning and
    /// terminates the walk; rendering proceeds with the chain so far.
    pub fn resolve_chain(&self, starting_label: &str) -> Vec<&Layout> {
        let mut chain = Vec::new();
        let mut used: HashSet<&str> = HashSet::new();
        let mut next = Some(starting_label);

        while let Some(label) = next {
            if used.contains(label) {
                // Cycle: permitted silently, the chain just stops here.
                break;
            }
            let Some(layout) = self.get(label) else {
                tracing::warn!(layout = label, "layout not found; rendering without it");
                break;
            };
            used.insert(&layout.label);
            chain.push(layout);
            next = layout.parent();
        }

        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(label: &str, parent: Option<&str>) -> Layout {
        let raw = match parent {
            Some(p) => format!("---\nlayout: {p}\n---\n<div>{{{{ content }}}}</div>"),
            None => "<html>{{ content }}</html>".to_string(),
        };
        Layout::from_raw(label, PathBuf::from(format!("_layouts/{label}.html")), &raw).unwrap()
    }

    #[test]
    fn test_chain_single() {
        let mut map = LayoutMap::new();
        map.insert(layout("default", None));
        let chain = map.resolve_chain("default");
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].label, "default");
    }

    #[test]
    fn test_chain_inheritance_order() {
        let mut map = LayoutMap::new();
        map.insert(layout("default", None));
        map.insert(layout("post", Some("default")));
        let chain = map.resolve_chain("post");
        let labels: Vec<_> = chain.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["post", "default"]);
    }

    #[test]
    fn test_chain_cycle_terminates() {
        let mut map = LayoutMap::new();
        map.insert(layout("a", Some("b")));
        map.insert(layout("b", Some("a")));
        let chain = map.resolve_chain("a");
        let labels: Vec<_> = chain.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn test_chain_self_cycle() {
        let mut map = LayoutMap::new();
        map.insert(layout("selfish", Some("selfish")));
        let chain = map.resolve_chain("selfish");
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_missing_layout_yields_empty_chain() {
        let map = LayoutMap::new();
        assert!(map.resolve_chain("ghost").is_empty());
    }

    #[test]
    fn test_missing_parent_keeps_partial_chain() {
        let mut map = LayoutMap::new();
        map.insert(layout("post", Some("ghost")));
        let chain = map.resolve_chain("post");
        let labels: Vec<_> = chain.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["post"]);
    }

    #[test]
    fn test_layout_extension() {
        let l = Layout::from_raw("doc", PathBuf::from("_layouts/doc.md"), "# {{ content }}").unwrap();
        assert_eq!(l.extension(), ".md");
    }
}
