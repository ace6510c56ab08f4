use std::collections::{BTreeMap, HashMap};

use domflow_core_types::{
    DomError, ElementCapability, ElementRef, MutationBatch, MutationKind, MutationRecord,
    ObserveOptions,
};
use tokio::sync::mpsc;

use crate::selector::{ElementTree, SelectorList};

pub(crate) type NodeId = u64;

const SELECTABLE_INPUT_TYPES: &[&str] = &["text", "search", "url", "tel", "password"];

/// Framework value tracker attached to an input.
///
/// `tracked` is the value the framework believes the input holds. Writes
/// through the instance setter keep it in sync; writes through the prototype
/// setter do not. Every `setValue` call made from outside is recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTracker {
    pub tracked: String,
    pub set_value_calls: Vec<String>,
}

/// Declarative element description used to build fixture trees.
#[derive(Clone, Debug, Default)]
pub struct ElementSpec {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) value: String,
    pub(crate) value_tracker: bool,
    pub(crate) children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn test_id(self, id: impl Into<String>) -> Self {
        self.attr("data-testid", id)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.attributes.retain(|(existing, _)| *existing != name);
        self.attributes.push((name, value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Attach a framework value tracker, as a controlled input would have.
    pub fn with_value_tracker(mut self) -> Self {
        self.value_tracker = true;
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub value: String,
    pub tracker: Option<ValueTracker>,
    pub selection: Option<(usize, usize)>,
    pub scroll_requests: u32,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            value: String::new(),
            tracker: None,
            selection: None,
            scroll_requests: 0,
        }
    }

    pub fn capability(&self) -> ElementCapability {
        let editable = self
            .attributes
            .get("contenteditable")
            .map(|value| matches!(value.as_str(), "" | "true" | "plaintext-only"))
            .unwrap_or(false);
        if editable {
            ElementCapability::ContentEditable
        } else if matches!(self.tag.as_str(), "input" | "textarea") {
            ElementCapability::NativeValue
        } else {
            ElementCapability::Generic
        }
    }

    pub fn supports_selection(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => self
                .attributes
                .get("type")
                .map(|kind| SELECTABLE_INPUT_TYPES.contains(&kind.to_ascii_lowercase().as_str()))
                .unwrap_or(true),
            _ => false,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attributes
            .get("class")
            .map(|classes| classes.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }
}

pub(crate) struct ObserverEntry {
    pub id: u64,
    pub target: NodeId,
    pub options: ObserveOptions,
    pub sender: mpsc::UnboundedSender<MutationBatch>,
}

struct PendingRecord {
    target: NodeId,
    kind: MutationKind,
}

/// The element tree plus observer bookkeeping.
pub(crate) struct DomTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: NodeId,
    pending: Vec<PendingRecord>,
    pub observers: Vec<ObserverEntry>,
    pub observers_created: usize,
    pub focused: Option<NodeId>,
}

impl DomTree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(1, Node::new("body"));
        Self {
            nodes,
            root: 1,
            next_id: 2,
            pending: Vec::new(),
            observers: Vec::new(),
            observers_created: 0,
            focused: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn resolve(&self, element: &ElementRef) -> Result<NodeId, DomError> {
        element
            .0
            .parse::<NodeId>()
            .ok()
            .filter(|id| self.nodes.contains_key(id))
            .ok_or_else(|| DomError::Detached(element.0.clone()))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| DomError::Detached(id.to_string()))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| DomError::Detached(id.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn insert(&mut self, parent: NodeId, spec: &ElementSpec) -> Result<NodeId, DomError> {
        self.node(parent)?;
        let id = self.build(parent, spec);
        self.node_mut(parent)?.children.push(id);
        self.queue(parent, MutationKind::ChildList);
        Ok(id)
    }

    /// Append under the body, which can never be removed.
    pub fn insert_into_root(&mut self, spec: &ElementSpec) -> NodeId {
        let root = self.root;
        let id = self.build(root, spec);
        if let Some(node) = self.nodes.get_mut(&root) {
            node.children.push(id);
        }
        self.queue(root, MutationKind::ChildList);
        id
    }

    fn build(&mut self, parent: NodeId, spec: &ElementSpec) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;

        let mut node = Node::new(&spec.tag);
        node.parent = Some(parent);
        node.text = spec.text.clone();
        node.value = spec.value.clone();
        node.attributes = spec.attributes.iter().cloned().collect();
        if spec.value_tracker {
            node.tracker = Some(ValueTracker {
                tracked: spec.value.clone(),
                set_value_calls: Vec::new(),
            });
        }
        self.nodes.insert(id, node);

        let children: Vec<NodeId> = spec
            .children
            .iter()
            .map(|child| self.build(id, child))
            .collect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = children;
        }
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::Unsupported("cannot remove the body".into()));
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
            self.queue(parent, MutationKind::ChildList);
        }
        self.drop_subtree(id);
        Ok(())
    }

    fn drop_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            if self.focused == Some(id) {
                self.focused = None;
            }
            for child in node.children {
                self.drop_subtree(child);
            }
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        self.queue(
            id,
            MutationKind::Attributes {
                name: name.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        if self.node_mut(id)?.attributes.remove(name).is_some() {
            self.queue(
                id,
                MutationKind::Attributes {
                    name: name.to_string(),
                },
            );
        }
        Ok(())
    }

    /// Replace all children with a single text run.
    pub fn replace_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.drop_subtree(child);
        }
        self.node_mut(id)?.text = text.to_string();
        self.queue(id, MutationKind::ChildList);
        Ok(())
    }

    /// Edit the own text run of an editing host in place.
    pub fn edit_text(&mut self, id: NodeId, text: String) -> Result<(), DomError> {
        self.node_mut(id)?.text = text;
        self.queue(id, MutationKind::CharacterData);
        Ok(())
    }

    pub fn text_content(&self, id: NodeId) -> Result<String, DomError> {
        let node = self.node(id)?;
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&self.text_content(*child)?);
        }
        Ok(text)
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    pub fn select(&self, scope: Option<NodeId>, selector: &SelectorList) -> Vec<NodeId> {
        let mut candidates = Vec::new();
        match scope {
            Some(scope) => self.collect_descendants(scope, &mut candidates),
            None => {
                candidates.push(self.root);
                self.collect_descendants(self.root, &mut candidates);
            }
        }
        candidates
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    /// `node` followed by its ancestors up to the root.
    pub fn path(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut cursor = self.parent_of(node);
        while let Some(parent) = cursor {
            path.push(parent);
            cursor = self.parent_of(parent);
        }
        path
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.path(node).contains(&ancestor)
    }

    fn queue(&mut self, target: NodeId, kind: MutationKind) {
        self.pending.push(PendingRecord { target, kind });
    }

    /// Deliver queued records, one batch per interested observer.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        for observer in &self.observers {
            let records: Vec<MutationRecord> = pending
                .iter()
                .filter(|record| self.delivers(observer, record))
                .map(|record| MutationRecord {
                    kind: record.kind.clone(),
                    target: Some(ElementRef(record.target.to_string())),
                })
                .collect();
            if !records.is_empty() {
                let _ = observer.sender.send(MutationBatch::new(records));
            }
        }
    }

    fn delivers(&self, observer: &ObserverEntry, record: &PendingRecord) -> bool {
        let in_scope = if observer.options.subtree {
            self.is_inclusive_ancestor(observer.target, record.target)
        } else {
            observer.target == record.target
        };
        if !in_scope {
            return false;
        }
        match &record.kind {
            MutationKind::ChildList => observer.options.child_list,
            MutationKind::CharacterData => observer.options.character_data,
            MutationKind::Attributes { name } => observer.options.wants_attribute(name),
        }
    }
}

impl ElementTree for DomTree {
    fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|node| node.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|node| node.attributes.get(name))
            .map(String::as_str)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|node| node.parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_builds_nested_children() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let list = tree
            .insert(
                root,
                &ElementSpec::new("ul")
                    .child(ElementSpec::new("li").text("a"))
                    .child(ElementSpec::new("li").text("b")),
            )
            .unwrap();
        let items = SelectorList::parse("li").unwrap();
        assert_eq!(tree.select(Some(list), &items).len(), 2);
        assert_eq!(tree.text_content(list).unwrap(), "ab");
    }

    #[test]
    fn insert_into_root_appends_last() {
        let mut tree = DomTree::new();
        let first = tree.insert_into_root(&ElementSpec::new("div"));
        let second = tree.insert_into_root(&ElementSpec::new("p"));
        assert_eq!(tree.node(tree.root()).unwrap().children, vec![first, second]);
        assert_eq!(tree.parent_of(second), Some(tree.root()));
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let outer = tree
            .insert(
                root,
                &ElementSpec::new("div").child(ElementSpec::new("span")),
            )
            .unwrap();
        let mut below = Vec::new();
        tree.collect_descendants(outer, &mut below);
        let inner = below[0];
        tree.remove(outer).unwrap();
        assert!(!tree.contains(outer));
        assert!(!tree.contains(inner));
        assert!(tree.remove(root).is_err());
    }

    #[test]
    fn capability_follows_tag_and_contenteditable() {
        assert_eq!(
            Node::new("input").capability(),
            ElementCapability::NativeValue
        );
        let mut editable = Node::new("div");
        editable
            .attributes
            .insert("contenteditable".into(), "true".into());
        assert_eq!(editable.capability(), ElementCapability::ContentEditable);
        assert_eq!(Node::new("span").capability(), ElementCapability::Generic);
    }

    #[test]
    fn selection_support_depends_on_input_type() {
        let mut number = Node::new("input");
        number.attributes.insert("type".into(), "number".into());
        assert!(!number.supports_selection());
        assert!(Node::new("input").supports_selection());
        assert!(Node::new("textarea").supports_selection());
    }
}
