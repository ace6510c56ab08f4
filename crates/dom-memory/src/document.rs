use std::sync::{Arc, Weak};

use async_trait::async_trait;
use domflow_core_types::{
    Document, DomError, DomEvent, DomEventKind, EditCommand, ElementCapability, ElementRef,
    MutationSubscription, ObserveOptions, ObserveTarget, ValueSetter,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::selector::SelectorList;
use crate::tree::{DomTree, ElementSpec, NodeId, ObserverEntry, ValueTracker};

/// An event as it was dispatched, in dispatch order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: ElementRef,
    pub event: DomEvent,
}

/// What a listener sees when it fires.
#[derive(Clone, Debug)]
pub struct ListenerContext {
    pub target: ElementRef,
    pub current_target: ElementRef,
    pub event: DomEvent,
}

type Handler = Arc<dyn Fn(&MemoryDocument, &ListenerContext) + Send + Sync>;

struct Listener {
    selector: SelectorList,
    kind: DomEventKind,
    handler: Handler,
}

struct Inner {
    tree: Mutex<DomTree>,
    listeners: Mutex<Vec<Listener>>,
    events: Mutex<Vec<DispatchedEvent>>,
}

/// In-memory [`Document`] implementation.
///
/// Cloning is cheap; clones share the same tree.
#[derive(Clone)]
pub struct MemoryDocument {
    inner: Arc<Inner>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn element_ref(id: NodeId) -> ElementRef {
    ElementRef(id.to_string())
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tree: Mutex::new(DomTree::new()),
                listeners: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn body(&self) -> ElementRef {
        element_ref(self.inner.tree.lock().root())
    }

    /// Run `f` against the tree and deliver whatever mutations it queued.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut DomTree) -> Result<T, DomError>,
    ) -> Result<T, DomError> {
        let mut tree = self.inner.tree.lock();
        let result = f(&mut tree);
        tree.flush();
        result
    }

    fn read<T>(&self, f: impl FnOnce(&DomTree) -> Result<T, DomError>) -> Result<T, DomError> {
        let tree = self.inner.tree.lock();
        f(&tree)
    }

    pub fn append(&self, parent: &ElementRef, spec: ElementSpec) -> Result<ElementRef, DomError> {
        self.mutate(|tree| {
            let parent = tree.resolve(parent)?;
            tree.insert(parent, &spec).map(element_ref)
        })
    }

    pub fn append_to_body(&self, spec: ElementSpec) -> ElementRef {
        let mut tree = self.inner.tree.lock();
        let id = tree.insert_into_root(&spec);
        tree.flush();
        element_ref(id)
    }

    pub fn remove(&self, element: &ElementRef) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            tree.remove(id)
        })
    }

    pub fn set_attribute(
        &self,
        element: &ElementRef,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            tree.set_attribute(id, name, value)
        })
    }

    pub fn remove_attribute(&self, element: &ElementRef, name: &str) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            tree.remove_attribute(id, name)
        })
    }

    pub fn add_class(&self, element: &ElementRef, class: &str) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            let node = tree.node(id)?;
            if node.has_class(class) {
                return Ok(());
            }
            let mut classes = node.attributes.get("class").cloned().unwrap_or_default();
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(class);
            tree.set_attribute(id, "class", &classes)
        })
    }

    pub fn remove_class(&self, element: &ElementRef, class: &str) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            let node = tree.node(id)?;
            if !node.has_class(class) {
                return Ok(());
            }
            let remaining = node
                .attributes
                .get("class")
                .map(|classes| {
                    classes
                        .split_whitespace()
                        .filter(|token| *token != class)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            tree.set_attribute(id, "class", &remaining)
        })
    }

    /// Replace the children of `element` with a text run.
    pub fn set_text(&self, element: &ElementRef, text: &str) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            tree.replace_text(id, text)
        })
    }

    /// Synchronous `querySelector` for fixture code running inside listeners.
    pub fn find(&self, selector: &str) -> Option<ElementRef> {
        let selector = SelectorList::parse(selector).ok()?;
        let tree = self.inner.tree.lock();
        tree.select(None, &selector).into_iter().next().map(element_ref)
    }

    /// Synchronous `textContent`; empty for detached elements.
    pub fn text(&self, element: &ElementRef) -> String {
        self.read(|tree| tree.text_content(tree.resolve(element)?))
            .unwrap_or_default()
    }

    /// Synchronous form value; empty for detached elements.
    pub fn current_value(&self, element: &ElementRef) -> String {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.value.clone()))
            .unwrap_or_default()
    }

    pub fn value_tracker(&self, element: &ElementRef) -> Option<ValueTracker> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.tracker.clone()))
            .ok()
            .flatten()
    }

    pub fn focused(&self) -> Option<ElementRef> {
        self.inner.tree.lock().focused.map(element_ref)
    }

    pub fn selection(&self, element: &ElementRef) -> Option<(usize, usize)> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.selection))
            .ok()
            .flatten()
    }

    pub fn scroll_requests(&self, element: &ElementRef) -> u32 {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.scroll_requests))
            .unwrap_or(0)
    }

    pub fn is_attached(&self, element: &ElementRef) -> bool {
        self.read(|tree| tree.resolve(element)).is_ok()
    }

    /// Observers currently connected.
    pub fn active_observers(&self) -> usize {
        self.inner.tree.lock().observers.len()
    }

    /// Observers ever attached, connected or not.
    pub fn observers_created(&self) -> usize {
        self.inner.tree.lock().observers_created
    }

    pub fn events(&self) -> Vec<DispatchedEvent> {
        self.inner.events.lock().clone()
    }

    pub fn events_of(&self, kind: DomEventKind) -> Vec<DispatchedEvent> {
        self.inner
            .events
            .lock()
            .iter()
            .filter(|dispatched| dispatched.event.kind == kind)
            .cloned()
            .collect()
    }

    /// Register a listener for events of `kind` reaching any element that
    /// matches `selector`, either as target or while bubbling.
    pub fn on(
        &self,
        selector: &str,
        kind: DomEventKind,
        handler: impl Fn(&MemoryDocument, &ListenerContext) + Send + Sync + 'static,
    ) -> Result<(), DomError> {
        let selector = SelectorList::parse(selector)?;
        self.inner.listeners.lock().push(Listener {
            selector,
            kind,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// React-style change handler: `input` events only reach `handler` when
    /// the element value differs from what its value tracker last saw.
    pub fn on_value_change(
        &self,
        selector: &str,
        handler: impl Fn(&MemoryDocument, &ElementRef, &str) + Send + Sync + 'static,
    ) -> Result<(), DomError> {
        self.on(selector, DomEventKind::Input, move |document, context| {
            let changed = document.mutate(|tree| {
                let id = tree.resolve(&context.target)?;
                let node = tree.node_mut(id)?;
                let value = node.value.clone();
                match node.tracker.as_mut() {
                    Some(tracker) if tracker.tracked == value => Ok(None),
                    Some(tracker) => {
                        tracker.tracked = value.clone();
                        Ok(Some(value))
                    }
                    None => Ok(Some(value)),
                }
            });
            if let Ok(Some(value)) = changed {
                handler(document, &context.target, &value);
            }
        })
    }

    fn fire(&self, target: NodeId, event: DomEvent) -> Result<(), DomError> {
        let path = self.read(|tree| {
            tree.node(target)?;
            Ok(if event.bubbles {
                tree.path(target)
            } else {
                vec![target]
            })
        })?;

        self.inner.events.lock().push(DispatchedEvent {
            target: element_ref(target),
            event: event.clone(),
        });

        let calls: Vec<(Handler, NodeId)> = {
            let tree = self.inner.tree.lock();
            let listeners = self.inner.listeners.lock();
            path.iter()
                .flat_map(|node| {
                    listeners
                        .iter()
                        .filter(|listener| {
                            listener.kind == event.kind && listener.selector.matches(&*tree, *node)
                        })
                        .map(|listener| (listener.handler.clone(), *node))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        for (handler, current) in calls {
            let context = ListenerContext {
                target: element_ref(target),
                current_target: element_ref(current),
                event: event.clone(),
            };
            handler(self, &context);
        }
        Ok(())
    }

    fn detach_observer(inner: &Weak<Inner>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            inner.tree.lock().observers.retain(|entry| entry.id != id);
            debug!(observer = id, "memory observer disconnected");
        }
    }
}

#[async_trait]
impl Document for MemoryDocument {
    async fn query(&self, selector: &str) -> Result<Option<ElementRef>, DomError> {
        let selector = SelectorList::parse(selector)?;
        self.read(|tree| {
            Ok(tree
                .select(None, &selector)
                .into_iter()
                .next()
                .map(element_ref))
        })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, DomError> {
        let selector = SelectorList::parse(selector)?;
        self.read(|tree| {
            Ok(tree
                .select(None, &selector)
                .into_iter()
                .map(element_ref)
                .collect())
        })
    }

    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, DomError> {
        let selector = SelectorList::parse(selector)?;
        self.read(|tree| {
            let scope = tree.resolve(root)?;
            Ok(tree
                .select(Some(scope), &selector)
                .into_iter()
                .next()
                .map(element_ref))
        })
    }

    async fn query_all_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DomError> {
        let selector = SelectorList::parse(selector)?;
        self.read(|tree| {
            let scope = tree.resolve(root)?;
            Ok(tree
                .select(Some(scope), &selector)
                .into_iter()
                .map(element_ref)
                .collect())
        })
    }

    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>, DomError> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.parent.map(element_ref)))
    }

    async fn text_content(&self, element: &ElementRef) -> Result<String, DomError> {
        self.read(|tree| tree.text_content(tree.resolve(element)?))
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        self.read(|tree| {
            Ok(tree
                .node(tree.resolve(element)?)?
                .attributes
                .get(name)
                .cloned())
        })
    }

    async fn has_class(&self, element: &ElementRef, class: &str) -> Result<bool, DomError> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.has_class(class)))
    }

    async fn is_disabled(&self, element: &ElementRef) -> Result<bool, DomError> {
        self.read(|tree| {
            Ok(tree
                .node(tree.resolve(element)?)?
                .attributes
                .contains_key("disabled"))
        })
    }

    async fn value(&self, element: &ElementRef) -> Result<String, DomError> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.value.clone()))
    }

    async fn capability(&self, element: &ElementRef) -> Result<ElementCapability, DomError> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.capability()))
    }

    async fn supports_selection(&self, element: &ElementRef) -> Result<bool, DomError> {
        self.read(|tree| Ok(tree.node(tree.resolve(element)?)?.supports_selection()))
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            tree.node_mut(id)?.scroll_requests += 1;
            Ok(())
        })
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), DomError> {
        let (target, previous) = {
            let mut tree = self.inner.tree.lock();
            let target = tree.resolve(element)?;
            let previous = tree.focused.filter(|focused| *focused != target);
            if tree.focused == Some(target) {
                return Ok(());
            }
            tree.focused = Some(target);
            (target, previous)
        };
        if let Some(previous) = previous {
            self.fire(previous, blur_event())?;
        }
        self.fire(target, focus_event())
    }

    async fn blur(&self, element: &ElementRef) -> Result<(), DomError> {
        let target = {
            let mut tree = self.inner.tree.lock();
            let target = tree.resolve(element)?;
            if tree.focused != Some(target) {
                return Ok(());
            }
            tree.focused = None;
            target
        };
        self.fire(target, blur_event())
    }

    async fn dispatch(&self, element: &ElementRef, event: DomEvent) -> Result<(), DomError> {
        let target = self.read(|tree| tree.resolve(element))?;
        self.fire(target, event)
    }

    async fn set_selection_range(
        &self,
        element: &ElementRef,
        start: usize,
        end: usize,
    ) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            let node = tree.node_mut(id)?;
            if !node.supports_selection() {
                return Err(DomError::Unsupported(format!(
                    "<{}> has no selection range",
                    node.tag
                )));
            }
            let len = node.value.chars().count();
            node.selection = Some((start.min(len), end.min(len)));
            Ok(())
        })
    }

    async fn exec_command(&self, command: EditCommand) -> Result<bool, DomError> {
        self.mutate(|tree| {
            let Some(id) = tree.focused else {
                return Ok(false);
            };
            let node = tree.node(id)?;
            if node.capability() != ElementCapability::ContentEditable {
                return Ok(false);
            }
            let chars: Vec<char> = node.text.chars().collect();
            let (start, end) = node.selection.unwrap_or((chars.len(), chars.len()));

            let (text, caret) = match command {
                EditCommand::SelectAll => {
                    tree.node_mut(id)?.selection = Some((0, chars.len()));
                    return Ok(true);
                }
                EditCommand::Delete if start < end => {
                    let mut edited: String = chars[..start].iter().collect();
                    edited.extend(&chars[end..]);
                    (edited, start)
                }
                EditCommand::Delete if start > 0 => {
                    let mut edited: String = chars[..start - 1].iter().collect();
                    edited.extend(&chars[start..]);
                    (edited, start - 1)
                }
                EditCommand::Delete => return Ok(true),
                EditCommand::InsertText(inserted) => {
                    let mut edited: String = chars[..start].iter().collect();
                    edited.push_str(&inserted);
                    edited.extend(&chars[end..]);
                    (edited, start + inserted.chars().count())
                }
            };
            tree.edit_text(id, text)?;
            tree.node_mut(id)?.selection = Some((caret, caret));
            Ok(true)
        })
    }

    async fn set_value(
        &self,
        element: &ElementRef,
        value: &str,
        setter: ValueSetter,
    ) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            let node = tree.node_mut(id)?;
            node.value = value.to_string();
            if setter == ValueSetter::Instance {
                if let Some(tracker) = node.tracker.as_mut() {
                    tracker.tracked = value.to_string();
                }
            }
            if node.selection.is_some() {
                let len = value.chars().count();
                node.selection = Some((len, len));
            }
            Ok(())
        })
    }

    async fn set_text_content(&self, element: &ElementRef, text: &str) -> Result<(), DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            tree.replace_text(id, text)
        })
    }

    async fn reset_value_tracker(
        &self,
        element: &ElementRef,
        previous: &str,
    ) -> Result<bool, DomError> {
        self.mutate(|tree| {
            let id = tree.resolve(element)?;
            Ok(match tree.node_mut(id)?.tracker.as_mut() {
                Some(tracker) => {
                    tracker.tracked = previous.to_string();
                    tracker.set_value_calls.push(previous.to_string());
                    true
                }
                None => false,
            })
        })
    }

    async fn observe(
        &self,
        target: &ObserveTarget,
        options: ObserveOptions,
    ) -> Result<MutationSubscription, DomError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut tree = self.inner.tree.lock();
            let node = match target {
                ObserveTarget::Body => tree.root(),
                ObserveTarget::Element(element) => tree.resolve(element)?,
            };
            tree.observers_created += 1;
            let id = tree.observers_created as u64;
            tree.observers.push(ObserverEntry {
                id,
                target: node,
                options,
                sender,
            });
            id
        };
        debug!(observer = id, "memory observer connected");

        let inner = Arc::downgrade(&self.inner);
        Ok(MutationSubscription::new(receiver, move || {
            MemoryDocument::detach_observer(&inner, id)
        }))
    }
}

fn focus_event() -> DomEvent {
    DomEvent {
        bubbles: false,
        ..DomEvent::new(DomEventKind::Focus)
    }
}

fn blur_event() -> DomEvent {
    DomEvent {
        bubbles: false,
        ..DomEvent::new(DomEventKind::Blur)
    }
}
