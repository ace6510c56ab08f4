//! Page-side script builders.
//!
//! Every call is a self-contained `Runtime.evaluate` expression: it installs
//! the element registry on first use, runs one operation and wraps the outcome
//! in a `{ok}` / `{err, message}` envelope that [`parse_reply`] decodes.
//! Arguments are embedded as JSON literals, never spliced as source.

use domflow_core_types::{
    DomError, DomEvent, EditCommand, ElementRef, MutationBatch, MutationKind, MutationRecord,
    ObserveOptions, ValueSetter,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Name of the `Runtime.addBinding` channel mutation batches are posted to.
pub const BINDING_NAME: &str = "__domflowMutations";

/// Element handles are strings minted by the registry; they resolve only
/// while the node stays connected. The registry holds nodes weakly and drops
/// handles of disconnected nodes whenever it mints a new one.
const REGISTRY: &str = r#"(() => {
  if (!window.__domflow) {
    const nodes = new Map();
    const ids = new WeakMap();
    let next = 1;
    const forget = (id, node) => {
      nodes.delete(id);
      if (node) ids.delete(node);
    };
    const prune = () => {
      for (const [id, weak] of nodes) {
        const node = weak.deref();
        if (!node || !node.isConnected) forget(id, node);
      }
    };
    window.__domflow = {
      observers: new Map(),
      ref(node) {
        if (!node) return null;
        let id = ids.get(node);
        if (id === undefined) {
          prune();
          id = String(next++);
          ids.set(node, id);
          nodes.set(id, new WeakRef(node));
        }
        return id;
      },
      get(id) {
        const weak = nodes.get(id);
        const node = weak && weak.deref();
        if (!node || !node.isConnected) {
          forget(id, node);
          throw { domflow: 'detached', message: id };
        }
        return node;
      },
    };
  }
  return window.__domflow;
})()"#;

fn invoke(function: &str, args: Value) -> String {
    format!(
        r#"(() => {{
  const df = {REGISTRY};
  try {{
    const value = ({function})(df, ...{args});
    return {{ ok: value === undefined ? null : value }};
  }} catch (e) {{
    if (e && e.domflow) return {{ err: e.domflow, message: String(e.message) }};
    if (e && e.name === 'SyntaxError') return {{ err: 'selector', message: String(e.message) }};
    return {{ err: 'script', message: String(e && e.message ? e.message : e) }};
  }}
}})()"#
    )
}

pub fn query(selector: &str) -> String {
    invoke(
        "(df, sel) => df.ref(document.querySelector(sel))",
        json!([selector]),
    )
}

pub fn query_all(selector: &str) -> String {
    invoke(
        "(df, sel) => Array.from(document.querySelectorAll(sel), (n) => df.ref(n))",
        json!([selector]),
    )
}

pub fn query_within(root: &ElementRef, selector: &str) -> String {
    invoke(
        "(df, root, sel) => df.ref(df.get(root).querySelector(sel))",
        json!([root.as_str(), selector]),
    )
}

pub fn query_all_within(root: &ElementRef, selector: &str) -> String {
    invoke(
        "(df, root, sel) => Array.from(df.get(root).querySelectorAll(sel), (n) => df.ref(n))",
        json!([root.as_str(), selector]),
    )
}

pub fn parent(element: &ElementRef) -> String {
    on_element(element, "(df, el) => df.ref(el.parentElement)", json!([]))
}

pub fn text_content(element: &ElementRef) -> String {
    on_element(element, "(df, el) => el.textContent || ''", json!([]))
}

pub fn attribute(element: &ElementRef, name: &str) -> String {
    on_element(element, "(df, el, name) => el.getAttribute(name)", json!([name]))
}

pub fn has_class(element: &ElementRef, class: &str) -> String {
    on_element(
        element,
        "(df, el, cls) => el.classList.contains(cls)",
        json!([class]),
    )
}

pub fn is_disabled(element: &ElementRef) -> String {
    on_element(
        element,
        "(df, el) => el.disabled === true || el.hasAttribute('disabled')",
        json!([]),
    )
}

pub fn value(element: &ElementRef) -> String {
    on_element(
        element,
        "(df, el) => (el.value === undefined || el.value === null) ? '' : String(el.value)",
        json!([]),
    )
}

/// Resolves to the serde name of an `ElementCapability` variant.
pub fn capability(element: &ElementRef) -> String {
    on_element(
        element,
        r#"(df, el) => {
  if (el.isContentEditable) return 'ContentEditable';
  if (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) return 'NativeValue';
  return 'Generic';
}"#,
        json!([]),
    )
}

pub fn supports_selection(element: &ElementRef) -> String {
    on_element(
        element,
        "(df, el) => typeof el.setSelectionRange === 'function'",
        json!([]),
    )
}

pub fn scroll_into_view(element: &ElementRef) -> String {
    on_element(
        element,
        "(df, el) => el.scrollIntoView({ block: 'center', inline: 'center' })",
        json!([]),
    )
}

pub fn focus(element: &ElementRef) -> String {
    on_element(element, "(df, el) => el.focus()", json!([]))
}

pub fn blur(element: &ElementRef) -> String {
    on_element(element, "(df, el) => el.blur()", json!([]))
}

pub fn dispatch(element: &ElementRef, event: &DomEvent) -> String {
    let init = json!({
        "type": event.type_name(),
        "bubbles": event.bubbles,
        "cancelable": event.cancelable,
        "data": event.data,
    });
    on_element(
        element,
        r#"(df, el, ev) => {
  const init = { bubbles: ev.bubbles, cancelable: ev.cancelable };
  let event;
  switch (ev.type) {
    case 'click':
      event = new MouseEvent('click', { ...init, view: window });
      break;
    case 'focus':
    case 'blur':
      event = new FocusEvent(ev.type, init);
      break;
    case 'keydown':
    case 'keypress':
    case 'keyup':
      event = new KeyboardEvent(ev.type, { ...init, key: ev.data || '' });
      break;
    case 'paste': {
      const data = new DataTransfer();
      data.setData('text/plain', ev.data || '');
      event = new ClipboardEvent('paste', { ...init, clipboardData: data });
      break;
    }
    case 'input':
      event = new InputEvent('input', { ...init, data: ev.data });
      break;
    default:
      event = new Event(ev.type, init);
  }
  el.dispatchEvent(event);
}"#,
        json!([init]),
    )
}

pub fn set_selection_range(element: &ElementRef, start: usize, end: usize) -> String {
    on_element(
        element,
        "(df, el, start, end) => el.setSelectionRange(start, end)",
        json!([start, end]),
    )
}

pub fn exec_command(command: &EditCommand) -> String {
    invoke(
        "(df, name, arg) => document.execCommand(name, false, arg === null ? undefined : arg)",
        json!([command.name(), command.argument()]),
    )
}

pub fn set_value(element: &ElementRef, value: &str, setter: ValueSetter) -> String {
    let function = match setter {
        ValueSetter::Instance => "(df, el, v) => { el.value = v; }",
        ValueSetter::Prototype => {
            r#"(df, el, v) => {
  const proto = el instanceof HTMLTextAreaElement
    ? HTMLTextAreaElement.prototype
    : HTMLInputElement.prototype;
  Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, v);
}"#
        }
    };
    on_element(element, function, json!([value]))
}

pub fn set_text_content(element: &ElementRef, text: &str) -> String {
    on_element(element, "(df, el, t) => { el.textContent = t; }", json!([text]))
}

pub fn reset_value_tracker(element: &ElementRef, previous: &str) -> String {
    on_element(
        element,
        r#"(df, el, prev) => {
  const tracker = el._valueTracker;
  if (!tracker) return false;
  tracker.setValue(prev);
  return true;
}"#,
        json!([previous]),
    )
}

/// Starts observer `id` on `target` (`None` is `document.body`).
pub fn observe(target: Option<&ElementRef>, id: u64, options: &ObserveOptions) -> String {
    let function = format!(
        r#"(df, target, id, options) => {{
  const root = target === null ? document.body : df.get(target);
  const observer = new MutationObserver((records) => {{
    window.{BINDING_NAME}(JSON.stringify({{
      id,
      records: records.map((r) => ({{
        type: r.type,
        attributeName: r.attributeName,
        target: r.target.nodeType === 1 ? df.ref(r.target) : null,
      }})),
    }}));
  }});
  observer.observe(root, options);
  df.observers.set(id, observer);
}}"#
    );
    invoke(
        &function,
        json!([target.map(ElementRef::as_str), id, options]),
    )
}

pub fn disconnect(id: u64) -> String {
    invoke(
        r#"(df, id) => {
  const observer = df.observers.get(id);
  if (observer) {
    observer.disconnect();
    df.observers.delete(id);
  }
}"#,
        json!([id]),
    )
}

fn on_element(element: &ElementRef, function: &str, extra: Value) -> String {
    let mut args = vec![Value::String(element.as_str().to_string())];
    if let Value::Array(rest) = extra {
        args.extend(rest);
    }
    let wrapped = format!("(df, id, ...rest) => ({function})(df, df.get(id), ...rest)");
    invoke(&wrapped, Value::Array(args))
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    ok: Value,
    err: Option<String>,
    message: Option<String>,
}

/// Decodes the envelope every script returns.
pub fn parse_reply(raw: Value) -> Result<Value, DomError> {
    let reply: Reply = serde_json::from_value(raw)
        .map_err(|err| DomError::Protocol(format!("malformed script reply: {err}")))?;
    let message = reply.message.unwrap_or_default();
    match reply.err.as_deref() {
        None => Ok(reply.ok),
        Some("detached") => Err(DomError::Detached(message)),
        Some("selector") => Err(DomError::InvalidSelector(message)),
        Some(_) => Err(DomError::Internal(message)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    attribute_name: Option<String>,
    target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BindingPayload {
    id: u64,
    records: Vec<RawRecord>,
}

/// Decodes one binding call into the observer id and its batch.
pub fn parse_batch(payload: &str) -> Result<(u64, MutationBatch), DomError> {
    let payload: BindingPayload = serde_json::from_str(payload)
        .map_err(|err| DomError::Protocol(format!("malformed mutation payload: {err}")))?;
    let records = payload
        .records
        .into_iter()
        .filter_map(|raw| {
            let kind = match raw.kind.as_str() {
                "childList" => MutationKind::ChildList,
                "attributes" => MutationKind::Attributes {
                    name: raw.attribute_name.unwrap_or_default(),
                },
                "characterData" => MutationKind::CharacterData,
                _ => return None,
            };
            Some(MutationRecord {
                kind,
                target: raw.target.map(ElementRef::new),
            })
        })
        .collect();
    Ok((payload.id, MutationBatch::new(records)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_embedded_as_json_literals() {
        let script = query(r#"button[data-testid="connect"]'); alert('x"#);
        assert!(script.contains(r#"...["button[data-testid=\"connect\"]'); alert('x"]"#));
        assert!(script.contains("window.__domflow"));
    }

    #[test]
    fn registry_holds_nodes_weakly_and_prunes_on_mint() {
        assert!(REGISTRY.contains("nodes.set(id, new WeakRef(node))"));
        let mint = REGISTRY.find("id = String(next++)").unwrap();
        let prune = REGISTRY.find("prune();").unwrap();
        assert!(prune < mint);
        assert!(REGISTRY.contains("if (!node || !node.isConnected) forget(id, node)"));
    }

    #[test]
    fn element_scripts_resolve_the_handle_first() {
        let script = text_content(&ElementRef::new("42"));
        assert!(script.contains("df.get(id)"));
        assert!(script.contains(r#"...["42"]"#));
    }

    #[test]
    fn prototype_setter_bypasses_instance_property() {
        let script = set_value(&ElementRef::new("3"), "1.5", ValueSetter::Prototype);
        assert!(script.contains("getOwnPropertyDescriptor(proto, 'value').set.call(el, v)"));
        let script = set_value(&ElementRef::new("3"), "1.5", ValueSetter::Instance);
        assert!(script.contains("el.value = v"));
    }

    #[test]
    fn exec_command_passes_argument_only_for_insert() {
        assert!(exec_command(&EditCommand::InsertText("SOL".into())).contains(r#"["insertText","SOL"]"#));
        assert!(exec_command(&EditCommand::SelectAll).contains(r#"["selectAll",null]"#));
    }

    #[test]
    fn observe_serializes_options_in_dom_casing() {
        let options = ObserveOptions::attributes().with_attribute_filter(&["class"]);
        let script = observe(Some(&ElementRef::new("7")), 3, &options);
        assert!(script.contains(r#""attributeFilter":["class"]"#));
        assert!(script.contains(BINDING_NAME));
        let body = observe(None, 4, &ObserveOptions::subtree_changes());
        assert!(body.contains(r#"...[null,4,"#));
    }

    #[test]
    fn reply_envelope_maps_errors() {
        assert_eq!(parse_reply(json!({ "ok": "5" })), Ok(json!("5")));
        assert_eq!(parse_reply(json!({ "ok": null })), Ok(Value::Null));
        assert_eq!(
            parse_reply(json!({ "err": "detached", "message": "9" })),
            Err(DomError::Detached("9".into()))
        );
        assert!(matches!(
            parse_reply(json!({ "err": "selector", "message": "bad" })),
            Err(DomError::InvalidSelector(_))
        ));
        assert!(matches!(parse_reply(json!(12)), Err(DomError::Protocol(_))));
    }

    #[test]
    fn binding_payload_becomes_batch() {
        let (id, batch) = parse_batch(
            r#"{"id":2,"records":[
                {"type":"childList","attributeName":null,"target":"1"},
                {"type":"attributes","attributeName":"class","target":"8"},
                {"type":"characterData","attributeName":null,"target":null}
            ]}"#,
        )
        .unwrap();
        assert_eq!(id, 2);
        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.records[1].kind,
            MutationKind::Attributes { name: "class".into() }
        );
        assert_eq!(batch.records[2].target, None);
    }
}
