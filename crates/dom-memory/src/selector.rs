//! Minimal CSS selector engine.
//!
//! Supports type/universal selectors, `#id`, `.class`, attribute selectors
//! (`[a]`, `=`, `~=`, `^=`, `$=`, `*=`), the descendant and child
//! combinators, and comma-separated lists. Pseudo-classes are rejected.

use domflow_core_types::DomError;

use crate::tree::NodeId;

/// Read access to an element tree, as needed for matching.
pub(crate) trait ElementTree {
    fn tag(&self, node: NodeId) -> Option<&str>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
}

/// Parsed selector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    complexes: Vec<Complex>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    operation: Option<(AttributeOp, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttributeOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        Parser::new(source).parse_list()
    }

    pub(crate) fn matches(&self, tree: &impl ElementTree, node: NodeId) -> bool {
        self.complexes
            .iter()
            .any(|complex| complex.matches(tree, node))
    }
}

impl Complex {
    fn matches(&self, tree: &impl ElementTree, node: NodeId) -> bool {
        let last = self.compounds.len() - 1;
        self.compounds[last].matches(tree, node) && self.matches_left_of(tree, node, last)
    }

    /// `node` already matched `compounds[index]`; check everything to its left.
    fn matches_left_of(&self, tree: &impl ElementTree, node: NodeId, index: usize) -> bool {
        if index == 0 {
            return true;
        }
        let previous = &self.compounds[index - 1];
        match self.combinators[index - 1] {
            Combinator::Child => tree.parent_of(node).map_or(false, |parent| {
                previous.matches(tree, parent) && self.matches_left_of(tree, parent, index - 1)
            }),
            Combinator::Descendant => {
                let mut cursor = tree.parent_of(node);
                while let Some(ancestor) = cursor {
                    if previous.matches(tree, ancestor)
                        && self.matches_left_of(tree, ancestor, index - 1)
                    {
                        return true;
                    }
                    cursor = tree.parent_of(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, tree: &impl ElementTree, node: NodeId) -> bool {
        let Some(tag) = tree.tag(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self
            .ids
            .iter()
            .all(|id| tree.attribute(node, "id") == Some(id.as_str()))
        {
            return false;
        }
        if !self.classes.is_empty() {
            let classes = tree.attribute(node, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|class| classes.split_whitespace().any(|token| token == class))
            {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|attribute| attribute.matches(tree.attribute(node, &attribute.name)))
    }
}

impl AttributeSelector {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match &self.operation {
            None => true,
            Some((AttributeOp::Equals, expected)) => actual == expected,
            Some((AttributeOp::Includes, expected)) => {
                actual.split_whitespace().any(|token| token == expected)
            }
            Some((AttributeOp::Prefix, expected)) => {
                !expected.is_empty() && actual.starts_with(expected.as_str())
            }
            Some((AttributeOp::Suffix, expected)) => {
                !expected.is_empty() && actual.ends_with(expected.as_str())
            }
            Some((AttributeOp::Substring, expected)) => {
                !expected.is_empty() && actual.contains(expected.as_str())
            }
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
        }
    }

    fn error(&self, reason: &str) -> DomError {
        DomError::InvalidSelector(format!(
            "{reason} at offset {} in '{}'",
            self.position, self.source
        ))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.peek();
        if next.is_some() {
            self.position += 1;
        }
        next
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
        self.position > start
    }

    fn parse_list(mut self) -> Result<SelectorList, DomError> {
        let mut complexes = Vec::new();
        loop {
            self.skip_whitespace();
            complexes.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(other) => return Err(self.error(&format!("unexpected '{other}'"))),
            }
        }
        Ok(SelectorList { complexes })
    }

    fn parse_complex(&mut self) -> Result<Complex, DomError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(other) => return Err(self.error(&format!("unexpected '{other}'"))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let mut has_part = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                has_part = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                has_part = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => compound.attributes.push(self.parse_attribute()?),
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
            has_part = true;
        }

        if has_part {
            Ok(compound)
        } else {
            Err(self.error("expected a selector"))
        }
    }

    fn parse_ident(&mut self) -> Result<String, DomError> {
        let start = self.position;
        while self.peek().is_some_and(is_ident_char) {
            self.position += 1;
        }
        if self.position == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.position].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, DomError> {
        self.bump();
        self.skip_whitespace();
        let name = self.parse_ident()?;
        self.skip_whitespace();

        let op = match (self.peek(), self.peek_second()) {
            (Some(']'), _) => {
                self.bump();
                return Ok(AttributeSelector {
                    name,
                    operation: None,
                });
            }
            (Some('='), _) => {
                self.bump();
                AttributeOp::Equals
            }
            (Some(prefix), Some('=')) => {
                let op = match prefix {
                    '~' => AttributeOp::Includes,
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    '*' => AttributeOp::Substring,
                    _ => return Err(self.error("unknown attribute operator")),
                };
                self.position += 2;
                op
            }
            _ => return Err(self.error("malformed attribute selector")),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.position;
                while self.peek().is_some_and(|c| c != quote) {
                    self.position += 1;
                }
                if self.peek().is_none() {
                    return Err(self.error("unterminated string"));
                }
                let value: String = self.chars[start..self.position].iter().collect();
                self.bump();
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(self.error("expected ']'"));
        }

        Ok(AttributeSelector {
            name,
            operation: Some((op, value)),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixture {
        nodes: HashMap<NodeId, (&'static str, Vec<(&'static str, &'static str)>, Option<NodeId>)>,
    }

    impl ElementTree for Fixture {
        fn tag(&self, node: NodeId) -> Option<&str> {
            self.nodes.get(&node).map(|(tag, _, _)| *tag)
        }

        fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
            self.nodes.get(&node).and_then(|(_, attrs, _)| {
                attrs
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
            })
        }

        fn parent_of(&self, node: NodeId) -> Option<NodeId> {
            self.nodes.get(&node).and_then(|(_, _, parent)| *parent)
        }
    }

    fn fixture() -> Fixture {
        let mut nodes = HashMap::new();
        nodes.insert(1, ("body", vec![], None));
        nodes.insert(
            2,
            ("div", vec![("id", "swap"), ("class", "panel open")], Some(1)),
        );
        nodes.insert(3, ("section", vec![("data-side", "from")], Some(2)));
        nodes.insert(
            4,
            (
                "button",
                vec![("data-testid", "token-select"), ("class", "btn")],
                Some(3),
            ),
        );
        Fixture { nodes }
    }

    fn matches(selector: &str, node: NodeId) -> bool {
        SelectorList::parse(selector)
            .unwrap()
            .matches(&fixture(), node)
    }

    #[test]
    fn compound_parts_must_all_match() {
        assert!(matches("div#swap.panel.open", 2));
        assert!(!matches("div#swap.closed", 2));
        assert!(matches("*", 4));
        assert!(matches("BUTTON", 4));
    }

    #[test]
    fn attribute_operators() {
        assert!(matches("[data-testid]", 4));
        assert!(matches("[data-testid=\"token-select\"]", 4));
        assert!(matches("[data-testid='token-select']", 4));
        assert!(matches("[data-testid^=token]", 4));
        assert!(matches("[data-testid$=select]", 4));
        assert!(matches("[data-testid*=n-s]", 4));
        assert!(matches("[class~=open]", 2));
        assert!(!matches("[class~=pen]", 2));
    }

    #[test]
    fn combinators_walk_ancestors() {
        assert!(matches("#swap button", 4));
        assert!(matches("#swap > section > button", 4));
        assert!(!matches("#swap > button", 4));
        assert!(matches("[data-side=from] .btn", 4));
    }

    #[test]
    fn lists_match_any_branch() {
        assert!(matches("a, section", 3));
        assert!(!matches("a, span", 3));
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        for bad in ["", "div >", "[x", "a:hover", "#", "[x!=y]", "a,,b"] {
            assert!(
                matches!(SelectorList::parse(bad), Err(DomError::InvalidSelector(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }
}
