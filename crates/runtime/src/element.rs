//! The element tree produced by evaluating a compiled body at a frame.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Evaluated element properties. `BTreeMap` keeps rendering deterministic.
pub type Props = BTreeMap<String, Value>;

/// What an element is, after evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum ElementKind {
    Stage,
    Box,
    Text,
    /// A time window around its children. Children evaluated at the
    /// window-local frame.
    Sequence,
    /// A live media element (interactive contexts only).
    Media(String),
    /// A media element replaced by its layout-preserving stub.
    MediaStub(String),
    /// Renders nothing but occupies its slot (out-of-window sequences,
    /// failed siblings).
    Empty,
}

/// One node of the evaluated tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub kind: ElementKind,
    pub props: Props,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    pub fn empty() -> Self {
        Self::new(ElementKind::Empty)
    }

    /// Depth-first count of nodes, empties included. Used by tests to
    /// check that stubbing preserves tree shape.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Element::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_count_is_recursive() {
        let tree = Element::new(ElementKind::Stage).with_children(vec![
            Element::new(ElementKind::Text),
            Element::new(ElementKind::Box).with_children(vec![Element::empty()]),
        ]);
        assert_eq!(tree.node_count(), 4);
    }
}
