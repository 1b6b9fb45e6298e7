// Syntax tree storage for psdeob.
// Nodes live in an arena owned by `Ast`; a `NodeId` is the identity of one
// node instance, so two structurally equal nodes are still distinct.

use crate::domain::kind::NodeKind;

/// Identity of a node inside its owning [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Small ordered attribute map. Insertion order is kept so documents
/// round-trip attribute for attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrites an existing key in place, or appends a new one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One element of the program tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub attributes: Attributes,
    pub text: Option<String>,
    /// Element name for `NodeKind::Unsupported` nodes.
    tag: Option<String>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: Attributes::default(),
            text: None,
            tag: None,
            children: Vec::new(),
        }
    }

    /// A node for an element name outside the known kinds.
    pub fn unsupported(tag: &str) -> Self {
        let mut node = Self::new(NodeKind::Unsupported);
        node.tag = Some(tag.to_string());
        node
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.set(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The element name this node serialises as.
    pub fn element_name(&self) -> &str {
        match &self.tag {
            Some(tag) => tag,
            None => self.kind.tag(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.set(key, value);
    }

    /// Text payload, empty when absent.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }
}

/// A rooted tree. Detached nodes stay in the arena but are unreachable;
/// every traversal starts from the root.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
    generation: u64,
}

impl Ast {
    pub fn new(root: Node) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
            generation: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Allocates `node` and attaches `children` to it in order.
    pub fn add(&mut self, node: Node, children: Vec<NodeId>) -> NodeId {
        let id = self.alloc(node);
        self.nodes[id.0].children = children;
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutable access to kind, attributes and text. Child lists change only
    /// through the structural methods, which advance the generation.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn is(&self, id: NodeId, kind: NodeKind) -> bool {
        self.nodes[id.0].kind == kind
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0].attr(key)
    }

    pub fn text(&self, id: NodeId) -> &str {
        self.nodes[id.0].text()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    /// First direct child of the given kind.
    pub fn find_child(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|c| self.is(*c, kind))
    }

    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.generation += 1;
        self.nodes[parent.0].children.push(child);
    }

    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        self.generation += 1;
        self.nodes[parent.0].children = children;
    }

    pub(crate) fn children_mut(&mut self, parent: NodeId) -> &mut Vec<NodeId> {
        self.generation += 1;
        &mut self.nodes[parent.0].children
    }

    /// Counter advanced on every structural change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pre-order traversal of the reachable tree.
    pub fn iter(&self) -> Descendants<'_> {
        self.descendants(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            ast: self,
            stack: vec![id],
        }
    }

    /// Number of reachable nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Copies the subtree `from` of `other` into this arena, returning the
    /// new (detached) subtree root.
    pub fn graft(&mut self, other: &Ast, from: NodeId) -> NodeId {
        let source = other.node(from);
        let children: Vec<NodeId> = source
            .children
            .iter()
            .map(|c| self.graft(other, *c))
            .collect();
        let mut copy = source.clone();
        copy.children = children;
        self.alloc(copy)
    }

    /// Compares two subtrees by kind, element name, attributes, text and
    /// children, ignoring identity.
    pub fn structurally_eq(&self, a: NodeId, other: &Ast, b: NodeId) -> bool {
        let (x, y) = (self.node(a), other.node(b));
        x.kind == y.kind
            && x.element_name() == y.element_name()
            && x.attributes == y.attributes
            && x.text == y.text
            && x.children.len() == y.children.len()
            && x
                .children
                .iter()
                .zip(y.children.iter())
                .all(|(ca, cb)| self.structurally_eq(*ca, other, *cb))
    }

    /// Nodes whose children do not match the arity of their kind.
    pub fn malformed_nodes(&self) -> Vec<NodeId> {
        self.iter().filter(|id| !self.has_valid_arity(*id)).collect()
    }

    fn has_valid_arity(&self, id: NodeId) -> bool {
        let n = self.children(id).len();
        match self.kind(id) {
            NodeKind::BinaryExpression
            | NodeKind::Assignment
            | NodeKind::IndexExpression
            | NodeKind::MemberExpression
            | NodeKind::Convert
            | NodeKind::While
            | NodeKind::DoWhile
            | NodeKind::DoUntil
            | NodeKind::KeyValuePair
            | NodeKind::SwitchClause => n == 2,
            NodeKind::UnaryExpression
            | NodeKind::ParenExpression
            | NodeKind::ArrayLiteral
            | NodeKind::ScriptBlockExpression
            | NodeKind::StatementBlock => n == 1,
            NodeKind::InvokeMember => n == 2 || n == 3,
            NodeKind::If => n >= 2,
            NodeKind::ForEach => n == 3,
            NodeKind::For => n == 4,
            NodeKind::Initializer | NodeKind::Condition | NodeKind::Iterator => n <= 1,
            _ => true,
        }
    }
}

pub struct Descendants<'a> {
    ast: &'a Ast,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.ast.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Ast, NodeId, NodeId) {
        let mut ast = Ast::new(Node::new(NodeKind::ScriptBlock));
        let a = ast.alloc(Node::new(NodeKind::StringConstant).with_text("a"));
        let b = ast.alloc(Node::new(NodeKind::StringConstant).with_text("a"));
        let elements = ast.add(Node::new(NodeKind::Elements), vec![a, b]);
        let root = ast.root();
        ast.push_child(root, elements);
        (ast, a, b)
    }

    #[test]
    fn test_identity_is_not_value() {
        let (ast, a, b) = sample();
        assert_ne!(a, b);
        assert!(ast.structurally_eq(a, &ast, b));
    }

    #[test]
    fn test_preorder() {
        let (ast, a, b) = sample();
        let order: Vec<NodeId> = ast.iter().collect();
        assert_eq!(order.len(), 4);
        assert_eq!(order[2], a);
        assert_eq!(order[3], b);
    }

    #[test]
    fn test_attributes_keep_order() {
        let mut attrs = Attributes::default();
        attrs.set("StringConstantType", "BareWord");
        attrs.set("StaticType", "string");
        attrs.set("StringConstantType", "SingleQuoted");
        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["StringConstantType", "StaticType"]);
        assert_eq!(attrs.get("StringConstantType"), Some("SingleQuoted"));
    }

    #[test]
    fn test_graft_copies_subtree() {
        let (source, _, _) = sample();
        let mut target = Ast::new(Node::new(NodeKind::ScriptBlock));
        let copy = target.graft(&source, source.root());
        assert!(target.structurally_eq(copy, &source, source.root()));
    }

    #[test]
    fn test_generation_advances_on_structure_only() {
        let (mut ast, a, _) = sample();
        let before = ast.generation();
        ast.node_mut(a).set_attr("StringConstantType", "BareWord");
        assert_eq!(ast.generation(), before);
        let root = ast.root();
        ast.set_children(root, vec![]);
        assert!(ast.generation() > before);
        assert_eq!(ast.len(), 1);
    }
}
