// Literal values and the literal nodes that carry them.

use std::fmt;

use crate::domain::ast::{Ast, Node, NodeId};
use crate::domain::escape::StringQuoting;
use crate::domain::kind::NodeKind;

/// A statically known value: a string, an integer, or a flat list of those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    Str(String),
    Int(i64),
    List(Vec<ConstValue>),
}

impl ConstValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ConstValue::List(_))
    }

    /// Truth value under the language's conversion to boolean.
    pub fn truthy(&self) -> bool {
        match self {
            ConstValue::Str(s) => !s.is_empty(),
            ConstValue::Int(i) => *i != 0,
            ConstValue::List(items) => match items.as_slice() {
                [] => false,
                [single] => single.truthy(),
                _ => true,
            },
        }
    }

    /// Integer view used by index arguments: integers, or strings holding one.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(i) => Some(*i),
            ConstValue::Str(s) => parse_int(s),
            ConstValue::List(_) => None,
        }
    }
}

/// String conversion: lists are joined with a single space.
impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Str(s) => write!(f, "{}", s),
            ConstValue::Int(i) => write!(f, "{}", i),
            ConstValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

/// Parses decimal or `0x` hexadecimal integer text.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

const INT_TYPES: [&str; 8] = [
    "int", "long", "byte", "System.Int32", "System.Int64", "System.Byte", "Int32", "Int64",
];

/// Scalar value of a string or integer literal node.
pub fn scalar_value(ast: &Ast, id: NodeId) -> Option<ConstValue> {
    let node = ast.node(id);
    match node.kind {
        NodeKind::StringConstant => Some(ConstValue::Str(node.text().to_string())),
        NodeKind::Constant => {
            let static_type = node.attr("StaticType").unwrap_or("int");
            if INT_TYPES.iter().any(|t| t.eq_ignore_ascii_case(static_type)) {
                parse_int(node.text()).map(ConstValue::Int)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Value of any literal node: scalars, or array literals of scalars.
pub fn literal_value(ast: &Ast, id: NodeId) -> Option<ConstValue> {
    match ast.kind(id) {
        NodeKind::ArrayLiteral => array_values(ast, id).map(ConstValue::List),
        _ => scalar_value(ast, id),
    }
}

/// Elements of an array literal when every one of them is a scalar literal.
pub fn array_values(ast: &Ast, id: NodeId) -> Option<Vec<ConstValue>> {
    let elements = ast.find_child(id, NodeKind::Elements)?;
    ast.children(elements)
        .iter()
        .map(|e| scalar_value(ast, *e))
        .collect()
}

pub fn string_node(text: &str, quoting: StringQuoting) -> Node {
    Node::new(NodeKind::StringConstant)
        .with_attr("StringConstantType", <&str>::from(quoting))
        .with_attr("StaticType", "string")
        .with_text(text)
}

pub fn int_node(value: i64) -> Node {
    Node::new(NodeKind::Constant)
        .with_attr("StaticType", "int")
        .with_text(value.to_string())
}

/// `$true` / `$false`.
pub fn bool_node(value: bool) -> Node {
    Node::new(NodeKind::Variable)
        .with_attr("VariablePath", if value { "true" } else { "false" })
        .with_attr("StaticType", "bool")
}

/// Allocates a literal node tree holding `value`. Strings use `quoting`;
/// list elements are always single-quoted.
pub fn alloc_value(ast: &mut Ast, value: &ConstValue, quoting: StringQuoting) -> NodeId {
    match value {
        ConstValue::Str(s) => ast.alloc(string_node(s, quoting)),
        ConstValue::Int(i) => ast.alloc(int_node(*i)),
        ConstValue::List(items) => {
            let children: Vec<NodeId> = items
                .iter()
                .map(|item| alloc_value(ast, item, StringQuoting::SingleQuoted))
                .collect();
            let elements = ast.add(Node::new(NodeKind::Elements), children);
            ast.add(
                Node::new(NodeKind::ArrayLiteral).with_attr("StaticType", "System.Object[]"),
                vec![elements],
            )
        }
    }
}

/// Boolean value of `$true`/`$false` variable nodes.
pub fn bool_value(ast: &Ast, id: NodeId) -> Option<bool> {
    if !ast.is(id, NodeKind::Variable) {
        return None;
    }
    match ast.attr(id, "VariablePath")?.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
