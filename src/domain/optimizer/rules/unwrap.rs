// Grouping nodes around a single child.

use tracing::debug;

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::ParentIndex;
use crate::domain::kind::NodeKind;
use crate::domain::optimizer::{Rule, RuleContext};

/// Expressions that read the same with or without surrounding parentheses.
fn is_self_delimited(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::StringConstant
            | NodeKind::ExpandableString
            | NodeKind::Constant
            | NodeKind::Variable
            | NodeKind::ArrayLiteral
            | NodeKind::Hashtable
            | NodeKind::ParenExpression
            | NodeKind::SubExpression
            | NodeKind::ArrayExpression
            | NodeKind::IndexExpression
            | NodeKind::MemberExpression
            | NodeKind::InvokeMember
            | NodeKind::TypeExpression
            | NodeKind::ScriptBlockExpression
    )
}

/// Replaces the first node of `kind` for which `payload` yields an inner
/// node by that inner node.
fn unwrap_first(
    ast: &mut Ast,
    kind: NodeKind,
    payload: impl Fn(&Ast, &ParentIndex, NodeId) -> Option<NodeId>,
) -> bool {
    let index = ParentIndex::build(ast);
    let found = ast
        .iter()
        .filter(|id| ast.is(*id, kind))
        .find_map(|id| payload(ast, &index, id).map(|inner| (id, inner)));
    let Some((outer, inner)) = found else {
        return false;
    };
    debug!("Replace {} with single element by {}", kind, ast.kind(inner));
    index.replace(ast, outer, inner, None)
}

fn single_child(ast: &Ast, id: NodeId) -> Option<NodeId> {
    match ast.children(id) {
        [only] => Some(*only),
        _ => None,
    }
}

/// `("abc")` becomes `"abc"`.
pub struct UnwrapParen;

impl Rule for UnwrapParen {
    fn name(&self) -> &'static str {
        "unwrap_paren"
    }

    fn description(&self) -> &'static str {
        "Drop parentheses around a single self-delimited expression"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        unwrap_first(ast, NodeKind::ParenExpression, |ast, _, paren| {
            let mut inner = single_child(ast, paren)?;
            while matches!(
                ast.kind(inner),
                NodeKind::Pipeline | NodeKind::PipelineElements | NodeKind::CommandExpression
            ) {
                inner = single_child(ast, inner)?;
            }
            is_self_delimited(ast.kind(inner)).then_some(inner)
        })
    }
}

/// A pipeline of one element becomes that element.
pub struct UnwrapPipeline;

impl Rule for UnwrapPipeline {
    fn name(&self) -> &'static str {
        "unwrap_pipeline"
    }

    fn description(&self) -> &'static str {
        "Replace a single-element pipeline by its element"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        unwrap_first(ast, NodeKind::Pipeline, |ast, _, pipeline| {
            let mut inner = single_child(ast, pipeline)?;
            if ast.is(inner, NodeKind::PipelineElements) {
                inner = single_child(ast, inner)?;
            }
            Some(inner)
        })
    }
}

/// An array literal of one element becomes that element where the value
/// is only written to the output stream, which enumerates it anyway.
/// Operands, assignment values and arguments keep the list.
pub struct UnwrapSingleArray;

fn is_output_position(ast: &Ast, index: &ParentIndex, array: NodeId) -> bool {
    let Some(stmt) = index.parent(array).filter(|p| ast.is(*p, NodeKind::CommandExpression)) else {
        return false;
    };
    let in_statements = |id: NodeId| {
        index
            .parent(id)
            .map(|p| ast.is(p, NodeKind::Statements))
            .unwrap_or(false)
    };
    match index.parent(stmt) {
        Some(p) if ast.is(p, NodeKind::PipelineElements) => index.parent(p).map(in_statements).unwrap_or(false),
        _ => in_statements(stmt),
    }
}

impl Rule for UnwrapSingleArray {
    fn name(&self) -> &'static str {
        "unwrap_single_array"
    }

    fn description(&self) -> &'static str {
        "Replace a one-element array literal by its element"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        unwrap_first(ast, NodeKind::ArrayLiteral, |ast, index, array| {
            if !is_output_position(ast, index, array) {
                return None;
            }
            let elements = ast.find_child(array, NodeKind::Elements)?;
            let inner = single_child(ast, elements)?;
            (!ast.kind(inner).needs_grouping()).then_some(inner)
        })
    }
}
