//! The rule catalog and the tree queries the rules share.

mod branches;
mod convert;
mod fold;
mod index;
mod inline;
mod invoke;
mod normalize;
mod propagate;
mod prune;
mod unused;
mod unwrap;

use std::collections::{HashMap, HashSet};

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::ParentIndex;
use crate::domain::escape::StringQuoting;
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::domain::tables;

use super::{OptimizerSettings, Rule};

pub use branches::DeadBranches;
pub use convert::FoldConversions;
pub use fold::{FoldBinary, UnaryJoin};
pub use index::FoldIndex;
pub use inline::InlineInvokeExpression;
pub use invoke::{FoldInvokeMember, ReverseConstArray};
pub use normalize::{
    AliasToCmdlet, BarewordCase, CommandBareword, MemberCase, PrefixCase, RenameLongNames,
    SpecialVariableCase, TypeConstraintFromConvert, TypeNameCase,
};
pub use propagate::PropagateConstants;
pub use prune::RemoveEmptyContainers;
pub use unused::{RemoveUnassignedUse, RemoveUnusedVariable};
pub use unwrap::{UnwrapParen, UnwrapPipeline, UnwrapSingleArray};

/// The full catalog in driver order.
pub fn catalog(settings: &OptimizerSettings) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(RemoveEmptyContainers),
        Box::new(RemoveUnusedVariable),
        Box::new(UnwrapParen),
        Box::new(UnwrapPipeline),
        Box::new(UnwrapSingleArray),
        Box::new(RemoveUnassignedUse),
        Box::new(DeadBranches),
        Box::new(UnaryJoin),
        Box::new(FoldBinary),
        Box::new(FoldInvokeMember),
        Box::new(ReverseConstArray),
        Box::new(InlineInvokeExpression::default()),
        Box::new(FoldConversions),
        Box::new(FoldIndex),
        Box::new(PrefixCase),
        Box::new(BarewordCase),
        Box::new(MemberCase),
        Box::new(CommandBareword),
        Box::new(AliasToCmdlet),
        Box::new(SpecialVariableCase),
        Box::new(TypeConstraintFromConvert),
        Box::new(TypeNameCase),
        Box::new(RenameLongNames::new(settings.rename_threshold)),
        Box::new(PropagateConstants),
    ]
}

pub(crate) fn variable_path(ast: &Ast, id: NodeId) -> Option<&str> {
    if ast.is(id, NodeKind::Variable) {
        ast.attr(id, "VariablePath")
    } else {
        None
    }
}

pub(crate) fn is_splatted(ast: &Ast, id: NodeId) -> bool {
    ast.attr(id, "Splatted")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub(crate) fn quoting(ast: &Ast, id: NodeId) -> Option<StringQuoting> {
    if !ast.is(id, NodeKind::StringConstant) {
        return None;
    }
    ast.attr(id, "StringConstantType")?.parse().ok()
}

pub(crate) fn is_bareword(ast: &Ast, id: NodeId) -> bool {
    quoting(ast, id) == Some(StringQuoting::BareWord)
}

pub(crate) fn operator(ast: &Ast, id: NodeId) -> Option<Operator> {
    ast.attr(id, "Operator").and_then(Operator::parse)
}

pub(crate) fn token(ast: &Ast, id: NodeId) -> Option<Operator> {
    ast.attr(id, "TokenKind").and_then(Operator::parse)
}

pub(crate) fn is_static(ast: &Ast, id: NodeId) -> bool {
    ast.attr(id, "Static")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Arguments, target and member name of an invocation.
pub(crate) fn invoke_parts(ast: &Ast, id: NodeId) -> Option<(Option<NodeId>, NodeId, NodeId)> {
    if !ast.is(id, NodeKind::InvokeMember) {
        return None;
    }
    match ast.children(id) {
        [args, target, member] if ast.is(*args, NodeKind::Arguments) => {
            Some((Some(*args), *target, *member))
        }
        [target, member] => Some((None, *target, *member)),
        _ => None,
    }
}

/// Lowercased bareword member name.
pub(crate) fn member_name(ast: &Ast, member: NodeId) -> Option<String> {
    if is_bareword(ast, member) {
        Some(ast.text(member).to_lowercase())
    } else {
        None
    }
}

/// Lowercased target type of a conversion, without a `System.` prefix, and
/// the converted operand.
pub(crate) fn convert_parts(ast: &Ast, id: NodeId) -> Option<(String, NodeId)> {
    if !ast.is(id, NodeKind::Convert) {
        return None;
    }
    let constraint = ast.find_child(id, NodeKind::TypeConstraint)?;
    let operand = ast
        .children(id)
        .iter()
        .copied()
        .find(|c| *c != constraint)?;
    let name = ast.attr(constraint, "TypeName")?.to_lowercase();
    let name = name.strip_prefix("system.").unwrap_or(&name).to_string();
    Some((name, operand))
}

/// Follows single-child pipeline wrappers down to the expression they carry.
pub(crate) fn unwrap_statement(ast: &Ast, mut id: NodeId) -> NodeId {
    loop {
        match ast.kind(id) {
            NodeKind::Pipeline | NodeKind::PipelineElements => match ast.children(id) {
                [only] => id = *only,
                _ => return id,
            },
            NodeKind::CommandExpression => {
                let expr = ast
                    .children(id)
                    .iter()
                    .copied()
                    .find(|c| !ast.is(*c, NodeKind::Redirections));
                match expr {
                    Some(expr) if ast.children(id).len() == 1 => id = expr,
                    _ => return id,
                }
            }
            NodeKind::ParenExpression => match ast.children(id) {
                [only] => id = *only,
                _ => return id,
            },
            _ => return id,
        }
    }
}

/// Statements held by a statement block.
pub(crate) fn block_statements(ast: &Ast, block: NodeId) -> Vec<NodeId> {
    ast.find_child(block, NodeKind::Statements)
        .map(|s| ast.children(s).to_vec())
        .unwrap_or_default()
}

/// The node that sits directly in a `Statements` list, starting at `id`.
pub(crate) fn statement_of(ast: &Ast, index: &ParentIndex, id: NodeId) -> Option<NodeId> {
    std::iter::once(id)
        .chain(index.ancestors(id))
        .find(|n| {
            index
                .parent(*n)
                .map(|p| ast.is(p, NodeKind::Statements))
                .unwrap_or(false)
        })
}

/// Variables written by an assignment target: the variable itself, the
/// one an index, member or cast target is rooted at, or every variable of a
/// multiple assignment.
pub(crate) fn written_variables(ast: &Ast, target: NodeId) -> Vec<NodeId> {
    match ast.kind(target) {
        NodeKind::Variable => vec![target],
        NodeKind::IndexExpression | NodeKind::MemberExpression => ast
            .child(target, 0)
            .map(|t| written_variables(ast, t))
            .unwrap_or_default(),
        NodeKind::Convert => ast
            .children(target)
            .iter()
            .copied()
            .filter(|c| !ast.is(*c, NodeKind::TypeConstraint))
            .flat_map(|c| written_variables(ast, c))
            .collect(),
        NodeKind::ArrayLiteral | NodeKind::Elements => ast
            .children(target)
            .iter()
            .flat_map(|c| written_variables(ast, *c))
            .collect(),
        _ => Vec::new(),
    }
}

/// Lowercased names written anywhere below `root`, with how many writes
/// each receives: assignment targets, increment operands and foreach
/// variables.
pub(crate) fn assignment_counts(ast: &Ast, root: NodeId) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for id in ast.descendants(root) {
        let written = match ast.kind(id) {
            NodeKind::Assignment => ast
                .child(id, 0)
                .map(|t| written_variables(ast, t))
                .unwrap_or_default(),
            NodeKind::UnaryExpression if token(ast, id).map(Operator::is_increment).unwrap_or(false) => {
                ast.child(id, 0)
                    .map(|t| written_variables(ast, t))
                    .unwrap_or_default()
            }
            NodeKind::ForEach => ast
                .child(id, 0)
                .filter(|v| ast.is(*v, NodeKind::Variable))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };
        for path in written.into_iter().filter_map(|v| variable_path(ast, v)) {
            *counts.entry(path.to_lowercase()).or_insert(0) += 1;
        }
    }
    counts
}

pub(crate) fn assigned_vars(ast: &Ast, root: NodeId) -> HashSet<String> {
    assignment_counts(ast, root).into_keys().collect()
}

/// Names declared as parameters of the script, functions or script blocks.
pub(crate) fn parameter_vars(ast: &Ast) -> HashSet<String> {
    ast.iter()
        .filter(|id| ast.is(*id, NodeKind::Parameter))
        .filter_map(|id| ast.find_child(id, NodeKind::Variable))
        .filter_map(|v| variable_path(ast, v))
        .map(str::to_lowercase)
        .collect()
}

/// Read count of every variable: occurrences other than the target of a
/// plain `=` assignment.
pub(crate) fn used_vars(ast: &Ast) -> HashMap<String, usize> {
    let mut written: HashSet<NodeId> = HashSet::new();
    for id in ast.iter() {
        if ast.is(id, NodeKind::Assignment) && operator(ast, id) == Some(Operator::Equals) {
            if let Some(target) = ast.child(id, 0).filter(|t| ast.is(*t, NodeKind::Variable)) {
                written.insert(target);
            }
        }
    }

    let mut used = HashMap::new();
    for id in ast.iter() {
        if written.contains(&id) {
            continue;
        }
        if let Some(path) = variable_path(ast, id) {
            let path = path.to_lowercase();
            let name = path.strip_prefix("variable:").unwrap_or(&path).to_string();
            *used.entry(name).or_insert(0) += 1;
        }
    }
    used
}

/// Commands that create, read or drop variables by name, which hides
/// writes from a tree walk.
const VARIABLE_CMDLETS: &[&str] = &[
    "set-variable", "new-variable", "remove-variable", "clear-variable", "get-variable",
    "sv", "nv", "rv", "clv", "gv", "set",
];

pub(crate) fn has_dynamic_variables(ast: &Ast) -> bool {
    ast.iter().any(|id| {
        if let Some(path) = variable_path(ast, id) {
            if path.to_lowercase().starts_with("variable:") {
                return true;
            }
        }
        if !ast.is(id, NodeKind::CommandElements) {
            return false;
        }
        ast.child(id, 0)
            .filter(|c| ast.is(*c, NodeKind::StringConstant))
            .map(|c| VARIABLE_CMDLETS.contains(&ast.text(c).to_lowercase().as_str()))
            .unwrap_or(false)
    })
}

/// Automatic variables and drive- or scope-qualified names.
pub(crate) fn is_ambient(path: &str) -> bool {
    tables::is_prefixed(path) || tables::special_var(path).is_some()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Tree builders shared by the rule tests.

    use crate::domain::ast::{Ast, Node, NodeId};
    use crate::domain::escape::StringQuoting;
    use crate::domain::kind::NodeKind;
    use crate::domain::value::{int_node, string_node};

    pub fn script() -> (Ast, NodeId) {
        let mut ast = Ast::new(Node::new(NodeKind::ScriptBlock));
        let statements = ast.alloc(Node::new(NodeKind::Statements));
        let block = ast.add(
            Node::new(NodeKind::NamedBlock)
                .with_attr("BlockKind", "End")
                .with_attr("Unnamed", "True"),
            vec![statements],
        );
        let root = ast.root();
        ast.push_child(root, block);
        (ast, statements)
    }

    pub fn var(ast: &mut Ast, name: &str) -> NodeId {
        ast.alloc(
            Node::new(NodeKind::Variable)
                .with_attr("VariablePath", name)
                .with_attr("Splatted", "False"),
        )
    }

    pub fn s(ast: &mut Ast, text: &str) -> NodeId {
        ast.alloc(string_node(text, StringQuoting::SingleQuoted))
    }

    pub fn bare(ast: &mut Ast, text: &str) -> NodeId {
        ast.alloc(string_node(text, StringQuoting::BareWord))
    }

    pub fn int(ast: &mut Ast, value: i64) -> NodeId {
        ast.alloc(int_node(value))
    }

    pub fn binary(ast: &mut Ast, op: &str, left: NodeId, right: NodeId) -> NodeId {
        ast.add(
            Node::new(NodeKind::BinaryExpression)
                .with_attr("Operator", op)
                .with_attr("StaticType", "System.Object"),
            vec![left, right],
        )
    }

    pub fn array(ast: &mut Ast, items: Vec<NodeId>) -> NodeId {
        let elements = ast.add(Node::new(NodeKind::Elements), items);
        ast.add(
            Node::new(NodeKind::ArrayLiteral).with_attr("StaticType", "System.Object[]"),
            vec![elements],
        )
    }

    pub fn expr_stmt(ast: &mut Ast, expr: NodeId) -> NodeId {
        ast.add(Node::new(NodeKind::CommandExpression), vec![expr])
    }

    pub fn assign(ast: &mut Ast, name: &str, value: NodeId) -> NodeId {
        let target = var(ast, name);
        let rhs = expr_stmt(ast, value);
        ast.add(
            Node::new(NodeKind::Assignment).with_attr("Operator", "Equals"),
            vec![target, rhs],
        )
    }

    pub fn command(ast: &mut Ast, elements: Vec<NodeId>) -> NodeId {
        let elements = ast.add(Node::new(NodeKind::CommandElements), elements);
        ast.add(
            Node::new(NodeKind::Command).with_attr("InvocationOperator", "Unknown"),
            vec![elements],
        )
    }

    pub fn block(ast: &mut Ast, statements: Vec<NodeId>) -> NodeId {
        let list = ast.add(Node::new(NodeKind::Statements), statements);
        ast.add(Node::new(NodeKind::StatementBlock), vec![list])
    }

    pub fn push(ast: &mut Ast, statements: NodeId, stmt: NodeId) {
        ast.push_child(statements, stmt);
    }
}
