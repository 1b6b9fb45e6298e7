// Dead variable code: writes nobody reads, and reads nobody wrote.

use tracing::debug;

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::ParentIndex;
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::domain::optimizer::{Rule, RuleContext};
use crate::domain::value::{int_node, scalar_value};

use super::{
    assigned_vars, has_dynamic_variables, is_ambient, is_splatted, operator, parameter_vars, token,
    used_vars, variable_path,
};

/// Deletes `$x = <expr>` statements when `$x` is never read.
pub struct RemoveUnusedVariable;

impl Rule for RemoveUnusedVariable {
    fn name(&self) -> &'static str {
        "remove_unused_variable"
    }

    fn description(&self) -> &'static str {
        "Delete assignments to variables that are never read"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        if has_dynamic_variables(ast) {
            return false;
        }
        let used = used_vars(ast);
        let index = ParentIndex::build(ast);

        let found = ast.iter().find(|id| {
            if !ast.is(*id, NodeKind::Assignment) || operator(ast, *id) != Some(Operator::Equals) {
                return false;
            }
            let in_statements = index
                .parent(*id)
                .map(|p| ast.is(p, NodeKind::Statements))
                .unwrap_or(false);
            let Some(path) = ast.child(*id, 0).and_then(|t| variable_path(ast, t)) else {
                return false;
            };
            in_statements
                && !is_ambient(path)
                && !used.contains_key(&path.to_lowercase())
                && ast.child(*id, 1).map(|rhs| is_pure(ast, rhs)).unwrap_or(false)
        });

        match found {
            Some(id) => {
                debug!(
                    "Remove assignment of unused variable {}",
                    ast.child(id, 0).and_then(|t| variable_path(ast, t)).unwrap_or_default()
                );
                index.delete(ast, id, None)
            }
            None => false,
        }
    }
}

/// Whether evaluating `id` cannot run code or write state.
fn is_pure(ast: &Ast, id: NodeId) -> bool {
    ast.descendants(id).all(|n| match ast.kind(n) {
        NodeKind::Command
        | NodeKind::InvokeMember
        | NodeKind::Assignment
        | NodeKind::SubExpression
        | NodeKind::ArrayExpression
        | NodeKind::ExpandableString
        | NodeKind::Unsupported => false,
        NodeKind::UnaryExpression => !token(ast, n).map(Operator::is_increment).unwrap_or(false),
        _ => true,
    })
}

/// Replaces arithmetic on a variable that is never assigned, which holds
/// `$null`: `$y + e` and `e + $y` become `e`, `e - $y` becomes `e`,
/// `$y - n` becomes `-n` and `$y * n` or `n * $y` become `0`.
pub struct RemoveUnassignedUse;

impl Rule for RemoveUnassignedUse {
    fn name(&self) -> &'static str {
        "remove_unassigned_use"
    }

    fn description(&self) -> &'static str {
        "Simplify arithmetic involving never-assigned variables"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        if has_dynamic_variables(ast) {
            return false;
        }
        let mut known = assigned_vars(ast, ast.root());
        known.extend(parameter_vars(ast));

        let unassigned = |id: NodeId| -> bool {
            match variable_path(ast, id) {
                Some(path) => {
                    !is_splatted(ast, id)
                        && !is_ambient(path)
                        && !known.contains(&path.to_lowercase())
                }
                None => false,
            }
        };

        let mut found: Option<(NodeId, Replacement)> = None;
        for id in ast.iter() {
            if !ast.is(id, NodeKind::BinaryExpression) {
                continue;
            }
            let (Some(left), Some(right)) = (ast.child(id, 0), ast.child(id, 1)) else {
                continue;
            };
            let int_of = |n: NodeId| scalar_value(ast, n).and_then(|v| v.as_int());
            let replacement = match (operator(ast, id), unassigned(left), unassigned(right)) {
                (Some(Operator::Plus), true, _) => Some(Replacement::Keep(right)),
                (Some(Operator::Plus), false, true) => Some(Replacement::Keep(left)),
                (Some(Operator::Minus), _, true) => Some(Replacement::Keep(left)),
                (Some(Operator::Minus), true, false) => {
                    int_of(right).and_then(|n| n.checked_neg()).map(Replacement::Int)
                }
                (Some(Operator::Multiply), true, false) => int_of(right).map(|_| Replacement::Int(0)),
                (Some(Operator::Multiply), false, true) => int_of(left).map(|_| Replacement::Int(0)),
                _ => None,
            };
            if let Some(replacement) = replacement {
                found = Some((id, replacement));
                break;
            }
        }

        let Some((id, replacement)) = found else {
            return false;
        };
        debug!("Remove unassigned variable use in {:?}", operator(ast, id));
        let index = ParentIndex::build(ast);
        let with = match replacement {
            Replacement::Keep(other) => other,
            Replacement::Int(value) => ast.alloc(int_node(value)),
        };
        index.replace(ast, id, with, None)
    }
}

enum Replacement {
    Keep(NodeId),
    Int(i64),
}
