//! Control flow decided by literal conditions.
//!
//! `if`/`elseif` arms with a constant guard are dropped or promoted,
//! `switch` on a literal keeps only the matching clause bodies, loops whose
//! condition is constant false disappear (a `for` keeps its initializer),
//! and loops whose body always ends in an unconditional `break` run at most
//! once and become an `if`.

use tracing::debug;

use crate::domain::ast::{Ast, Node, NodeId};
use crate::domain::edit::ParentIndex;
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::domain::optimizer::{Rule, RuleContext};
use crate::domain::value::{bool_value, scalar_value};

use super::{block_statements, operator, token, unwrap_statement, variable_path};

pub struct DeadBranches;

enum Outcome {
    /// Replace the construct by these statements.
    Splice(Vec<NodeId>),
    /// Keep the construct with these children.
    Retain(Vec<NodeId>),
    /// Replace the construct by `prefix` then `if (cond) { body }`, or by
    /// `prefix` then `body` when there is no condition.
    SinglePass {
        prefix: Vec<NodeId>,
        cond: Option<NodeId>,
        body: Vec<NodeId>,
    },
}

impl Rule for DeadBranches {
    fn name(&self) -> &'static str {
        "dead_branches"
    }

    fn description(&self) -> &'static str {
        "Remove branches and loops whose guard is a compile-time constant"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let index = ParentIndex::build(ast);
        let found = ast.iter().find_map(|id| {
            let outcome = match ast.kind(id) {
                NodeKind::If => fold_if(ast, id),
                NodeKind::Switch => fold_switch(ast, id),
                NodeKind::While => fold_while(ast, id),
                NodeKind::DoWhile => fold_do(ast, id, false),
                NodeKind::DoUntil => fold_do(ast, id, true),
                NodeKind::For => fold_for(ast, id),
                _ => None,
            }?;
            let in_statements = index
                .parent(id)
                .map(|p| ast.is(p, NodeKind::Statements))
                .unwrap_or(false);
            match outcome {
                Outcome::Retain(_) => Some((id, outcome)),
                _ if in_statements => Some((id, outcome)),
                _ => None,
            }
        });

        let Some((id, outcome)) = found else {
            return false;
        };
        debug!("Remove dead code in {}", ast.kind(id));

        match outcome {
            Outcome::Retain(children) => {
                ast.set_children(id, children);
                true
            }
            Outcome::Splice(statements) => index.replace(ast, id, statements, None),
            Outcome::SinglePass { prefix, cond, body } => {
                let mut replacement = prefix;
                match cond {
                    Some(cond) => {
                        let list = ast.add(Node::new(NodeKind::Statements), body);
                        let block = ast.add(Node::new(NodeKind::StatementBlock), vec![list]);
                        replacement.push(ast.add(Node::new(NodeKind::If), vec![cond, block]));
                    }
                    None => replacement.extend(body),
                }
                index.replace(ast, id, replacement, None)
            }
        }
    }
}

/// Truth value of a condition built from literals.
fn static_truth(ast: &Ast, cond: NodeId) -> Option<bool> {
    let expr = unwrap_statement(ast, cond);
    if let Some(value) = bool_value(ast, expr) {
        return Some(value);
    }
    match ast.kind(expr) {
        NodeKind::BinaryExpression => {
            let op = operator(ast, expr).filter(|op| op.is_comparison())?;
            let left = scalar_value(ast, unwrap_statement(ast, ast.child(expr, 0)?))?;
            let right = scalar_value(ast, unwrap_statement(ast, ast.child(expr, 1)?))?;
            op.compare(&left, &right)
        }
        NodeKind::UnaryExpression => match token(ast, expr)? {
            Operator::Not | Operator::Exclaim => static_truth(ast, ast.child(expr, 0)?).map(|b| !b),
            _ => None,
        },
        _ => scalar_value(ast, expr).map(|v| v.truthy()),
    }
}

fn fold_if(ast: &Ast, id: NodeId) -> Option<Outcome> {
    let children = ast.children(id);
    let pairs: Vec<(NodeId, NodeId)> = children.chunks_exact(2).map(|c| (c[0], c[1])).collect();
    let mut else_block = children.chunks_exact(2).remainder().first().copied();

    let mut kept: Vec<(NodeId, NodeId)> = Vec::new();
    let mut changed = false;
    for (cond, body) in pairs {
        match static_truth(ast, cond) {
            Some(false) => changed = true,
            Some(true) => {
                if kept.is_empty() {
                    return Some(Outcome::Splice(block_statements(ast, body)));
                }
                changed = true;
                else_block = Some(body);
                break;
            }
            None => kept.push((cond, body)),
        }
    }

    if !changed {
        return None;
    }
    if kept.is_empty() {
        let statements = else_block
            .map(|b| block_statements(ast, b))
            .unwrap_or_default();
        return Some(Outcome::Splice(statements));
    }
    let mut retained: Vec<NodeId> = kept.into_iter().flat_map(|(c, b)| [c, b]).collect();
    retained.extend(else_block);
    Some(Outcome::Retain(retained))
}

fn fold_switch(ast: &Ast, id: NodeId) -> Option<Outcome> {
    let flags = ast.attr(id, "Flags").unwrap_or("None");
    if !flags.eq_ignore_ascii_case("none") {
        return None;
    }
    let cond = scalar_value(ast, unwrap_statement(ast, ast.child(id, 0)?))?;
    let clauses = ast.find_child(id, NodeKind::Clauses)?;
    let default = ast
        .children(id)
        .iter()
        .copied()
        .find(|c| ast.is(*c, NodeKind::StatementBlock));

    let bodies: Vec<NodeId> = ast
        .children(clauses)
        .iter()
        .filter_map(|c| ast.child(*c, 1))
        .chain(default)
        .collect();
    for body in &bodies {
        if loop_exits(ast, *body)? > 0 || reads_current_item(ast, *body) {
            return None;
        }
    }

    let mut statements = Vec::new();
    let mut matched = false;
    for clause in ast.children(clauses) {
        let test = scalar_value(ast, unwrap_statement(ast, ast.child(*clause, 0)?))?;
        if Operator::Ieq.compare(&cond, &test)? {
            matched = true;
            statements.extend(block_statements(ast, ast.child(*clause, 1)?));
        }
    }
    if !matched {
        if let Some(default) = default {
            statements = block_statements(ast, default);
        }
    }
    Some(Outcome::Splice(statements))
}

fn fold_while(ast: &Ast, id: NodeId) -> Option<Outcome> {
    let (cond, body) = (ast.child(id, 0)?, ast.child(id, 1)?);
    if static_truth(ast, cond) == Some(false) {
        return Some(Outcome::Splice(Vec::new()));
    }
    let body = single_pass_body(ast, body)?;
    Some(Outcome::SinglePass {
        prefix: Vec::new(),
        cond: Some(cond),
        body,
    })
}

/// `do {} while (c)` when `until` is false, `do {} until (c)` otherwise.
fn fold_do(ast: &Ast, id: NodeId, until: bool) -> Option<Outcome> {
    let (cond, body) = (ast.child(id, 0)?, ast.child(id, 1)?);
    if static_truth(ast, cond) == Some(until) && loop_exits(ast, body)? == 0 {
        return Some(Outcome::Splice(block_statements(ast, body)));
    }
    single_pass_body(ast, body).map(Outcome::Splice)
}

fn fold_for(ast: &Ast, id: NodeId) -> Option<Outcome> {
    let children = ast.children(id);
    let [init, cond, _iter, body] = children else {
        return None;
    };
    let prefix = ast.children(*init).to_vec();
    let cond = ast.child(*cond, 0);
    if let Some(c) = cond {
        if static_truth(ast, c) == Some(false) {
            return Some(Outcome::Splice(prefix));
        }
    }
    let body = single_pass_body(ast, *body)?;
    Some(Outcome::SinglePass { prefix, cond, body })
}

/// Statements before the final `break` of a loop body whose only exit is
/// that `break`.
fn single_pass_body(ast: &Ast, body: NodeId) -> Option<Vec<NodeId>> {
    let mut statements = block_statements(ast, body);
    let last = *statements.last()?;
    if !ast.is(last, NodeKind::Break) || has_label(ast, last) || loop_exits(ast, body)? != 1 {
        return None;
    }
    statements.pop();
    Some(statements)
}

fn has_label(ast: &Ast, id: NodeId) -> bool {
    ast.attr(id, "Label").map(|l| !l.is_empty()).unwrap_or(false) || !ast.children(id).is_empty()
}

/// Number of `break`/`continue` statements leaving the loop that owns
/// `body`. `None` when an exit cannot be attributed: a labelled one, or
/// one inside a script block.
fn loop_exits(ast: &Ast, body: NodeId) -> Option<usize> {
    let mut count = 0;
    for child in ast.children(body) {
        match ast.kind(*child) {
            NodeKind::Break | NodeKind::Continue => {
                if has_label(ast, *child) {
                    return None;
                }
                count += 1;
            }
            kind if kind.is_loop() || kind == NodeKind::Switch => {
                let labelled = ast.descendants(*child).any(|n| {
                    matches!(ast.kind(n), NodeKind::Break | NodeKind::Continue) && has_label(ast, n)
                });
                if labelled {
                    return None;
                }
            }
            NodeKind::FunctionDefinition => {}
            NodeKind::ScriptBlockExpression => {
                if ast
                    .descendants(*child)
                    .any(|n| matches!(ast.kind(n), NodeKind::Break | NodeKind::Continue))
                {
                    return None;
                }
            }
            _ => count += loop_exits(ast, *child)?,
        }
    }
    Some(count)
}

/// Whether `$_`/`$PSItem` appear below `id`.
fn reads_current_item(ast: &Ast, id: NodeId) -> bool {
    ast.descendants(id).any(|n| {
        variable_path(ast, n)
            .map(|p| p == "_" || p.eq_ignore_ascii_case("psitem"))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimizer::rules::testing::*;
    use crate::domain::optimizer::OptimizerSettings;

    fn cmp(ast: &mut Ast, op: &str, a: i64, b: i64) -> NodeId {
        let a = int(ast, a);
        let b = int(ast, b);
        let bin = binary(ast, op, a, b);
        expr_stmt(ast, bin)
    }

    fn say(ast: &mut Ast, text: &str) -> NodeId {
        let name = bare(ast, "Write-Host");
        let arg = s(ast, text);
        command(ast, vec![name, arg])
    }

    #[test]
    fn test_false_while_is_removed() {
        let (mut ast, statements) = script();
        let cond = cmp(&mut ast, "Igt", 5, 10);
        let body_stmt = say(&mut ast, "loop");
        let body = block(&mut ast, vec![body_stmt]);
        let w = ast.add(Node::new(NodeKind::While), vec![cond, body]);
        push(&mut ast, statements, w);

        let settings = OptimizerSettings::default();
        assert!(DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
        assert!(ast.children(statements).is_empty());
    }

    #[test]
    fn test_true_if_is_spliced() {
        let (mut ast, statements) = script();
        let cond = cmp(&mut ast, "Ilt", 1, 2);
        let a = say(&mut ast, "a");
        let b = say(&mut ast, "b");
        let then = block(&mut ast, vec![a, b]);
        let other = say(&mut ast, "c");
        let otherwise = block(&mut ast, vec![other]);
        let stmt = ast.add(Node::new(NodeKind::If), vec![cond, then, otherwise]);
        push(&mut ast, statements, stmt);

        let settings = OptimizerSettings::default();
        assert!(DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
        assert_eq!(ast.children(statements), &[a, b]);
    }

    #[test]
    fn test_false_elseif_arm_is_dropped() {
        let (mut ast, statements) = script();
        let x = var(&mut ast, "x");
        let dynamic = expr_stmt(&mut ast, x);
        let a = say(&mut ast, "a");
        let then = block(&mut ast, vec![a]);
        let never = cmp(&mut ast, "Ieq", 1, 2);
        let b = say(&mut ast, "b");
        let dead = block(&mut ast, vec![b]);
        let stmt = ast.add(Node::new(NodeKind::If), vec![dynamic, then, never, dead]);
        push(&mut ast, statements, stmt);

        let settings = OptimizerSettings::default();
        assert!(DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
        assert_eq!(ast.children(stmt), &[dynamic, then]);
        assert!(!DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
    }

    #[test]
    fn test_single_pass_while_becomes_if() {
        let (mut ast, statements) = script();
        let x = var(&mut ast, "x");
        let cond = expr_stmt(&mut ast, x);
        let a = say(&mut ast, "a");
        let brk = ast.alloc(Node::new(NodeKind::Break));
        let body = block(&mut ast, vec![a, brk]);
        let w = ast.add(Node::new(NodeKind::While), vec![cond, body]);
        push(&mut ast, statements, w);

        let settings = OptimizerSettings::default();
        assert!(DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
        let stmt = ast.children(statements)[0];
        assert_eq!(ast.kind(stmt), NodeKind::If);
        assert_eq!(ast.child(stmt, 0), Some(cond));
        let then = ast.child(stmt, 1).unwrap();
        assert_eq!(block_statements(&ast, then), vec![a]);
    }

    #[test]
    fn test_switch_on_literal() {
        let (mut ast, statements) = script();
        let subject = s(&mut ast, "b");
        let subject = expr_stmt(&mut ast, subject);
        let mut clauses = Vec::new();
        let mut bodies = Vec::new();
        for label in ["a", "B"] {
            let test = s(&mut ast, label);
            let body_stmt = say(&mut ast, label);
            bodies.push(body_stmt);
            let body = block(&mut ast, vec![body_stmt]);
            clauses.push(ast.add(Node::new(NodeKind::SwitchClause), vec![test, body]));
        }
        let clauses = ast.add(Node::new(NodeKind::Clauses), clauses);
        let sw = ast.add(
            Node::new(NodeKind::Switch).with_attr("Flags", "None"),
            vec![subject, clauses],
        );
        push(&mut ast, statements, sw);

        let settings = OptimizerSettings::default();
        assert!(DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
        assert_eq!(ast.children(statements), &[bodies[1]]);
    }

    #[test]
    fn test_false_for_keeps_initializer() {
        let (mut ast, statements) = script();
        let zero = int(&mut ast, 0);
        let init_stmt = assign(&mut ast, "i", zero);
        let init = ast.add(Node::new(NodeKind::Initializer), vec![init_stmt]);
        let c = cmp(&mut ast, "Igt", 0, 1);
        let cond = ast.add(Node::new(NodeKind::Condition), vec![c]);
        let iter = ast.alloc(Node::new(NodeKind::Iterator));
        let body_stmt = say(&mut ast, "x");
        let body = block(&mut ast, vec![body_stmt]);
        let f = ast.add(Node::new(NodeKind::For), vec![init, cond, iter, body]);
        push(&mut ast, statements, f);

        let settings = OptimizerSettings::default();
        assert!(DeadBranches.apply(&mut ast, &RuleContext::new(&settings)));
        assert_eq!(ast.children(statements), &[init_stmt]);
    }
}
