//! Constant propagation.
//!
//! A single walk in program order tracks, in a [`Scope`], the variables
//! whose current value is a literal, and replaces reads of those variables
//! by the literal. The walk is conservative:
//!
//! - a variable written by anything but `$x = <literal>` loses its value;
//! - variables written inside a loop are never substituted inside the loop,
//!   and lose their value after it;
//! - variables written inside an `if`/`switch`/`try` arm lose their value
//!   after the arm;
//! - bodies of functions and script blocks run at an unknown time: writes
//!   there freeze the variable for the whole script, and reads there are
//!   substituted only for variables assigned exactly once.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::{EditBatch, ParentIndex};
use crate::domain::escape::{escape, StringQuoting};
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};
use crate::domain::scope::Scope;
use crate::domain::value::{alloc_value, literal_value, ConstValue};

use super::{
    assigned_vars, assignment_counts, has_dynamic_variables, is_ambient, is_splatted, operator,
    parameter_vars, token, unwrap_statement, variable_path, written_variables,
};

pub struct PropagateConstants;

impl Rule for PropagateConstants {
    fn name(&self) -> &'static str {
        "propagate_constants"
    }

    fn description(&self) -> &'static str {
        "Replace reads of constant variables by their value"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        if has_dynamic_variables(ast) {
            return false;
        }
        let index = ParentIndex::build(ast);
        let substitutions = {
            let mut walker = Walker::new(ast, &index);
            walker.visit(ast.root());
            walker.substitutions
        };
        if substitutions.is_empty() {
            return false;
        }

        let mut batch = EditBatch::default();
        for (id, value, quoting) in substitutions {
            let node = alloc_value(ast, &value, quoting);
            batch.replace(id, node, None);
        }
        batch.apply(ast, index) > 0
    }
}

struct Walker<'a> {
    ast: &'a Ast,
    index: &'a ParentIndex,
    scope: Scope,
    /// Never given a value: parameters, foreach variables and variables
    /// written in deferred bodies.
    frozen: HashSet<String>,
    counts: HashMap<String, usize>,
    /// Variables written by each enclosing loop.
    loops: Vec<HashSet<String>>,
    /// Depth of function and script block bodies.
    deferred: usize,
    substitutions: Vec<(NodeId, ConstValue, StringQuoting)>,
}

impl<'a> Walker<'a> {
    fn new(ast: &'a Ast, index: &'a ParentIndex) -> Self {
        let mut frozen = parameter_vars(ast);
        for id in ast.iter() {
            match ast.kind(id) {
                NodeKind::FunctionDefinition | NodeKind::ScriptBlockExpression => {
                    frozen.extend(assigned_vars(ast, id));
                }
                NodeKind::ForEach => {
                    if let Some(path) = ast.child(id, 0).and_then(|v| variable_path(ast, v)) {
                        frozen.insert(path.to_lowercase());
                    }
                }
                _ => {}
            }
        }
        Self {
            ast,
            index,
            scope: Scope::new(),
            frozen,
            counts: assignment_counts(ast, ast.root()),
            loops: Vec::new(),
            deferred: 0,
            substitutions: Vec::new(),
        }
    }

    fn visit(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Assignment => self.visit_assignment(id),
            NodeKind::UnaryExpression if token(ast, id).map(Operator::is_increment).unwrap_or(false) => {
                if let Some(operand) = ast.child(id, 0) {
                    self.forget(written_variables(ast, operand));
                }
            }
            kind if kind.is_loop() => self.visit_loop(id),
            NodeKind::If | NodeKind::Switch | NodeKind::Try => self.visit_branches(id),
            NodeKind::FunctionDefinition | NodeKind::ScriptBlockExpression => {
                self.deferred += 1;
                self.visit_children(id);
                self.deferred -= 1;
            }
            NodeKind::ScriptBlock | NodeKind::StatementBlock => {
                self.scope.enter();
                self.visit_children(id);
                self.scope.leave();
            }
            NodeKind::Variable => self.substitute(id),
            _ => self.visit_children(id),
        }
    }

    fn visit_children(&mut self, id: NodeId) {
        let ast = self.ast;
        for child in ast.children(id) {
            self.visit(*child);
        }
    }

    fn forget(&mut self, variables: Vec<NodeId>) {
        for v in variables {
            if let Some(path) = variable_path(self.ast, v) {
                self.scope.delete(path);
            }
        }
    }

    fn forget_names(&mut self, names: &HashSet<String>) {
        for name in names {
            self.scope.delete(name);
        }
    }

    fn visit_assignment(&mut self, id: NodeId) {
        let ast = self.ast;
        let (Some(target), Some(value)) = (ast.child(id, 0), ast.child(id, 1)) else {
            return;
        };
        self.visit(value);

        let plain = operator(ast, id) == Some(Operator::Equals) && !is_splatted(ast, target);
        match variable_path(ast, target) {
            Some(path) if plain => {
                let name = path.to_lowercase();
                match literal_value(ast, unwrap_statement(ast, value)) {
                    Some(constant) if self.may_track(&name) => {
                        debug!("Track constant value of ${}", path);
                        self.scope.set(&name, constant);
                    }
                    _ => self.scope.delete(&name),
                }
            }
            _ => self.forget(written_variables(ast, target)),
        }
    }

    fn may_track(&self, name: &str) -> bool {
        self.deferred == 0
            && !is_ambient(name)
            && !self.frozen.contains(name)
            && !self.loops.iter().any(|l| l.contains(name))
    }

    fn visit_loop(&mut self, id: NodeId) {
        let ast = self.ast;
        let children = ast.children(id);
        // Parts evaluated once, before the first iteration.
        let (once, repeated): (Vec<NodeId>, Vec<NodeId>) = match ast.kind(id) {
            NodeKind::ForEach => (
                children.get(2).copied().into_iter().collect(),
                children.get(1).copied().into_iter().collect(),
            ),
            NodeKind::For => (
                children.first().copied().into_iter().collect(),
                children.iter().skip(1).copied().collect(),
            ),
            _ => (Vec::new(), children.to_vec()),
        };
        for part in once {
            self.visit(part);
        }

        let written = assigned_vars(ast, id);
        self.forget_names(&written);
        self.loops.push(written);
        for part in repeated {
            self.visit(part);
        }
        if let Some(written) = self.loops.pop() {
            self.forget_names(&written);
        }
    }

    fn visit_branches(&mut self, id: NodeId) {
        let ast = self.ast;
        for child in ast.children(id) {
            let arm = match ast.kind(*child) {
                NodeKind::StatementBlock => Some(*child),
                NodeKind::Clauses | NodeKind::CatchClauses => None,
                _ => {
                    self.visit(*child);
                    continue;
                }
            };
            match arm {
                Some(block) => self.visit_arm(block),
                None => {
                    for clause in ast.children(*child) {
                        for part in ast.children(*clause) {
                            if ast.is(*part, NodeKind::StatementBlock) {
                                self.visit_arm(*part);
                            } else {
                                self.visit(*part);
                            }
                        }
                    }
                }
            }
        }
    }

    fn visit_arm(&mut self, block: NodeId) {
        self.visit(block);
        let written = assigned_vars(self.ast, block);
        self.forget_names(&written);
    }

    fn substitute(&mut self, id: NodeId) {
        let ast = self.ast;
        let Some(path) = variable_path(ast, id) else {
            return;
        };
        let name = path.to_lowercase();
        if is_splatted(ast, id)
            || is_ambient(&name)
            || self.frozen.contains(&name)
            || self.loops.iter().any(|l| l.contains(&name))
        {
            return;
        }
        if self.deferred > 0 && self.counts.get(&name) != Some(&1) {
            return;
        }
        let Some(value) = self.scope.get(&name).cloned() else {
            return;
        };
        if !value.is_scalar() && self.may_mutate(id) {
            // `[array]::Reverse($a)`, `$a.Sort()`: arrays change in place.
            self.scope.delete(&name);
            return;
        }
        let Some(quoting) = self.context(id, &value) else {
            return;
        };
        debug!("Replace constant variable ${} by its value", path);
        self.substitutions.push((id, value, quoting));
    }

    /// Whether `id` is a method argument or a method receiver.
    fn may_mutate(&self, id: NodeId) -> bool {
        let Some(parent) = self.index.parent(id) else {
            return false;
        };
        match self.ast.kind(parent) {
            NodeKind::Arguments => true,
            NodeKind::InvokeMember => self.ast.children(parent).last() != Some(&id),
            _ => false,
        }
    }

    /// Quoting of the literal that may stand in place of `id`, or `None`
    /// when a literal is not allowed there.
    fn context(&self, id: NodeId, value: &ConstValue) -> Option<StringQuoting> {
        let ast = self.ast;
        let parent = self.index.parent(id)?;
        let quoted = Some(StringQuoting::DoubleQuoted);
        match ast.kind(parent) {
            NodeKind::UnaryExpression => match token(ast, parent) {
                Some(op) if op.is_increment() => None,
                _ => quoted,
            },
            NodeKind::BinaryExpression
            | NodeKind::Arguments
            | NodeKind::IndexExpression
            | NodeKind::Elements
            | NodeKind::Convert
            | NodeKind::CommandExpression => quoted,
            NodeKind::InvokeMember | NodeKind::MemberExpression => {
                if ast.children(parent).last() != Some(&id) {
                    return quoted;
                }
                let name = value.as_str()?;
                (!name.is_empty() && escape(name, StringQuoting::BareWord) == name)
                    .then_some(StringQuoting::BareWord)
            }
            NodeKind::CommandElements => {
                let position = ast.children(parent).iter().position(|c| *c == id)?;
                if position > 0 {
                    return quoted;
                }
                let command = self.index.parent(parent)?;
                let invocation = ast.attr(command, "InvocationOperator").unwrap_or("Unknown");
                matches!(invocation, "Ampersand" | "Dot").then_some(StringQuoting::DoubleQuoted)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::Node;
    use crate::domain::optimizer::rules::testing::*;
    use crate::domain::optimizer::OptimizerSettings;

    fn run(ast: &mut Ast) -> bool {
        let settings = OptimizerSettings::default();
        PropagateConstants.apply(ast, &RuleContext::new(&settings))
    }

    fn write_host(ast: &mut Ast, arg: NodeId) -> NodeId {
        let name = bare(ast, "Write-Host");
        command(ast, vec![name, arg])
    }

    #[test]
    fn test_substitutes_command_argument() {
        let (mut ast, statements) = script();
        let value = s(&mut ast, "abc");
        let set = assign(&mut ast, "x", value);
        push(&mut ast, statements, set);
        let x = var(&mut ast, "x");
        let cmd = write_host(&mut ast, x);
        push(&mut ast, statements, cmd);

        assert!(run(&mut ast));
        let elements = ast.child(cmd, 0).unwrap();
        let arg = ast.child(elements, 1).unwrap();
        assert_eq!(literal_value(&ast, arg), Some(ConstValue::Str("abc".into())));
        assert!(!run(&mut ast));
    }

    #[test]
    fn test_loop_variables_are_not_substituted() {
        let (mut ast, statements) = script();
        let zero = int(&mut ast, 0);
        let set = assign(&mut ast, "i", zero);
        push(&mut ast, statements, set);

        let i = var(&mut ast, "i");
        let three = int(&mut ast, 3);
        let cond = binary(&mut ast, "Ilt", i, three);
        let cond = expr_stmt(&mut ast, cond);
        let counter = var(&mut ast, "i");
        let incr = ast.add(
            Node::new(NodeKind::UnaryExpression).with_attr("TokenKind", "PostfixPlusPlus"),
            vec![counter],
        );
        let incr = expr_stmt(&mut ast, incr);
        let body = block(&mut ast, vec![incr]);
        let w = ast.add(Node::new(NodeKind::While), vec![cond, body]);
        push(&mut ast, statements, w);

        assert!(!run(&mut ast));
    }

    #[test]
    fn test_branch_writes_are_forgotten() {
        let (mut ast, statements) = script();
        let one = int(&mut ast, 1);
        let set = assign(&mut ast, "a", one);
        push(&mut ast, statements, set);

        let c = var(&mut ast, "c");
        let cond = expr_stmt(&mut ast, c);
        let two = int(&mut ast, 2);
        let reset = assign(&mut ast, "a", two);
        let then = block(&mut ast, vec![reset]);
        let stmt = ast.add(Node::new(NodeKind::If), vec![cond, then]);
        push(&mut ast, statements, stmt);

        let a = var(&mut ast, "a");
        let cmd = write_host(&mut ast, a);
        push(&mut ast, statements, cmd);

        assert!(!run(&mut ast));
        assert_eq!(ast.kind(a), NodeKind::Variable);
    }

    #[test]
    fn test_member_name_becomes_bareword() {
        let (mut ast, statements) = script();
        let method = s(&mut ast, "ToLower");
        let set = assign(&mut ast, "m", method);
        push(&mut ast, statements, set);

        let target = s(&mut ast, "X");
        let member = var(&mut ast, "m");
        let args = ast.alloc(Node::new(NodeKind::Arguments));
        let call = ast.add(Node::new(NodeKind::InvokeMember), vec![args, target, member]);
        let stmt = expr_stmt(&mut ast, call);
        push(&mut ast, statements, stmt);

        assert!(run(&mut ast));
        let member = ast.children(call)[2];
        assert_eq!(ast.attr(member, "StringConstantType"), Some("BareWord"));
        assert_eq!(ast.text(member), "ToLower");
    }

    #[test]
    fn test_assignment_target_is_kept() {
        let (mut ast, statements) = script();
        let one = s(&mut ast, "a");
        let first = assign(&mut ast, "x", one);
        push(&mut ast, statements, first);
        let two = s(&mut ast, "b");
        let second = assign(&mut ast, "x", two);
        push(&mut ast, statements, second);

        assert!(!run(&mut ast));
        let target = ast.child(second, 0).unwrap();
        assert_eq!(ast.kind(target), NodeKind::Variable);
    }
}
