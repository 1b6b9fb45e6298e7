// Method calls on literal receivers.

use tracing::debug;

use crate::domain::ast::{Ast, Node, NodeId};
use crate::domain::edit::{EditBatch, ParentIndex};
use crate::domain::escape::StringQuoting;
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};
use crate::domain::value::{alloc_value, array_values, literal_value, ConstValue};

use super::{
    assignment_counts, invoke_parts, is_ambient, is_splatted, is_static, member_name, operator,
    statement_of, unwrap_statement, variable_path,
};

/// Evaluates string methods, `[string]::Join` and `.Length` on literals.
pub struct FoldInvokeMember;

impl Rule for FoldInvokeMember {
    fn name(&self) -> &'static str {
        "fold_invoke_member"
    }

    fn description(&self) -> &'static str {
        "Evaluate member invocations whose receiver and arguments are literals"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut folds = Vec::new();
        for id in ast.iter() {
            let folded = match ast.kind(id) {
                NodeKind::InvokeMember => fold_invoke(ast, id),
                NodeKind::MemberExpression => fold_length(ast, id),
                _ => None,
            };
            if let Some(value) = folded {
                folds.push((id, value));
            }
        }
        if folds.is_empty() {
            return false;
        }

        let mut batch = EditBatch::default();
        for (id, value) in folds {
            let node = alloc_value(ast, &value, StringQuoting::SingleQuoted);
            batch.replace(id, node, None);
        }
        let index = ParentIndex::build(ast);
        batch.apply(ast, index) > 0
    }
}

fn fold_invoke(ast: &Ast, id: NodeId) -> Option<ConstValue> {
    let (args, target, member) = invoke_parts(ast, id)?;
    let method = member_name(ast, member)?;
    let args: Vec<ConstValue> = match args {
        Some(args) => ast
            .children(args)
            .iter()
            .map(|a| literal_value(ast, *a))
            .collect::<Option<_>>()?,
        None => Vec::new(),
    };

    if is_static(ast, id) {
        let type_name = ast
            .attr(target, "TypeName")
            .filter(|_| ast.is(target, NodeKind::TypeExpression))?
            .to_lowercase();
        let type_name = type_name.strip_prefix("system.").unwrap_or(&type_name);
        return match (type_name, method.as_str()) {
            ("string", "join") => static_join(&args),
            _ => None,
        };
    }

    let folded = match literal_value(ast, target)? {
        ConstValue::Str(s) => string_method(&s, &method, &args),
        ConstValue::Int(i) if method == "tostring" && args.is_empty() => {
            Some(ConstValue::Str(i.to_string()))
        }
        _ => None,
    };
    if folded.is_some() {
        debug!("Apply {} method on literal", method);
    }
    folded
}

fn static_join(args: &[ConstValue]) -> Option<ConstValue> {
    let (separator, items) = args.split_first()?;
    let separator = separator.as_str()?;
    let items: Vec<String> = match items {
        [ConstValue::List(list)] => list.iter().map(ToString::to_string).collect(),
        scalars => scalars
            .iter()
            .map(|v| v.is_scalar().then(|| v.to_string()))
            .collect::<Option<_>>()?,
    };
    Some(ConstValue::Str(items.join(separator)))
}

fn string_method(s: &str, method: &str, args: &[ConstValue]) -> Option<ConstValue> {
    use ConstValue::{List, Str};

    let strings = |items: Vec<&str>| List(items.into_iter().map(|p| Str(p.to_string())).collect());
    Some(match (method, args) {
        ("split", []) => strings(s.split(char::is_whitespace).collect()),
        ("split", separators) => {
            let chars: Vec<char> = separators
                .iter()
                .map(|v| v.as_str())
                .collect::<Option<Vec<_>>>()?
                .concat()
                .chars()
                .collect();
            if chars.is_empty() {
                return None;
            }
            strings(s.split(chars.as_slice()).collect())
        }
        ("replace", [Str(from), Str(to)]) if !from.is_empty() => Str(s.replace(from.as_str(), to)),
        ("tolower", []) | ("tolowerinvariant", []) => Str(s.to_lowercase()),
        ("toupper", []) | ("toupperinvariant", []) => Str(s.to_uppercase()),
        ("trim", []) => Str(s.trim().to_string()),
        ("trimstart", []) => Str(s.trim_start().to_string()),
        ("trimend", []) => Str(s.trim_end().to_string()),
        ("trim", [Str(chars)]) => {
            let chars: Vec<char> = chars.chars().collect();
            Str(s.trim_matches(chars.as_slice()).to_string())
        }
        ("tostring", []) => Str(s.to_string()),
        ("tochararray", []) => List(s.chars().map(|c| Str(c.to_string())).collect()),
        ("substring", [start]) => {
            let start = usize::try_from(start.to_int()?).ok()?;
            let chars: Vec<char> = s.chars().collect();
            if start > chars.len() {
                return None;
            }
            Str(chars[start..].iter().collect())
        }
        ("substring", [start, length]) => {
            let start = usize::try_from(start.to_int()?).ok()?;
            let length = usize::try_from(length.to_int()?).ok()?;
            let chars: Vec<char> = s.chars().collect();
            let end = start.checked_add(length)?;
            if end > chars.len() {
                return None;
            }
            Str(chars[start..end].iter().collect())
        }
        _ => return None,
    })
}

/// `'abc'.Length` and `@(1, 2).Count`.
fn fold_length(ast: &Ast, id: NodeId) -> Option<ConstValue> {
    if is_static(ast, id) {
        return None;
    }
    let (target, member) = (ast.child(id, 0)?, ast.child(id, 1)?);
    let property = member_name(ast, member)?;
    let count = match (literal_value(ast, target)?, property.as_str()) {
        (ConstValue::Str(s), "length") => s.chars().count(),
        (ConstValue::List(items), "length" | "count") => items.len(),
        _ => return None,
    };
    Some(ConstValue::Int(i64::try_from(count).ok()?))
}

/// `$a = 1, 2, 3; [array]::Reverse($a)` becomes `$a = 3, 2, 1`.
///
/// The variable must be written exactly once, by a plain assignment of a
/// literal array earlier in the same statement list, and not be read
/// between that assignment and the call.
pub struct ReverseConstArray;

impl Rule for ReverseConstArray {
    fn name(&self) -> &'static str {
        "reverse_const_array"
    }

    fn description(&self) -> &'static str {
        "Apply [array]::Reverse to a constant array at its assignment"
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let index = ParentIndex::build(ast);
        let counts = assignment_counts(ast, ast.root());
        let found = ast
            .iter()
            .find_map(|id| reversible(ast, &index, &counts, id));
        let Some((call_statement, elements)) = found else {
            return false;
        };

        debug!("Apply reverse method to constant array");
        let mut reversed = ast.children(elements).to_vec();
        reversed.reverse();
        let replacement = ast.add(Node::new(NodeKind::Elements), reversed);

        let mut batch = EditBatch::default();
        batch.replace(elements, replacement, None);
        batch.delete(call_statement, None);
        batch.apply(ast, index) == 2
    }
}

/// Statement holding the call, and the `Elements` of the array to reverse.
fn reversible(
    ast: &Ast,
    index: &ParentIndex,
    counts: &std::collections::HashMap<String, usize>,
    id: NodeId,
) -> Option<(NodeId, NodeId)> {
    let (args, target, member) = invoke_parts(ast, id)?;
    if !is_static(ast, id) || member_name(ast, member)? != "reverse" {
        return None;
    }
    let type_name = ast.attr(target, "TypeName")?.to_lowercase();
    if !ast.is(target, NodeKind::TypeExpression) || !matches!(type_name.as_str(), "array" | "system.array") {
        return None;
    }
    let variable = match ast.children(args?) {
        [v] if !is_splatted(ast, *v) => *v,
        _ => return None,
    };
    let name = variable_path(ast, variable)?.to_lowercase();
    if is_ambient(&name) || counts.get(&name) != Some(&1) {
        return None;
    }

    let statement = statement_of(ast, index, id)?;
    if unwrap_statement(ast, statement) != id {
        return None;
    }
    let list = index.parent(statement)?;
    let siblings = ast.children(list);
    let call_pos = siblings.iter().position(|s| *s == statement)?;

    let (assign_pos, elements) = siblings[..call_pos].iter().enumerate().find_map(|(pos, s)| {
        if !ast.is(*s, NodeKind::Assignment) || operator(ast, *s) != Some(Operator::Equals) {
            return None;
        }
        let lhs = variable_path(ast, ast.child(*s, 0)?)?;
        if !lhs.eq_ignore_ascii_case(&name) {
            return None;
        }
        let array = unwrap_statement(ast, ast.child(*s, 1)?);
        if !ast.is(array, NodeKind::ArrayLiteral) {
            return None;
        }
        array_values(ast, array)?;
        Some((pos, ast.find_child(array, NodeKind::Elements)?))
    })?;

    let read_between = siblings[assign_pos + 1..call_pos].iter().any(|s| {
        ast.descendants(*s).any(|n| {
            variable_path(ast, n)
                .map(|p| p.eq_ignore_ascii_case(&name))
                .unwrap_or(false)
        })
    });
    if read_between {
        return None;
    }
    Some((statement, elements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimizer::rules::testing::*;
    use crate::domain::optimizer::OptimizerSettings;

    fn invoke(ast: &mut Ast, target: NodeId, method: &str, args: Vec<NodeId>) -> NodeId {
        let member = bare(ast, method);
        let args = ast.add(Node::new(NodeKind::Arguments), args);
        ast.add(
            Node::new(NodeKind::InvokeMember).with_attr("Static", "False"),
            vec![args, target, member],
        )
    }

    fn folded(build: impl FnOnce(&mut Ast) -> NodeId) -> Option<ConstValue> {
        let (mut ast, statements) = script();
        let expr = build(&mut ast);
        let stmt = expr_stmt(&mut ast, expr);
        push(&mut ast, statements, stmt);
        let settings = OptimizerSettings::default();
        if !FoldInvokeMember.apply(&mut ast, &RuleContext::new(&settings)) {
            return None;
        }
        literal_value(&ast, ast.children(stmt)[0])
    }

    #[test]
    fn test_split_and_replace() {
        let split = folded(|ast| {
            let target = s(ast, "a,b;c");
            let sep = s(ast, ",;");
            invoke(ast, target, "Split", vec![sep])
        });
        assert_eq!(
            split,
            Some(ConstValue::List(vec![
                ConstValue::Str("a".into()),
                ConstValue::Str("b".into()),
                ConstValue::Str("c".into()),
            ]))
        );

        let replaced = folded(|ast| {
            let target = s(ast, "WXrXite");
            let from = s(ast, "X");
            let to = s(ast, "");
            invoke(ast, target, "replace", vec![from, to])
        });
        assert_eq!(replaced, Some(ConstValue::Str("Write".into())));
    }

    #[test]
    fn test_substring_bounds() {
        assert_eq!(
            string_method("hello", "substring", &[ConstValue::Int(1), ConstValue::Int(3)]),
            Some(ConstValue::Str("ell".into()))
        );
        assert_eq!(
            string_method("hello", "substring", &[ConstValue::Int(3), ConstValue::Int(5)]),
            None
        );
    }

    #[test]
    fn test_static_join() {
        let joined = folded(|ast| {
            let ty = ast.alloc(Node::new(NodeKind::TypeExpression).with_attr("TypeName", "String"));
            let member = bare(ast, "Join");
            let sep = s(ast, "");
            let a = s(ast, "i");
            let b = s(ast, "ex");
            let list = array(ast, vec![a, b]);
            let args = ast.add(Node::new(NodeKind::Arguments), vec![sep, list]);
            ast.add(
                Node::new(NodeKind::InvokeMember).with_attr("Static", "True"),
                vec![args, ty, member],
            )
        });
        assert_eq!(joined, Some(ConstValue::Str("iex".into())));
    }

    #[test]
    fn test_variable_receiver_is_kept() {
        assert_eq!(
            folded(|ast| {
                let target = var(ast, "x");
                invoke(ast, target, "ToLower", vec![])
            }),
            None
        );
    }

    #[test]
    fn test_reverse_const_array() {
        let (mut ast, statements) = script();
        let items: Vec<NodeId> = ["a", "b", "c"].iter().map(|t| s(&mut ast, t)).collect();
        let list = array(&mut ast, items.clone());
        let set = assign(&mut ast, "arr", list);
        push(&mut ast, statements, set);

        let ty = ast.alloc(Node::new(NodeKind::TypeExpression).with_attr("TypeName", "Array"));
        let arg = var(&mut ast, "arr");
        let member = bare(&mut ast, "Reverse");
        let args = ast.add(Node::new(NodeKind::Arguments), vec![arg]);
        let call = ast.add(
            Node::new(NodeKind::InvokeMember).with_attr("Static", "True"),
            vec![args, ty, member],
        );
        let call = expr_stmt(&mut ast, call);
        push(&mut ast, statements, call);

        let settings = OptimizerSettings::default();
        assert!(ReverseConstArray.apply(&mut ast, &RuleContext::new(&settings)));
        assert_eq!(ast.children(statements), &[set]);
        let elements = ast.find_child(list, NodeKind::Elements).unwrap();
        assert_eq!(ast.children(elements), &[items[2], items[1], items[0]]);
    }
}
