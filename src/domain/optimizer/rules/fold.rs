// Constant folding of operators over literal operands.

use tracing::debug;

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::{EditBatch, ParentIndex};
use crate::domain::escape::StringQuoting;
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};
use crate::domain::value::{alloc_value, bool_node, literal_value, parse_int, string_node, ConstValue};

use super::{operator, token};

/// Characters that make a `-replace`/`-split` pattern more than a literal.
const REGEX_META: &[char] = &[
    '\\', '^', '$', '.', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}',
];

/// Longest string `"ab" * n` is allowed to produce.
const MAX_REPEAT_LEN: usize = 4096;

/// `-join $x` becomes `$x -join ''`.
pub struct UnaryJoin;

impl Rule for UnaryJoin {
    fn name(&self) -> &'static str {
        "unary_join"
    }

    fn description(&self) -> &'static str {
        "Rewrite unary -join as a binary join with an empty separator"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let joins: Vec<NodeId> = ast
            .iter()
            .filter(|id| {
                ast.is(*id, NodeKind::UnaryExpression)
                    && token(ast, *id) == Some(Operator::Join)
                    && ast.children(*id).len() == 1
            })
            .collect();

        for id in &joins {
            debug!("Replace unary join by binary join");
            let empty = ast.alloc(string_node("", StringQuoting::SingleQuoted));
            let node = ast.node_mut(*id);
            node.kind = NodeKind::BinaryExpression;
            node.attributes.remove("TokenKind");
            node.set_attr("Operator", <&str>::from(Operator::Join));
            node.set_attr("StaticType", "System.Object");
            ast.push_child(*id, empty);
        }
        !joins.is_empty()
    }
}

enum Folded {
    Value(ConstValue, StringQuoting),
    Bool(bool),
}

/// Evaluates binary operators whose operands are both literals.
pub struct FoldBinary;

impl Rule for FoldBinary {
    fn name(&self) -> &'static str {
        "fold_binary"
    }

    fn description(&self) -> &'static str {
        "Evaluate arithmetic, string and comparison operators over literals"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut folds = Vec::new();
        for id in ast.iter() {
            if !ast.is(id, NodeKind::BinaryExpression) {
                continue;
            }
            let (Some(op), Some(left), Some(right)) = (operator(ast, id), ast.child(id, 0), ast.child(id, 1))
            else {
                continue;
            };
            let (Some(left), Some(right)) = (literal_value(ast, left), literal_value(ast, right)) else {
                continue;
            };
            if let Some(folded) = fold(op, &left, &right) {
                debug!("Fold binary operator {}", op);
                folds.push((id, folded));
            }
        }
        if folds.is_empty() {
            return false;
        }

        let mut batch = EditBatch::default();
        for (id, folded) in folds {
            let node = match folded {
                Folded::Value(value, quoting) => alloc_value(ast, &value, quoting),
                Folded::Bool(value) => ast.alloc(bool_node(value)),
            };
            batch.replace(id, node, None);
        }
        let index = ParentIndex::build(ast);
        batch.apply(ast, index) > 0
    }
}

fn fold(op: Operator, left: &ConstValue, right: &ConstValue) -> Option<Folded> {
    use ConstValue::{Int, List, Str};

    if op.is_comparison() {
        return op.compare(left, right).map(Folded::Bool);
    }

    let single = |value: ConstValue| Some(Folded::Value(value, StringQuoting::SingleQuoted));
    match (op, left, right) {
        (Operator::Plus, Str(a), b) => {
            Some(Folded::Value(Str(format!("{}{}", a, b)), StringQuoting::DoubleQuoted))
        }
        (Operator::Plus, Int(a), Int(b)) => single(Int(a.checked_add(*b)?)),
        (Operator::Plus, Int(a), Str(b)) => single(Int(a.checked_add(parse_int(b)?)?)),
        (Operator::Plus, List(a), List(b)) => single(List(a.iter().chain(b).cloned().collect())),
        (Operator::Plus, List(a), b) => {
            let mut items = a.clone();
            items.push(b.clone());
            single(List(items))
        }
        (Operator::Multiply, Str(a), b) => {
            let n = usize::try_from(b.to_int()?).ok()?;
            if a.len().checked_mul(n)? > MAX_REPEAT_LEN {
                return None;
            }
            single(Str(a.repeat(n)))
        }
        (Operator::Minus | Operator::Multiply | Operator::Bxor | Operator::Band | Operator::Bor, Int(a), b) => {
            single(Int(op.eval_int(*a, b.to_int()?)?))
        }
        (Operator::Format, Str(pattern), args) => {
            let args = match args {
                List(items) => items.clone(),
                scalar => vec![scalar.clone()],
            };
            single(Str(format_string(pattern, &args)?))
        }
        (Operator::Ireplace | Operator::Creplace, Str(subject), args) => {
            let (pattern, replacement) = match args {
                Str(p) => (p.clone(), String::new()),
                List(items) => match items.as_slice() {
                    [p] => (p.to_string(), String::new()),
                    [p, r] => (p.to_string(), r.to_string()),
                    _ => return None,
                },
                Int(_) => return None,
            };
            let replaced = literal_replace(
                subject,
                &pattern,
                &replacement,
                op == Operator::Creplace,
            )?;
            single(Str(replaced))
        }
        (Operator::Isplit | Operator::Csplit, Str(subject), Str(pattern)) => {
            if pattern.is_empty()
                || pattern.contains(REGEX_META)
                || (op == Operator::Isplit && pattern.chars().any(char::is_alphabetic))
            {
                return None;
            }
            single(List(subject.split(pattern.as_str()).map(|s| Str(s.to_string())).collect()))
        }
        (Operator::Join, items, Str(separator)) => {
            let joined = match items {
                List(items) => items
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(separator),
                scalar => scalar.to_string(),
            };
            single(Str(joined))
        }
        _ => None,
    }
}

/// .NET composite formatting with `{index[,alignment]}` items. Format
/// specifiers and out-of-range indexes are not folded.
pub(crate) fn format_string(pattern: &str, args: &[ConstValue]) -> Option<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut item = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        ':' => return None,
                        other => item.push(other),
                    }
                }
                let (index, align) = match item.split_once(',') {
                    Some((index, align)) => (index, Some(align.trim().parse::<i64>().ok()?)),
                    None => (item.as_str(), None),
                };
                let value = args.get(index.trim().parse::<usize>().ok()?)?.to_string();
                match align {
                    Some(width) if width < 0 => {
                        out.push_str(&format!("{:<w$}", value, w = width.unsigned_abs() as usize))
                    }
                    Some(width) => out.push_str(&format!("{:>w$}", value, w = width as usize)),
                    None => out.push_str(&value),
                }
            }
            '}' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

/// `-replace` with a pattern that holds no regex syntax, so it matches
/// literally. ASCII letters match case-insensitively unless `case_sensitive`.
fn literal_replace(
    subject: &str,
    pattern: &str,
    replacement: &str,
    case_sensitive: bool,
) -> Option<String> {
    if pattern.is_empty() || pattern.contains(REGEX_META) || replacement.contains('$') {
        return None;
    }
    if case_sensitive {
        return Some(subject.replace(pattern, replacement));
    }

    let haystack = subject.to_ascii_lowercase();
    let needle = pattern.to_ascii_lowercase();
    let mut out = String::with_capacity(subject.len());
    let mut last = 0;
    for (start, _) in haystack.match_indices(&needle) {
        out.push_str(&subject[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
    }
    out.push_str(&subject[last..]);
    Some(out)
}
