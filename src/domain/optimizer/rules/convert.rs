// Casts of literals to well-known types.

use tracing::debug;

use crate::domain::ast::{Ast, Node, NodeId};
use crate::domain::edit::{EditBatch, ParentIndex};
use crate::domain::escape::StringQuoting;
use crate::domain::kind::NodeKind;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};
use crate::domain::tables;
use crate::domain::value::{alloc_value, literal_value, parse_int, ConstValue};

use super::{convert_parts, variable_path};

enum Converted {
    Value(ConstValue, StringQuoting),
    Type(String),
}

/// Folds `[type]`, `[string]`, `[char]`, `[char[]]`, `[array]` and integer
/// casts of literal operands.
pub struct FoldConversions;

impl Rule for FoldConversions {
    fn name(&self) -> &'static str {
        "fold_conversions"
    }

    fn description(&self) -> &'static str {
        "Evaluate casts of literal values"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let conversions: Vec<(NodeId, Converted)> = ast
            .iter()
            .filter_map(|id| {
                let (type_name, operand) = convert_parts(ast, id)?;
                convert(ast, &type_name, operand).map(|c| {
                    debug!("Fold conversion to [{}]", type_name);
                    (id, c)
                })
            })
            .collect();
        if conversions.is_empty() {
            return false;
        }

        let mut batch = EditBatch::default();
        for (id, converted) in conversions {
            let node = match converted {
                Converted::Value(value, quoting) => alloc_value(ast, &value, quoting),
                Converted::Type(name) => {
                    ast.alloc(Node::new(NodeKind::TypeExpression).with_attr("TypeName", name))
                }
            };
            batch.replace(id, node, None);
        }
        let index = ParentIndex::build(ast);
        batch.apply(ast, index) > 0
    }
}

fn convert(ast: &Ast, type_name: &str, operand: NodeId) -> Option<Converted> {
    use ConstValue::{Int, List, Str};

    if type_name == "string" {
        if let Some(value) = variable_path(ast, operand).and_then(tables::special_var_value) {
            return Some(Converted::Value(Str(value.to_string()), StringQuoting::DoubleQuoted));
        }
    }

    let value = literal_value(ast, operand)?;
    let single = |v: ConstValue| Some(Converted::Value(v, StringQuoting::SingleQuoted));
    match (type_name, value) {
        ("type", Str(name)) if !name.is_empty() => Some(Converted::Type(name)),
        ("string", value) => Some(Converted::Value(
            Str(value.to_string()),
            StringQuoting::DoubleQuoted,
        )),
        ("char", Int(code)) => {
            let c = char::from_u32(u32::try_from(code).ok()?)?;
            single(Str(c.to_string()))
        }
        ("char", Str(s)) if s.chars().count() == 1 => single(Str(s)),
        ("char[]", Str(s)) => single(List(s.chars().map(|c| Str(c.to_string())).collect())),
        ("array", Str(s)) => single(Str(s)),
        (numeric, value) => {
            let n = match value {
                Int(n) => n,
                Str(s) => parse_int(&s)?,
                List(_) => return None,
            };
            let in_range = match numeric {
                "byte" => u8::try_from(n).is_ok(),
                "int" | "int32" => i32::try_from(n).is_ok(),
                "long" | "int64" => true,
                _ => return None,
            };
            in_range.then_some(Converted::Value(Int(n), StringQuoting::SingleQuoted))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimizer::rules::testing::*;
    use crate::domain::optimizer::OptimizerSettings;

    fn cast(ast: &mut Ast, type_name: &str, operand: NodeId) -> NodeId {
        let constraint = ast.alloc(Node::new(NodeKind::TypeConstraint).with_attr("TypeName", type_name));
        ast.add(Node::new(NodeKind::Convert), vec![constraint, operand])
    }

    fn run(build: impl FnOnce(&mut Ast) -> NodeId) -> (Ast, NodeId) {
        let (mut ast, statements) = script();
        let expr = build(&mut ast);
        let stmt = expr_stmt(&mut ast, expr);
        push(&mut ast, statements, stmt);
        let settings = OptimizerSettings::default();
        FoldConversions.apply(&mut ast, &RuleContext::new(&settings));
        let result = ast.children(stmt)[0];
        (ast, result)
    }

    #[test]
    fn test_char_of_int() {
        let (ast, result) = run(|ast| {
            let code = int(ast, 65);
            cast(ast, "char", code)
        });
        assert_eq!(literal_value(&ast, result), Some(ConstValue::Str("A".into())));
    }

    #[test]
    fn test_type_literal() {
        let (ast, result) = run(|ast| {
            let name = s(ast, "System.Text.Encoding");
            cast(ast, "Type", name)
        });
        assert_eq!(ast.kind(result), NodeKind::TypeExpression);
        assert_eq!(ast.attr(result, "TypeName"), Some("System.Text.Encoding"));
    }

    #[test]
    fn test_string_of_special_variable() {
        let (ast, result) = run(|ast| {
            let shell = var(ast, "ShellId");
            cast(ast, "System.String", shell)
        });
        assert_eq!(
            literal_value(&ast, result),
            Some(ConstValue::Str("Microsoft.PowerShell".into()))
        );
    }

    #[test]
    fn test_byte_range() {
        let (ast, result) = run(|ast| {
            let big = s(ast, "300");
            cast(ast, "byte", big)
        });
        assert_eq!(ast.kind(result), NodeKind::Convert);

        let (ast, result) = run(|ast| {
            let hex = s(ast, "0x41");
            cast(ast, "int", hex)
        });
        assert_eq!(literal_value(&ast, result), Some(ConstValue::Int(65)));
    }
}
