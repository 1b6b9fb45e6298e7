use tracing::debug;

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::{EditBatch, ParentIndex};
use crate::domain::escape::StringQuoting;
use crate::domain::kind::NodeKind;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};
use crate::domain::tables;
use crate::domain::value::{alloc_value, literal_value, ConstValue};

use super::variable_path;

/// `'abc'[0]`, `@(1, 2, 3)[-1]`, `$pshome[4, 24]`.
pub struct FoldIndex;

impl Rule for FoldIndex {
    fn name(&self) -> &'static str {
        "fold_index"
    }

    fn description(&self) -> &'static str {
        "Evaluate indexing of literals by literal indexes"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let folds: Vec<(NodeId, ConstValue)> = ast
            .iter()
            .filter(|id| ast.is(*id, NodeKind::IndexExpression))
            .filter_map(|id| fold_index(ast, id).map(|v| (id, v)))
            .collect();
        if folds.is_empty() {
            return false;
        }

        let mut batch = EditBatch::default();
        for (id, value) in folds {
            debug!("Fold index expression to {}", value);
            let node = alloc_value(ast, &value, StringQuoting::SingleQuoted);
            batch.replace(id, node, None);
        }
        let index = ParentIndex::build(ast);
        batch.apply(ast, index) > 0
    }
}

fn indexed_value(ast: &Ast, target: NodeId) -> Option<Vec<ConstValue>> {
    let value = match variable_path(ast, target) {
        Some(path) => ConstValue::Str(tables::special_var_value(path)?.to_string()),
        None => literal_value(ast, target)?,
    };
    Some(match value {
        ConstValue::Str(s) => s.chars().map(|c| ConstValue::Str(c.to_string())).collect(),
        ConstValue::List(items) => items,
        ConstValue::Int(_) => return None,
    })
}

fn fold_index(ast: &Ast, id: NodeId) -> Option<ConstValue> {
    let items = indexed_value(ast, ast.child(id, 0)?)?;
    let resolve = |v: &ConstValue| -> Option<ConstValue> {
        let i = v.to_int()?;
        let len = i64::try_from(items.len()).ok()?;
        let i = if i < 0 { len + i } else { i };
        items.get(usize::try_from(i).ok()?).cloned()
    };
    match literal_value(ast, ast.child(id, 1)?)? {
        ConstValue::List(indexes) => indexes
            .iter()
            .map(resolve)
            .collect::<Option<Vec<_>>>()
            .map(ConstValue::List),
        scalar => resolve(&scalar),
    }
}
