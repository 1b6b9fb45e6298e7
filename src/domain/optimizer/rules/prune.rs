use tracing::debug;

use crate::domain::ast::Ast;
use crate::domain::edit::{EditBatch, ParentIndex};
use crate::domain::kind::NodeKind;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};

/// Drops optional containers once they hold nothing.
pub struct RemoveEmptyContainers;

const OPTIONAL: [NodeKind; 3] = [NodeKind::Attributes, NodeKind::Redirections, NodeKind::CatchTypes];

impl Rule for RemoveEmptyContainers {
    fn name(&self) -> &'static str {
        "remove_empty_containers"
    }

    fn description(&self) -> &'static str {
        "Remove empty Attributes, Redirections and CatchTypes lists"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut batch = EditBatch::default();
        for id in ast.iter() {
            if OPTIONAL.contains(&ast.kind(id)) && ast.children(id).is_empty() {
                debug!("Remove empty node {}", ast.kind(id));
                batch.delete(id, None);
            }
        }
        if batch.is_empty() {
            return false;
        }
        let index = ParentIndex::build(ast);
        batch.apply(ast, index) > 0
    }
}
