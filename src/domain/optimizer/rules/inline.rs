use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::ast::{Ast, NodeId};
use crate::domain::edit::ParentIndex;
use crate::domain::kind::NodeKind;
use crate::domain::optimizer::{Rule, RuleContext};

use super::{is_bareword, quoting};

/// Replaces `Invoke-Expression '<script>'` (or `iex`) by the statements of
/// the parsed script.
///
/// The sub-script goes through the parse collaborator. Texts that fail to
/// parse, or that declare parameters or named blocks, are remembered and
/// never submitted again.
#[derive(Default)]
pub struct InlineInvokeExpression {
    rejected: HashSet<String>,
}

impl Rule for InlineInvokeExpression {
    fn name(&self) -> &'static str {
        "inline_invoke_expression"
    }

    fn description(&self) -> &'static str {
        "Inline Invoke-Expression calls with a literal script argument"
    }

    fn apply(&mut self, ast: &mut Ast, ctx: &RuleContext<'_>) -> bool {
        if !ctx.settings.inline_invoke_expression {
            return false;
        }
        let Some(parser) = ctx.parser else {
            return false;
        };

        let index = ParentIndex::build(ast);
        let candidates: Vec<(NodeId, String)> = ast
            .iter()
            .filter_map(|id| invocation(ast, &index, id))
            .filter(|(_, text)| !self.rejected.contains(text))
            .collect();

        for (target, text) in candidates {
            let sub = match parser.parse_text(&text) {
                Ok(sub) => sub,
                Err(e) => {
                    warn!("Could not parse Invoke-Expression argument: {}", e);
                    self.rejected.insert(text);
                    continue;
                }
            };
            let Some(statements) = end_block_statements(&sub) else {
                debug!("Keep Invoke-Expression of a script with param or named blocks");
                self.rejected.insert(text);
                continue;
            };

            debug!("Replace Invoke-Expression by expression AST");
            let grafted: Vec<NodeId> = statements.iter().map(|s| ast.graft(&sub, *s)).collect();
            return index.replace(ast, target, grafted, None);
        }
        false
    }
}

/// The statement to replace and the script text, when `id` is the
/// `CommandElements` of a statement-level `Invoke-Expression '<text>'`.
fn invocation(ast: &Ast, index: &ParentIndex, id: NodeId) -> Option<(NodeId, String)> {
    if !ast.is(id, NodeKind::CommandElements) {
        return None;
    }
    let [name, argument] = ast.children(id) else {
        return None;
    };
    let cmdlet = ast.text(*name).to_lowercase();
    if !is_bareword(ast, *name) || !matches!(cmdlet.as_str(), "invoke-expression" | "iex") {
        return None;
    }
    if quoting(ast, *argument).is_none() || is_bareword(ast, *argument) {
        return None;
    }

    let command = index.parent(id).filter(|c| ast.is(*c, NodeKind::Command))?;
    let parent = index.parent(command)?;
    let target = match ast.kind(parent) {
        NodeKind::Statements => command,
        NodeKind::PipelineElements if ast.children(parent).len() == 1 => {
            let pipeline = index.parent(parent).filter(|p| ast.is(*p, NodeKind::Pipeline))?;
            let list = index.parent(pipeline)?;
            if !ast.is(list, NodeKind::Statements) {
                return None;
            }
            pipeline
        }
        _ => return None,
    };
    Some((target, ast.text(*argument).to_string()))
}

/// Statements of a script made of a single unnamed `end` block.
fn end_block_statements(sub: &Ast) -> Option<Vec<NodeId>> {
    let mut statements = Vec::new();
    for child in sub.children(sub.root()) {
        match sub.kind(*child) {
            NodeKind::NamedBlock => {
                let kind = sub.attr(*child, "BlockKind").unwrap_or("End");
                if !kind.eq_ignore_ascii_case("end") {
                    return None;
                }
                if let Some(list) = sub.find_child(*child, NodeKind::Statements) {
                    statements.extend_from_slice(sub.children(list));
                }
            }
            NodeKind::ParamBlock => return None,
            _ => {}
        }
    }
    Some(statements)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::ast::Node;
    use crate::domain::optimizer::rules::testing::*;
    use crate::domain::optimizer::OptimizerSettings;
    use crate::error::{Error, Result};
    use crate::ports::ScriptParser;

    /// Parses `Write-Host hi` and rejects anything else.
    struct StubParser {
        calls: AtomicUsize,
    }

    impl StubParser {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ScriptParser for StubParser {
        fn parse_file(&self, path: &Path) -> Result<Ast> {
            Err(Error::Document(format!("no file support: {}", path.display())))
        }

        fn parse_text(&self, text: &str) -> Result<Ast> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text != "Write-Host hi" {
                return Err(Error::Document("syntax error".into()));
            }
            let (mut ast, statements) = script();
            let name = bare(&mut ast, "Write-Host");
            let arg = bare(&mut ast, "hi");
            let cmd = command(&mut ast, vec![name, arg]);
            push(&mut ast, statements, cmd);
            Ok(ast)
        }
    }

    fn iex(ast: &mut Ast, statements: NodeId, text: &str) -> NodeId {
        let name = bare(ast, "iex");
        let arg = s(ast, text);
        let cmd = command(ast, vec![name, arg]);
        let elements = ast.add(Node::new(NodeKind::PipelineElements), vec![cmd]);
        let pipeline = ast.add(Node::new(NodeKind::Pipeline), vec![elements]);
        push(ast, statements, pipeline);
        pipeline
    }

    #[test]
    fn test_inlines_parsed_script() {
        let (mut ast, statements) = script();
        iex(&mut ast, statements, "Write-Host hi");

        let parser = StubParser::new();
        let settings = OptimizerSettings::default();
        let ctx = RuleContext::new(&settings).with_parser(&parser);
        let mut rule = InlineInvokeExpression::default();
        assert!(rule.apply(&mut ast, &ctx));

        let inlined = ast.children(statements);
        assert_eq!(inlined.len(), 1);
        assert_eq!(ast.kind(inlined[0]), NodeKind::Command);
    }

    #[test]
    fn test_parse_failure_is_not_retried() {
        let (mut ast, statements) = script();
        iex(&mut ast, statements, "Write-Host (");

        let parser = StubParser::new();
        let settings = OptimizerSettings::default();
        let ctx = RuleContext::new(&settings).with_parser(&parser);
        let mut rule = InlineInvokeExpression::default();
        assert!(!rule.apply(&mut ast, &ctx));
        assert!(!rule.apply(&mut ast, &ctx));
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn test_disabled_without_parser() {
        let (mut ast, statements) = script();
        iex(&mut ast, statements, "Write-Host hi");
        let settings = OptimizerSettings::default();
        let mut rule = InlineInvokeExpression::default();
        assert!(!rule.apply(&mut ast, &RuleContext::new(&settings)));
    }
}
