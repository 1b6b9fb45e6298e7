//! Script Rebuilder
//!
//! Prints a tree back as PowerShell source. The printer never fails on tree
//! content: a node kind it has no model for, or an operator missing from the
//! operator table, is logged and left out of the output.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::ast::{Ast, NodeId};
use crate::domain::escape::{escape, escape_expandable, StringQuoting};
use crate::domain::kind::NodeKind;
use crate::domain::operators::Operator;
use crate::error::Result;
use crate::ports::TreeExporter;

/// Output layout, read from the `[rebuilder]` section of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuilderSettings {
    pub indent_width: usize,
}

impl Default for RebuilderSettings {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rebuilder {
    settings: RebuilderSettings,
}

impl Rebuilder {
    pub fn new(settings: RebuilderSettings) -> Self {
        Self { settings }
    }

    /// Source text of the whole tree. The root script block is printed
    /// without braces.
    pub fn rebuild(&self, ast: &Ast) -> String {
        let mut printer = Printer::new(ast, self.settings.indent_width);
        printer.script_body(ast.root());
        let mut text = printer.out.trim_start_matches('\n').to_string();
        text.push('\n');
        text
    }

    /// Source text of one subtree, as it would appear inside a statement.
    pub fn rebuild_node(&self, ast: &Ast, id: NodeId) -> String {
        let mut printer = Printer::new(ast, self.settings.indent_width);
        printer.node(id);
        printer.out
    }
}

impl TreeExporter for Rebuilder {
    fn render(&self, ast: &Ast) -> Result<String> {
        Ok(self.rebuild(ast))
    }
}

struct Printer<'a> {
    ast: &'a Ast,
    out: String,
    unit: String,
    level: usize,
}

impl<'a> Printer<'a> {
    fn new(ast: &'a Ast, indent_width: usize) -> Self {
        Self {
            ast,
            out: String::new(),
            unit: " ".repeat(indent_width),
            level: 0,
        }
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.level {
            self.out.push_str(&self.unit);
        }
    }

    fn children(&self, id: NodeId) -> &'a [NodeId] {
        self.ast.children(id)
    }

    fn attr(&self, id: NodeId, key: &str) -> &'a str {
        self.ast.attr(id, key).unwrap_or("")
    }

    fn flag(&self, id: NodeId, key: &str) -> bool {
        self.attr(id, key).eq_ignore_ascii_case("true")
    }

    fn separated(&mut self, items: &[NodeId], separator: &str) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(separator);
            }
            self.node(*item);
        }
    }

    /// Children of the first child of `kind`, or nothing.
    fn list_of(&self, id: NodeId, kind: NodeKind) -> &'a [NodeId] {
        let ast = self.ast;
        match ast.find_child(id, kind) {
            Some(list) => ast.children(list),
            None => &[],
        }
    }

    // Blocks and statements

    /// Parameter block and named blocks of a script block, one line each.
    fn script_body(&mut self, id: NodeId) {
        for child in self.children(id) {
            match self.ast.kind(*child) {
                NodeKind::ParamBlock => {
                    self.newline();
                    self.param_block(*child);
                }
                NodeKind::NamedBlock => self.named_block(*child),
                _ => {
                    self.newline();
                    self.node(*child);
                }
            }
        }
    }

    fn named_block(&mut self, id: NodeId) {
        let statements = self.list_of(id, NodeKind::Statements);
        if self.flag(id, "Unnamed") {
            self.statement_lines(statements);
            return;
        }
        self.newline();
        let kind = self.attr(id, "BlockKind").to_lowercase();
        self.write(&kind);
        self.write(" ");
        self.braced(statements);
    }

    fn statement_lines(&mut self, statements: &[NodeId]) {
        for stmt in statements {
            self.newline();
            self.statement(*stmt);
        }
    }

    fn statement(&mut self, id: NodeId) {
        self.node(id);
        if !self.is_block_structured(id) {
            self.write(";");
        }
    }

    /// Statements followed by a bare newline rather than `;`.
    fn is_block_structured(&self, id: NodeId) -> bool {
        let ast = self.ast;
        if ast.kind(id).is_block_statement() {
            return true;
        }
        if !ast.is(id, NodeKind::Pipeline) {
            return false;
        }
        let Some(last) = self.list_of(id, NodeKind::PipelineElements).last() else {
            return false;
        };
        let tail = match ast.kind(*last) {
            NodeKind::CommandExpression => ast.child(*last, 0),
            NodeKind::Command => self.list_of(*last, NodeKind::CommandElements).last().copied(),
            _ => None,
        };
        tail.is_some_and(|t| ast.is(t, NodeKind::ScriptBlockExpression))
    }

    fn braced(&mut self, statements: &[NodeId]) {
        if statements.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.level += 1;
        self.statement_lines(statements);
        self.level -= 1;
        self.newline();
        self.write("}");
    }

    /// A `StatementBlockAst` as a braced block.
    fn statement_block(&mut self, id: NodeId) {
        let statements = self.list_of(id, NodeKind::Statements);
        self.braced(statements);
    }

    /// Statements of a `StatementBlockAst` on one line, for `$()` and `@()`.
    fn inline_statements(&mut self, id: NodeId) {
        let statements = match self.ast.kind(id) {
            NodeKind::StatementBlock => self.list_of(id, NodeKind::Statements),
            _ => std::slice::from_ref(&id),
        };
        self.separated(statements, "; ");
    }

    fn script_block(&mut self, id: NodeId) {
        if self.children(id).is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.level += 1;
        self.script_body(id);
        self.level -= 1;
        self.newline();
        self.write("}");
    }

    fn param_block(&mut self, id: NodeId) {
        for attribute in self.list_of(id, NodeKind::Attributes) {
            self.node(*attribute);
            self.newline();
        }
        self.write("param(");
        let parameters = self.list_of(id, NodeKind::Parameters);
        self.separated(parameters, ", ");
        self.write(")");
    }

    fn parameter(&mut self, id: NodeId) {
        for attribute in self.list_of(id, NodeKind::Attributes) {
            self.node(*attribute);
        }
        let rest: Vec<NodeId> = self
            .ast
            .children(id)
            .iter()
            .copied()
            .filter(|c| !self.ast.is(*c, NodeKind::Attributes))
            .collect();
        if let Some(variable) = rest.first() {
            self.node(*variable);
        }
        if let Some(default) = rest.get(1) {
            self.write(" = ");
            self.node(*default);
        }
    }

    fn attribute(&mut self, id: NodeId) {
        self.write("[");
        self.write(self.attr(id, "TypeName"));
        self.write("(");
        let positional = self.list_of(id, NodeKind::PositionalArguments);
        let named = self.list_of(id, NodeKind::NamedArguments);
        self.separated(positional, ", ");
        if !positional.is_empty() && !named.is_empty() {
            self.write(", ");
        }
        self.separated(named, ", ");
        self.write(")]");
    }

    fn function_definition(&mut self, id: NodeId) {
        let keyword = if self.flag(id, "IsFilter") { "filter " } else { "function " };
        self.write(keyword);
        self.write(self.attr(id, "Name"));
        let parameters = self.list_of(id, NodeKind::Parameters);
        if !parameters.is_empty() {
            self.write("(");
            self.separated(parameters, ", ");
            self.write(")");
        }
        self.write(" ");
        match self.ast.find_child(id, NodeKind::ScriptBlock) {
            Some(body) => self.script_block(body),
            None => self.write("{}"),
        }
    }

    // Control flow

    fn if_statement(&mut self, id: NodeId) {
        let children = self.children(id);
        let pairs = children.chunks_exact(2);
        let otherwise = pairs.remainder().first().copied();
        for (i, pair) in pairs.enumerate() {
            self.write(if i == 0 { "if (" } else { " elseif (" });
            self.node(pair[0]);
            self.write(") ");
            self.statement_block(pair[1]);
        }
        if let Some(block) = otherwise {
            self.write(" else ");
            self.statement_block(block);
        }
    }

    fn loop_statement(&mut self, id: NodeId) {
        let children = self.children(id);
        let (Some(condition), Some(body)) = (children.first(), children.get(1)) else {
            return;
        };
        match self.ast.kind(id) {
            NodeKind::While => {
                self.write("while (");
                self.node(*condition);
                self.write(") ");
                self.statement_block(*body);
            }
            kind => {
                self.write("do ");
                self.statement_block(*body);
                self.write(if kind == NodeKind::DoUntil { " until (" } else { " while (" });
                self.node(*condition);
                self.write(")");
            }
        }
    }

    fn for_statement(&mut self, id: NodeId) {
        self.write("for (");
        for (i, part) in [NodeKind::Initializer, NodeKind::Condition, NodeKind::Iterator]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                self.write("; ");
            }
            let items = self.list_of(id, part);
            self.separated(items, "; ");
        }
        self.write(") ");
        if let Some(body) = self.ast.find_child(id, NodeKind::StatementBlock) {
            self.statement_block(body);
        }
    }

    fn foreach_statement(&mut self, id: NodeId) {
        let [variable, body, collection] = self.children(id) else {
            return;
        };
        self.write("foreach (");
        self.node(*variable);
        self.write(" in ");
        self.node(*collection);
        self.write(") ");
        self.statement_block(*body);
    }

    fn switch_statement(&mut self, id: NodeId) {
        self.write("switch ");
        for flag in self.attr(id, "Flags").split(',').map(str::trim) {
            if !flag.is_empty() && !flag.eq_ignore_ascii_case("none") {
                self.write("-");
                self.write(&flag.to_lowercase());
                self.write(" ");
            }
        }
        self.write("(");
        if let Some(condition) = self.ast.child(id, 0) {
            self.node(condition);
        }
        self.write(") {");
        self.level += 1;
        for clause in self.list_of(id, NodeKind::Clauses) {
            self.newline();
            self.node(*clause);
        }
        let default = self
            .children(id)
            .iter()
            .skip(1)
            .copied()
            .find(|c| self.ast.is(*c, NodeKind::StatementBlock));
        if let Some(block) = default {
            self.newline();
            self.write("default ");
            self.statement_block(block);
        }
        self.level -= 1;
        self.newline();
        self.write("}");
    }

    fn try_statement(&mut self, id: NodeId) {
        let children = self.children(id);
        self.write("try ");
        if let Some(body) = children.first() {
            self.statement_block(*body);
        }
        for clause in self.list_of(id, NodeKind::CatchClauses) {
            self.write(" ");
            self.node(*clause);
        }
        let finally = children.iter().skip(1).find(|c| self.ast.is(**c, NodeKind::StatementBlock));
        if let Some(finally) = finally {
            self.write(" finally ");
            self.statement_block(*finally);
        }
    }

    fn catch_clause(&mut self, id: NodeId) {
        self.write("catch ");
        let types = self.list_of(id, NodeKind::CatchTypes);
        if !types.is_empty() {
            self.separated(types, ", ");
            self.write(" ");
        }
        if let Some(body) = self.ast.find_child(id, NodeKind::StatementBlock) {
            self.statement_block(body);
        }
    }

    /// `return`, `exit`, `throw`, `break` and `continue`.
    fn keyword_statement(&mut self, id: NodeId, keyword: &str) {
        self.write(keyword);
        let label = self.attr(id, "Label");
        if !label.is_empty() {
            self.write(" ");
            self.write(label);
        }
        if let Some(operand) = self.ast.child(id, 0) {
            self.write(" ");
            self.node(operand);
        }
    }

    // Commands

    fn command(&mut self, id: NodeId) {
        match self.attr(id, "InvocationOperator") {
            "Ampersand" => self.write("& "),
            "Dot" => self.write(". "),
            _ => {}
        }
        let elements = self.list_of(id, NodeKind::CommandElements);
        self.separated(elements, " ");
        self.redirections(id);
    }

    fn redirections(&mut self, id: NodeId) {
        for redirection in self.list_of(id, NodeKind::Redirections) {
            self.write(" ");
            self.node(*redirection);
        }
    }

    fn command_parameter(&mut self, id: NodeId) {
        self.write("-");
        self.write(self.attr(id, "ParameterName"));
        if let Some(argument) = self.ast.child(id, 0) {
            self.write(":");
            self.node(argument);
        }
    }

    fn file_redirection(&mut self, id: NodeId) {
        self.write(stream_number(self.attr(id, "FromStream"), ""));
        self.write(if self.flag(id, "Append") { ">>" } else { ">" });
        if let Some(location) = self.ast.child(id, 0) {
            self.write(" ");
            self.node(location);
        }
    }

    fn merging_redirection(&mut self, id: NodeId) {
        self.write(stream_number(self.attr(id, "FromStream"), "1"));
        self.write(">&");
        self.write(stream_number(self.attr(id, "ToStream"), "1"));
    }

    // Expressions

    fn binary(&mut self, id: NodeId, operator_key: &str) {
        let children = self.children(id);
        let (Some(left), Some(right)) = (children.first(), children.get(1)) else {
            return;
        };
        let token = self.attr(id, operator_key);
        self.node(*left);
        match Operator::parse(token).and_then(Operator::binary_text) {
            Some(text) => self.write(text),
            None => {
                error!("Unsupported binary operator: {}", token);
                self.write(" ");
            }
        }
        self.node(*right);
    }

    fn unary(&mut self, id: NodeId) {
        let Some(operand) = self.ast.child(id, 0) else {
            return;
        };
        let token = self.attr(id, "TokenKind");
        match Operator::parse(token).and_then(Operator::unary_text) {
            Some((text, true)) => {
                self.node(operand);
                self.write(text);
            }
            Some((text, false)) => {
                self.write(text);
                let start = self.out.len();
                self.node(operand);
                // `-` then `-3` would read as the decrement operator.
                let signs: &[char] = &['-', '+'];
                if text.ends_with(signs) && self.out[start..].starts_with(signs) {
                    self.out.insert(start, '(');
                    self.out.push(')');
                }
            }
            None => {
                error!("Unsupported unary operator: {}", token);
                self.node(operand);
            }
        }
    }

    fn string_constant(&mut self, id: NodeId) {
        let text = self.ast.text(id);
        let quoting = self
            .ast
            .attr(id, "StringConstantType")
            .and_then(|q| q.parse().ok())
            .unwrap_or(StringQuoting::SingleQuoted);
        if let Some((open, close)) = here_string_delimiters(text, quoting) {
            self.write(open);
            self.write("\n");
            self.write(&escape(text, quoting));
            self.write("\n");
            self.write(close);
            return;
        }
        match quoting {
            StringQuoting::BareWord => self.write(&escape(text, StringQuoting::BareWord)),
            StringQuoting::SingleQuoted | StringQuoting::SingleQuotedHereString => {
                self.write("'");
                self.write(&escape(text, StringQuoting::SingleQuoted));
                self.write("'");
            }
            StringQuoting::DoubleQuoted | StringQuoting::DoubleQuotedHereString => {
                self.write("\"");
                self.write(&escape(text, StringQuoting::DoubleQuoted));
                self.write("\"");
            }
        }
    }

    fn variable(&mut self, id: NodeId) {
        self.write(if self.flag(id, "Splatted") { "@" } else { "$" });
        let path = self.attr(id, "VariablePath");
        if is_simple_variable(path) {
            self.write(path);
        } else {
            self.write("{");
            for c in path.chars() {
                if c == '}' || c == '`' {
                    self.out.push('`');
                }
                self.out.push(c);
            }
            self.write("}");
        }
    }

    fn member(&mut self, id: NodeId) {
        let Some((args, target, member)) = member_parts(self.ast, id) else {
            return;
        };
        self.node(target);
        self.write(if self.flag(id, "Static") { "::" } else { "." });
        self.node(member);
        if self.ast.is(id, NodeKind::InvokeMember) {
            self.write("(");
            if let Some(args) = args {
                let args = self.children(args);
                self.separated(args, ", ");
            }
            self.write(")");
        }
    }

    fn hashtable(&mut self, id: NodeId) {
        let pairs = self.list_of(id, NodeKind::KeyValuePairs);
        if pairs.is_empty() {
            self.write("@{}");
            return;
        }
        self.write("@{");
        self.level += 1;
        for pair in pairs {
            self.newline();
            self.node(*pair);
        }
        self.level -= 1;
        self.newline();
        self.write("}");
    }

    fn type_name(&mut self, id: NodeId) {
        self.write("[");
        self.write(self.attr(id, "TypeName"));
        self.write("]");
    }

    fn unsupported(&mut self, id: NodeId) {
        warn!("Unsupported node kind: {}", self.ast.node(id).element_name());
    }

    fn node(&mut self, id: NodeId) {
        let ast = self.ast;
        let children = ast.children(id);
        match ast.kind(id) {
            NodeKind::ScriptBlock => self.script_block(id),
            NodeKind::NamedBlock => self.named_block(id),
            NodeKind::StatementBlock => self.statement_block(id),
            NodeKind::ParamBlock => self.param_block(id),
            NodeKind::Parameter => self.parameter(id),
            NodeKind::Attribute => self.attribute(id),
            NodeKind::NamedAttributeArgument => {
                self.write(self.attr(id, "ArgumentName"));
                if let (false, Some(value)) = (self.flag(id, "ExpressionOmitted"), ast.child(id, 0)) {
                    self.write(" = ");
                    self.node(value);
                }
            }
            NodeKind::FunctionDefinition => self.function_definition(id),

            NodeKind::Pipeline => {
                let elements = self.list_of(id, NodeKind::PipelineElements);
                self.separated(elements, " | ");
            }
            NodeKind::Command => self.command(id),
            NodeKind::CommandExpression => {
                if let Some(expr) = ast.child(id, 0) {
                    self.node(expr);
                }
                self.redirections(id);
            }
            NodeKind::CommandParameter => self.command_parameter(id),
            NodeKind::Assignment => self.binary(id, "Operator"),
            NodeKind::If => self.if_statement(id),
            NodeKind::While | NodeKind::DoWhile | NodeKind::DoUntil => self.loop_statement(id),
            NodeKind::For => self.for_statement(id),
            NodeKind::ForEach => self.foreach_statement(id),
            NodeKind::Switch => self.switch_statement(id),
            NodeKind::SwitchClause => {
                let [test, body] = children else {
                    return;
                };
                self.node(*test);
                self.write(" ");
                self.statement_block(*body);
            }
            NodeKind::Try => self.try_statement(id),
            NodeKind::CatchClause => self.catch_clause(id),
            NodeKind::Return => self.keyword_statement(id, "return"),
            NodeKind::Exit => self.keyword_statement(id, "exit"),
            NodeKind::Throw => self.keyword_statement(id, "throw"),
            NodeKind::Break => self.keyword_statement(id, "break"),
            NodeKind::Continue => self.keyword_statement(id, "continue"),
            NodeKind::FileRedirection => self.file_redirection(id),
            NodeKind::MergingRedirection => self.merging_redirection(id),

            NodeKind::BinaryExpression => self.binary(id, "Operator"),
            NodeKind::UnaryExpression => self.unary(id),
            NodeKind::ParenExpression => {
                self.write("(");
                self.separated(children, "; ");
                self.write(")");
            }
            NodeKind::SubExpression | NodeKind::ArrayExpression => {
                self.write(if ast.is(id, NodeKind::SubExpression) { "$(" } else { "@(" });
                if let Some(block) = ast.child(id, 0) {
                    self.inline_statements(block);
                }
                self.write(")");
            }
            NodeKind::ArrayLiteral => {
                self.write("@(");
                let elements = self.list_of(id, NodeKind::Elements);
                self.separated(elements, ", ");
                self.write(")");
            }
            NodeKind::Hashtable => self.hashtable(id),
            NodeKind::KeyValuePair => {
                let [key, value] = children else {
                    return;
                };
                self.node(*key);
                self.write(" = ");
                self.node(*value);
            }
            NodeKind::StringConstant => self.string_constant(id),
            NodeKind::ExpandableString => {
                self.write("\"");
                self.write(&escape_expandable(ast.text(id)));
                self.write("\"");
            }
            NodeKind::Constant => self.write(ast.text(id)),
            NodeKind::Variable => self.variable(id),
            NodeKind::IndexExpression => {
                let [target, index] = children else {
                    return;
                };
                self.node(*target);
                self.write("[");
                self.node(*index);
                self.write("]");
            }
            NodeKind::MemberExpression | NodeKind::InvokeMember => self.member(id),
            NodeKind::Convert => {
                for child in children {
                    self.node(*child);
                }
            }
            NodeKind::TypeConstraint | NodeKind::TypeExpression => self.type_name(id),
            NodeKind::ScriptBlockExpression => {
                if let Some(body) = ast.child(id, 0) {
                    self.script_block(body);
                }
            }

            NodeKind::Statements => self.statement_lines(children),
            NodeKind::CommandElements => self.separated(children, " "),
            NodeKind::PipelineElements => self.separated(children, " | "),
            NodeKind::Initializer | NodeKind::Condition | NodeKind::Iterator => {
                self.separated(children, "; ")
            }
            NodeKind::Attributes | NodeKind::CatchClauses => {
                for child in children {
                    self.node(*child);
                }
            }
            NodeKind::Redirections => self.separated(children, " "),
            NodeKind::Elements
            | NodeKind::Arguments
            | NodeKind::CatchTypes
            | NodeKind::Parameters
            | NodeKind::PositionalArguments
            | NodeKind::NamedArguments
            | NodeKind::Clauses
            | NodeKind::NestedExpressions
            | NodeKind::KeyValuePairs
            | NodeKind::Traps
            | NodeKind::UsingStatements => self.separated(children, ", "),

            NodeKind::ErrorStatement | NodeKind::ErrorExpression | NodeKind::Unsupported => {
                self.unsupported(id)
            }
        }
    }
}

/// Arguments, receiver and member of a member access or invocation.
fn member_parts(ast: &Ast, id: NodeId) -> Option<(Option<NodeId>, NodeId, NodeId)> {
    match ast.children(id) {
        [args, target, member] if ast.is(*args, NodeKind::Arguments) => {
            Some((Some(*args), *target, *member))
        }
        [target, member] => Some((None, *target, *member)),
        _ => None,
    }
}

/// Delimiters for printing `text` as a here-string. Only multi-line text
/// keeps that form, and only when no line would close it early.
fn here_string_delimiters(text: &str, quoting: StringQuoting) -> Option<(&'static str, &'static str)> {
    let (open, close) = match quoting {
        StringQuoting::SingleQuotedHereString => ("@'", "'@"),
        StringQuoting::DoubleQuotedHereString => ("@\"", "\"@"),
        _ => return None,
    };
    let closes_early = text.lines().any(|line| line.starts_with(close));
    (text.contains('\n') && !text.contains('\r') && !closes_early).then_some((open, close))
}

/// Names that can follow `$` without braces.
fn is_simple_variable(path: &str) -> bool {
    if matches!(path, "$" | "^" | "?") {
        return true;
    }
    let name = match path.split_once(':') {
        Some((scope, name)) if !scope.is_empty() && scope.chars().all(char::is_alphanumeric) => name,
        Some(_) => return false,
        None => path,
    };
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '?')
}

fn stream_number<'s>(stream: &str, output: &'s str) -> &'s str {
    match stream {
        "Output" => output,
        "Error" => "2",
        "Warning" => "3",
        "Verbose" => "4",
        "Debug" => "5",
        "Information" => "6",
        "All" => "*",
        _ => output,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::domain::ast::Node;
    use crate::domain::optimizer::rules::testing::*;
    use crate::domain::value::string_node;

    fn rebuild(ast: &Ast) -> String {
        Rebuilder::default().rebuild(ast)
    }

    #[test]
    fn test_root_statements_are_unwrapped() {
        let (mut ast, statements) = script();
        let five = int(&mut ast, 5);
        let stmt = assign(&mut ast, "x", five);
        push(&mut ast, statements, stmt);
        let name = bare(&mut ast, "Write-Host");
        let arg = var(&mut ast, "x");
        let cmd = command(&mut ast, vec![name, arg]);
        push(&mut ast, statements, cmd);

        assert_eq!(rebuild(&ast), "$x = 5;\nWrite-Host $x;\n");
    }

    #[test]
    fn test_quoting_kinds() {
        let mut ast = Ast::new(Node::new(NodeKind::ScriptBlock));
        let rebuilder = Rebuilder::default();
        let cases = [
            ("it's", StringQuoting::SingleQuoted, "'it''s'"),
            ("a\n$b", StringQuoting::DoubleQuoted, "\"a`n`$b\""),
            ("Get-Item", StringQuoting::BareWord, "Get-Item"),
            ("x'y", StringQuoting::SingleQuotedHereString, "'x''y'"),
            ("", StringQuoting::DoubleQuoted, "\"\""),
            ("a\nb'c", StringQuoting::SingleQuotedHereString, "@'\na\nb'c\n'@"),
            ("$a\n\"b\"", StringQuoting::DoubleQuotedHereString, "@\"\n`$a\n\"b\"\n\"@"),
            ("a\n'@", StringQuoting::SingleQuotedHereString, "'a\n''@'"),
        ];
        for (text, quoting, expected) in cases {
            let id = ast.alloc(string_node(text, quoting));
            assert_eq!(rebuilder.rebuild_node(&ast, id), expected);
        }
    }

    #[test]
    fn test_nested_blocks_and_terminators() {
        let (mut ast, statements) = script();
        let left = int(&mut ast, 5);
        let right = int(&mut ast, 10);
        let condition = binary(&mut ast, "Igt", left, right);
        let one = int(&mut ast, 1);
        let inner = assign(&mut ast, "y", one);
        let body = block(&mut ast, vec![inner]);
        let while_stmt = ast.add(Node::new(NodeKind::While), vec![condition, body]);
        push(&mut ast, statements, while_stmt);
        let y = var(&mut ast, "y");
        let tail = expr_stmt(&mut ast, y);
        push(&mut ast, statements, tail);

        assert_eq!(
            rebuild(&ast),
            "while (5 -gt 10) {\n    $y = 1;\n}\n$y;\n"
        );
    }

    #[test]
    fn test_member_invocation() {
        let (mut ast, statements) = script();
        let type_expr = ast.alloc(Node::new(NodeKind::TypeExpression).with_attr("TypeName", "string"));
        let join = bare(&mut ast, "Join");
        let sep = s(&mut ast, "");
        let chars = var(&mut ast, "chars");
        let args = ast.add(Node::new(NodeKind::Arguments), vec![sep, chars]);
        let call = ast.add(
            Node::new(NodeKind::InvokeMember).with_attr("Static", "True"),
            vec![args, type_expr, join],
        );
        let stmt = expr_stmt(&mut ast, call);
        push(&mut ast, statements, stmt);

        let target = s(&mut ast, "abc");
        let length = bare(&mut ast, "Length");
        let access = ast.add(
            Node::new(NodeKind::MemberExpression).with_attr("Static", "False"),
            vec![target, length],
        );
        let stmt = expr_stmt(&mut ast, access);
        push(&mut ast, statements, stmt);

        assert_eq!(rebuild(&ast), "[string]::Join('', $chars);\n'abc'.Length;\n");
    }

    #[test]
    fn test_pipeline_ending_in_script_block() {
        let (mut ast, statements) = script();
        let name = bare(&mut ast, "ForEach-Object");
        let inner_root = {
            let underscore = var(&mut ast, "_");
            let stmt = expr_stmt(&mut ast, underscore);
            let list = ast.add(Node::new(NodeKind::Statements), vec![stmt]);
            let named = ast.add(
                Node::new(NodeKind::NamedBlock)
                    .with_attr("BlockKind", "End")
                    .with_attr("Unnamed", "True"),
                vec![list],
            );
            ast.add(Node::new(NodeKind::ScriptBlock), vec![named])
        };
        let sb = ast.add(Node::new(NodeKind::ScriptBlockExpression), vec![inner_root]);
        let cmd = command(&mut ast, vec![name, sb]);
        let elements = ast.add(Node::new(NodeKind::PipelineElements), vec![cmd]);
        let pipeline = ast.add(Node::new(NodeKind::Pipeline), vec![elements]);
        push(&mut ast, statements, pipeline);

        assert_eq!(rebuild(&ast), "ForEach-Object {\n    $_;\n}\n");
    }

    #[test]
    fn test_sign_operand_is_grouped() {
        let mut ast = Ast::new(Node::new(NodeKind::ScriptBlock));
        let rebuilder = Rebuilder::default();
        let negative = int(&mut ast, -3);
        let minus = ast.add(
            Node::new(NodeKind::UnaryExpression).with_attr("TokenKind", "Minus"),
            vec![negative],
        );
        assert_eq!(rebuilder.rebuild_node(&ast, minus), "-(-3)");

        let nested = ast.add(
            Node::new(NodeKind::UnaryExpression).with_attr("TokenKind", "Plus"),
            vec![minus],
        );
        assert_eq!(rebuilder.rebuild_node(&ast, nested), "+(-(-3))");

        let x = var(&mut ast, "x");
        let not = ast.add(
            Node::new(NodeKind::UnaryExpression).with_attr("TokenKind", "Not"),
            vec![x],
        );
        let three = int(&mut ast, 3);
        let plain = ast.add(
            Node::new(NodeKind::UnaryExpression).with_attr("TokenKind", "Minus"),
            vec![three],
        );
        assert_eq!(rebuilder.rebuild_node(&ast, not), "-not $x");
        assert_eq!(rebuilder.rebuild_node(&ast, plain), "-3");
    }

    #[test]
    fn test_variable_forms() {
        let mut ast = Ast::new(Node::new(NodeKind::ScriptBlock));
        let rebuilder = Rebuilder::default();
        let odd = ast.alloc(Node::new(NodeKind::Variable).with_attr("VariablePath", "a-b}"));
        assert_eq!(rebuilder.rebuild_node(&ast, odd), "${a-b`}}");
        let env = ast.alloc(Node::new(NodeKind::Variable).with_attr("VariablePath", "env:ComSpec"));
        assert_eq!(rebuilder.rebuild_node(&ast, env), "$env:ComSpec");
        let splat = ast.alloc(
            Node::new(NodeKind::Variable)
                .with_attr("VariablePath", "params")
                .with_attr("Splatted", "True"),
        );
        assert_eq!(rebuilder.rebuild_node(&ast, splat), "@params");
    }

    #[test]
    fn test_unknown_operator_and_kind_are_skipped() {
        let (mut ast, statements) = script();
        let a = int(&mut ast, 1);
        let b = int(&mut ast, 2);
        let odd = binary(&mut ast, "Frobnicate", a, b);
        let stmt = expr_stmt(&mut ast, odd);
        push(&mut ast, statements, stmt);
        let unknown = ast.alloc(Node::unsupported("UsingExpressionAst"));
        push(&mut ast, statements, unknown);
        let c = int(&mut ast, 3);
        let tail = expr_stmt(&mut ast, c);
        push(&mut ast, statements, tail);

        assert_eq!(rebuild(&ast), "1 2;\n;\n3;\n");
    }

    #[test]
    fn test_indent_width_setting() {
        let (mut ast, statements) = script();
        let one = int(&mut ast, 1);
        let inner = expr_stmt(&mut ast, one);
        let body = block(&mut ast, vec![inner]);
        let t = ast.alloc(string_node("x", StringQuoting::SingleQuoted));
        let if_stmt = ast.add(Node::new(NodeKind::If), vec![t, body]);
        push(&mut ast, statements, if_stmt);

        let rebuilder = Rebuilder::new(RebuilderSettings { indent_width: 2 });
        assert_eq!(rebuilder.rebuild(&ast), "if ('x') {\n  1;\n}\n");
    }
}
