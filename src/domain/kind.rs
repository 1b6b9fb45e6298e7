//! Node kinds of the script syntax tree.
//!
//! The set is closed: every element name the parse collaborator emits maps to
//! one variant, and anything else becomes [`NodeKind::Unsupported`] (the
//! original element name is then kept on the node itself).

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum NodeKind {
    // Script structure
    #[strum(serialize = "ScriptBlockAst")]
    ScriptBlock,
    #[strum(serialize = "NamedBlockAst")]
    NamedBlock,
    #[strum(serialize = "StatementBlockAst")]
    StatementBlock,
    #[strum(serialize = "ParamBlockAst")]
    ParamBlock,
    #[strum(serialize = "ParameterAst")]
    Parameter,
    #[strum(serialize = "AttributeAst")]
    Attribute,
    #[strum(serialize = "NamedAttributeArgumentAst")]
    NamedAttributeArgument,
    #[strum(serialize = "FunctionDefinitionAst")]
    FunctionDefinition,

    // Statements
    #[strum(serialize = "PipelineAst")]
    Pipeline,
    #[strum(serialize = "CommandAst")]
    Command,
    #[strum(serialize = "CommandExpressionAst")]
    CommandExpression,
    #[strum(serialize = "CommandParameterAst")]
    CommandParameter,
    #[strum(serialize = "AssignmentStatementAst")]
    Assignment,
    #[strum(serialize = "IfStatementAst")]
    If,
    #[strum(serialize = "WhileStatementAst")]
    While,
    #[strum(serialize = "DoWhileStatementAst")]
    DoWhile,
    #[strum(serialize = "DoUntilStatementAst")]
    DoUntil,
    #[strum(serialize = "ForStatementAst")]
    For,
    #[strum(serialize = "ForEachStatementAst")]
    ForEach,
    #[strum(serialize = "SwitchStatementAst")]
    Switch,
    #[strum(serialize = "SwitchClause")]
    SwitchClause,
    #[strum(serialize = "TryStatementAst")]
    Try,
    #[strum(serialize = "CatchClauseAst")]
    CatchClause,
    #[strum(serialize = "ReturnStatementAst")]
    Return,
    #[strum(serialize = "ExitStatementAst")]
    Exit,
    #[strum(serialize = "ThrowStatementAst")]
    Throw,
    #[strum(serialize = "BreakStatementAst")]
    Break,
    #[strum(serialize = "ContinueStatementAst")]
    Continue,
    #[strum(serialize = "FileRedirectionAst")]
    FileRedirection,
    #[strum(serialize = "MergingRedirectionAst")]
    MergingRedirection,
    #[strum(serialize = "ErrorStatementAst")]
    ErrorStatement,

    // Expressions
    #[strum(serialize = "BinaryExpressionAst")]
    BinaryExpression,
    #[strum(serialize = "UnaryExpressionAst")]
    UnaryExpression,
    #[strum(serialize = "ParenExpressionAst")]
    ParenExpression,
    #[strum(serialize = "SubExpressionAst")]
    SubExpression,
    #[strum(serialize = "ArrayExpressionAst")]
    ArrayExpression,
    #[strum(serialize = "ArrayLiteralAst")]
    ArrayLiteral,
    #[strum(serialize = "HashtableAst")]
    Hashtable,
    #[strum(serialize = "KeyValuePair")]
    KeyValuePair,
    #[strum(serialize = "StringConstantExpressionAst")]
    StringConstant,
    #[strum(serialize = "ExpandableStringExpressionAst")]
    ExpandableString,
    #[strum(serialize = "ConstantExpressionAst")]
    Constant,
    #[strum(serialize = "VariableExpressionAst")]
    Variable,
    #[strum(serialize = "IndexExpressionAst")]
    IndexExpression,
    #[strum(serialize = "MemberExpressionAst")]
    MemberExpression,
    #[strum(serialize = "InvokeMemberExpressionAst")]
    InvokeMember,
    #[strum(serialize = "ConvertExpressionAst")]
    Convert,
    #[strum(serialize = "TypeConstraintAst")]
    TypeConstraint,
    #[strum(serialize = "TypeExpressionAst")]
    TypeExpression,
    #[strum(serialize = "ScriptBlockExpressionAst")]
    ScriptBlockExpression,
    #[strum(serialize = "ErrorExpressionAst")]
    ErrorExpression,

    // Ordered containers
    Statements,
    Elements,
    Arguments,
    CommandElements,
    PipelineElements,
    Attributes,
    Redirections,
    CatchTypes,
    CatchClauses,
    Parameters,
    PositionalArguments,
    NamedArguments,
    Clauses,
    NestedExpressions,
    KeyValuePairs,
    Initializer,
    Condition,
    Iterator,
    Traps,
    UsingStatements,

    /// Element the tool emitted but this crate has no model for.
    #[strum(serialize = "Unsupported")]
    Unsupported,
}

impl NodeKind {
    /// Parses an element name, mapping unknown names to `Unsupported`.
    pub fn from_tag(tag: &str) -> NodeKind {
        match tag.parse::<NodeKind>() {
            Ok(NodeKind::Unsupported) | Err(_) => NodeKind::Unsupported,
            Ok(kind) => kind,
        }
    }

    pub fn tag(self) -> &'static str {
        self.into()
    }

    /// Loop statements; the body may run any number of times.
    pub fn is_loop(self) -> bool {
        matches!(
            self,
            NodeKind::While | NodeKind::DoWhile | NodeKind::DoUntil | NodeKind::For | NodeKind::ForEach
        )
    }

    /// Statements printed as a block construct, not followed by `;`.
    pub fn is_block_statement(self) -> bool {
        self.is_loop()
            || matches!(
                self,
                NodeKind::If | NodeKind::Try | NodeKind::Switch | NodeKind::FunctionDefinition
            )
    }

    /// Kinds that must keep an enclosing grouping node to stay parseable.
    pub fn needs_grouping(self) -> bool {
        matches!(
            self,
            NodeKind::Command | NodeKind::UnaryExpression | NodeKind::BinaryExpression
        )
    }
}
