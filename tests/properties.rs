// Generated-input properties of the escape tables and the optimizer.

use proptest::prelude::*;
use strum::IntoEnumIterator;

use psdeob::application::deobfuscate;
use psdeob::domain::escape::{escape, unescape, StringQuoting};
use psdeob::domain::optimizer::OptimizerSettings;
use psdeob::infrastructure::{read_tree, write_tree};
use psdeob::ports::rebuilder::Rebuilder;

proptest! {
    #[test]
    fn escape_roundtrips_for_every_quoting(text in "[ -~\n\r\t\u{2018}\u{2019}\u{201C}\u{201D}]{0,40}") {
        for quoting in StringQuoting::iter() {
            prop_assert_eq!(unescape(&escape(&text, quoting), quoting), text.clone());
        }
    }
}

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..100).prop_map(|n| format!(
            r#"<ConstantExpressionAst StaticType="int">{}</ConstantExpressionAst>"#,
            n
        )),
        "[a-c]{0,3}".prop_map(|s| format!(
            r#"<StringConstantExpressionAst StringConstantType="SingleQuoted" StaticType="string">{}</StringConstantExpressionAst>"#,
            s
        )),
        prop::sample::select(vec!["x", "y", "z"]).prop_map(|name| format!(
            r#"<VariableExpressionAst VariablePath="{}" Splatted="False" />"#,
            name
        )),
    ]
}

fn expression() -> impl Strategy<Value = String> {
    leaf().prop_recursive(2, 8, 2, |inner| {
        (
            prop::sample::select(vec!["Plus", "Minus", "Multiply", "Igt", "Ieq"]),
            inner.clone(),
            inner,
        )
            .prop_map(|(op, left, right)| {
                format!(
                    r#"<ParenExpressionAst><PipelineAst><PipelineElements><CommandExpressionAst><BinaryExpressionAst Operator="{}" StaticType="System.Object">{}{}</BinaryExpressionAst></CommandExpressionAst></PipelineElements></PipelineAst></ParenExpressionAst>"#,
                    op, left, right
                )
            })
    })
}

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (prop::sample::select(vec!["x", "y", "z"]), expression()).prop_map(|(name, value)| format!(
            r#"<AssignmentStatementAst Operator="Equals"><VariableExpressionAst VariablePath="{}" Splatted="False" /><CommandExpressionAst>{}</CommandExpressionAst></AssignmentStatementAst>"#,
            name, value
        )),
        expression().prop_map(|argument| format!(
            r#"<PipelineAst><PipelineElements><CommandAst InvocationOperator="Unknown"><CommandElements><StringConstantExpressionAst StringConstantType="BareWord" StaticType="string">Write-Host</StringConstantExpressionAst>{}</CommandElements></CommandAst></PipelineElements></PipelineAst>"#,
            argument
        )),
    ]
}

fn script() -> impl Strategy<Value = String> {
    prop::collection::vec(statement(), 1..6).prop_map(|statements| {
        format!(
            r#"<ScriptBlockAst><NamedBlockAst BlockKind="End" Unnamed="True"><Statements>{}</Statements></NamedBlockAst></ScriptBlockAst>"#,
            statements.concat()
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn optimizer_terminates_at_a_fixed_point(document in script()) {
        let settings = OptimizerSettings {
            max_steps: Some(10_000),
            ..OptimizerSettings::default()
        };
        let mut ast = read_tree(&document).unwrap();
        let first = deobfuscate(&mut ast, &settings, None);
        prop_assert!(first.is_ok());
        prop_assert!(ast.malformed_nodes().is_empty());

        let mut reread = read_tree(&write_tree(&ast).unwrap()).unwrap();
        let second = deobfuscate(&mut reread, &settings, None).unwrap();
        prop_assert_eq!(second.steps, 0);
        prop_assert_eq!(
            Rebuilder::default().rebuild(&reread),
            Rebuilder::default().rebuild(&ast)
        );
    }
}
