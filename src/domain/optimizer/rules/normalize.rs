//! Spelling normalisation.
//!
//! These rules only rewrite attributes and text: casing of barewords,
//! members, types and automatic variables, alias expansion, quoting of
//! command names, and renaming of unreadably long identifiers. None of
//! them changes the shape of the tree.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::ast::{Ast, NodeId};
use crate::domain::escape::{escape, StringQuoting};
use crate::domain::kind::NodeKind;
use crate::domain::optimizer::{Discipline, Rule, RuleContext};
use crate::domain::tables;

use super::{is_bareword, quoting, variable_path};

/// One attribute or text rewrite.
enum Patch {
    Attr(NodeId, &'static str, String),
    Text(NodeId, String),
}

fn apply_patches(ast: &mut Ast, patches: Vec<Patch>) -> bool {
    let changed = !patches.is_empty();
    for patch in patches {
        match patch {
            Patch::Attr(id, key, value) => ast.node_mut(id).set_attr(key, value),
            Patch::Text(id, text) => ast.node_mut(id).text = Some(text),
        }
    }
    changed
}

/// `ENV:x` and `Variable:x` become `env:x` and `variable:x`.
pub struct PrefixCase;

fn lower_prefix(path: &str) -> Option<String> {
    let (prefix, rest) = path.split_once(':')?;
    let lowered = prefix.to_lowercase();
    if !matches!(lowered.as_str(), "env" | "variable") || lowered == prefix {
        return None;
    }
    Some(format!("{}:{}", lowered, rest))
}

impl Rule for PrefixCase {
    fn name(&self) -> &'static str {
        "prefix_case"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let patches: Vec<Patch> = ast
            .iter()
            .filter_map(|id| {
                if is_bareword(ast, id) {
                    lower_prefix(ast.text(id)).map(|t| Patch::Text(id, t))
                } else {
                    let path = variable_path(ast, id)?;
                    lower_prefix(path).map(|p| Patch::Attr(id, "VariablePath", p))
                }
            })
            .collect();
        apply_patches(ast, patches)
    }
}

/// Canonical casing of known words inside barewords.
pub struct BarewordCase;

impl Rule for BarewordCase {
    fn name(&self) -> &'static str {
        "bareword_case"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let patches: Vec<Patch> = ast
            .iter()
            .filter(|id| is_bareword(ast, *id))
            .filter_map(|id| {
                let text = ast.text(id);
                let fixed = tables::canonical_case(text);
                (fixed != text).then(|| {
                    debug!("Fix bareword case from '{}' to '{}'", text, fixed);
                    Patch::Text(id, fixed)
                })
            })
            .collect();
        apply_patches(ast, patches)
    }
}

/// `.'tolower'()` becomes `.ToLower()`: quoted member names that are known
/// words turn into barewords with canonical case.
pub struct MemberCase;

impl Rule for MemberCase {
    fn name(&self) -> &'static str {
        "member_case"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut patches = Vec::new();
        for id in ast.iter() {
            let member = match ast.kind(id) {
                NodeKind::InvokeMember | NodeKind::MemberExpression => ast.children(id).last().copied(),
                _ => None,
            };
            let Some(member) = member else {
                continue;
            };
            if quoting(ast, member).is_none() || is_bareword(ast, member) {
                continue;
            }
            if let Some(word) = tables::bareword(ast.text(member)) {
                debug!("Fix member string type for '{}'", word);
                patches.push(Patch::Attr(member, "StringConstantType", StringQuoting::BareWord.to_string()));
                patches.push(Patch::Text(member, word.to_string()));
            }
        }
        apply_patches(ast, patches)
    }
}

/// Quoted command names, and quoted arguments that are known words, become
/// barewords.
pub struct CommandBareword;

fn is_plain_word(text: &str) -> bool {
    text.chars().next().map(char::is_alphabetic).unwrap_or(false)
        && escape(text, StringQuoting::BareWord) == text
}

impl Rule for CommandBareword {
    fn name(&self) -> &'static str {
        "command_bareword"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut patches = Vec::new();
        for id in ast.iter().filter(|id| ast.is(*id, NodeKind::CommandElements)) {
            for (position, element) in ast.children(id).iter().enumerate() {
                let Some(q) = quoting(ast, *element) else {
                    continue;
                };
                if q == StringQuoting::BareWord {
                    continue;
                }
                let text = ast.text(*element);
                let convert = if position == 0 {
                    is_plain_word(text)
                } else {
                    tables::bareword(text).is_some() && is_plain_word(text)
                };
                if convert {
                    debug!("Fix command string type for '{}'", text);
                    patches.push(Patch::Attr(
                        *element,
                        "StringConstantType",
                        StringQuoting::BareWord.to_string(),
                    ));
                }
            }
        }
        apply_patches(ast, patches)
    }
}

/// `iex` becomes `Invoke-Expression`.
pub struct AliasToCmdlet;

impl Rule for AliasToCmdlet {
    fn name(&self) -> &'static str {
        "alias_to_cmdlet"
    }

    fn description(&self) -> &'static str {
        "Expand command aliases to full cmdlet names"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let patches: Vec<Patch> = ast
            .iter()
            .filter(|id| ast.is(*id, NodeKind::CommandElements))
            .filter_map(|id| ast.child(id, 0))
            .filter(|name| is_bareword(ast, *name))
            .filter_map(|name| {
                let cmdlet = tables::alias_target(ast.text(name))?;
                debug!("Replace alias '{}' by '{}'", ast.text(name), cmdlet);
                Some(Patch::Text(name, cmdlet.to_string()))
            })
            .collect();
        apply_patches(ast, patches)
    }
}

/// `$PSHOME` keeps the canonical spelling of automatic variables.
pub struct SpecialVariableCase;

impl Rule for SpecialVariableCase {
    fn name(&self) -> &'static str {
        "special_variable_case"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let patches: Vec<Patch> = ast
            .iter()
            .filter_map(|id| {
                let path = variable_path(ast, id)?;
                let canonical = tables::special_var(path)?;
                (canonical != path).then(|| Patch::Attr(id, "VariablePath", canonical.to_string()))
            })
            .collect();
        apply_patches(ast, patches)
    }
}

/// The type constraint of a cast takes the resolved static type, so
/// accelerators and odd casing print as the full type name.
pub struct TypeConstraintFromConvert;

fn strip_system(name: &str) -> &str {
    let lowered = name.get(..7).map(|p| p.eq_ignore_ascii_case("system."));
    match lowered {
        Some(true) => &name[7..],
        _ => name,
    }
}

impl Rule for TypeConstraintFromConvert {
    fn name(&self) -> &'static str {
        "type_constraint_from_convert"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut patches = Vec::new();
        for id in ast.iter().filter(|id| ast.is(*id, NodeKind::Convert)) {
            let Some(static_type) = ast.attr(id, "StaticType") else {
                continue;
            };
            if static_type.eq_ignore_ascii_case("System.Object") {
                continue;
            }
            let Some(constraint) = ast.find_child(id, NodeKind::TypeConstraint) else {
                continue;
            };
            let current = ast.attr(constraint, "TypeName").unwrap_or("");
            if strip_system(current).eq_ignore_ascii_case(strip_system(static_type)) {
                continue;
            }
            debug!("Replace type constraint '{}' by '{}'", current, static_type);
            patches.push(Patch::Attr(constraint, "TypeName", static_type.to_string()));
        }
        apply_patches(ast, patches)
    }
}

/// Canonical casing of type names in casts and type literals.
pub struct TypeNameCase;

impl Rule for TypeNameCase {
    fn name(&self) -> &'static str {
        "type_name_case"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let patches: Vec<Patch> = ast
            .iter()
            .filter(|id| matches!(ast.kind(*id), NodeKind::TypeConstraint | NodeKind::TypeExpression))
            .filter_map(|id| {
                let name = ast.attr(id, "TypeName")?;
                let fixed = tables::canonical_case(name);
                (fixed != name).then(|| {
                    debug!("Fix typename case from '{}' to '{}'", name, fixed);
                    Patch::Attr(id, "TypeName", fixed)
                })
            })
            .collect();
        apply_patches(ast, patches)
    }
}

/// Renames variables and parameters whose name is at least `threshold`
/// characters long to `deob_N`. The mapping is kept for the whole run so
/// every occurrence of a name gets the same replacement.
pub struct RenameLongNames {
    threshold: usize,
    mapping: HashMap<String, String>,
    next: usize,
}

impl RenameLongNames {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            mapping: HashMap::new(),
            next: 0,
        }
    }

    fn replacement(&mut self, name: &str, taken: &HashSet<String>) -> String {
        if let Some(existing) = self.mapping.get(&name.to_lowercase()) {
            return existing.clone();
        }
        let fresh = loop {
            let candidate = format!("deob_{}", self.next);
            self.next += 1;
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        debug!("Replacing long variable name {} with {}", name, fresh);
        self.mapping.insert(name.to_lowercase(), fresh.clone());
        fresh
    }
}

impl Rule for RenameLongNames {
    fn name(&self) -> &'static str {
        "rename_long_names"
    }

    fn description(&self) -> &'static str {
        "Replace very long variable names by short generated ones"
    }

    fn discipline(&self) -> Discipline {
        Discipline::Exhaustive
    }

    fn apply(&mut self, ast: &mut Ast, _ctx: &RuleContext<'_>) -> bool {
        let mut taken = HashSet::new();
        let mut long = Vec::new();
        for id in ast.iter() {
            let (key, name) = match ast.kind(id) {
                NodeKind::Variable => ("VariablePath", ast.attr(id, "VariablePath")),
                NodeKind::Parameter => ("Name", ast.attr(id, "Name")),
                _ => continue,
            };
            let Some(name) = name else {
                continue;
            };
            let (dollar, bare) = match name.strip_prefix('$') {
                Some(bare) => (true, bare),
                None => (false, name),
            };
            taken.insert(bare.to_lowercase());
            if bare.chars().count() >= self.threshold && !tables::is_prefixed(bare) {
                long.push((id, key, dollar, bare.to_string()));
            }
        }

        let mut patches = Vec::new();
        for (id, key, dollar, name) in long {
            let fresh = self.replacement(&name, &taken);
            let value = if dollar { format!("${}", fresh) } else { fresh };
            patches.push(Patch::Attr(id, key, value));
        }
        apply_patches(ast, patches)
    }
}
