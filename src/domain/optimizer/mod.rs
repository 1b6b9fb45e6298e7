//! Fixed-point rewriting of a script tree.
//!
//! The [`Optimizer`] owns an ordered catalog of [`Rule`]s. Every step scans
//! the catalog from the top and applies the first rule that changes the
//! tree; the scan then restarts, because an edit can enable rules earlier in
//! the list. The run ends after a full scan in which no rule matched.
//!
//! Every rule must strictly shrink the tree or move it towards a canonical
//! spelling it never leaves again, so the loop terminates on its own. The
//! optional step cap only guards against a faulty rule.

pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

use crate::domain::ast::Ast;
use crate::error::{Error, Result};
use crate::ports::ScriptParser;

/// How a rule consumes the matches it finds in one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Applies the first match and returns.
    FirstMatch,
    /// Collects every match of one traversal and applies them as a batch.
    Exhaustive,
}

/// A tree rewrite.
///
/// `apply` reports whether the tree changed. A rule whose expected shape is
/// absent simply reports no match; rules never fail.
pub trait Rule: Send {
    /// Unique name for logging and statistics.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description available"
    }

    fn discipline(&self) -> Discipline {
        Discipline::FirstMatch
    }

    fn apply(&mut self, ast: &mut Ast, ctx: &RuleContext<'_>) -> bool;
}

/// Optimizer knobs, read from the `[optimizer]` section of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Identifiers at least this long are renamed.
    pub rename_threshold: usize,
    /// Abort after this many steps. `None` runs to the fixed point.
    pub max_steps: Option<usize>,
    /// Whether `Invoke-Expression` arguments are parsed and inlined.
    pub inline_invoke_expression: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            rename_threshold: 60,
            max_steps: None,
            inline_invoke_expression: true,
        }
    }
}

/// What a rule may consult besides the tree.
pub struct RuleContext<'a> {
    pub parser: Option<&'a dyn ScriptParser>,
    pub settings: &'a OptimizerSettings,
}

impl<'a> RuleContext<'a> {
    pub fn new(settings: &'a OptimizerSettings) -> Self {
        Self {
            parser: None,
            settings,
        }
    }

    pub fn with_parser(mut self, parser: &'a dyn ScriptParser) -> Self {
        self.parser = Some(parser);
        self
    }
}

/// Summary of one optimizer run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeStats {
    pub nodes_in: usize,
    pub nodes_out: usize,
    pub steps: usize,
    pub per_rule: Vec<(String, usize)>,
}

impl OptimizeStats {
    /// Output size as a percentage of the input size.
    pub fn ratio(&self) -> f64 {
        if self.nodes_in == 0 {
            return 100.0;
        }
        self.nodes_out as f64 / self.nodes_in as f64 * 100.0
    }
}

pub struct Optimizer {
    rules: Vec<Box<dyn Rule>>,
}

impl Optimizer {
    /// An optimizer running the full catalog.
    pub fn new(settings: &OptimizerSettings) -> Self {
        Self::with_rules(rules::catalog(settings))
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Rewrites `ast` until no rule matches.
    pub fn optimize(&mut self, ast: &mut Ast, ctx: &RuleContext<'_>) -> Result<OptimizeStats> {
        let nodes_in = ast.len();
        debug!("{} nodes loaded", nodes_in);
        for rule in &self.rules {
            trace!("Rule {}: {}", rule.name(), rule.description());
        }

        let mut counts = vec![0usize; self.rules.len()];
        let mut steps = 0usize;

        while let Some(i) = self.step(ast, ctx) {
            steps += 1;
            counts[i] += 1;

            if cfg!(debug_assertions) {
                let malformed = ast.malformed_nodes();
                if !malformed.is_empty() {
                    error!(
                        "Rule {} left {} malformed node(s), first {:?}",
                        self.rules[i].name(),
                        malformed.len(),
                        ast.kind(malformed[0])
                    );
                }
            }

            if let Some(max) = ctx.settings.max_steps {
                if steps > max {
                    return Err(Error::StepLimit(max));
                }
            }
        }

        let nodes_out = ast.len();
        let stats = OptimizeStats {
            nodes_in,
            nodes_out,
            steps,
            per_rule: self
                .rules
                .iter()
                .zip(counts)
                .filter(|(_, n)| *n > 0)
                .map(|(r, n)| (r.name().to_string(), n))
                .collect(),
        };

        info!("{} modifications applied", stats.steps);
        debug!("{} nodes in output ({:.2}%)", stats.nodes_out, stats.ratio());
        Ok(stats)
    }

    /// Applies the first matching rule, returning its position.
    fn step(&mut self, ast: &mut Ast, ctx: &RuleContext<'_>) -> Option<usize> {
        for (i, rule) in self.rules.iter_mut().enumerate() {
            if rule.apply(ast, ctx) {
                debug!("Applied {} ({:?})", rule.name(), rule.discipline());
                return Some(i);
            }
        }
        None
    }
}
