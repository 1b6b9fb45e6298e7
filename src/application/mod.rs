// Use cases: parse, deob and format one input file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use strum::{Display, EnumString};
use tracing::info;

use crate::domain::artifact::Artifact;
use crate::domain::ast::Ast;
use crate::domain::optimizer::{OptimizeStats, Optimizer, OptimizerSettings, RuleContext};
use crate::ports::{ScriptParser, TreeExporter, TreeImporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Task {
    /// Write the tree document only.
    Parse,
    /// Optimize, then regenerate the script.
    Deob,
    /// Regenerate the script without optimizing.
    Format,
}

impl Task {
    pub fn artifacts(self) -> &'static [Artifact] {
        match self {
            Task::Parse => &[Artifact::Tree],
            Task::Deob => &[Artifact::DeobTree, Artifact::Deobfuscated],
            Task::Format => &[Artifact::Formatted],
        }
    }
}

/// Saved tree documents are read directly instead of being parsed.
pub fn is_tree_document(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Result of one successful use case run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub task: Task,
    pub input: PathBuf,
    pub outputs: Vec<(Artifact, PathBuf)>,
    pub stats: Option<OptimizeStats>,
}

/// Runs the optimizer catalog to its fixed point.
pub fn deobfuscate(
    ast: &mut Ast,
    settings: &OptimizerSettings,
    parser: Option<&dyn ScriptParser>,
) -> crate::error::Result<OptimizeStats> {
    let mut ctx = RuleContext::new(settings);
    if let Some(parser) = parser {
        ctx = ctx.with_parser(parser);
    }
    Optimizer::new(settings).optimize(ast, &ctx)
}

pub struct ProcessUsecase<'a> {
    pub parser: &'a dyn ScriptParser,
    pub tree_codec: &'a dyn TreeImporter,
    pub tree_exporter: &'a dyn TreeExporter,
    pub script_exporter: &'a dyn TreeExporter,
    pub optimizer: &'a OptimizerSettings,
}

impl<'a> ProcessUsecase<'a> {
    /// Runs `task` on `input`. Outputs are written only once every phase
    /// succeeded, so a failed file leaves nothing behind.
    pub fn run(&self, task: Task, input: &Path) -> Result<ProcessOutcome> {
        let from_document = is_tree_document(input);
        if from_document && task == Task::Parse {
            bail!("{} is already a tree document", input.display());
        }

        let mut ast = if from_document {
            info!("Reading input AST: {}", input.display());
            self.tree_codec
                .import(input)
                .with_context(|| format!("Failed to read tree document {}", input.display()))?
        } else {
            self.parser
                .parse_file(input)
                .with_context(|| format!("Failed to parse {}", input.display()))?
        };
        info!("{} nodes in {}", ast.len(), input.display());

        let stats = if task == Task::Deob {
            let stats = deobfuscate(&mut ast, self.optimizer, Some(self.parser))
                .with_context(|| format!("Failed to optimize {}", input.display()))?;
            Some(stats)
        } else {
            None
        };

        let mut rendered = Vec::new();
        for artifact in task.artifacts() {
            let exporter = match artifact {
                Artifact::Tree | Artifact::DeobTree => self.tree_exporter,
                Artifact::Formatted | Artifact::Deobfuscated => self.script_exporter,
            };
            let content = exporter
                .render(&ast)
                .with_context(|| format!("Failed to render {}", artifact))?;
            rendered.push((*artifact, content));
        }

        let mut outputs = Vec::new();
        for (artifact, content) in rendered {
            let path = artifact.path_for(input);
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} ({} bytes) to {}", artifact, content.len(), path.display());
            outputs.push((artifact, path));
        }

        Ok(ProcessOutcome {
            task,
            input: input.to_path_buf(),
            outputs,
            stats,
        })
    }
}
