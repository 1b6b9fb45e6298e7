/// PowerShell Parse Runner.
///
/// Runs `tools/Get-AST.ps1` under a PowerShell interpreter to turn a script
/// into a tree document, then reads the document back:
/// - Windows: `powershell`
/// - elsewhere: `pwsh`
///
/// The tool only parses; with `sandboxed` it does so in a separate job
/// process.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::xml::read_tree_file;
use crate::domain::ast::Ast;
use crate::error::{Error, Result};
use crate::ports::ScriptParser;

/// The `[parser]` section of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub program: String,
    pub script: PathBuf,
    pub sandboxed: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            program: default_program().to_string(),
            script: PathBuf::from("tools").join("Get-AST.ps1"),
            sandboxed: false,
        }
    }
}

fn default_program() -> &'static str {
    if cfg!(windows) {
        "powershell"
    } else {
        "pwsh"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PowerShellParser {
    settings: ParserSettings,
}

impl PowerShellParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Check that the interpreter can be started, logging its version.
    pub fn check_available(&self) -> Result<()> {
        let program = &self.settings.program;
        let output = Command::new(program)
            .args(["-NoProfile", "-NonInteractive", "-Command", "$PSVersionTable.PSVersion.ToString()"])
            .output()
            .map_err(|source| Error::ParserUnavailable {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::ParserFailed {
                path: PathBuf::from(program),
                status: output.status.code(),
                diagnostics: lines(&output.stderr),
            });
        }
        let version = String::from_utf8_lossy(&output.stdout);
        info!("Using {} {}", program, version.trim());
        Ok(())
    }

    /// Writes the tree document of `input` to `output`.
    pub fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let input = absolute(input);
        if !input.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input script not found: {}", input.display()),
            )));
        }

        let spec = build_command_spec(&self.settings, &self.script_path(), &input, &absolute(output));
        info!("Creating AST for: {}", input.display());
        debug!("Running {} {}", spec.program, spec.args.join(" "));

        let result = Command::new(&spec.program)
            .args(&spec.args)
            .output()
            .map_err(|source| Error::ParserUnavailable {
                program: spec.program.clone(),
                source,
            })?;

        for line in lines(&result.stdout) {
            debug!("{}", line);
        }
        let diagnostics = lines(&result.stderr);

        if !result.status.success() {
            for line in &diagnostics {
                error!("{}", line);
            }
            return Err(Error::ParserFailed {
                path: input,
                status: result.status.code(),
                diagnostics,
            });
        }
        for line in &diagnostics {
            warn!("{}", line);
        }

        if !output.is_file() {
            return Err(Error::Document(format!(
                "parser did not create {}",
                output.display()
            )));
        }
        Ok(())
    }

    /// The tool script: as configured, or next to the executable.
    fn script_path(&self) -> PathBuf {
        let script = &self.settings.script;
        if script.is_absolute() || script.exists() {
            return absolute(script);
        }
        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(script)))
            .filter(|candidate| candidate.exists());
        beside_exe.unwrap_or_else(|| absolute(script))
    }
}

impl ScriptParser for PowerShellParser {
    fn parse_file(&self, path: &Path) -> Result<Ast> {
        let dir = tempfile::Builder::new().prefix("psdeob-ast-").tempdir()?;
        let output = dir.path().join("tree.xml");
        self.run(path, &output)?;
        read_tree_file(&output)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Internal Implementation
// ═══════════════════════════════════════════════════════════════════════════

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Testable Command Builder (for unit tests)
// ═══════════════════════════════════════════════════════════════════════════

/// Describes the command that would be run for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerShellCommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Build the command line for parsing `input` into `output`.
pub fn build_command_spec(
    settings: &ParserSettings,
    script: &Path,
    input: &Path,
    output: &Path,
) -> PowerShellCommandSpec {
    let mut args: Vec<String> = [
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-File",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(script.display().to_string());
    args.push("-ps1".to_string());
    args.push(input.display().to_string());
    args.push("-xml".to_string());
    args.push(output.display().to_string());
    if settings.sandboxed {
        args.push("-Sandbox".to_string());
    }
    PowerShellCommandSpec {
        program: settings.program.clone(),
        args,
    }
}
