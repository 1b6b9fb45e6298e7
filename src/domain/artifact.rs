/// Output Artifact Domain Module
///
/// Naming convention for the files produced next to an input script.

use std::path::{Path, PathBuf};

/// Files written by the parse, deob and format commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Raw parse output.
    Tree,
    /// Optimized tree.
    DeobTree,
    /// Regenerated script without optimization.
    Formatted,
    /// Optimized and regenerated script.
    Deobfuscated,
}

impl Artifact {
    /// Get the extension appended to the input's stem.
    pub fn extension(&self) -> &'static str {
        match self {
            Artifact::Tree => "xml",
            Artifact::DeobTree => "deob.xml",
            Artifact::Formatted => "formatted.ps1",
            Artifact::Deobfuscated => "deob.ps1",
        }
    }

    /// Get the display name of the artifact.
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::Tree => "tree",
            Artifact::DeobTree => "deobfuscated tree",
            Artifact::Formatted => "formatted script",
            Artifact::Deobfuscated => "deobfuscated script",
        }
    }

    /// Path of this artifact for `input`: the input's extension is swapped.
    pub fn path_for(&self, input: &Path) -> PathBuf {
        input.with_extension(self.extension())
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for() {
        let input = Path::new("samples/dropper.ps1");
        assert_eq!(Artifact::Tree.path_for(input), PathBuf::from("samples/dropper.xml"));
        assert_eq!(Artifact::DeobTree.path_for(input), PathBuf::from("samples/dropper.deob.xml"));
        assert_eq!(Artifact::Formatted.path_for(input), PathBuf::from("samples/dropper.formatted.ps1"));
        assert_eq!(Artifact::Deobfuscated.path_for(input), PathBuf::from("samples/dropper.deob.ps1"));
    }

    #[test]
    fn test_path_without_extension() {
        assert_eq!(Artifact::Tree.path_for(Path::new("payload")), PathBuf::from("payload.xml"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Artifact::Formatted.to_string(), "formatted script");
    }
}
