// Collaborator traits of the pipeline and the script rebuilder.

use std::fs;
use std::path::Path;

use crate::domain::ast::Ast;
use crate::error::Result;

pub mod rebuilder;

/// Turns script text into a tree. Implemented by the external PowerShell
/// parse tool, and by stubs in tests.
pub trait ScriptParser: Send + Sync {
    fn parse_file(&self, path: &Path) -> Result<Ast>;

    /// Parses a script held in memory. The default goes through a temporary
    /// file that is removed whether parsing succeeds or not.
    fn parse_text(&self, text: &str) -> Result<Ast> {
        let dir = tempfile::Builder::new().prefix("psdeob-").tempdir()?;
        let path = dir.path().join("script.ps1");
        fs::write(&path, text)?;
        self.parse_file(&path)
    }
}

/// Reads a previously saved tree document.
pub trait TreeImporter: Send + Sync {
    fn import(&self, path: &Path) -> Result<Ast>;
}

/// Serialises a tree into one of the output artifacts.
pub trait TreeExporter: Send + Sync {
    fn render(&self, ast: &Ast) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::ast::Node;
    use crate::domain::kind::NodeKind;
    use crate::error::Error;

    /// Records what it was asked to parse.
    struct Recorder {
        seen: Mutex<Vec<(std::path::PathBuf, String)>>,
    }

    impl ScriptParser for Recorder {
        fn parse_file(&self, path: &Path) -> Result<Ast> {
            let text = fs::read_to_string(path)?;
            self.seen.lock().unwrap().push((path.to_path_buf(), text.clone()));
            if text.contains('(') {
                return Err(Error::Document("unbalanced".into()));
            }
            Ok(Ast::new(Node::new(NodeKind::ScriptBlock)))
        }
    }

    #[test]
    fn test_parse_text_cleans_up() {
        let parser = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        assert!(parser.parse_text("Write-Host hi").is_ok());
        assert!(parser.parse_text("Write-Host (").is_err());

        let seen = parser.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, "Write-Host hi");
        for (path, _) in seen.iter() {
            assert!(!path.exists());
        }
    }
}
