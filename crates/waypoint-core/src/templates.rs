use std::path::Path;

use crate::error::Result;

pub const GITIGNORE_FILE: &str = "gitignore";
pub const README_FILE: &str = "README.md";

const DEFAULT_GITIGNORE: &str = "\
# Build output
/target/
/build/
/dist/

# Editors
.idea/
.vscode/
*.swp

# OS
.DS_Store
Thumbs.db

# Environment
.env
";

const DEFAULT_README: &str = "\
# {name}

Work on this project happens in checkpointed sessions: start a session,
save checkpoints as you go, and finish with a single reviewable change.
";

/// Static text used when initializing a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub gitignore: String,
    pub readme: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            gitignore: DEFAULT_GITIGNORE.to_string(),
            readme: DEFAULT_README.to_string(),
        }
    }
}

impl Templates {
    /// Read templates from `dir`, falling back to the built-in text for any
    /// file that is not present there.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut templates = Self::default();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        let gitignore = dir.join(GITIGNORE_FILE);
        if gitignore.is_file() {
            templates.gitignore = std::fs::read_to_string(&gitignore)?;
        }
        let readme = dir.join(README_FILE);
        if readme.is_file() {
            templates.readme = std::fs::read_to_string(&readme)?;
        }
        tracing::debug!(dir = %dir.display(), "loaded templates");
        Ok(templates)
    }

    pub fn readme_for(&self, name: &str) -> String {
        self.readme.replace("{name}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_dir() {
        let templates = Templates::load(None).unwrap();
        assert_eq!(templates, Templates::default());
        assert!(templates.gitignore.contains("/target/"));
    }

    #[test]
    fn test_load_overrides_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(GITIGNORE_FILE), "*.log\n").unwrap();

        let templates = Templates::load(Some(dir.path())).unwrap();
        assert_eq!(templates.gitignore, "*.log\n");
        assert_eq!(templates.readme, Templates::default().readme);
    }

    #[test]
    fn test_readme_for_substitutes_name() {
        let templates = Templates::default();
        assert!(templates.readme_for("atlas").starts_with("# atlas\n"));
    }
}
