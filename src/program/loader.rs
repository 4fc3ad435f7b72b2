//! Program file loader
//!
//! Load program text from a single file or every program file in a directory.

use std::path::{Path, PathBuf};

use super::model::Program;
use super::parser::ProgramParser;

/// File extensions recognized as program text
pub const PROGRAM_EXTENSIONS: &[&str] = &["prog", "program"];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("JSON parse error in {file}: {error}")]
    Json {
        file: String,
        error: serde_json::Error,
    },
}

pub struct ProgramLoader;

impl ProgramLoader {
    /// Load every program file in `dir`, sorted by file name
    pub fn load_directory(dir: &Path) -> Result<Vec<(PathBuf, Program)>, LoadError> {
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && Self::is_program_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let program = Self::load_file(&path)?;
                Ok((path, program))
            })
            .collect()
    }

    pub fn load_file(path: &Path) -> Result<Program, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ProgramParser::parse(&content))
    }

    pub fn is_program_file(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| PROGRAM_EXTENSIONS.contains(&ext))
    }
}
