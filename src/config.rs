use std::path::PathBuf;

use clap::Parser;

/// Configuration for the docx-fs-mcp tool server.
#[derive(Parser, Debug, Clone)]
#[command(name = "docx-fs-mcp")]
#[command(about = "Sandboxed DOCX and PDF tools over a line-delimited JSON stdio protocol")]
#[command(version)]
pub struct Config {
    /// Directories documents may be read from and written to
    #[arg(env = "DOCX_ALLOWED_PATHS", value_delimiter = ',')]
    pub allowed_paths: Vec<PathBuf>,
}

impl Config {
    /// The allowed roots, falling back to the working directory.
    pub fn roots(&self) -> Vec<PathBuf> {
        if self.allowed_paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.allowed_paths.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_roots() {
        let config = Config::try_parse_from(["docx-fs-mcp", "/data/docs", "/tmp/out"]).unwrap();
        assert_eq!(
            config.roots(),
            vec![PathBuf::from("/data/docs"), PathBuf::from("/tmp/out")]
        );
    }

    #[test]
    fn test_default_root_is_working_directory() {
        let config = Config {
            allowed_paths: Vec::new(),
        };
        assert_eq!(config.roots(), vec![PathBuf::from(".")]);
    }
}
