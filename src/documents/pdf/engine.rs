//! External HTML to PDF engine.
//!
//! Handles the low-level details of writing HTML to a temporary directory,
//! invoking the converter, and reading the output PDF back.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use tempfile::Builder;

use super::{LayoutEngine, LayoutError};

const INPUT_FILE: &str = "document.html";
const OUTPUT_FILE: &str = "document.pdf";

/// Runs a converter program such as `weasyprint` once per document.
pub struct CommandLayoutEngine {
    program: String,
    args: Vec<String>,
    work_root: PathBuf,
}

impl CommandLayoutEngine {
    /// `args` may reference `{input}`, `{output}` and `{base_url}`.
    pub fn new(program: impl Into<String>, args: Vec<String>, work_root: &Path) -> Self {
        Self {
            program: program.into(),
            args,
            work_root: work_root.to_path_buf(),
        }
    }

    fn expand_args(&self, input: &Path, output: &Path, base_url: &str) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{base_url}", base_url)
            })
            .collect()
    }
}

impl LayoutEngine for CommandLayoutEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn html_to_pdf(&self, html: &str, base_url: &str) -> Result<Vec<u8>, LayoutError> {
        // Private working directory, removed when `work_dir` drops.
        let work_dir = Builder::new()
            .prefix("render-pdf-")
            .tempdir_in(&self.work_root)
            .map_err(LayoutError::TempDir)?;
        let input = work_dir.path().join(INPUT_FILE);
        let output = work_dir.path().join(OUTPUT_FILE);

        fs::write(&input, html).map_err(LayoutError::WriteHtml)?;

        let args = self.expand_args(&input, &output, base_url);
        debug!("running {} {:?}", self.program, args);

        let result = Command::new(&self.program)
            .args(&args)
            .current_dir(work_dir.path())
            .output()
            .map_err(|source| LayoutError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(LayoutError::Exit {
                program: self.program.clone(),
                code: result.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        fs::read(&output).map_err(LayoutError::ReadPdf)
    }
}
