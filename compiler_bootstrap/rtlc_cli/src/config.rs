//! Run configuration (§4c).
//!
//! `CompileConfig` is assembled directly from parsed CLI flags. The core has
//! no on-disk configuration of its own (that's a deliberate non-goal), but
//! the CLI layers in an optional project-level `rtlc.toml` for the output
//! path and default testbench bound, so the common case doesn't need every
//! flag re-specified on every invocation. Flags always win over the file.

use std::path::{Path, PathBuf};

use rtlc_common::{CompileError, CompileResult};
use serde::Deserialize;

/// The five mutually exclusive run modes selected by `-check`/`-gv`/`-vars`/
/// `-stmt`, or ordinary RTL emission when none of them are given (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Emit,
    Check,
    DumpTree,
    DumpVars,
    DumpStmt,
}

/// One resolved compilation run.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub mode: Mode,
    pub testbench_cycles: Option<u32>,
    pub debug_mask: u32,
}

impl CompileConfig {
    pub fn resolve(
        input: PathBuf,
        output: Option<PathBuf>,
        mode: Mode,
        testbench_cycles: Option<u32>,
        debug_mask: u32,
        project: &ProjectFile,
    ) -> Self {
        Self {
            output: output.or_else(|| project.output.clone()),
            testbench_cycles: testbench_cycles.or(project.testbench_cycles),
            input,
            mode,
            debug_mask,
        }
    }
}

/// `rtlc.toml` defaults, read next to the input file (or from a path passed
/// with `--config`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub output: Option<PathBuf>,
    pub testbench_cycles: Option<u32>,
}

impl ProjectFile {
    pub fn load(path: &Path) -> CompileResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CompileError::io(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| CompileError::config(format!("parsing {}: {e}", path.display())))
    }

    /// `rtlc.toml` in the same directory as `input`, if one exists. Absence
    /// is not an error — the core has no required config file.
    pub fn discover(input: &Path) -> CompileResult<Self> {
        let dir = input.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let candidate = dir.join("rtlc.toml");
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_win_over_the_project_file() {
        let project = ProjectFile { output: Some(PathBuf::from("from_file.rtl")), testbench_cycles: Some(50) };
        let config = CompileConfig::resolve(PathBuf::from("in.go"), Some(PathBuf::from("from_flag.rtl")), Mode::Emit, None, 0, &project);
        assert_eq!(config.output, Some(PathBuf::from("from_flag.rtl")));
        assert_eq!(config.testbench_cycles, Some(50));
    }

    #[test]
    fn absent_project_file_leaves_defaults_untouched() {
        let project = ProjectFile::default();
        let config = CompileConfig::resolve(PathBuf::from("in.go"), None, Mode::Emit, None, 0, &project);
        assert_eq!(config.output, None);
        assert_eq!(config.testbench_cycles, None);
    }

    #[test]
    fn discover_returns_defaults_when_no_config_file_exists() {
        let project = ProjectFile::discover(Path::new("/tmp/definitely-not-a-real-rtlc-project/in.go")).unwrap();
        assert_eq!(project.output, None);
    }
}
