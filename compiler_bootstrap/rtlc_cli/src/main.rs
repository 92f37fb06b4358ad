//! RTL compiler command-line driver (§6).
//!
//! A single binary: parse the input, build the variable/function tables and
//! the statement CFG, then either emit RTL or, if one of the dump flags was
//! given, print one of the three intermediate artifacts instead.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use rtlc_cli::config::{CompileConfig, Mode, ProjectFile};
use rtlc_cli::dump::{dump_stmt, dump_vars, tree_to_dot};
use rtlc_common::CompileError;
use rtlc_emit::EmitOptions;

/// RTL compiler: lowers a statement control-flow graph to one-hot encoded,
/// Verilog-style RTL.
#[derive(Parser)]
#[command(name = "rtlc")]
#[command(about = "RTL compiler: lowers a statement CFG to one-hot encoded RTL")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Input source path.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output RTL path. Defaults to standard output.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Parse and build tables, do not emit RTL.
    #[arg(long = "check", conflicts_with_all = ["gv", "vars", "stmt"])]
    check: bool,

    /// Dump the parse tree in DOT format; no RTL emission.
    #[arg(long = "gv", conflicts_with_all = ["check", "vars", "stmt"])]
    gv: bool,

    /// Dump the variable table, one binding per line; no RTL emission.
    #[arg(long = "vars", conflicts_with_all = ["check", "gv", "stmt"])]
    vars: bool,

    /// Dump the statement CFG, one cell per line; no RTL emission.
    #[arg(long = "stmt", conflicts_with_all = ["check", "gv", "vars"])]
    stmt: bool,

    /// Also emit a testbench module, with MAX_CYCLES = N (default 100).
    #[arg(long = "tb", num_args = 0..=1, default_missing_value = "100")]
    tb: Option<u32>,

    /// Debug bitmask; bit 0 enables control-flow tracing inside emitted always-blocks.
    #[arg(short = 'd', long = "debug", default_value_t = 0)]
    debug: u32,

    /// Project-level config file (defaults to `rtlc.toml` next to the input).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.debug & 0x1 != 0 { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("rtlc: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let project = match &cli.config {
        Some(path) => ProjectFile::load(path)?,
        None => ProjectFile::discover(&cli.input)?,
    };

    let mode = if cli.check {
        Mode::Check
    } else if cli.gv {
        Mode::DumpTree
    } else if cli.vars {
        Mode::DumpVars
    } else if cli.stmt {
        Mode::DumpStmt
    } else {
        Mode::Emit
    };

    let config = CompileConfig::resolve(cli.input.clone(), cli.output.clone(), mode, cli.tb, cli.debug, &project);

    match compile(&config) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("rtlc: {err}");
            Ok(ExitCode::from(err.exit_code() as u8))
        }
    }
}

fn compile(config: &CompileConfig) -> Result<(), CompileError> {
    let source = std::fs::read_to_string(&config.input).map_err(|e| CompileError::io(format!("reading {}: {e}", config.input.display())))?;

    log::debug!("parsing {}", config.input.display());
    let tree = rtlc_frontend::parse_source(&source)?;

    if config.mode == Mode::DumpTree {
        return write_output(config, &tree_to_dot(&tree));
    }

    log::debug!("building variable table");
    let (mut vars, var_diagnostics) = rtlc_sem::build_variable_table(&tree)?;
    for warning in var_diagnostics.warnings() {
        log::warn!("{warning}");
    }

    log::debug!("building function table");
    let funcs = rtlc_sem::build_function_table(&tree, &mut vars)?;

    if config.mode == Mode::DumpVars {
        return write_output(config, &dump_vars(&vars));
    }

    log::debug!("building control-flow graph");
    let cfg = rtlc_cfg::build_cfg(&tree, &vars, &funcs)?;

    if config.mode == Mode::DumpStmt {
        return write_output(config, &dump_stmt(&cfg));
    }

    if config.mode == Mode::Check {
        return Ok(());
    }

    log::debug!("emitting RTL");
    let options = EmitOptions::new(config.debug_mask, config.testbench_cycles, config.input.display().to_string());
    let output = rtlc_emit::emit_program(&tree, &vars, &funcs, &cfg, &options)?;
    for warning in output.diagnostics.warnings() {
        log::warn!("{warning}");
    }
    write_output(config, &output.rtl)
}

fn write_output(config: &CompileConfig, text: &str) -> Result<(), CompileError> {
    match &config.output {
        Some(path) => std::fs::write(path, text).map_err(|e| CompileError::io(format!("writing {}: {e}", path.display()))),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
