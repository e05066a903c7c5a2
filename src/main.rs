use std::{error::Error as _, path::PathBuf, process};

use checker_core::{
    codechecker,
    error::{Error, Result},
    toolchain::{Toolchain, ToolchainStatus},
    CheckerConfig, ConsoleReporter,
};
use clap::{Args, Parser, Subcommand};
use log::info;

#[derive(Parser)]
#[clap(
    version = "0.1.0",
    name = "codechecker",
    author = "Kanari",
    about = "Compile, run and check a single C, C++ or Java submission."
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    #[clap(about = "Check a source file against one input")]
    Check(CheckConfig),
    #[clap(about = "Check using a checker.yaml")]
    Prefab(PrefabConfig),
    #[clap(about = "Show which toolchain binaries are available")]
    Env(ToolchainConfig),
}

#[derive(Args, Debug)]
struct CheckConfig {
    #[clap(help = "path of source")]
    src_path: PathBuf,
    #[clap(short, long, help = "input file path")]
    input_file: Option<PathBuf>,
    #[clap(short, long, help = "expected output file path")]
    answer_file: Option<PathBuf>,
    #[clap(short, long, default_value = "1", help = "time limit(s)")]
    time_limit: f64,
    #[clap(long, help = "stop after running, skip the output comparison")]
    no_check: bool,
    #[clap(short, long, default_value = "output.txt", help = "where the program output is captured")]
    output_file: PathBuf,
    #[clap(long, default_value = ".", help = "directory for compiled artifacts")]
    work_dir: PathBuf,
    #[clap(flatten)]
    toolchain: ToolchainConfig,
}

#[derive(Args, Debug)]
struct PrefabConfig {
    #[clap(help = "checker config")]
    config: String,
}

#[derive(Args, Debug)]
struct ToolchainConfig {
    #[clap(long, help = "C compiler")]
    cc: Option<String>,
    #[clap(long, help = "C++ compiler")]
    cxx: Option<String>,
    #[clap(long, help = "Java compiler")]
    javac: Option<String>,
    #[clap(long, help = "Java runtime")]
    java: Option<String>,
}

impl From<ToolchainConfig> for Toolchain {
    fn from(v: ToolchainConfig) -> Self {
        let default = Toolchain::default();
        Toolchain {
            c_compiler: v.cc.unwrap_or(default.c_compiler),
            cpp_compiler: v.cxx.unwrap_or(default.cpp_compiler),
            java_compiler: v.javac.unwrap_or(default.java_compiler),
            java_runtime: v.java.unwrap_or(default.java_runtime),
        }
    }
}

impl From<CheckConfig> for CheckerConfig {
    fn from(v: CheckConfig) -> Self {
        let mut config = CheckerConfig::new(v.src_path);
        config.input = v.input_file;
        config.expected_output = v.answer_file;
        config.time_limit = v.time_limit;
        config.check = !v.no_check;
        config.output_file = v.output_file;
        config.work_dir = v.work_dir;
        config.toolchain = v.toolchain.into();
        config
    }
}

fn main() {
    env_logger::init();
    let opts: Opts = Opts::parse();

    // verdicts are reported by the checker itself, only fatal errors end up here
    if let Err(err) = execute(opts) {
        report_fatal(&err);
        process::exit(1);
    }
}

fn execute(opts: Opts) -> Result<()> {
    match opts.subcmd {
        SubCommand::Check(config) => check(&config.into()),
        SubCommand::Prefab(config) => check(&CheckerConfig::from_file(&config.config)?),
        SubCommand::Env(config) => {
            let toolchain: Toolchain = config.into();
            for (name, program) in toolchain.programs() {
                match Toolchain::check_environment(program) {
                    ToolchainStatus::OK { version, path } => {
                        println!("{:<14} {} ({})", name, path, version)
                    }
                    ToolchainStatus::Missing => println!("{:<14} {} missing", name, program),
                }
            }
            Ok(())
        }
    }
}

fn check(config: &CheckerConfig) -> Result<()> {
    let mut reporter = ConsoleReporter::stdio();
    let report = codechecker(config, &mut reporter)?;
    info!("finished as {:?}", report.state);
    Ok(())
}

fn report_fatal(err: &Error) {
    if let Error::InvalidFile(_) = err {
        eprintln!("FATAL: Invalid file");
        return;
    }

    eprintln!("FATAL: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
