use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    language::Language,
};

/// Compiler and runtime binaries used for each language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    #[serde(rename = "cCompiler")]
    pub c_compiler: String,
    #[serde(rename = "cppCompiler")]
    pub cpp_compiler: String,
    #[serde(rename = "javaCompiler")]
    pub java_compiler: String,
    #[serde(rename = "javaRuntime")]
    pub java_runtime: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            c_compiler: "gcc".into(),
            cpp_compiler: "g++".into(),
            java_compiler: "javac".into(),
            java_runtime: "java".into(),
        }
    }
}

#[derive(Debug)]
pub enum ToolchainStatus {
    OK { version: String, path: String },
    Missing,
}

impl Toolchain {
    pub fn compiler_for(&self, language: Language) -> &str {
        match language {
            Language::C => &self.c_compiler,
            Language::Cpp => &self.cpp_compiler,
            Language::Java => &self.java_compiler,
        }
    }

    /// Every binary this toolchain may launch, paired with a display name.
    pub fn programs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("c compiler", self.c_compiler.as_str()),
            ("c++ compiler", self.cpp_compiler.as_str()),
            ("java compiler", self.java_compiler.as_str()),
            ("java runtime", self.java_runtime.as_str()),
        ]
    }

    pub fn check_environment(program: &str) -> ToolchainStatus {
        let path = match which::which(program) {
            Ok(path) => path,
            Err(_) => return ToolchainStatus::Missing,
        };

        // javac and java answer `-version` on stderr with older JDKs
        let flag = if program.ends_with("java") || program.ends_with("javac") {
            "-version"
        } else {
            "--version"
        };
        let version = Command::new(&path)
            .arg(flag)
            .stdin(Stdio::null())
            .output()
            .ok()
            .and_then(|output| {
                let text = if output.stdout.is_empty() {
                    output.stderr
                } else {
                    output.stdout
                };
                String::from_utf8_lossy(&text)
                    .lines()
                    .next()
                    .map(|line| line.trim().to_string())
            })
            .unwrap_or_default();

        ToolchainStatus::OK {
            version,
            path: path.to_string_lossy().into(),
        }
    }

    /// Locates `program` on PATH, a missing binary is an environment error.
    pub fn resolve(program: &str) -> Result<PathBuf> {
        which::which(program).map_err(|_| Error::Environment(format!("missing {}", program)))
    }

    pub fn compile_command(
        &self,
        language: Language,
        source: &Path,
        artifact: &Path,
        work_dir: &Path,
    ) -> Result<Command> {
        let mut command = Command::new(Self::resolve(self.compiler_for(language))?);
        match language {
            Language::C | Language::Cpp => {
                command.arg("-o").arg(artifact).arg(source);
            }
            Language::Java => {
                command.arg("-d").arg(work_dir).arg(source);
            }
        }
        Ok(command)
    }

    pub fn run_command(&self, language: Language, artifact: &Path, work_dir: &Path, class: &str) -> Result<Command> {
        let command = match language {
            Language::C | Language::Cpp => Command::new(artifact),
            Language::Java => {
                let mut command = Command::new(Self::resolve(&self.java_runtime)?);
                command.arg("-cp").arg(work_dir).arg(class);
                command
            }
        };
        Ok(command)
    }
}
