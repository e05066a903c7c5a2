use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{info, warn};

use crate::{
    compare::compare_files,
    error::{Error, Result},
    language::{Language, SourceName},
    probe::{ProcessBio, ProcessProbe, Sink, Source},
    toolchain::Toolchain,
    verdict::Status,
};

pub const DEFAULT_OUTPUT_FILE: &str = "output.txt";

/// Status of one stage plus whatever the stage had to say about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub status: Status,
    pub diagnostics: Option<String>,
}

impl StageOutcome {
    pub fn plain(status: Status) -> Self {
        Self {
            status,
            diagnostics: None,
        }
    }

    pub fn failure(status: Status, diagnostics: impl Into<String>) -> Self {
        Self {
            status,
            diagnostics: Some(diagnostics.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// One grading request.
///
/// Stages do not check each other's results, the driver in
/// [`crate::pipeline`] is responsible for only running a stage after its
/// predecessor succeeded.
#[derive(Debug, Clone)]
pub struct Submission {
    source_path: PathBuf,
    source: Option<SourceName>,
    input_path: Option<PathBuf>,
    expected_output_path: Option<PathBuf>,
    actual_output_path: PathBuf,
    work_dir: PathBuf,
    time_limit: Duration,
    toolchain: Toolchain,
}

impl Submission {
    pub fn new(source_path: impl Into<PathBuf>, time_limit: Duration) -> Result<Self> {
        if time_limit.is_zero() {
            return Err(Error::Argument("time limit must be positive".into()));
        }
        Ok(Self {
            source_path: source_path.into(),
            source: None,
            input_path: None,
            expected_output_path: None,
            actual_output_path: DEFAULT_OUTPUT_FILE.into(),
            work_dir: ".".into(),
            time_limit,
            toolchain: Toolchain::default(),
        })
    }

    pub fn with_input(mut self, input_path: Option<PathBuf>) -> Self {
        self.input_path = input_path;
        self
    }

    pub fn with_expected_output(mut self, expected_output_path: Option<PathBuf>) -> Self {
        self.expected_output_path = expected_output_path;
        self
    }

    pub fn with_actual_output(mut self, actual_output_path: impl Into<PathBuf>) -> Self {
        self.actual_output_path = actual_output_path.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn actual_output_path(&self) -> &Path {
        &self.actual_output_path
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn language(&self) -> Option<Language> {
        self.source.as_ref().map(|s| s.language)
    }

    pub fn base_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.base_name.as_str())
    }

    /// Where the compiler leaves its output, known once validated.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        self.source
            .as_ref()
            .map(|s| self.work_dir.join(s.language.artifact_name(s.stem())))
    }

    /// Checks the source file name and derives base name and language from it.
    /// The language never changes once set.
    pub fn validate(&mut self) -> Result<bool> {
        if self.source.is_none() {
            self.source = SourceName::parse(&self.source_path)?;
        }
        Ok(self.source.is_some())
    }

    pub fn compile(&self) -> Result<StageOutcome> {
        // a stale binary must never be graded
        if let Some(artifact) = self.artifact_path() {
            if artifact.is_file() {
                fs::remove_file(&artifact)?;
            }
        }

        if !self.source_path.is_file() {
            return Ok(StageOutcome::failure(Status::FileNotFound, "Missing file"));
        }

        let (language, artifact) = match (self.language(), self.artifact_path()) {
            (Some(language), Some(artifact)) => (language, artifact),
            _ => {
                return Ok(StageOutcome::failure(
                    Status::InvalidFile,
                    "File is of invalid type",
                ))
            }
        };

        fs::create_dir_all(&self.work_dir)?;
        let command =
            self.toolchain
                .compile_command(language, &self.source_path, &artifact, &self.work_dir)?;
        let bio = ProcessProbe::launch(command, Source::Empty, Sink::Capture)?.watching(None)?;

        let outcome = if bio.success() {
            StageOutcome::plain(Status::Ok)
        } else {
            StageOutcome::failure(Status::CompilationError, failure_text(&bio))
        };
        info!(
            "compiled `{}` as {}: {}",
            self.source_path.display(),
            language,
            outcome.status
        );
        Ok(outcome)
    }

    pub fn run(&self) -> Result<StageOutcome> {
        let (source, artifact) = match (&self.source, self.artifact_path()) {
            (Some(source), Some(artifact)) => (source, artifact),
            _ => {
                return Ok(StageOutcome::failure(
                    Status::InvalidFile,
                    "File is of invalid type",
                ))
            }
        };

        if !artifact.is_file() {
            return Ok(StageOutcome::failure(
                Status::FileNotFound,
                "Missing executable file",
            ));
        }

        let command =
            self.toolchain
                .run_command(source.language, &artifact, &self.work_dir, source.stem())?;

        let output = File::create(&self.actual_output_path)?;
        let input = match &self.input_path {
            Some(path) if path.is_file() => Source::File(File::open(path)?),
            _ => Source::Empty,
        };

        let bio = ProcessProbe::launch(command, input, Sink::File(output))?
            .watching(Some(self.time_limit))?;

        // the child is reaped even after a timeout, so the artifact can always go
        self.remove_artifact(&artifact);

        let outcome = match bio.timeout_message() {
            Some(message) => StageOutcome::failure(Status::TimeLimitExceeded, message),
            None if bio.success() => StageOutcome::plain(Status::Ok),
            None => StageOutcome::failure(Status::RuntimeError, failure_text(&bio)),
        };
        info!(
            "ran `{}` in {}ms: {}",
            artifact.display(),
            bio.get_time_usage(),
            outcome.status
        );
        Ok(outcome)
    }

    pub fn compare(&self) -> Result<StageOutcome> {
        let expected = match &self.expected_output_path {
            Some(path) if path.is_file() && self.actual_output_path.is_file() => path,
            _ => {
                return Ok(StageOutcome::failure(
                    Status::FileNotFound,
                    "Missing output files",
                ))
            }
        };

        let status: Status = compare_files(&self.actual_output_path, expected)?.into();
        info!("compared `{}`: {}", self.actual_output_path.display(), status);
        Ok(StageOutcome::plain(status))
    }

    fn remove_artifact(&self, artifact: &Path) {
        if let Err(e) = fs::remove_file(artifact) {
            warn!("failed to remove `{}`: {}", artifact.display(), e);
        }
    }
}

/// Stderr of a failed process, or a description of how it ended when it was silent.
fn failure_text(bio: &ProcessBio) -> String {
    let stderr = bio.stderr();
    if !stderr.trim().is_empty() {
        return stderr;
    }
    let stdout = bio.stdout();
    if !stdout.trim().is_empty() {
        return stdout;
    }
    match (bio.get_status(), bio.get_signal()) {
        (Some(code), _) => format!("process exited with status {}", code),
        (None, Some(signal)) => format!("process terminated by signal {}", signal),
        (None, None) => "process failed".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(source: &str) -> Submission {
        Submission::new(source, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn zero_time_limit_is_rejected() {
        let result = Submission::new("a.cpp", Duration::from_secs(0));
        assert!(matches!(result, Err(Error::Argument(_))));
    }

    #[test]
    fn validate_sets_language() -> Result<()> {
        let mut s = submission("sum.cpp");
        assert_eq!(s.language(), None);
        assert!(s.validate()?);
        assert_eq!(s.language(), Some(Language::Cpp));
        assert_eq!(s.base_name(), Some("sum"));
        assert_eq!(s.artifact_path(), Some(PathBuf::from("./sum")));

        let mut s = submission("Main.java").with_work_dir("/tmp/w");
        assert!(s.validate()?);
        assert_eq!(s.artifact_path(), Some(PathBuf::from("/tmp/w/Main.class")));
        Ok(())
    }

    #[test]
    fn validate_rejects_other_files() -> Result<()> {
        let mut s = submission("sum.py");
        assert!(!s.validate()?);
        assert_eq!(s.language(), None);
        assert_eq!(s.artifact_path(), None);
        Ok(())
    }

    #[test]
    fn compile_missing_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut s = submission(dir.path().join("nothing.cpp").to_str().unwrap())
            .with_work_dir(dir.path());
        assert!(s.validate()?);
        let outcome = s.compile()?;
        assert_eq!(outcome.status, Status::FileNotFound);
        assert_eq!(outcome.diagnostics.as_deref(), Some("Missing file"));
        Ok(())
    }

    #[test]
    fn compile_without_language_is_invalid() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("prog.py");
        fs::write(&source, "print(1)")?;
        let s = submission(source.to_str().unwrap());
        assert_eq!(s.compile()?.status, Status::InvalidFile);
        assert_eq!(s.run()?.status, Status::InvalidFile);
        Ok(())
    }

    #[test]
    fn run_missing_artifact() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut s = submission("sum.cpp").with_work_dir(dir.path());
        assert!(s.validate()?);
        let outcome = s.run()?;
        assert_eq!(outcome.status, Status::FileNotFound);
        assert_eq!(outcome.diagnostics.as_deref(), Some("Missing executable file"));
        Ok(())
    }

    #[test]
    fn compare_missing_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let actual = dir.path().join("output.txt");
        let s = submission("sum.cpp").with_actual_output(&actual);
        assert_eq!(s.compare()?.status, Status::FileNotFound);

        fs::write(&actual, "5\n")?;
        let s = s.with_expected_output(Some(dir.path().join("missing.txt")));
        let outcome = s.compare()?;
        assert_eq!(outcome.status, Status::FileNotFound);
        assert_eq!(outcome.diagnostics.as_deref(), Some("Missing output files"));
        Ok(())
    }

    #[test]
    fn compare_verdicts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let actual = dir.path().join("output.txt");
        let expected = dir.path().join("expected.txt");
        fs::write(&expected, "5\n")?;
        let s = submission("sum.cpp")
            .with_actual_output(&actual)
            .with_expected_output(Some(expected));

        fs::write(&actual, "5\n")?;
        assert_eq!(s.compare()?, StageOutcome::plain(Status::Accepted));

        fs::write(&actual, "5")?;
        assert_eq!(s.compare()?, StageOutcome::plain(Status::WrongAnswer));
        Ok(())
    }

    #[test]
    fn failure_text_never_empty() -> Result<()> {
        let mut command = std::process::Command::new("sh");
        command.arg("-c").arg("exit 7");
        let bio = ProcessProbe::launch(command, Source::Empty, Sink::Capture)?.watching(None)?;
        assert_eq!(failure_text(&bio), "process exited with status 7");
        Ok(())
    }
}
