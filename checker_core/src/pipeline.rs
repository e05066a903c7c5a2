use std::io::{self, Stderr, Stdout, Write};

use log::debug;

use crate::{
    config::CheckerConfig,
    error::{Error, Result},
    submission::{StageOutcome, Submission},
    verdict::{label_for, Status},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Run,
    Compare,
}

impl Stage {
    pub fn verb(self) -> &'static str {
        match self {
            Stage::Compile => "Compiling",
            Stage::Run => "Running",
            Stage::Compare => "Verdict",
        }
    }

    fn execute(self, submission: &Submission) -> Result<StageOutcome> {
        match self {
            Stage::Compile => submission.compile(),
            Stage::Run => submission.run(),
            Stage::Compare => submission.compare(),
        }
    }
}

/// Where one submission stands.
///
/// `Validated → Compiled → Ran → Compared`, any failing stage moves to
/// `Aborted` and nothing runs after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Validated,
    Compiled,
    Ran,
    Compared(Status),
    Aborted { stage: Stage, outcome: StageOutcome },
}

impl PipelineState {
    /// Stage to run next, `None` once terminal. Without `check` the
    /// pipeline stops after a successful run.
    pub fn next_stage(&self, check: bool) -> Option<Stage> {
        match self {
            PipelineState::Validated => Some(Stage::Compile),
            PipelineState::Compiled => Some(Stage::Run),
            PipelineState::Ran if check => Some(Stage::Compare),
            _ => None,
        }
    }

    pub fn advance(self, stage: Stage, outcome: &StageOutcome) -> PipelineState {
        match (stage, outcome.status) {
            (Stage::Compare, status @ Status::Accepted)
            | (Stage::Compare, status @ Status::WrongAnswer) => PipelineState::Compared(status),
            (Stage::Compile, Status::Ok) => PipelineState::Compiled,
            (Stage::Run, Status::Ok) => PipelineState::Ran,
            _ => PipelineState::Aborted {
                stage,
                outcome: outcome.clone(),
            },
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, PipelineState::Aborted { .. })
    }
}

/// Receives stage results as they happen.
pub trait Reporter {
    fn started(&mut self, submission: &Submission) -> Result<()>;
    fn stage_finished(&mut self, stage: Stage, outcome: &StageOutcome) -> Result<()>;
}

/// Prints `<Verb>... <LABEL>(<CODE>)` lines, diagnostics go to the error stream.
pub struct ConsoleReporter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl ConsoleReporter<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
    fn started(&mut self, _submission: &Submission) -> Result<()> {
        writeln!(self.out, "Executing code checker...")?;
        self.out.flush()?;
        Ok(())
    }

    fn stage_finished(&mut self, stage: Stage, outcome: &StageOutcome) -> Result<()> {
        let code = outcome.status.code();
        writeln!(self.out, "{}... {}({})", stage.verb(), label_for(code)?, code)?;
        self.out.flush()?;

        if let Some(diagnostics) = &outcome.diagnostics {
            writeln!(self.err, "{}", diagnostics)?;
            self.err.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GradeReport {
    pub stages: Vec<(Stage, StageOutcome)>,
    pub state: PipelineState,
}

impl GradeReport {
    /// Status of the last stage that ran.
    pub fn final_status(&self) -> Option<Status> {
        self.stages.last().map(|(_, outcome)| outcome.status)
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.stages.iter().map(|(_, outcome)| outcome.status).collect()
    }
}

/// Runs compile, run and (with `check`) compare, stopping at the first failure.
pub fn grade(
    submission: &Submission,
    check: bool,
    reporter: &mut dyn Reporter,
) -> Result<GradeReport> {
    if submission.language().is_none() {
        return Err(Error::InvalidFile(
            submission.source_path().to_string_lossy().into(),
        ));
    }

    reporter.started(submission)?;

    let mut state = PipelineState::Validated;
    let mut stages = Vec::new();
    while let Some(stage) = state.next_stage(check) {
        let outcome = stage.execute(submission)?;
        reporter.stage_finished(stage, &outcome)?;
        state = state.advance(stage, &outcome);
        debug!("{:?} -> {:?}", stage, state);
        stages.push((stage, outcome));
    }

    Ok(GradeReport { stages, state })
}

/// Validates and grades the submission described by `config`.
pub fn codechecker(config: &CheckerConfig, reporter: &mut dyn Reporter) -> Result<GradeReport> {
    let mut submission = config.submission()?;
    if !submission.validate()? {
        return Err(Error::InvalidFile(
            submission.source_path().to_string_lossy().into(),
        ));
    }
    grade(&submission, config.check, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reducer_happy_path() {
        let ok = StageOutcome::plain(Status::Ok);
        let state = PipelineState::Validated;
        assert_eq!(state.next_stage(true), Some(Stage::Compile));

        let state = state.advance(Stage::Compile, &ok);
        assert_eq!(state, PipelineState::Compiled);
        assert_eq!(state.next_stage(true), Some(Stage::Run));

        let state = state.advance(Stage::Run, &ok);
        assert_eq!(state, PipelineState::Ran);
        assert_eq!(state.next_stage(true), Some(Stage::Compare));
        assert_eq!(state.next_stage(false), None);

        let state = state.advance(Stage::Compare, &StageOutcome::plain(Status::Accepted));
        assert_eq!(state, PipelineState::Compared(Status::Accepted));
        assert_eq!(state.next_stage(true), None);
    }

    #[test]
    fn reducer_aborts_on_failure() {
        let failed = StageOutcome::failure(Status::CompilationError, "error: expected ';'");
        let state = PipelineState::Validated.advance(Stage::Compile, &failed);
        assert!(state.is_aborted());
        assert_eq!(state.next_stage(true), None);

        let missing = StageOutcome::failure(Status::FileNotFound, "Missing output files");
        let state = PipelineState::Ran.advance(Stage::Compare, &missing);
        assert!(matches!(
            state,
            PipelineState::Aborted { stage: Stage::Compare, .. }
        ));
    }

    #[test]
    fn wrong_answer_ends_compared() {
        let state =
            PipelineState::Ran.advance(Stage::Compare, &StageOutcome::plain(Status::WrongAnswer));
        assert_eq!(state, PipelineState::Compared(Status::WrongAnswer));
    }

    #[test]
    fn console_lines() -> Result<()> {
        let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
        reporter.stage_finished(Stage::Compile, &StageOutcome::plain(Status::Ok))?;
        reporter.stage_finished(
            Stage::Run,
            &StageOutcome::failure(Status::RuntimeError, "Segmentation fault"),
        )?;
        let (out, err) = reporter.into_inner();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "Compiling... OK(200)\nRunning... RUNTIME ERROR(402)\n"
        );
        assert_eq!(String::from_utf8_lossy(&err), "Segmentation fault\n");
        Ok(())
    }

    #[test]
    fn unvalidated_submission_is_refused() -> Result<()> {
        let submission = Submission::new("sum.cpp", Duration::from_secs(1))?;
        let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
        let result = grade(&submission, true, &mut reporter);
        assert!(matches!(result, Err(Error::InvalidFile(_))));
        assert!(reporter.into_inner().0.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_file_runs_nothing() {
        let config = CheckerConfig::new("solution.rb");
        let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
        let result = codechecker(&config, &mut reporter);
        assert!(matches!(result, Err(Error::InvalidFile(_))));
        assert!(reporter.into_inner().0.is_empty());
    }
}
