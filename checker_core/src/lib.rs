//! Single-submission grader: compile a C, C++ or Java source, run it against
//! an input under a wall-clock limit and compare its output byte for byte.

pub mod compare;
pub mod config;
pub mod error;
pub mod language;
pub mod pipeline;
pub mod probe;
pub mod submission;
pub mod toolchain;
pub mod verdict;

pub use config::CheckerConfig;
pub use pipeline::{codechecker, grade, ConsoleReporter, GradeReport, PipelineState, Reporter, Stage};
pub use submission::{StageOutcome, Submission};
pub use verdict::{label_for, Status};
