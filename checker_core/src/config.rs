use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    error::{Error, Result},
    submission::{Submission, DEFAULT_OUTPUT_FILE},
    toolchain::Toolchain,
};

fn default_time_limit() -> f64 {
    1.0
}

fn default_check() -> bool {
    true
}

fn default_output_file() -> PathBuf {
    DEFAULT_OUTPUT_FILE.into()
}

fn default_work_dir() -> PathBuf {
    ".".into()
}

/// Everything needed to grade one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub source: PathBuf,
    pub input: Option<PathBuf>,
    #[serde(rename = "expectedOutput")]
    pub expected_output: Option<PathBuf>,
    /// Seconds, fractions allowed.
    #[serde(rename = "timeLimit", default = "default_time_limit")]
    pub time_limit: f64,
    #[serde(default = "default_check")]
    pub check: bool,
    #[serde(rename = "outputFile", default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(rename = "workDir", default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub toolchain: Toolchain,
}

impl CheckerConfig {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            input: None,
            expected_output: None,
            time_limit: default_time_limit(),
            check: default_check(),
            output_file: default_output_file(),
            work_dir: default_work_dir(),
            toolchain: Toolchain::default(),
        }
    }

    fn from_string(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a config file, relative paths inside it are taken from its directory.
    pub fn from_file(path: &str) -> Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            return Err(Error::NotFound(path.to_string_lossy().into()));
        }
        let content = fs::read_to_string(path)?;
        let mut v = Self::from_string(&content)?;

        let base = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        v.source = find_relative_path(&base, &v.source);
        v.input = v.input.map(|p| find_relative_path(&base, &p));
        v.expected_output = v.expected_output.map(|p| find_relative_path(&base, &p));
        v.output_file = find_relative_path(&base, &v.output_file);
        v.work_dir = find_relative_path(&base, &v.work_dir);

        Ok(v)
    }

    pub fn time_limit(&self) -> Result<Duration> {
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            return Err(Error::Argument(format!(
                "time limit must be a positive number of seconds, got {}",
                self.time_limit
            )));
        }
        Duration::try_from_secs_f64(self.time_limit).map_err(|e| {
            Error::Argument(format!("time limit {} is out of range: {}", self.time_limit, e))
        })
    }

    /// Builds the (not yet validated) submission.
    pub fn submission(&self) -> Result<Submission> {
        Ok(Submission::new(&self.source, self.time_limit()?)?
            .with_input(self.input.clone())
            .with_expected_output(self.expected_output.clone())
            .with_actual_output(&self.output_file)
            .with_work_dir(&self.work_dir)
            .with_toolchain(self.toolchain.clone()))
    }
}

fn find_relative_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
