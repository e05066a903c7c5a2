use std::fmt;

use crate::error::{Error, Result};

/// Whether a verdict lets the pipeline continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Success,
    Failure,
}

/// One row of the registry: numeric code, display label and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub code: u16,
    pub label: &'static str,
    pub category: Category,
}

/// Every status code a stage can produce. Codes are unique across stages.
pub static REGISTRY: [Verdict; 8] = [
    Verdict { code: 200, label: "OK", category: Category::Success },
    Verdict { code: 201, label: "ACCEPTED", category: Category::Success },
    Verdict { code: 400, label: "WRONG ANSWER", category: Category::Failure },
    Verdict { code: 401, label: "COMPILATION ERROR", category: Category::Failure },
    Verdict { code: 402, label: "RUNTIME ERROR", category: Category::Failure },
    Verdict { code: 403, label: "INVALID FILE", category: Category::Failure },
    Verdict { code: 404, label: "FILE NOT FOUND", category: Category::Failure },
    Verdict { code: 408, label: "TIME LIMIT EXCEEDED", category: Category::Failure },
];

/// Finds the registry row for `code`.
pub fn lookup(code: u16) -> Result<&'static Verdict> {
    REGISTRY
        .iter()
        .find(|v| v.code == code)
        .ok_or(Error::UnknownCode(code))
}

/// Label of a registered code, fails with `UnknownCode` for anything else.
pub fn label_for(code: u16) -> Result<&'static str> {
    Ok(lookup(code)?.label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Status {
    Ok = 200,
    Accepted = 201,
    WrongAnswer = 400,
    CompilationError = 401,
    RuntimeError = 402,
    InvalidFile = 403,
    FileNotFound = 404,
    TimeLimitExceeded = 408,
}

impl Status {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Accepted)
    }
}

impl TryFrom<u16> for Status {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        let status = match lookup(code)?.code {
            200 => Status::Ok,
            201 => Status::Accepted,
            400 => Status::WrongAnswer,
            401 => Status::CompilationError,
            402 => Status::RuntimeError,
            403 => Status::InvalidFile,
            404 => Status::FileNotFound,
            408 => Status::TimeLimitExceeded,
            other => return Err(Error::UnknownCode(other)),
        };
        Ok(status)
    }
}

impl fmt::Display for Status {
    /// Renders as `LABEL(CODE)`, e.g. `ACCEPTED(201)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = label_for(self.code()).map_err(|_| fmt::Error)?;
        write!(f, "{}({})", label, self.code())
    }
}
