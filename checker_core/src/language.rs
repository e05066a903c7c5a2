use std::{fmt, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// `<name>.<ext>`, the name becomes the artifact or class name.
pub const SOURCE_PATTERN: &str = r"^(\S+)\.(java|cpp|c)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" => Some(Language::C),
            "cpp" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    /// File name of what the compiler leaves behind for `base`.
    pub fn artifact_name(self, base: &str) -> String {
        match self {
            Language::C | Language::Cpp => base.to_string(),
            Language::Java => format!("{}.class", base),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    pub base_name: String,
    pub language: Language,
}

impl SourceName {
    /// Matches the source path against [`SOURCE_PATTERN`].
    pub fn parse(path: &Path) -> Result<Option<Self>> {
        let pattern = Regex::new(SOURCE_PATTERN)?;
        let path = path.to_string_lossy();

        let captures = match pattern.captures(&path) {
            Some(captures) => captures,
            None => return Ok(None),
        };

        let language = match Language::from_extension(&captures[2]) {
            Some(language) => language,
            None => return Ok(None),
        };

        Ok(Some(Self {
            base_name: captures[1].to_string(),
            language,
        }))
    }

    /// Last component of the base name; artifacts always land in the work directory.
    pub fn stem(&self) -> &str {
        Path::new(&self.base_name)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(&self.base_name)
    }
}
