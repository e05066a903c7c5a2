use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{error::Result, verdict::Status};

const CHUNK: usize = 8 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum ComparisionResult {
    Same,
    Different,
}

impl From<ComparisionResult> for Status {
    fn from(v: ComparisionResult) -> Self {
        match v {
            ComparisionResult::Same => Status::Accepted,
            ComparisionResult::Different => Status::WrongAnswer,
        }
    }
}

/// Byte-for-byte file comparison. Whitespace and trailing newlines count.
pub fn compare_files(actual: &Path, expected: &Path) -> Result<ComparisionResult> {
    let actual = File::open(actual)?;
    let expected = File::open(expected)?;

    if actual.metadata()?.len() != expected.metadata()?.len() {
        return Ok(ComparisionResult::Different);
    }

    let mut actual = BufReader::new(actual);
    let mut expected = BufReader::new(expected);
    let mut buf1 = [0u8; CHUNK];
    let mut buf2 = [0u8; CHUNK];

    loop {
        let n = read_full(&mut actual, &mut buf1)?;
        let m = read_full(&mut expected, &mut buf2)?;
        if n != m || buf1[..n] != buf2[..m] {
            return Ok(ComparisionResult::Different);
        }
        if n == 0 {
            return Ok(ComparisionResult::Same);
        }
    }
}

// a short read from one side must not look like a mismatch
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn check(a: &[u8], b: &[u8]) -> ComparisionResult {
        let dir = tempfile::tempdir().unwrap();
        let actual = dir.path().join("actual");
        let expected = dir.path().join("expected");
        fs::write(&actual, a).unwrap();
        fs::write(&expected, b).unwrap();
        compare_files(&actual, &expected).unwrap()
    }

    #[test]
    fn identical() {
        assert_eq!(check(b"5\n", b"5\n"), ComparisionResult::Same);
        assert_eq!(check(b"", b""), ComparisionResult::Same);
    }

    #[test]
    fn whitespace_is_significant() {
        assert_eq!(check(b"5", b"5\n"), ComparisionResult::Different);
        assert_eq!(check(b"5 \n", b"5\n"), ComparisionResult::Different);
        assert_eq!(check(b"5\r\n", b"5\n"), ComparisionResult::Different);
        assert_eq!(check(b"4\n", b"5\n"), ComparisionResult::Different);
    }

    #[test]
    fn large_files() {
        let mut a = vec![b'x'; 3 * CHUNK + 17];
        assert_eq!(check(&a, &a.clone()), ComparisionResult::Same);
        let b = a.clone();
        a[2 * CHUNK + 3] = b'y';
        assert_eq!(check(&a, &b), ComparisionResult::Different);
    }

    #[test]
    fn verdicts() {
        assert_eq!(Status::from(ComparisionResult::Same), Status::Accepted);
        assert_eq!(Status::from(ComparisionResult::Different), Status::WrongAnswer);
    }
}
