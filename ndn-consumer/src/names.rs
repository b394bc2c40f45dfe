//! NDN names in URI form and the request list read from the input file.

use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// An NDN name: an ordered list of opaque components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Name {
    components: Vec<Vec<u8>>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> impl Iterator<Item = &[u8]> {
        self.components.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn push(mut self, component: impl Into<Vec<u8>>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Whether `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a == b)
    }
}

/// Error returned for a malformed NDN URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNameError {
    /// The URI does not start with `/` (after an optional `ndn:`).
    NotAbsolute,
    /// A `%` escape is not followed by two hex digits.
    BadEscape,
    /// `.` and `..` are not valid component encodings.
    DotComponent,
    /// `//` inside the name.
    EmptyComponent,
}

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNameError::NotAbsolute => write!(f, "name must start with '/'"),
            ParseNameError::BadEscape => write!(f, "invalid percent escape"),
            ParseNameError::DotComponent => write!(f, "'.' and '..' are not valid components"),
            ParseNameError::EmptyComponent => write!(f, "empty component"),
        }
    }
}

impl std::error::Error for ParseNameError {}

impl FromStr for Name {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("ndn:").unwrap_or(s);
        let path = s.strip_prefix('/').ok_or(ParseNameError::NotAbsolute)?;
        let path = path.strip_suffix('/').unwrap_or(path);

        let mut name = Name::new();
        if path.is_empty() {
            return Ok(name);
        }
        for part in path.split('/') {
            name.components.push(decode_component(part)?);
        }
        Ok(name)
    }
}

fn decode_component(part: &str) -> Result<Vec<u8>, ParseNameError> {
    if part.is_empty() {
        return Err(ParseNameError::EmptyComponent);
    }
    if part.bytes().all(|b| b == b'.') {
        // "..." encodes the empty component; each extra period is kept.
        return match part.len() {
            1 | 2 => Err(ParseNameError::DotComponent),
            n => Ok(vec![b'.'; n - 3]),
        };
    }

    let bytes = part.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .ok_or(ParseNameError::BadEscape)?;
            let hex = std::str::from_utf8(hex).map_err(|_| ParseNameError::BadEscape)?;
            out.push(u8::from_str_radix(hex, 16).map_err(|_| ParseNameError::BadEscape)?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl fmt::Display for Name {
    /// Canonical URI form: unreserved characters verbatim, everything else
    /// percent-encoded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/")?;
            if component.iter().all(|b| *b == b'.') {
                write!(f, "...")?;
            }
            for b in component {
                match b {
                    b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                        write!(f, "{}", *b as char)?
                    }
                    _ => write!(f, "%{:02X}", b)?,
                }
            }
        }
        Ok(())
    }
}

/// Error loading the request list.
#[derive(Debug)]
pub enum RequestListError {
    Io(std::io::Error),
    Malformed { line: usize, source: ParseNameError },
    /// The input holds no names.
    Empty,
}

impl fmt::Display for RequestListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestListError::Io(e) => write!(f, "cannot read input: {e}"),
            RequestListError::Malformed { line, source } => {
                write!(f, "input line {line}: {source}")
            }
            RequestListError::Empty => write!(f, "input contains no names"),
        }
    }
}

impl std::error::Error for RequestListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestListError::Io(e) => Some(e),
            RequestListError::Malformed { source, .. } => Some(source),
            RequestListError::Empty => None,
        }
    }
}

impl From<std::io::Error> for RequestListError {
    fn from(e: std::io::Error) -> Self {
        RequestListError::Io(e)
    }
}

/// Names to request, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestList {
    names: Vec<Name>,
}

impl RequestList {
    /// Read one name per line. Blank lines and `#` comments are skipped.
    pub fn load(path: &Path) -> Result<Self, RequestListError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, RequestListError> {
        let mut names = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let name: Name = line
                .parse()
                .map_err(|source| RequestListError::Malformed {
                    line: idx + 1,
                    source,
                })?;
            names.push(name);
        }
        if names.is_empty() {
            return Err(RequestListError::Empty);
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
