use crate::dir_entry::normalize_name;
use crate::error::{ErrorKind, FsError};

/// One step of a parsed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// `.`
    Current,
    /// `..`
    Parent,
    /// A normalised 8.3 name.
    Name([u8; 11]),
}

/// A split and normalised path. Paths are absolute; the leading `/` is
/// implied and optional, and `\` is tolerated as a separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub components: Vec<Component>,
    /// A trailing `/` requires the target to be a directory.
    pub must_be_dir: bool,
}

pub fn parse_path(path: &str) -> Result<ParsedPath, FsError> {
    let folded = path.replace('\\', "/");
    let trimmed = folded.trim();
    let must_be_dir = trimmed.ends_with('/');
    let mut components = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" => continue,
            "." => components.push(Component::Current),
            ".." => components.push(Component::Parent),
            name => components.push(Component::Name(normalize_name(name)?)),
        }
    }
    Ok(ParsedPath {
        components,
        must_be_dir,
    })
}

impl ParsedPath {
    /// True for paths that name the root directory itself.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Splits off the final component for operations that target an entry
    /// within a directory. Fails `BadName` when the path names the root or
    /// ends in `.`/`..`.
    pub fn split_leaf(mut self) -> Result<(Vec<Component>, [u8; 11], bool), FsError> {
        match self.components.pop() {
            Some(Component::Name(name11)) => Ok((self.components, name11, self.must_be_dir)),
            Some(_) => Err(FsError::new(
                ErrorKind::BadName,
                "path may not end in . or ..",
            )),
            None => Err(FsError::new(
                ErrorKind::BadName,
                "the root directory is not an entry",
            )),
        }
    }
}
