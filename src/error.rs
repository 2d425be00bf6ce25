use core::fmt;

/// What went wrong, independent of the human-readable detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Exists,
    BadName,
    NotADirectory,
    IsADirectory,
    ReadOnly,
    BadSize,
    NoSpace,
    DirFull,
    DirNotEmpty,
    BadImage,
    UnsupportedGeometry,
    CorruptDirectory,
    BadChain,
    BadCluster,
    OutOfRange,
    Invalidated,
}

/// Coarse partition of error kinds, useful for callers that only care
/// whether to blame the input, the disk, or the image contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserInput,
    Capacity,
    Corruption,
    Lifecycle,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::NotFound
            | ErrorKind::Exists
            | ErrorKind::BadName
            | ErrorKind::NotADirectory
            | ErrorKind::IsADirectory
            | ErrorKind::ReadOnly
            | ErrorKind::BadSize => ErrorCategory::UserInput,
            ErrorKind::NoSpace | ErrorKind::DirFull | ErrorKind::DirNotEmpty => {
                ErrorCategory::Capacity
            }
            ErrorKind::BadImage
            | ErrorKind::UnsupportedGeometry
            | ErrorKind::CorruptDirectory
            | ErrorKind::BadChain
            | ErrorKind::BadCluster
            | ErrorKind::OutOfRange => ErrorCategory::Corruption,
            ErrorKind::Invalidated => ErrorCategory::Lifecycle,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Exists => "already exists",
            ErrorKind::BadName => "bad name",
            ErrorKind::NotADirectory => "not a directory",
            ErrorKind::IsADirectory => "is a directory",
            ErrorKind::ReadOnly => "read-only",
            ErrorKind::BadSize => "bad size",
            ErrorKind::NoSpace => "no space",
            ErrorKind::DirFull => "directory full",
            ErrorKind::DirNotEmpty => "directory not empty",
            ErrorKind::BadImage => "bad image",
            ErrorKind::UnsupportedGeometry => "unsupported geometry",
            ErrorKind::CorruptDirectory => "corrupt directory",
            ErrorKind::BadChain => "bad cluster chain",
            ErrorKind::BadCluster => "bad cluster number",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for every fallible operation in the crate: a kind tag plus a
/// human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsError {
    kind: ErrorKind,
    detail: String,
}

impl FsError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        FsError {
            kind,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for FsError {}
