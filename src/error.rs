//! Error and `Result` types shared by every decoding layer.

use nom::error::{ErrorKind as NomErrorKind, VerboseError, VerboseErrorKind};

/// Result type for PGS decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, independent of which field or layer raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fewer bytes were available than a field, count or length requires.
    TruncatedInput,
    /// Bad magic, unknown type tag, or a payload that disagrees with its header.
    MalformedHeader,
    /// Object parts arrived out of order.
    InvalidSequencing,
    /// An RLE run would have run past the declared row width.
    DecodeOverflow,
    /// A display set never reached its End segment.
    CreateFailure,
    /// Reading the input failed.
    Io,
}

/// Errors raised while decoding segments, display sets and bitmaps.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input ended unexpectedly while reading {context}")]
    TruncatedInput { context: &'static str },

    #[error("invalid segment magic {0:02x?}, expected \"PG\"")]
    BadMagic([u8; 2]),

    #[error("unknown segment type 0x{0:02x}")]
    UnknownSegmentType(u8),

    #[error("unknown composition state 0x{0:02x}")]
    UnknownCompositionState(u8),

    #[error("segment declares {declared} payload bytes but {consumed} were decoded")]
    SizeMismatch { declared: u16, consumed: usize },

    #[error("object sequencing fault: {0}")]
    InvalidSequencing(&'static str),

    #[error("row {row} overflowed its width, {dropped} pixels dropped")]
    DecodeOverflow { row: usize, dropped: usize },

    #[error("could not build display set: {0}")]
    CreateFailure(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TruncatedInput { .. } => ErrorKind::TruncatedInput,
            Error::BadMagic(_)
            | Error::UnknownSegmentType(_)
            | Error::UnknownCompositionState(_)
            | Error::SizeMismatch { .. } => ErrorKind::MalformedHeader,
            Error::InvalidSequencing(_) => ErrorKind::InvalidSequencing,
            Error::DecodeOverflow { .. } => ErrorKind::DecodeOverflow,
            Error::CreateFailure(_) => ErrorKind::CreateFailure,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Is this error fatal to the unit being decoded?
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::InvalidSequencing | ErrorKind::DecodeOverflow
        )
    }
}

/// Converts `nom` results into our own error type.
pub(crate) trait IResultExt<O> {
    fn into_pgs_result(self) -> Result<O>;
}

impl<'a, O> IResultExt<(&'a [u8], O)> for nom::IResult<&'a [u8], O, VerboseError<&'a [u8]>> {
    fn into_pgs_result(self) -> Result<(&'a [u8], O)> {
        match self {
            Ok(done) => Ok(done),
            Err(nom::Err::Incomplete(_)) => Err(Error::TruncatedInput { context: "payload" }),
            Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => Err(from_verbose(err)),
        }
    }
}

fn from_verbose(err: VerboseError<&[u8]>) -> Error {
    // Errors are pushed innermost first, so the first context is the most
    // specific field name.
    let context = err
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some(*ctx),
            _ => None,
        })
        .unwrap_or("payload");

    match err.errors.first() {
        Some((input, VerboseErrorKind::Nom(NomErrorKind::MapOpt))) => {
            match (context, input.first()) {
                ("composition_state", Some(state)) => Error::UnknownCompositionState(*state),
                _ => Error::TruncatedInput { context },
            }
        }
        _ => Error::TruncatedInput { context },
    }
}
