use nom::{
    error::VerboseError,
    number::complete::{be_u16, be_u24, be_u32, be_u8},
    IResult,
};

use crate::error::{Error, IResultExt, Result};

/// Bounds-checked big-endian reader over a byte slice.
///
/// Every read either advances the offset by the width of the value or fails
/// with [`Error::TruncatedInput`], leaving the offset untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread part of the input.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.parse(be_u8).map_err(|_| truncated("u8"))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.parse(be_u16).map_err(|_| truncated("u16"))
    }

    /// Reads a 24-bit value, widened to 32 bits.
    pub fn read_u24(&mut self) -> Result<u32> {
        self.parse(be_u24).map_err(|_| truncated("u24"))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.parse(be_u32).map_err(|_| truncated("u32"))
    }

    /// Borrows the next `n` bytes.
    pub fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::TruncatedInput { context });
        }
        let taken = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(taken)
    }

    /// Runs a `nom` parser over the unread input and advances past whatever
    /// it consumed.
    pub(crate) fn parse<O, F>(&mut self, mut parser: F) -> Result<O>
    where
        F: FnMut(&'a [u8]) -> IResult<&'a [u8], O, VerboseError<&'a [u8]>>,
    {
        let input = self.rest();
        let (rest, out) = parser(input).into_pgs_result()?;
        self.pos += input.len() - rest.len();
        Ok(out)
    }
}

fn truncated(context: &'static str) -> Error {
    Error::TruncatedInput { context }
}
