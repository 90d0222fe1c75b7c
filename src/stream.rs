//! Splitting a whole `.sup` buffer into display sets.

use std::sync::mpsc;

use threadpool::ThreadPool;

use crate::display_set::{Assembler, DisplaySet};
use crate::error::{Error, Result};
use crate::options::DecodeOptions;
use crate::parser::parse::{self, MAGIC};
use crate::parser::types::SegmentType;
use crate::parser::{decode_segment, ByteCursor};

/// A display set that could not be decoded.
#[derive(Debug)]
pub struct UnitFailure {
    /// Position of the unit among all units found in the stream.
    pub index: usize,
    /// Byte offset the unit started at.
    pub offset: usize,
    pub error: Error,
}

/// Outcome of decoding a whole stream.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub display_sets: Vec<DisplaySet>,
    pub failures: Vec<UnitFailure>,
}

/// Offset of the next "PG" at or after `from`.
fn find_magic(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(MAGIC.len())
        .position(|w| w == MAGIC)
        .map(|p| from + p)
}

/// Decodes the display set starting at or after `start`, returning it and
/// the number of bytes from `start` through its End segment.
pub fn decode_display_set(bytes: &[u8], start: usize) -> Result<(DisplaySet, usize)> {
    decode_display_set_with(bytes, start, &DecodeOptions::default())
}

pub fn decode_display_set_with(
    bytes: &[u8],
    start: usize,
    options: &DecodeOptions,
) -> Result<(DisplaySet, usize)> {
    let mut assembler = Assembler::new(options);
    let mut pos = start;

    while pos < bytes.len() {
        // Step over stray bytes until a segment start lines up.
        if !bytes[pos..].starts_with(MAGIC) {
            pos += 1;
            continue;
        }

        let (segment, consumed) = decode_segment(&bytes[pos..])?;
        pos += consumed;
        if assembler.push(segment)? {
            return Ok((assembler.finish()?, pos - start));
        }
    }

    Err(Error::CreateFailure("input ended before the end segment"))
}

/// Whether the size field of the header at `pos` can be trusted to step to
/// the next segment. A header with an unknown type is only trusted when its
/// size lands on another "PG" or on the end of the buffer; otherwise it is
/// stray bytes that happen to read "PG".
fn frames_segment(bytes: &[u8], pos: usize, header: &parse::Header) -> bool {
    if SegmentType::from_tag(header.tag).is_some() {
        return true;
    }
    let next = pos + parse::HEADER_SIZE + usize::from(header.size);
    next == bytes.len() || bytes.get(next..).map_or(false, |rest| rest.starts_with(MAGIC))
}

/// Length from `start` through the next End segment, found by walking
/// segment headers only. Runs to the end of `bytes` if no End is found.
///
/// A stray "PG" ends the walk: the extent stops in front of it, or covers
/// just its first byte when the walk starts on it.
pub fn display_set_extent(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;

    while pos < bytes.len() {
        let rest = &bytes[pos..];
        if !rest.starts_with(MAGIC) {
            pos += 1;
            continue;
        }

        let mut cursor = ByteCursor::new(rest);
        let header = match cursor
            .take(MAGIC.len(), "magic")
            .and_then(|_| cursor.parse(parse::header))
        {
            Ok(header) => header,
            Err(_) => return bytes.len().saturating_sub(start),
        };
        if !frames_segment(bytes, pos, &header) {
            debug!("stray segment header at 0x{:x}", pos);
            return (pos - start).max(1);
        }

        pos = (pos + parse::HEADER_SIZE + usize::from(header.size)).min(bytes.len());
        if header.tag == SegmentType::End.tag() {
            break;
        }
    }

    pos.saturating_sub(start)
}

/// Decodes every display set in `bytes`. Units that fail are logged and
/// skipped.
pub fn decode_all_display_sets(bytes: &[u8]) -> Vec<DisplaySet> {
    decode_all_display_sets_with(bytes, &DecodeOptions::default()).display_sets
}

pub fn decode_all_display_sets_with(bytes: &[u8], options: &DecodeOptions) -> BatchReport {
    let mut report = BatchReport::default();
    let mut pos = 0;
    let mut index = 0;

    while let Some(offset) = find_magic(bytes, pos) {
        match decode_display_set_with(bytes, offset, options) {
            Ok((set, consumed)) => {
                report.display_sets.push(set);
                pos = offset + consumed;
            }
            Err(error) => {
                warn!("display set {} at 0x{:x}: {}", index, offset, error);
                pos = offset + display_set_extent(bytes, offset).max(1);
                report.failures.push(UnitFailure {
                    index,
                    offset,
                    error,
                });
            }
        }
        index += 1;
    }

    debug!(
        "decoded {} display sets, {} failed",
        report.display_sets.len(),
        report.failures.len()
    );
    report
}

/// Byte ranges of each display set, as `(offset, len)`.
fn split_units(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut units = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find_magic(bytes, pos) {
        let len = display_set_extent(bytes, offset).max(1);
        units.push((offset, len));
        pos = offset + len;
    }
    units
}

/// Like [`decode_all_display_sets_with`], with each display set decoded on
/// a pool of `options.workers` threads. Results come back in stream order.
pub fn decode_all_display_sets_parallel(bytes: &[u8], options: &DecodeOptions) -> BatchReport {
    let units = split_units(bytes);
    let pool = ThreadPool::new(options.workers.max(1));
    let (tx, rx) = mpsc::channel();

    for (index, &(offset, len)) in units.iter().enumerate() {
        // Keep a whole header so a stray one fails the way it does in order.
        let end = (offset + len).max((offset + parse::HEADER_SIZE).min(bytes.len()));
        let chunk = bytes[offset..end].to_vec();
        let options = options.clone();
        let tx = tx.clone();
        pool.execute(move || {
            let result = decode_display_set_with(&chunk, 0, &options).map(|(set, _)| set);
            // The receiver only goes away once every job has reported.
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let mut results: Vec<(usize, Result<DisplaySet>)> = rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);

    let mut report = BatchReport::default();
    for (index, result) in results {
        match result {
            Ok(set) => report.display_sets.push(set),
            Err(error) => {
                let offset = units[index].0;
                warn!("display set {} at 0x{:x}: {}", index, offset, error);
                report.failures.push(UnitFailure {
                    index,
                    offset,
                    error,
                });
            }
        }
    }
    report
}
