use std::collections::BTreeMap;

use nom::{
    combinator::{flat_map, map, map_opt, rest},
    error::{context, ContextError, ErrorKind, ParseError},
    multi::count,
    number::complete::{be_u16, be_u24, be_u32, be_u8},
    sequence::tuple,
    IResult,
};

use crate::parser::types::*;

pub(crate) const MAGIC: &[u8; 2] = b"PG";

/// Magic, two timestamps, type tag and payload size.
pub(crate) const HEADER_SIZE: usize = 13;

const COMPOSITION_OBJECT_MIN_SIZE: usize = 8;
const PALETTE_ENTRY_SIZE: usize = 5;

/// Segment header fields following the magic.
#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) struct Header {
    pub pts: Timestamp,
    pub dts: Timestamp,
    pub tag: u8,
    pub size: u16,
}

fn timestamp<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], Timestamp, E> {
    map(be_u32, Timestamp::from)(i)
}

fn flag_byte<'a, E: ParseError<&'a [u8]>>(
    t_val: u8,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], bool, E> {
    map(be_u8, move |b| b == t_val)
}

fn truncated<'a, O, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], O, E> {
    Err(nom::Err::Error(E::from_error_kind(i, ErrorKind::Eof)))
}

pub(crate) fn header<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], Header, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    map(
        tuple((
            context("pts", timestamp),
            context("dts", timestamp),
            context("segment_type", be_u8),
            context("segment_size", be_u16),
        )),
        |(pts, dts, tag, size)| Header { pts, dts, tag, size },
    )(i)
}

pub(crate) fn presentation_composition<'a, E>(
    i: &'a [u8],
) -> IResult<&'a [u8], PresentationComposition, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    map(
        tuple((
            context("width", be_u16),
            context("height", be_u16),
            context("frame_rate", be_u8),
            context("composition_number", be_u16),
            context(
                "composition_state",
                map_opt(be_u8, CompositionState::from_byte),
            ),
            context("palette_update", flag_byte(0x80)),
            context("palette_id", be_u8),
            flat_map(context("object_count", be_u8), |n_obj| {
                count(
                    context("composition_object", composition_object),
                    usize::from(n_obj),
                )
            }),
        )),
        |(width, height, frame_rate, number, state, palette_update, palette_id, objects)| {
            PresentationComposition {
                width,
                height,
                frame_rate,
                number,
                state,
                palette_update,
                palette_id,
                objects,
            }
        },
    )(i)
}

fn composition_object<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], CompositionObject, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    if i.len() < COMPOSITION_OBJECT_MIN_SIZE {
        return truncated(i);
    }

    let (i1, (id, window_id, is_crop, x, y)) = tuple((
        context("object_id", be_u16),
        context("window_id", be_u8),
        context("is_crop", flag_byte(0x40)),
        context("x", be_u16),
        context("y", be_u16),
    ))(i)?;

    let (i2, crop) = if is_crop {
        map(
            tuple((
                context("crop_x", be_u16),
                context("crop_y", be_u16),
                context("crop_w", be_u16),
                context("crop_h", be_u16),
            )),
            |(x, y, width, height)| CompositionObjectCrop::Cropped { x, y, width, height },
        )(i1)
    } else {
        Ok((i1, CompositionObjectCrop::NotCropped))
    }?;

    Ok((
        i2,
        CompositionObject {
            id,
            window_id,
            x,
            y,
            crop,
        },
    ))
}

pub(crate) fn window_definition<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], WindowDefinition, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    map(
        flat_map(context("num_windows", be_u8), |n| {
            count(context("window", window_object), usize::from(n))
        }),
        |windows| WindowDefinition { windows },
    )(i)
}

fn window_object<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], WindowObject, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    map(
        tuple((
            context("id", be_u8),
            context("x", be_u16),
            context("y", be_u16),
            context("width", be_u16),
            context("height", be_u16),
        )),
        |(id, x, y, width, height)| WindowObject { id, x, y, width, height },
    )(i)
}

pub(crate) fn palette_definition<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], PaletteDefinition, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    let (i, (id, version)) = tuple((context("id", be_u8), context("version", be_u8)))(i)?;
    let n_entries = i.len() / PALETTE_ENTRY_SIZE;
    let (i, list) = count(context("palette_entry", palette_entry), n_entries)(i)?;

    // A repeated id replaces the earlier entry.
    let mut entries = BTreeMap::new();
    for entry in list {
        entries.insert(entry.id, entry);
    }

    // Fewer than five stray bytes can't hold another entry.
    let (i, leftover) = rest(i)?;
    if !leftover.is_empty() {
        debug!("palette {} ignores {} trailing bytes", id, leftover.len());
    }

    Ok((i, PaletteDefinition { id, version, entries }))
}

fn palette_entry<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], PaletteEntry, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    map(
        tuple((
            context("id", be_u8),
            context("y", be_u8),
            context("Cr", be_u8),
            context("Cb", be_u8),
            context("a", be_u8),
        )),
        |(id, y, cr, cb, a)| PaletteEntry {
            id,
            color: YCrCbAColor { y, cr, cb, a },
        },
    )(i)
}

pub(crate) fn object_definition<'a, E>(i: &'a [u8]) -> IResult<&'a [u8], ObjectDefinition, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    let (after_info, (id, version, flag_raw, data_length, width, height)) = tuple((
        context("id", be_u16),
        context("version", be_u8),
        context("sequence_flag", be_u8),
        context("data_length", be_u24),
        context("width", be_u16),
        context("height", be_u16),
    ))(i)?;

    // The compressed bitmap is kept as-is and only decoded on request.
    let (rest, data_raw) = rest(after_info)?;

    Ok((
        rest,
        ObjectDefinition {
            id,
            version,
            sequence: SequenceFlag::from_byte(flag_raw),
            data_length,
            width,
            height,
            data_raw: data_raw.to_vec(),
        },
    ))
}

/// A single token of the object bitmap's run-length encoding.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum RleEntry {
    Single(u8),

    Repeated { count: u16, color: u8 },

    /// Repeat `color` up to the end of the current row.
    FillLine { color: u8 },

    EndOfLine,
}

pub(crate) fn rle_entry<'a, E: ParseError<&'a [u8]>>(
    i: &'a [u8],
) -> IResult<&'a [u8], RleEntry, E> {
    let (i, b0) = be_u8(i)?;
    if b0 != 0x00 {
        return Ok((i, RleEntry::Single(b0)));
    }

    let (i, b1) = be_u8(i)?;
    if b1 == 0x00 {
        return Ok((i, RleEntry::EndOfLine));
    }

    // bit 6 selects the 14-bit length form
    let long_run = b1 & 0x40 != 0;
    let (i, count) = if long_run {
        let (i, low) = be_u8(i)?;
        (i, (u16::from(b1 & 0x3f) << 8) | u16::from(low))
    } else {
        (i, u16::from(b1 & 0x3f))
    };

    // bit 7 says a color byte follows, otherwise the color is 0
    let (i, color) = if b1 & 0x80 != 0 { be_u8(i)? } else { (i, 0) };

    if !long_run && count == 0 {
        Ok((i, RleEntry::FillLine { color }))
    } else {
        Ok((i, RleEntry::Repeated { count, color }))
    }
}
