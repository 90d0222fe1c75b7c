//! Segment framing and payload decoding.

use nom::error::context;

use crate::error::{Error, Result};
use crate::parser::types::{Payload, Segment, SegmentType};

mod cursor;
pub(crate) mod parse;
pub mod types;

pub use self::cursor::ByteCursor;

/// Decodes one segment from the start of `bytes`, returning it along with
/// the number of bytes it occupied (header plus declared payload).
pub fn decode_segment(bytes: &[u8]) -> Result<(Segment, usize)> {
    let mut cursor = ByteCursor::new(bytes);
    let segment = read_segment(&mut cursor)?;
    Ok((segment, cursor.position()))
}

pub(crate) fn read_segment(cursor: &mut ByteCursor) -> Result<Segment> {
    let magic = cursor.take(2, "magic")?;
    if magic != parse::MAGIC {
        return Err(Error::BadMagic([magic[0], magic[1]]));
    }

    let header = cursor.parse(parse::header)?;
    let segment_type =
        SegmentType::from_tag(header.tag).ok_or(Error::UnknownSegmentType(header.tag))?;
    let body = cursor.take(usize::from(header.size), "segment payload")?;
    let payload = decode_payload(segment_type, body, header.size)?;

    trace!(
        "segment {:?}: pts={} dts={} size={}",
        segment_type,
        header.pts,
        header.dts,
        header.size
    );

    Ok(Segment {
        pts: header.pts,
        dts: header.dts,
        segment_type,
        size: header.size,
        payload,
    })
}

fn decode_payload(segment_type: SegmentType, body: &[u8], size: u16) -> Result<Payload> {
    let mut payload = ByteCursor::new(body);
    let decoded = match segment_type {
        SegmentType::PresentationComposition => Payload::PresentationComposition(
            payload.parse(context("pcs", parse::presentation_composition))?,
        ),
        SegmentType::WindowDefinition => {
            Payload::WindowDefinition(payload.parse(context("wds", parse::window_definition))?)
        }
        SegmentType::PaletteDefinition => {
            Payload::PaletteDefinition(payload.parse(context("pds", parse::palette_definition))?)
        }
        SegmentType::ObjectDefinition => {
            Payload::ObjectDefinition(payload.parse(context("ods", parse::object_definition))?)
        }
        SegmentType::End => Payload::End,
    };

    if !payload.is_empty() {
        return Err(Error::SizeMismatch {
            declared: size,
            consumed: payload.position(),
        });
    }

    Ok(decoded)
}
