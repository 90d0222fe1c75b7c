//! Assembling segments into display sets.

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::color::{color_table, ColorSpace};
use crate::error::{Error, Result};
use crate::options::DecodeOptions;
use crate::parser::types::{
    CompositionObject, ObjectDefinition, Payload, PaletteDefinition, PresentationComposition,
    Segment, SequenceFlag, Timestamp, WindowDefinition, WindowObject, TICKS_PER_MS,
};
use crate::rle::{decode_rle, Bitmap};

/// Object parts that arrived in an order the sequence flags don't allow.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SequencingFault {
    LastWithoutFirst,
    FirstWhilePending,
    ContinuationWithoutFirst,
}

impl SequencingFault {
    pub fn describe(self) -> &'static str {
        match self {
            SequencingFault::LastWithoutFirst => "last object part without a first part",
            SequencingFault::FirstWhilePending => "first object part while another is pending",
            SequencingFault::ContinuationWithoutFirst => {
                "continuation object part without a first part"
            }
        }
    }
}

/// One complete subtitle update: everything between a run of segments and
/// the End segment that closes it.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct DisplaySet {
    composition: Option<PresentationComposition>,
    windows: Option<WindowDefinition>,
    palette: Option<PaletteDefinition>,
    objects: [Option<ObjectDefinition>; 2],
    object_count: u8,
    pts: Timestamp,
    dts: Timestamp,
    warnings: Vec<SequencingFault>,
}

impl DisplaySet {
    pub fn composition(&self) -> Option<&PresentationComposition> {
        self.composition.as_ref()
    }

    pub fn composition_objects(&self) -> &[CompositionObject] {
        self.composition
            .as_ref()
            .map_or(&[][..], |pcs| &pcs.objects[..])
    }

    pub fn window_definition(&self) -> Option<&WindowDefinition> {
        self.windows.as_ref()
    }

    pub fn palette(&self) -> Option<&PaletteDefinition> {
        self.palette.as_ref()
    }

    /// The parts of the object, in sequence order: none, a single `Only`
    /// part, or `First` then `Last`.
    pub fn object_parts(&self) -> Vec<&ObjectDefinition> {
        self.objects[..usize::from(self.object_count)]
            .iter()
            .flatten()
            .collect()
    }

    /// The window that places this subtitle on screen.
    fn window(&self) -> Option<&WindowObject> {
        self.windows.as_ref().and_then(|wds| wds.windows.first())
    }

    pub fn x(&self) -> u16 {
        self.window().map_or(0, |w| w.x)
    }

    pub fn y(&self) -> u16 {
        self.window().map_or(0, |w| w.y)
    }

    pub fn width(&self) -> u16 {
        self.window().map_or(0, |w| w.width)
    }

    pub fn height(&self) -> u16 {
        self.window().map_or(0, |w| w.height)
    }

    /// Presentation time in 90kHz ticks.
    pub fn presentation_time(&self) -> Timestamp {
        self.pts
    }

    pub fn presentation_time_ms(&self) -> u32 {
        self.pts / TICKS_PER_MS
    }

    /// Decoding time in 90kHz ticks.
    pub fn decoding_time(&self) -> Timestamp {
        self.dts
    }

    pub fn decoding_time_ms(&self) -> u32 {
        self.dts / TICKS_PER_MS
    }

    /// Ordering problems that were tolerated while assembling this set.
    pub fn warnings(&self) -> &[SequencingFault] {
        &self.warnings
    }

    /// Does this set carry a complete object to draw?
    pub fn has_image(&self) -> bool {
        match self.object_count {
            1 => self.objects[0].is_some(),
            2 => self.objects.iter().all(Option::is_some),
            _ => false,
        }
    }

    /// Decodes the object bitmap, joining multi-part data in part order.
    pub fn decode_bitmap(&self) -> Result<Bitmap> {
        if !self.has_image() {
            return Err(Error::CreateFailure("display set has no complete object"));
        }
        let parts = self.object_parts();
        let head = parts[0];
        let bitmap = if parts.len() == 1 {
            decode_rle(&head.data_raw, head.width, head.height)?
        } else {
            let data: Vec<u8> = parts
                .iter()
                .flat_map(|part| part.data_raw.iter().copied())
                .collect();
            decode_rle(&data, head.width, head.height)?
        };
        if bitmap.clipped_pixels() > 0 {
            warn!(
                "object {} clipped {} pixels past its width",
                head.id,
                bitmap.clipped_pixels()
            );
        }
        Ok(bitmap)
    }

    /// Maps the decoded bitmap through the palette.
    pub fn render(&self, space: ColorSpace) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>> {
        let bitmap = self.decode_bitmap()?;
        let table = color_table(self.palette.as_ref(), space);
        Ok(ImageBuffer::from_fn(
            u32::from(bitmap.width()),
            u32::from(bitmap.height()),
            |x, y| table[usize::from(bitmap.get(x, y).unwrap_or(0))],
        ))
    }

    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        self.render(ColorSpace::Rgba)
    }
}

/// Builds a [`DisplaySet`] one segment at a time.
#[derive(Debug)]
pub struct Assembler {
    set: DisplaySet,
    pending: bool,
    finished: bool,
    strict: bool,
}

impl Assembler {
    pub fn new(options: &DecodeOptions) -> Assembler {
        Assembler {
            set: DisplaySet::default(),
            pending: false,
            finished: false,
            strict: options.strict_sequencing,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Folds `segment` into the set. Returns `true` once the End segment has
    /// been seen; segments after that are ignored.
    pub fn push(&mut self, segment: Segment) -> Result<bool> {
        if self.finished {
            debug!("ignoring {:?} after end of display set", segment.segment_type);
            return Ok(true);
        }

        match segment.payload {
            Payload::PresentationComposition(pcs) => {
                self.set.composition = Some(pcs);
            }
            Payload::WindowDefinition(wds) => {
                self.set.windows = Some(wds);
            }
            Payload::PaletteDefinition(pds) => {
                self.set.palette = Some(pds);
            }
            Payload::ObjectDefinition(ods) => {
                self.push_object(ods)?;
            }
            Payload::End => {
                self.set.pts = segment.pts;
                self.set.dts = segment.dts;
                self.finished = true;
            }
        }

        Ok(self.finished)
    }

    fn push_object(&mut self, ods: ObjectDefinition) -> Result<()> {
        match ods.sequence {
            SequenceFlag::Only => {
                self.set.objects = [Some(ods), None];
                self.set.object_count = 1;
                self.pending = false;
            }
            SequenceFlag::First => {
                if self.pending {
                    self.fault(SequencingFault::FirstWhilePending)?;
                }
                self.set.objects = [Some(ods), None];
                self.set.object_count = 2;
                self.pending = true;
            }
            SequenceFlag::Continuation => {
                if !self.pending {
                    // Nothing to append to.
                    return self.fault(SequencingFault::ContinuationWithoutFirst);
                }
                if let Some(first) = self.set.objects[0].as_mut() {
                    first.data_raw.extend_from_slice(&ods.data_raw);
                }
            }
            SequenceFlag::Last => {
                if !self.pending {
                    self.fault(SequencingFault::LastWithoutFirst)?;
                    // An earlier Only part is not the head of this object.
                    self.set.objects[0] = None;
                }
                self.set.objects[1] = Some(ods);
                self.set.object_count = 2;
                self.pending = false;
            }
        }
        Ok(())
    }

    fn fault(&mut self, fault: SequencingFault) -> Result<()> {
        if self.strict {
            return Err(Error::InvalidSequencing(fault.describe()));
        }
        warn!("{}, latest part wins", fault.describe());
        self.set.warnings.push(fault);
        Ok(())
    }

    /// Hands over the finished set.
    pub fn finish(self) -> Result<DisplaySet> {
        if !self.finished {
            return Err(Error::CreateFailure("no end segment"));
        }
        debug!(
            "display set at {}ms with {} object parts",
            self.set.presentation_time_ms(),
            self.set.object_count
        );
        Ok(self.set)
    }
}
