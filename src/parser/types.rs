use std::collections::BTreeMap;

/// A 90kHz clock value, as carried in segment headers.
pub type Timestamp = u32;

/// Ticks of the PTS/DTS clock per millisecond.
pub const TICKS_PER_MS: u32 = 90;

/// One framed segment: the header fields plus its decoded payload.
#[derive(Debug, PartialEq, Clone)]
pub struct Segment {
    pub pts: Timestamp,
    pub dts: Timestamp,
    pub segment_type: SegmentType,
    /// Payload size as declared in the header.
    pub size: u16,
    pub payload: Payload,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SegmentType {
    PaletteDefinition,
    ObjectDefinition,
    PresentationComposition,
    WindowDefinition,
    End,
}

impl SegmentType {
    pub fn from_tag(tag: u8) -> Option<SegmentType> {
        match tag {
            0x14 => Some(SegmentType::PaletteDefinition),
            0x15 => Some(SegmentType::ObjectDefinition),
            0x16 => Some(SegmentType::PresentationComposition),
            0x17 => Some(SegmentType::WindowDefinition),
            0x80 => Some(SegmentType::End),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            SegmentType::PaletteDefinition => 0x14,
            SegmentType::ObjectDefinition => 0x15,
            SegmentType::PresentationComposition => 0x16,
            SegmentType::WindowDefinition => 0x17,
            SegmentType::End => 0x80,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Payload {
    PresentationComposition(PresentationComposition),
    WindowDefinition(WindowDefinition),
    PaletteDefinition(PaletteDefinition),
    ObjectDefinition(ObjectDefinition),
    End,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CompositionState {
    Normal,
    AcquisitionPoint,
    EpochStart,
}

impl CompositionState {
    pub fn from_byte(b: u8) -> Option<CompositionState> {
        match b {
            0x00 => Some(CompositionState::Normal),
            0x40 => Some(CompositionState::AcquisitionPoint),
            0x80 => Some(CompositionState::EpochStart),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PresentationComposition {
    /// Video frame width, not the bitmap width.
    pub width: u16,
    /// Video frame height, not the bitmap height.
    pub height: u16,
    pub frame_rate: u8,
    pub number: u16,
    pub state: CompositionState,
    pub palette_update: bool,
    pub palette_id: u8,
    pub objects: Vec<CompositionObject>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CompositionObject {
    pub id: u16,
    pub window_id: u8,
    pub x: u16,
    pub y: u16,
    pub crop: CompositionObjectCrop,
}

impl CompositionObject {
    pub fn is_cropped(&self) -> bool {
        matches!(self.crop, CompositionObjectCrop::Cropped { .. })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CompositionObjectCrop {
    NotCropped,
    Cropped {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },
}

#[derive(Debug, PartialEq, Clone)]
pub struct WindowDefinition {
    pub windows: Vec<WindowObject>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct WindowObject {
    pub id: u8,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// A palette, keyed by entry id. Entries need not be contiguous, and a
/// repeated id replaces the earlier entry.
#[derive(Debug, PartialEq, Clone)]
pub struct PaletteDefinition {
    pub id: u8,
    pub version: u8,
    pub entries: BTreeMap<u8, PaletteEntry>,
}

impl PaletteDefinition {
    pub fn entry(&self, index: u8) -> Option<&PaletteEntry> {
        self.entries.get(&index)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PaletteEntry {
    pub id: u8,
    pub color: YCrCbAColor,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct YCrCbAColor {
    pub y: u8,
    pub cr: u8,
    pub cb: u8,
    pub a: u8,
}

/// Position of an object part within its sequence.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SequenceFlag {
    First,
    Last,
    /// Both the first and the last bit are set.
    Only,
    /// Neither bit is set: a middle part of a sequence of three or more.
    Continuation,
}

impl SequenceFlag {
    pub fn from_byte(b: u8) -> SequenceFlag {
        match (b & 0x80 != 0, b & 0x40 != 0) {
            (true, true) => SequenceFlag::Only,
            (true, false) => SequenceFlag::First,
            (false, true) => SequenceFlag::Last,
            (false, false) => SequenceFlag::Continuation,
        }
    }
}

#[derive(Derivative, PartialEq, Clone)]
#[derivative(Debug)]
pub struct ObjectDefinition {
    pub id: u16,
    pub version: u8,
    pub sequence: SequenceFlag,
    /// Length of the complete object data, across every part.
    pub data_length: u32,
    pub width: u16,
    pub height: u16,
    /// Compressed bytes carried by this part, decoded only on demand.
    #[derivative(Debug = "ignore")]
    pub data_raw: Vec<u8>,
}
