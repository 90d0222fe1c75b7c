//! Decoder for Blu-ray Presentation Graphics Stream subtitles, as found in
//! `*.sup` files.
//!
//! A stream is a run of segments, each with a 13-byte header (`"PG"`, PTS,
//! DTS, type, size). Segments are grouped into display sets closed by an
//! End segment; each display set may carry a composition, windows, a
//! palette and a run-length encoded bitmap.
//!
//! ```no_run
//! let bytes = std::fs::read("subs.sup").unwrap();
//! for set in pgs_parser::decode_all_display_sets(&bytes) {
//!     if set.has_image() {
//!         let img = set.to_rgba_image().unwrap();
//!         println!("{}ms at {},{}: {:?}", set.presentation_time_ms(), set.x(), set.y(), img.dimensions());
//!     }
//! }
//! ```
//!
//! Decoding is synchronous and keeps no shared state, so independent display
//! sets can be decoded on separate threads; see
//! [`decode_all_display_sets_parallel`].

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod color;
mod display_set;
pub mod error;
mod options;
pub mod parser;
pub mod rle;
mod stream;

pub use crate::color::ColorSpace;
pub use crate::display_set::{Assembler, DisplaySet, SequencingFault};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::options::DecodeOptions;
pub use crate::parser::types::*;
pub use crate::parser::{decode_segment, ByteCursor};
pub use crate::rle::{decode_rle, Bitmap};
pub use crate::stream::{
    decode_all_display_sets, decode_all_display_sets_parallel, decode_all_display_sets_with,
    decode_display_set, decode_display_set_with, display_set_extent, BatchReport, UnitFailure,
};
