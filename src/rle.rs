//! Run-length decoding of object bitmaps into palette indices.

use nom::error::context;

use crate::error::{Error, Result};
use crate::parser::parse::{rle_entry, RleEntry};
use crate::parser::ByteCursor;

/// A decoded object bitmap: one palette index per pixel, row-major.
#[derive(Derivative, PartialEq, Eq, Clone)]
#[derivative(Debug)]
pub struct Bitmap {
    width: u16,
    height: u16,
    #[derivative(Debug = "ignore")]
    pixels: Vec<u8>,
    clipped: usize,
}

impl Bitmap {
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// All indices, row after row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= usize::from(self.height) {
            return None;
        }
        let w = usize::from(self.width);
        self.pixels.get(y * w..(y + 1) * w)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks() panics on a zero size
        self.pixels.chunks(usize::from(self.width).max(1))
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= u32::from(self.width) || y >= u32::from(self.height) {
            return None;
        }
        self.pixels
            .get(y as usize * usize::from(self.width) + x as usize)
            .copied()
    }

    /// Pixels dropped because a run reached past the end of its row.
    pub fn clipped_pixels(&self) -> usize {
        self.clipped
    }
}

/// Decodes `data` into a `width` x `height` bitmap.
///
/// Each row is a sequence of tokens closed by an end-of-line token
/// (`00 00`). Runs reaching past `width` are cut short, and rows that end
/// early keep index 0 in their remaining pixels. Running out of data before
/// `height` rows have been closed is an error.
pub fn decode_rle(data: &[u8], width: u16, height: u16) -> Result<Bitmap> {
    let w = usize::from(width);
    let mut pixels = vec![0u8; w * usize::from(height)];
    let mut cursor = ByteCursor::new(data);
    let mut clipped = 0;

    // A zero width still needs each row's end-of-line token.
    for y in 0..usize::from(height) {
        let start = cursor.position();
        let dropped = decode_row(&mut cursor, &mut pixels[y * w..(y + 1) * w])?;
        trace!("row {}: {} bytes", y, cursor.position() - start);
        if dropped > 0 {
            let overflow = Error::DecodeOverflow { row: y, dropped };
            debug!("{}", overflow);
            clipped += dropped;
        }
    }

    if !cursor.is_empty() {
        debug!("{} bytes left after the last row", cursor.remaining());
    }

    Ok(Bitmap {
        width,
        height,
        pixels,
        clipped,
    })
}

/// Decodes tokens into `row` up to and including the end-of-line token,
/// returning how many pixels did not fit.
fn decode_row(cursor: &mut ByteCursor, row: &mut [u8]) -> Result<usize> {
    let width = row.len();
    let mut x = 0;
    let mut dropped = 0;

    loop {
        let (count, color) = match cursor.parse(context("bitmap row", rle_entry))? {
            RleEntry::EndOfLine => return Ok(dropped),
            RleEntry::Single(color) => (1, color),
            RleEntry::Repeated { count, color } => (usize::from(count), color),
            RleEntry::FillLine { color } => (width - x, color),
        };

        let n = count.min(width - x);
        row[x..x + n].fill(color);
        x += n;
        dropped += count - n;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Encodes one row using the shortest token for each run.
    pub(crate) fn encode_row(row: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < row.len() {
            let color = row[i];
            let mut n = 1;
            while i + n < row.len() && row[i + n] == color && n < 0x3fff {
                n += 1;
            }
            encode_run(&mut out, color, n);
            i += n;
        }
        out.extend_from_slice(&[0x00, 0x00]);
        out
    }

    fn encode_run(out: &mut Vec<u8>, color: u8, n: usize) {
        if color != 0 && n <= 2 {
            out.extend(std::iter::repeat(color).take(n));
            return;
        }
        let color_bit = if color != 0 { 0x80 } else { 0x00 };
        if n < 64 {
            out.extend_from_slice(&[0x00, color_bit | n as u8]);
        } else {
            out.extend_from_slice(&[0x00, color_bit | 0x40 | (n >> 8) as u8, n as u8]);
        }
        if color != 0 {
            out.push(color);
        }
    }

    fn decode_one_row(encoded: &[u8], width: u16) -> Vec<u8> {
        let bitmap = decode_rle(encoded, width, 1).unwrap();
        bitmap.pixels().to_vec()
    }

    #[test]
    fn literal_pixels() {
        let row = [1, 2, 3, 4, 5, 6, 7, 8];
        let encoded = encode_row(&row);
        assert_eq!(encoded, vec![1, 2, 3, 4, 5, 6, 7, 8, 0, 0]);
        assert_eq!(decode_one_row(&encoded, 8), row);
    }

    #[test]
    fn short_transparent_run() {
        let mut row = vec![0u8; 40];
        row.extend_from_slice(&[9, 9]);
        let encoded = encode_row(&row);
        assert_eq!(&encoded[..2], &[0x00, 40]);
        assert_eq!(decode_one_row(&encoded, 42), row);
    }

    #[test]
    fn long_run_with_color() {
        let mut row = vec![3u8; 16383];
        row.extend_from_slice(&[0u8; 300]);
        row.push(7);
        let encoded = encode_row(&row);
        assert_eq!(&encoded[..4], &[0x00, 0xff, 0xff, 0x03]);
        assert_eq!(decode_one_row(&encoded, row.len() as u16), row);
    }

    #[test]
    fn run_of_256_does_not_split_row() {
        // The low count byte of a 256 run is zero, followed by the
        // end-of-line marker.
        let row = vec![0u8; 256];
        let encoded = encode_row(&row);
        assert_eq!(encoded, vec![0x00, 0x41, 0x00, 0x00, 0x00]);
        assert_eq!(decode_one_row(&encoded, 256), row);
    }

    #[test]
    fn zero_count_fills_rest_of_row() {
        let encoded = [0x05, 0x06, 0x00, 0x80, 0x02, 0x00, 0x00];
        assert_eq!(decode_one_row(&encoded, 6), vec![5, 6, 2, 2, 2, 2]);
    }

    #[test]
    fn color_bearing_short_run() {
        let encoded = [0x00, 0x83, 0x11, 0x00, 0x02, 0x00, 0x00];
        assert_eq!(decode_one_row(&encoded, 5), vec![0x11, 0x11, 0x11, 0, 0]);
    }

    #[test]
    fn overflowing_run_is_clipped() {
        let encoded = [0x01, 0x00, 0x8a, 0x04, 0x02, 0x00, 0x00];
        let bitmap = decode_rle(&encoded, 4, 1).unwrap();
        assert_eq!(bitmap.pixels(), &[1, 4, 4, 4]);
        assert_eq!(bitmap.clipped_pixels(), 10 - 3 + 1);
    }

    #[test]
    fn short_row_keeps_index_zero() {
        let encoded = [0x07, 0x00, 0x00, 0x08, 0x08, 0x08, 0x00, 0x00];
        let bitmap = decode_rle(&encoded, 3, 2).unwrap();
        assert_eq!(bitmap.row(0), Some(&[7, 0, 0][..]));
        assert_eq!(bitmap.row(1), Some(&[8, 8, 8][..]));
        assert_eq!(bitmap.get(0, 1), Some(8));
        assert_eq!(bitmap.get(3, 0), None);
    }

    #[test]
    fn multi_row_bitmap() {
        let rows: Vec<Vec<u8>> = vec![vec![0; 10], vec![1, 1, 1, 0, 0, 0, 0, 2, 2, 2], vec![4; 10]];
        let encoded: Vec<u8> = rows.iter().flat_map(|r| encode_row(r)).collect();
        let bitmap = decode_rle(&encoded, 10, 3).unwrap();
        assert_eq!(bitmap.pixels().len(), 30);
        for (decoded, expected) in bitmap.rows().zip(&rows) {
            assert_eq!(decoded, &expected[..]);
        }
    }

    #[test]
    fn missing_rows_are_truncated() {
        let encoded = encode_row(&[1, 2, 3]);
        let err = decode_rle(&encoded, 3, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);

        let err = decode_rle(&[0x01, 0x02], 2, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    }

    #[test]
    fn empty_bitmap() {
        let bitmap = decode_rle(&[], 0, 0).unwrap();
        assert!(bitmap.pixels().is_empty());
    }

    #[test]
    fn zero_width_rows_still_need_terminators() {
        let err = decode_rle(&[], 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);

        let bitmap = decode_rle(&[0x00, 0x00, 0x00, 0x00], 0, 2).unwrap();
        assert!(bitmap.pixels().is_empty());
        assert_eq!(bitmap.row(1), Some(&[][..]));
    }

    #[test]
    fn row_out_of_range() {
        let bitmap = decode_rle(&encode_row(&[1, 2]), 2, 1).unwrap();
        assert_eq!(bitmap.row(0), Some(&[1, 2][..]));
        assert_eq!(bitmap.row(1), None);
        assert_eq!(bitmap.row(usize::MAX), None);
    }
}
