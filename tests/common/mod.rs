//! Builders for synthetic `.sup` streams.

#![allow(dead_code)]

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn segment(tag: u8, pts: u32, dts: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = b"PG".to_vec();
    out.extend_from_slice(&pts.to_be_bytes());
    out.extend_from_slice(&dts.to_be_bytes());
    out.push(tag);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// A composition with one uncropped object at `(x, y)`, or none.
pub fn pcs(number: u16, state: u8, object: Option<(u16, u16)>) -> Vec<u8> {
    let mut out = vec![0x07, 0x80, 0x04, 0x38, 0x10];
    out.extend_from_slice(&number.to_be_bytes());
    out.extend_from_slice(&[state, 0x00, 0x00]);
    match object {
        Some((x, y)) => {
            out.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00]);
            out.extend_from_slice(&x.to_be_bytes());
            out.extend_from_slice(&y.to_be_bytes());
        }
        None => out.push(0x00),
    }
    out
}

pub fn wds(x: u16, y: u16, width: u16, height: u16) -> Vec<u8> {
    let mut out = vec![0x01, 0x00];
    for v in [x, y, width, height] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}

/// Palette `(id, Y, Cr, Cb, alpha)` entries.
pub fn pds(entries: &[(u8, u8, u8, u8, u8)]) -> Vec<u8> {
    let mut out = vec![0x00, 0x00];
    for &(id, y, cr, cb, a) in entries {
        out.extend_from_slice(&[id, y, cr, cb, a]);
    }
    out
}

pub fn ods(flag: u8, width: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, 0x00, flag];
    let len = data.len() as u32 + 4;
    out.extend_from_slice(&len.to_be_bytes()[1..]);
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// Encodes one row of palette indices, closing it with `00 00`.
pub fn encode_row(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < row.len() {
        let color = row[i];
        let mut n = 1;
        while i + n < row.len() && row[i + n] == color && n < 0x3fff {
            n += 1;
        }
        if color != 0 && n == 1 {
            out.push(color);
        } else {
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
        i += n;
    }
    out.extend_from_slice(&[0x00, 0x00]);
    out
}

pub fn encode_bitmap(rows: &[Vec<u8>]) -> Vec<u8> {
    rows.iter().flat_map(|r| encode_row(r)).collect()
}

/// A complete display set showing `rows` at presentation time `pts`.
pub fn display_set(pts: u32, rows: &[Vec<u8>]) -> Vec<u8> {
    let width = rows.first().map_or(0, |r| r.len()) as u16;
    let height = rows.len() as u16;
    [
        segment(0x16, pts, pts, &pcs(1, 0x80, Some((100, 900)))),
        segment(0x17, pts, pts, &wds(100, 900, width, height)),
        segment(
            0x14,
            pts,
            pts,
            &pds(&[(1, 235, 128, 128, 255), (2, 16, 128, 128, 255)]),
        ),
        segment(0x15, pts, pts, &ods(0xc0, width, height, &encode_bitmap(rows))),
        segment(0x80, pts, pts, &[]),
    ]
    .concat()
}

pub fn sample_rows() -> Vec<Vec<u8>> {
    let mut rows = vec![vec![0u8; 300]; 2];
    rows.push([vec![1u8; 100], vec![0u8; 100], vec![2u8; 100]].concat());
    rows.push((0..300).map(|x| (x % 3) as u8).collect());
    rows
}
