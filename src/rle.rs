use crate::error::{BmpError, BmpResult};
use crate::reader::ByteReader;

//===========================================================================//

// Escape codes that follow a zero count byte:
const ESCAPE_END_OF_LINE: u8 = 0;
const ESCAPE_END_OF_BITMAP: u8 = 1;
const ESCAPE_DELTA: u8 = 2;

//===========================================================================//

/// Palette indices expanded from an RLE8 or RLE4 stream, in stored row
/// order.  Pixels the stream never wrote are `None` and decode as
/// transparent black.
#[derive(Debug)]
pub(crate) struct RleIndices {
    width: usize,
    indices: Vec<u8>,
    // One bit per pixel, set once the stream has written that pixel.
    written: Vec<u64>,
    end: usize,
}

impl RleIndices {
    fn with_pixels(width: usize, num_pixels: usize) -> Option<RleIndices> {
        let mut indices = Vec::new();
        indices.try_reserve_exact(num_pixels).ok()?;
        indices.resize(num_pixels, 0);
        let num_words = num_pixels.div_ceil(64);
        let mut written = Vec::new();
        written.try_reserve_exact(num_words).ok()?;
        written.resize(num_words, 0);
        Some(RleIndices { width, indices, written, end: 0 })
    }

    fn set(&mut self, pixel: usize, index: u8) {
        self.indices[pixel] = index;
        self.written[pixel / 64] |= 1u64 << (pixel % 64);
    }

    /// Returns the index written for pixel `x` of stored row `row`.
    pub(crate) fn get(&self, row: u32, x: usize) -> Option<u8> {
        let pixel = row as usize * self.width + x;
        if self.written[pixel / 64] & (1u64 << (pixel % 64)) != 0 {
            Some(self.indices[pixel])
        } else {
            None
        }
    }

    /// Returns the offset just past the last byte of the stream.
    pub(crate) fn end(&self) -> usize {
        self.end
    }
}

//===========================================================================//

/// Expands the RLE stream beginning at `start`.  Set `nibbles` for RLE4.
///
/// Runs that overflow a row are clipped, deltas that leave the image end
/// decoding, and an early end-of-bitmap leaves the remaining pixels unset.
/// Only running out of input is an error.
pub(crate) fn expand(
    reader: &ByteReader,
    start: usize,
    width: u32,
    height: u32,
    nibbles: bool,
) -> BmpResult<RleIndices> {
    let width = width as usize;
    let height = height as usize;
    let num_pixels = match width.checked_mul(height) {
        Some(num) => num,
        None => data_error!("Width * Height is too large"),
    };
    let mut indices = match RleIndices::with_pixels(width, num_pixels) {
        Some(indices) => indices,
        None => {
            return Err(BmpError::InsufficientMemory {
                width: width as u32,
                height: height as u32,
            });
        }
    };

    let mut pos = start;
    let mut x = 0usize;
    let mut line = 0usize;
    let mut clipped = false;
    let mut put = |line: usize, x: usize, index: u8| {
        if x < width {
            indices.set(line * width + x, index);
        } else {
            clipped = true;
        }
    };
    loop {
        if line >= height {
            // Swallow a trailing end-of-bitmap marker so that `end` points
            // past the whole stream.
            let marker = reader.read_u16_be(pos).ok();
            if marker == Some(ESCAPE_END_OF_BITMAP as u16) {
                pos += 2;
            }
            break;
        }
        let count = read_stream_byte(reader, pos)?;
        let code = read_stream_byte(reader, pos + 1)?;
        pos += 2;
        if count > 0 {
            // Encoded run: `count` pixels of one index (RLE8) or of two
            // alternating indices (RLE4).
            for i in 0..count as usize {
                let index = if !nibbles {
                    code
                } else if i % 2 == 0 {
                    code >> 4
                } else {
                    code & 0xf
                };
                put(line, x + i, index);
            }
            x += count as usize;
            continue;
        }
        match code {
            ESCAPE_END_OF_LINE => {
                line += 1;
                x = 0;
            }
            ESCAPE_END_OF_BITMAP => break,
            ESCAPE_DELTA => {
                let dx = read_stream_byte(reader, pos)?;
                let dy = read_stream_byte(reader, pos + 1)?;
                pos += 2;
                x += dx as usize;
                line += dy as usize;
            }
            literal => {
                // Absolute run: `literal` indices copied from the stream,
                // padded to a 16-bit boundary.
                let literal = literal as usize;
                let len = if nibbles { (literal + 1) / 2 } else { literal };
                let bytes = match reader.slice(pos, len) {
                    Ok(bytes) => bytes,
                    Err(_) => {
                        insufficient_data!(
                            "RLE absolute run of {} pixels at offset {} \
                             is truncated",
                            literal,
                            pos
                        );
                    }
                };
                pos += len + len % 2;
                for i in 0..literal {
                    let index = if nibbles {
                        (bytes[i / 2] >> (4 * (1 - i % 2))) & 0xf
                    } else {
                        bytes[i]
                    };
                    put(line, x + i, index);
                }
                x += literal;
            }
        }
    }
    if clipped {
        log::warn!(
            "RLE runs overflowed the {}-pixel row width; clipped",
            width
        );
    }
    indices.end = pos;
    Ok(indices)
}

fn read_stream_byte(reader: &ByteReader, pos: usize) -> BmpResult<u8> {
    match reader.read_u8(pos) {
        Ok(byte) => Ok(byte),
        Err(_) => insufficient_data!(
            "RLE stream ends at offset {} before end-of-bitmap",
            pos
        ),
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::expand;
    use crate::error::ErrorCode;
    use crate::reader::ByteReader;

    fn row(
        indices: &super::RleIndices,
        row: u32,
        width: usize,
    ) -> Vec<Option<u8>> {
        (0..width).map(|x| indices.get(row, x)).collect()
    }

    #[test]
    fn encoded_run_then_escapes() {
        let data = b"\x04\x09\x00\x00\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 4, 1, false).unwrap();
        assert_eq!(row(&indices, 0, 4), vec![Some(9); 4]);
        assert_eq!(indices.end(), 6);
    }

    #[test]
    fn absolute_run_is_padded() {
        let data = b"\x00\x03\x01\x02\x03\x00\x01\x07\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 4, 1, false).unwrap();
        assert_eq!(
            row(&indices, 0, 4),
            vec![Some(1), Some(2), Some(3), Some(7)]
        );
        assert_eq!(indices.end(), 10);
    }

    #[test]
    fn rle4_alternates_nibbles() {
        let data = b"\x05\x12\x00\x00\x00\x03\x34\x50\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 5, 2, true).unwrap();
        assert_eq!(
            row(&indices, 0, 5),
            vec![Some(1), Some(2), Some(1), Some(2), Some(1)]
        );
        assert_eq!(
            row(&indices, 1, 5),
            vec![Some(3), Some(4), Some(5), None, None]
        );
    }

    #[test]
    fn delta_skips_pixels() {
        let data = b"\x00\x02\x02\x01\x01\x05\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 3, 2, false).unwrap();
        assert_eq!(row(&indices, 0, 3), vec![None; 3]);
        assert_eq!(row(&indices, 1, 3), vec![None, None, Some(5)]);
    }

    #[test]
    fn overlong_runs_are_clipped() {
        let data = b"\x06\x02\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 2, 1, false).unwrap();
        assert_eq!(row(&indices, 0, 2), vec![Some(2), Some(2)]);
    }

    #[test]
    fn early_end_of_bitmap_leaves_pixels_unset() {
        let data = b"\x01\x04\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 2, 2, false).unwrap();
        assert_eq!(row(&indices, 0, 2), vec![Some(4), None]);
        assert_eq!(row(&indices, 1, 2), vec![None, None]);
    }

    #[test]
    fn written_pixels_span_words() {
        let data = b"\x41\x07\x00\x00\x00\x02\x05\x00\x01\x03\x00\x01";
        let indices = expand(&ByteReader::new(data), 0, 70, 2, false).unwrap();
        let first = row(&indices, 0, 70);
        assert_eq!(&first[..65], &[Some(7); 65][..]);
        assert_eq!(&first[65..], &[None; 5][..]);
        let second = row(&indices, 1, 70);
        assert_eq!(second[4], None);
        assert_eq!(second[5], Some(3));
        assert_eq!(&second[6..], &[None; 64][..]);
    }

    #[test]
    fn truncated_stream() {
        let data = b"\x02\x01\x00";
        let error =
            expand(&ByteReader::new(data), 0, 2, 2, false).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InsufficientData);
        let data = b"\x00\x04\x01\x02";
        let error =
            expand(&ByteReader::new(data), 0, 4, 1, false).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InsufficientData);
    }
}

//===========================================================================//
