use crate::bmpdepth::BmpDepth;
use crate::error::BmpResult;
use crate::header::{BmpHeader, Compression, DecodePlan};
use crate::palette::ColorTable;
use crate::reader::ByteReader;
use crate::rle::{self, RleIndices};
use byteorder::{ByteOrder, LittleEndian};

//===========================================================================//

const OPAQUE: u8 = u8::MAX;
const TRANSPARENT_BLACK: [u8; 4] = [0, 0, 0, 0];

//===========================================================================//

/// Extracts one channel from a 16- or 32-bit pixel and scales it to eight
/// bits.
#[derive(Clone, Copy, Debug)]
struct Channel {
    mask: u32,
    shift: u32,
    bits: u32,
}

impl Channel {
    fn new(mask: u32) -> Channel {
        if mask == 0 {
            return Channel { mask, shift: 0, bits: 0 };
        }
        let shift = mask.trailing_zeros();
        let bits = 32 - (mask >> shift).leading_zeros();
        Channel { mask, shift, bits }
    }

    fn extract(&self, pixel: u32) -> u8 {
        if self.bits == 0 {
            return 0;
        }
        let value = (pixel & self.mask) >> self.shift;
        if self.bits >= 8 {
            (value >> (self.bits - 8)) as u8
        } else {
            let max = (1 << self.bits) - 1;
            ((value * 255 + max / 2) / max) as u8
        }
    }
}

//===========================================================================//

enum Source {
    Rows,
    Rle(RleIndices),
}

/// Decodes the pixel data described by a header and plan, one stored row at
/// a time.
pub(crate) struct PixelDecoder<'a> {
    depth: BmpDepth,
    plan: &'a DecodePlan,
    color_table: Option<&'a ColorTable>,
    reader: ByteReader<'a>,
    source: Source,
    channels: [Channel; 4],
    use_alpha: bool,
    and_mask: Option<&'a [u8]>,
}

impl<'a> PixelDecoder<'a> {
    /// Prepares to decode from `data`, the same buffer the header and plan
    /// were parsed from.  RLE streams are expanded here, so a truncated
    /// stream fails before any row is produced.
    pub(crate) fn new(
        header: &'a BmpHeader,
        plan: &'a DecodePlan,
        data: &'a [u8],
    ) -> BmpResult<PixelDecoder<'a>> {
        let reader = ByteReader::new(data);
        let (source, mask_offset) = match header.compression() {
            Compression::Rle8 | Compression::Rle4 => {
                let nibbles = header.compression() == Compression::Rle4;
                let indices = rle::expand(
                    &reader,
                    plan.pixel_offset,
                    plan.width,
                    plan.height,
                    nibbles,
                )?;
                let end = indices.end();
                (Source::Rle(indices), end)
            }
            Compression::None | Compression::Bitfields => {
                let size = plan.pixel_size.unwrap_or(0);
                (Source::Rows, plan.pixel_offset.saturating_add(size))
            }
        };

        let and_mask = match plan.mask_stride {
            Some(stride) => {
                let len = stride.saturating_mul(plan.height as usize);
                let mask = reader.slice(mask_offset, len).ok();
                if mask.is_none() {
                    log::debug!(
                        "No complete AND mask after pixel data \
                         (needs {} bytes at offset {}, buffer has {})",
                        len,
                        mask_offset,
                        reader.len()
                    );
                }
                mask
            }
            None => None,
        };

        let masks = header.masks();
        let channels = [
            Channel::new(masks.red),
            Channel::new(masks.green),
            Channel::new(masks.blue),
            Channel::new(masks.alpha),
        ];
        let mut decoder = PixelDecoder {
            depth: header.depth(),
            plan,
            color_table: header.color_table(),
            reader,
            source,
            channels,
            use_alpha: masks.alpha != 0,
            and_mask,
        };
        if plan.implicit_alpha && !decoder.has_nonzero_alpha() {
            log::debug!("32-bit icon has an empty alpha channel; opaque");
            decoder.use_alpha = false;
        }
        Ok(decoder)
    }

    /// Returns true if any available 32-bit pixel has a nonzero alpha
    /// byte.
    fn has_nonzero_alpha(&self) -> bool {
        let row_len = self.plan.width as usize * 4;
        (0..self.plan.height as usize)
            .map(|row| self.plan.pixel_offset + row * self.plan.stride)
            .map_while(|offset| self.reader.slice(offset, row_len).ok())
            .any(|row| row.chunks_exact(4).any(|pixel| pixel[3] != 0))
    }

    /// Returns the number of bytes of pixel data each stored row needs,
    /// excluding padding.
    fn row_data_len(&self) -> usize {
        let bits_per_pixel = self.depth.bits_per_pixel() as usize;
        (self.plan.width as usize * bits_per_pixel + 7) / 8
    }

    /// Decodes stored row `row` into `out` as RGBA, writing each pixel into
    /// the first four bytes of a `bytes_per_pixel`-sized slot.
    pub(crate) fn decode_row(
        &self,
        row: u32,
        out: &mut [u8],
        bytes_per_pixel: usize,
    ) -> BmpResult<()> {
        let width = self.plan.width as usize;
        let pixels = out.chunks_exact_mut(bytes_per_pixel).take(width);
        match self.source {
            Source::Rle(ref indices) => {
                for (x, pixel) in pixels.enumerate() {
                    let rgba = match indices.get(row, x) {
                        Some(index) => self.lookup(index)?,
                        None => TRANSPARENT_BLACK,
                    };
                    pixel[..4].copy_from_slice(&rgba);
                }
            }
            Source::Rows => {
                let offset = self.plan.pixel_offset
                    + row as usize * self.plan.stride;
                let len = self.row_data_len();
                let data = match self.reader.slice(offset, len) {
                    Ok(data) => data,
                    Err(_) => {
                        insufficient_data!(
                            "BMP pixel data ends in row {} of {} \
                             (buffer has {} bytes)",
                            row,
                            self.plan.height,
                            self.reader.len()
                        );
                    }
                };
                self.decode_stored_row(data, pixels)?;
            }
        }
        if let Some(mask) = self.and_mask {
            let stride = self.plan.mask_stride.unwrap_or(0);
            let mask_row = &mask[row as usize * stride..][..stride];
            for (x, pixel) in
                out.chunks_exact_mut(bytes_per_pixel).take(width).enumerate()
            {
                if BmpDepth::One.index_at(mask_row, x) == 1 {
                    pixel[3] = 0;
                }
            }
        }
        Ok(())
    }

    fn decode_stored_row<'o, I>(
        &self,
        data: &[u8],
        pixels: I,
    ) -> BmpResult<()>
    where
        I: Iterator<Item = &'o mut [u8]>,
    {
        match self.depth {
            BmpDepth::One | BmpDepth::Four | BmpDepth::Eight => {
                for (x, pixel) in pixels.enumerate() {
                    let rgba = self.lookup(self.depth.index_at(data, x))?;
                    pixel[..4].copy_from_slice(&rgba);
                }
            }
            BmpDepth::TwentyFour => {
                for (bgr, pixel) in data.chunks_exact(3).zip(pixels) {
                    let rgba = [bgr[2], bgr[1], bgr[0], OPAQUE];
                    pixel[..4].copy_from_slice(&rgba);
                }
            }
            BmpDepth::Sixteen => {
                for (bytes, pixel) in data.chunks_exact(2).zip(pixels) {
                    let value = LittleEndian::read_u16(bytes) as u32;
                    pixel[..4].copy_from_slice(&self.split_channels(value));
                }
            }
            BmpDepth::ThirtyTwo => {
                for (bytes, pixel) in data.chunks_exact(4).zip(pixels) {
                    let value = LittleEndian::read_u32(bytes);
                    pixel[..4].copy_from_slice(&self.split_channels(value));
                }
            }
        }
        Ok(())
    }

    fn split_channels(&self, value: u32) -> [u8; 4] {
        let [red, green, blue, alpha] = self.channels;
        [
            red.extract(value),
            green.extract(value),
            blue.extract(value),
            if self.use_alpha { alpha.extract(value) } else { OPAQUE },
        ]
    }

    fn lookup(&self, index: u8) -> BmpResult<[u8; 4]> {
        let color = self.color_table.and_then(|table| table.get(index));
        match color {
            Some(color) => Ok([color.red, color.green, color.blue, OPAQUE]),
            None => {
                data_error!(
                    "Palette index {} is out of range ({} colors)",
                    index,
                    self.color_table.map_or(0, |table| table.len())
                );
            }
        }
    }
}

//===========================================================================//


//===========================================================================//
