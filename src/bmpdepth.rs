//===========================================================================//

/// The pixel depths a BMP image can be stored at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    pub(crate) fn from_bits_per_pixel(
        bits_per_pixel: u16,
    ) -> Option<BmpDepth> {
        match bits_per_pixel {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }

    pub(crate) fn bits_per_pixel(&self) -> u16 {
        match *self {
            BmpDepth::One => 1,
            BmpDepth::Four => 4,
            BmpDepth::Eight => 8,
            BmpDepth::Sixteen => 16,
            BmpDepth::TwentyFour => 24,
            BmpDepth::ThirtyTwo => 32,
        }
    }

    /// Returns the size of a full color table at this depth, or zero for
    /// depths that store colors directly.
    pub(crate) fn max_colors(&self) -> usize {
        match *self {
            BmpDepth::One => 2,
            BmpDepth::Four => 16,
            BmpDepth::Eight => 256,
            _ => 0,
        }
    }

    pub(crate) fn is_indexed(&self) -> bool {
        self.max_colors() > 0
    }

    /// Returns the number of bytes in one stored row of `width` pixels,
    /// including the padding to a four-byte boundary, or `None` on overflow.
    pub(crate) fn row_stride(&self, width: u32) -> Option<usize> {
        let bits_per_pixel = self.bits_per_pixel() as usize;
        let bits = (width as usize).checked_mul(bits_per_pixel)?;
        Some(bits.checked_add(31)? / 32 * 4)
    }

    /// Extracts the palette index of pixel `x` from a packed row.  Bits are
    /// stored most-significant first.  The caller guarantees that the row
    /// is long enough.
    pub(crate) fn index_at(&self, row: &[u8], x: usize) -> u8 {
        match *self {
            BmpDepth::One => (row[x / 8] >> (7 - (x % 8))) & 0x1,
            BmpDepth::Four => (row[x / 2] >> (4 * (1 - (x % 2)))) & 0xf,
            _ => row[x],
        }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::BmpDepth;

    #[test]
    fn bmp_depth_round_trip() {
        let depths = &[
            BmpDepth::One,
            BmpDepth::Four,
            BmpDepth::Eight,
            BmpDepth::Sixteen,
            BmpDepth::TwentyFour,
            BmpDepth::ThirtyTwo,
        ];
        for &depth in depths.iter() {
            assert_eq!(
                BmpDepth::from_bits_per_pixel(depth.bits_per_pixel()),
                Some(depth)
            );
        }
        assert_eq!(BmpDepth::from_bits_per_pixel(2), None);
        assert_eq!(BmpDepth::from_bits_per_pixel(0), None);
    }

    #[test]
    fn row_strides_are_padded() {
        assert_eq!(BmpDepth::One.row_stride(1), Some(4));
        assert_eq!(BmpDepth::One.row_stride(33), Some(8));
        assert_eq!(BmpDepth::Four.row_stride(5), Some(4));
        assert_eq!(BmpDepth::TwentyFour.row_stride(3), Some(12));
        assert_eq!(BmpDepth::TwentyFour.row_stride(5), Some(16));
        assert_eq!(BmpDepth::ThirtyTwo.row_stride(7), Some(28));
    }

    #[test]
    fn unpack_indices() {
        let row = [0b1010_0000];
        let bits: Vec<u8> =
            (0..4).map(|x| BmpDepth::One.index_at(&row, x)).collect();
        assert_eq!(bits, vec![1, 0, 1, 0]);
        let row = [0x3c, 0x90];
        let nibbles: Vec<u8> =
            (0..3).map(|x| BmpDepth::Four.index_at(&row, x)).collect();
        assert_eq!(nibbles, vec![0x3, 0xc, 0x9]);
        assert_eq!(BmpDepth::Eight.index_at(&[7, 9], 1), 9);
    }
}

//===========================================================================//
