use crate::bmpdepth::BmpDepth;
use crate::error::BmpResult;
use crate::palette::ColorTable;
use crate::reader::ByteReader;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

// The size of the BITMAPFILEHEADER that precedes stand-alone BMP files.
const FILE_HEADER_LEN: usize = 14;

// Sizes of the DIB header variants we distinguish, in bytes:
const CORE_HEADER_LEN: u32 = 12;
const INFO_HEADER_LEN: u32 = 40;
const V2_INFO_HEADER_LEN: u32 = 52;
const V3_INFO_HEADER_LEN: u32 = 56;

// Raw compression numbers:
const BI_RGB: u32 = 0;
const BI_RLE8: u32 = 1;
const BI_RLE4: u32 = 2;
const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

//===========================================================================//

/// How the pixel data of a BMP image is encoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Compression {
    /// Uncompressed pixels with a fixed channel layout.
    None,
    /// Run-length encoded 8-bit palette indices.
    Rle8,
    /// Run-length encoded 4-bit palette indices.
    Rle4,
    /// Uncompressed 16- or 32-bit pixels with explicit channel masks.
    Bitfields,
}

impl Compression {
    fn from_number(number: u32) -> Option<Compression> {
        match number {
            BI_RGB => Some(Compression::None),
            BI_RLE8 => Some(Compression::Rle8),
            BI_RLE4 => Some(Compression::Rle4),
            BI_BITFIELDS | BI_ALPHABITFIELDS => Some(Compression::Bitfields),
            _ => None,
        }
    }

    /// Returns true for the run-length encoded variants.
    pub fn is_rle(&self) -> bool {
        matches!(*self, Compression::Rle8 | Compression::Rle4)
    }
}

//===========================================================================//

/// Channel masks for 16- and 32-bit pixels.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct BitMasks {
    /// Bits holding the red channel.
    pub red: u32,
    /// Bits holding the green channel.
    pub green: u32,
    /// Bits holding the blue channel.
    pub blue: u32,
    /// Bits holding the alpha channel, or zero for opaque images.
    pub alpha: u32,
}

impl BitMasks {
    /// The default layout of uncompressed 16-bit pixels.
    pub const RGB555: BitMasks =
        BitMasks { red: 0x7c00, green: 0x03e0, blue: 0x001f, alpha: 0 };

    /// The default layout of uncompressed 32-bit pixels.
    pub const RGB888: BitMasks = BitMasks {
        red: 0x00ff_0000,
        green: 0x0000_ff00,
        blue: 0x0000_00ff,
        alpha: 0,
    };

    /// The alpha byte that 32-bit icons carry in the top of each pixel.
    pub(crate) const ICON_ALPHA: u32 = 0xff00_0000;

    fn read(
        reader: &ByteReader,
        offset: usize,
        with_alpha: bool,
    ) -> BmpResult<BitMasks> {
        Ok(BitMasks {
            red: reader.read_u32_le(offset)?,
            green: reader.read_u32_le(offset + 4)?,
            blue: reader.read_u32_le(offset + 8)?,
            alpha: if with_alpha {
                reader.read_u32_le(offset + 12)?
            } else {
                0
            },
        })
    }

    fn has_color(&self) -> bool {
        (self.red | self.green | self.blue) != 0
    }
}

//===========================================================================//

/// The order in which rows are stored in the pixel data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum RowOrder {
    /// The first stored row is the bottom of the image (positive height).
    BottomUp,
    /// The first stored row is the top of the image (negative height).
    TopDown,
}

//===========================================================================//

/// The parsed DIB header of a BMP image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BmpHeader {
    header_size: u32,
    width: i32,
    height: i32,
    depth: BmpDepth,
    compression: Compression,
    color_table: Option<ColorTable>,
    masks: BitMasks,
}

impl BmpHeader {
    /// Parses the DIB header embedded in an ICO/CUR entry, which has no
    /// outer BMP file header.  The height field of an embedded header
    /// counts both the color rows and the AND mask rows, so the returned
    /// header reports half of it.
    pub fn parse_dib(data: &[u8]) -> BmpResult<(BmpHeader, DecodePlan)> {
        BmpHeader::parse(&ByteReader::new(data), 0, None)
    }

    /// Parses a stand-alone BMP file, starting with the `BM` file header.
    pub fn parse_file(data: &[u8]) -> BmpResult<(BmpHeader, DecodePlan)> {
        let reader = ByteReader::new(data);
        if reader.len() < FILE_HEADER_LEN {
            insufficient_data!(
                "BMP file header needs {} bytes (buffer has {})",
                FILE_HEADER_LEN,
                reader.len()
            );
        }
        if reader.slice(0, 2)? != b"BM" {
            invalid_header!("Missing BM signature in BMP file header");
        }
        let pixel_offset = reader.read_u32_le(10)? as usize;
        BmpHeader::parse(&reader, FILE_HEADER_LEN, Some(pixel_offset))
    }

    fn parse(
        reader: &ByteReader,
        start: usize,
        file_pixel_offset: Option<usize>,
    ) -> BmpResult<(BmpHeader, DecodePlan)> {
        let is_icon = file_pixel_offset.is_none();
        let header_size = reader.read_u32_le(start)?;
        if header_size != CORE_HEADER_LEN && header_size < INFO_HEADER_LEN {
            data_error!("Unsupported BMP header size ({})", header_size);
        }
        if !reader.contains(start, header_size as usize) {
            insufficient_data!(
                "BMP header of {} bytes is truncated (buffer has {} bytes)",
                header_size,
                reader.len()
            );
        }

        let (width, height, planes, bits_per_pixel, raw_compression);
        let colors_used;
        if header_size == CORE_HEADER_LEN {
            // OS/2 BITMAPCOREHEADER: 16-bit dimensions, no compression.
            width = reader.read_u16_le(start + 4)? as i32;
            height = reader.read_u16_le(start + 6)? as i32;
            planes = reader.read_u16_le(start + 8)?;
            bits_per_pixel = reader.read_u16_le(start + 10)?;
            raw_compression = BI_RGB;
            colors_used = 0;
        } else {
            // BITMAPINFOHEADER, or a later variant that extends it.
            width = reader.read_i32_le(start + 4)?;
            height = reader.read_i32_le(start + 8)?;
            planes = reader.read_u16_le(start + 12)?;
            bits_per_pixel = reader.read_u16_le(start + 14)?;
            raw_compression = reader.read_u32_le(start + 16)?;
            colors_used = reader.read_u32_le(start + 32)?;
        }
        if planes != 1 {
            log::debug!("Ignoring BMP planes field of {}", planes);
        }

        let depth = match BmpDepth::from_bits_per_pixel(bits_per_pixel) {
            Some(depth) => depth,
            None => {
                data_error!(
                    "Unsupported BMP bits-per-pixel ({})",
                    bits_per_pixel
                );
            }
        };
        let compression = match Compression::from_number(raw_compression) {
            Some(compression) => compression,
            None => {
                data_error!(
                    "Unsupported BMP compression ({})",
                    raw_compression
                );
            }
        };
        let compatible = match compression {
            Compression::None => true,
            Compression::Rle8 => depth == BmpDepth::Eight,
            Compression::Rle4 => depth == BmpDepth::Four,
            Compression::Bitfields => {
                matches!(depth, BmpDepth::Sixteen | BmpDepth::ThirtyTwo)
            }
        };
        if !compatible {
            data_error!(
                "{:?} compression can't be used at {} bits-per-pixel",
                compression,
                bits_per_pixel
            );
        }

        // Icon headers store the combined height of the color data and the
        // AND mask.
        let height = if is_icon { height / 2 } else { height };
        if width <= 0 {
            data_error!(
                "Invalid BMP width (was {}, but must be positive)",
                width
            );
        }
        if height == 0 {
            data_error!("Invalid BMP height (was 0)");
        }

        let mut offset = start + header_size as usize;
        let mut implicit_alpha = false;
        let masks = match depth {
            BmpDepth::Sixteen | BmpDepth::ThirtyTwo => {
                let defaults = if depth == BmpDepth::Sixteen {
                    BitMasks::RGB555
                } else {
                    BitMasks::RGB888
                };
                if compression == Compression::Bitfields {
                    let declared = if header_size >= V2_INFO_HEADER_LEN {
                        BitMasks::read(
                            reader,
                            start + INFO_HEADER_LEN as usize,
                            header_size >= V3_INFO_HEADER_LEN,
                        )?
                    } else {
                        let with_alpha = raw_compression == BI_ALPHABITFIELDS;
                        let len = if with_alpha { 16 } else { 12 };
                        if !reader.contains(offset, len) {
                            insufficient_data!(
                                "BMP bitfield masks are truncated \
                                 (buffer has {} bytes)",
                                reader.len()
                            );
                        }
                        let masks =
                            BitMasks::read(reader, offset, with_alpha)?;
                        offset += len;
                        masks
                    };
                    if declared.has_color() {
                        declared
                    } else {
                        log::debug!("Empty BMP bitfield masks; defaulting");
                        BitMasks { alpha: declared.alpha, ..defaults }
                    }
                } else if depth == BmpDepth::ThirtyTwo {
                    let declared_alpha = if header_size >= V3_INFO_HEADER_LEN {
                        reader.read_u32_le(start + 52)?
                    } else {
                        0
                    };
                    if declared_alpha != 0 {
                        BitMasks { alpha: declared_alpha, ..defaults }
                    } else if is_icon {
                        implicit_alpha = true;
                        BitMasks { alpha: BitMasks::ICON_ALPHA, ..defaults }
                    } else {
                        defaults
                    }
                } else {
                    defaults
                }
            }
            _ => BitMasks::default(),
        };
        if depth == BmpDepth::Sixteen
            && (masks.red | masks.green | masks.blue | masks.alpha) > 0xffff
        {
            data_error!("BMP bitfield masks {:?} don't fit in 16 bits", masks);
        }

        let color_table = if depth.is_indexed() {
            let max_colors = depth.max_colors();
            let count = if colors_used == 0 {
                max_colors
            } else if colors_used as usize > max_colors {
                log::debug!(
                    "BMP declares {} colors at {} bits-per-pixel; clamping",
                    colors_used,
                    bits_per_pixel
                );
                max_colors
            } else {
                colors_used as usize
            };
            let entry_size =
                if header_size == CORE_HEADER_LEN { 3 } else { 4 };
            let table = ColorTable::read(reader, offset, count, entry_size)?;
            offset += count * entry_size;
            Some(table)
        } else {
            None
        };

        let pixel_offset = match file_pixel_offset {
            Some(pixel_offset) => {
                if pixel_offset < FILE_HEADER_LEN + header_size as usize {
                    data_error!(
                        "BMP pixel data offset ({}) points into the header",
                        pixel_offset
                    );
                }
                pixel_offset
            }
            None => offset,
        };

        let abs_width = width as u32;
        let abs_height = height.unsigned_abs();
        let stride = match depth.row_stride(abs_width) {
            Some(stride) => stride,
            None => data_error!("BMP width is too large ({})", width),
        };
        let pixel_size = if compression.is_rle() {
            None
        } else {
            match stride.checked_mul(abs_height as usize) {
                Some(size) => Some(size),
                None => {
                    data_error!(
                        "BMP dimensions are too large ({}x{})",
                        width,
                        abs_height
                    );
                }
            }
        };
        let mask_stride = if is_icon {
            BmpDepth::One.row_stride(abs_width)
        } else {
            None
        };
        let row_order =
            if height < 0 { RowOrder::TopDown } else { RowOrder::BottomUp };

        log::debug!(
            "BMP header: {}-byte variant, {}x{}, {} bpp, {:?}, {:?}",
            header_size,
            width,
            height,
            bits_per_pixel,
            compression,
            row_order
        );
        let header = BmpHeader {
            header_size,
            width,
            height,
            depth,
            compression,
            color_table,
            masks,
        };
        let plan = DecodePlan {
            width: abs_width,
            height: abs_height,
            stride,
            row_order,
            pixel_offset,
            pixel_size,
            mask_stride,
            implicit_alpha,
        };
        Ok((header, plan))
    }

    /// Returns the size of the DIB header variant, in bytes.
    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Returns the height of the image, in pixels.  A negative height means
    /// the rows are stored top-down.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Returns the bits-per-pixel (color depth) of the image.
    pub fn bits_per_pixel(&self) -> u16 {
        self.depth.bits_per_pixel()
    }

    pub(crate) fn depth(&self) -> BmpDepth {
        self.depth
    }

    /// Returns how the pixel data is encoded.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Returns the color table of an indexed image.
    pub fn color_table(&self) -> Option<&ColorTable> {
        self.color_table.as_ref()
    }

    /// Returns the channel masks used for 16- and 32-bit pixels.  These are
    /// all zero for other depths.
    pub fn masks(&self) -> BitMasks {
        self.masks
    }
}

//===========================================================================//

/// Where and how the pixel data of a BMP image is laid out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodePlan {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) stride: usize,
    pub(crate) row_order: RowOrder,
    pub(crate) pixel_offset: usize,
    pub(crate) pixel_size: Option<usize>,
    pub(crate) mask_stride: Option<usize>,
    pub(crate) implicit_alpha: bool,
}

impl DecodePlan {
    /// Returns the width of the decoded image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the decoded image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of bytes in one stored row, including padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the order the rows are stored in.
    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Returns the offset of the pixel data from the start of the buffer
    /// that was parsed.
    pub fn pixel_offset(&self) -> usize {
        self.pixel_offset
    }

    /// Returns the expected size of uncompressed pixel data, or `None` for
    /// run-length encoded data.
    pub fn pixel_size(&self) -> Option<usize> {
        self.pixel_size
    }

    /// Returns true if a 1-bit AND transparency mask may follow the pixel
    /// data (icons and cursors only).
    pub fn has_and_mask(&self) -> bool {
        self.mask_stride.is_some()
    }

    /// Maps the index of a stored row to its row in top-down output.
    pub(crate) fn output_row(&self, stored_row: u32) -> u32 {
        match self.row_order {
            RowOrder::BottomUp => self.height - 1 - stored_row,
            RowOrder::TopDown => stored_row,
        }
    }
}

//===========================================================================//


//===========================================================================//
