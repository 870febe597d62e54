use crate::callbacks::{BitmapCallbacks, BitmapState, Invalidator};
use crate::decoder::PixelDecoder;
use crate::error::{BmpError, BmpResult};
use crate::header::{BmpHeader, DecodePlan};
use crate::icondir::EntryFormat;
use crate::reader::ByteReader;
use std::io;

//===========================================================================//

enum Format {
    Bmp { header: BmpHeader, plan: DecodePlan },
    Png { width: u32, height: u32 },
}

//===========================================================================//

/// A single encoded image (an ICO/CUR entry or a stand-alone BMP file),
/// bound to the host that will store its decoded pixels.
pub struct Image<'a, C: BitmapCallbacks> {
    data: &'a [u8],
    host: &'a C,
    format: Format,
    hotspot: Option<(u16, u16)>,
}

impl<'a, C: BitmapCallbacks> Image<'a, C> {
    /// Parses a stand-alone BMP file (starting with the `BM` file header).
    pub fn from_bmp(data: &'a [u8], host: &'a C) -> BmpResult<Image<'a, C>> {
        let (header, plan) = BmpHeader::parse_file(data)?;
        let format = Format::Bmp { header, plan };
        Ok(Image { data, host, format, hotspot: None })
    }

    pub(crate) fn from_entry(
        data: &'a [u8],
        host: &'a C,
        entry_format: EntryFormat,
        hotspot: Option<(u16, u16)>,
    ) -> BmpResult<Image<'a, C>> {
        let format = match entry_format {
            EntryFormat::Bmp => {
                let (header, plan) = BmpHeader::parse_dib(data)?;
                Format::Bmp { header, plan }
            }
            EntryFormat::Png => {
                let reader = match png::Decoder::new(data).read_info() {
                    Ok(reader) => reader,
                    Err(error) => return Err(png_error(error, 0, 0)),
                };
                let info = reader.info();
                if info.width == 0 || info.height == 0 {
                    data_error!(
                        "Invalid PNG dimensions ({}x{})",
                        info.width,
                        info.height
                    );
                }
                Format::Png { width: info.width, height: info.height }
            }
        };
        Ok(Image { data, host, format, hotspot })
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        match self.format {
            Format::Bmp { ref plan, .. } => plan.width(),
            Format::Png { width, .. } => width,
        }
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        match self.format {
            Format::Bmp { ref plan, .. } => plan.height(),
            Format::Png { height, .. } => height,
        }
    }

    /// Returns true if the image is encoded as a PNG.
    pub fn is_png(&self) -> bool {
        matches!(self.format, Format::Png { .. })
    }

    /// Returns the parsed BMP header, or `None` for PNG images.
    pub fn header(&self) -> Option<&BmpHeader> {
        match self.format {
            Format::Bmp { ref header, .. } => Some(header),
            Format::Png { .. } => None,
        }
    }

    /// Returns the pixel data layout, or `None` for PNG images.
    pub fn plan(&self) -> Option<&DecodePlan> {
        match self.format {
            Format::Bmp { ref plan, .. } => Some(plan),
            Format::Png { .. } => None,
        }
    }

    /// Returns the coordinates of the cursor hotspot (pixels right from the
    /// left edge of the image, and pixels down from the top edge), or `None`
    /// if the image is not a cursor.
    pub fn cursor_hotspot(&self) -> Option<(u16, u16)> {
        self.hotspot
    }

    /// Returns true if every decoded pixel is known to be fully opaque.
    fn is_opaque(&self) -> bool {
        match self.format {
            Format::Bmp { ref header, ref plan } => {
                !plan.has_and_mask()
                    && !header.compression().is_rle()
                    && header.masks().alpha == 0
            }
            Format::Png { .. } => false,
        }
    }

    /// Asks the host for storage to decode this image into.  The bitmap
    /// belongs to the caller, who must hand it back to the host with
    /// `DecodedBitmap::release`.
    pub fn create_bitmap(&self) -> BmpResult<DecodedBitmap<C::Bitmap>> {
        let width = self.width();
        let height = self.height();
        let state = BitmapState { opaque: self.is_opaque() };
        let mut bitmap = match self.host.create(width, height, state) {
            Some(bitmap) => bitmap,
            None => return Err(BmpError::InsufficientMemory { width, height }),
        };
        let bytes_per_pixel = self.host.bytes_per_pixel(&bitmap);
        let needed = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(bytes_per_pixel));
        let available = self.host.buffer(&mut bitmap).len();
        let fits = match needed {
            Some(needed) => bytes_per_pixel >= 4 && available >= needed,
            None => false,
        };
        if !fits {
            log::debug!(
                "Host storage for {}x{} bitmap is too small \
                 ({} bytes at {} bytes-per-pixel)",
                width,
                height,
                available,
                bytes_per_pixel
            );
            self.host.destroy(bitmap);
            return Err(BmpError::InsufficientMemory { width, height });
        }
        let invalidator = Invalidator::new();
        self.host.set_suspendable(&mut bitmap, invalidator.clone());
        Ok(DecodedBitmap {
            bitmap,
            width,
            height,
            bytes_per_pixel,
            invalidator,
        })
    }

    /// Decodes the image into a bitmap created by `create_bitmap`.  Rows
    /// written before a failure stay in the bitmap, but it is not marked
    /// valid until the whole image has been decoded.
    pub fn decode_into(
        &self,
        bitmap: &mut DecodedBitmap<C::Bitmap>,
    ) -> BmpResult<()> {
        if bitmap.width != self.width() || bitmap.height != self.height() {
            data_error!(
                "Bitmap is {}x{}, but image is {}x{}",
                bitmap.width,
                bitmap.height,
                self.width(),
                self.height()
            );
        }
        bitmap.invalidator.set_valid(false);
        match self.format {
            Format::Bmp { ref header, ref plan } => {
                self.decode_bmp(header, plan, bitmap)?
            }
            Format::Png { width, height } => {
                self.decode_png(width, height, bitmap)?
            }
        }
        bitmap.invalidator.set_valid(true);
        Ok(())
    }

    /// Creates a bitmap and decodes the image into it.  Uncompressed pixel
    /// data must be complete before the host is asked for storage.  On
    /// failure the bitmap is handed back to the host.
    pub fn decode(&self) -> BmpResult<DecodedBitmap<C::Bitmap>> {
        self.check_pixel_data()?;
        let mut bitmap = self.create_bitmap()?;
        match self.decode_into(&mut bitmap) {
            Ok(()) => Ok(bitmap),
            Err(error) => {
                bitmap.release(self.host);
                Err(error)
            }
        }
    }

    fn check_pixel_data(&self) -> BmpResult<()> {
        if let Format::Bmp { ref plan, .. } = self.format {
            if let Some(size) = plan.pixel_size() {
                let offset = plan.pixel_offset();
                if !ByteReader::new(self.data).contains(offset, size) {
                    insufficient_data!(
                        "BMP pixel data needs {} bytes at offset {} \
                         (buffer has {})",
                        size,
                        offset,
                        self.data.len()
                    );
                }
            }
        }
        Ok(())
    }

    fn decode_bmp(
        &self,
        header: &BmpHeader,
        plan: &DecodePlan,
        bitmap: &mut DecodedBitmap<C::Bitmap>,
    ) -> BmpResult<()> {
        let decoder = PixelDecoder::new(header, plan, self.data)?;
        let bytes_per_pixel = bitmap.bytes_per_pixel;
        for row in 0..plan.height() {
            let target = plan.output_row(row);
            let out = self.output_row(bitmap, target)?;
            decoder.decode_row(row, out, bytes_per_pixel)?;
            self.host.modified(&mut bitmap.bitmap, target..target + 1);
        }
        Ok(())
    }

    fn decode_png(
        &self,
        width: u32,
        height: u32,
        bitmap: &mut DecodedBitmap<C::Bitmap>,
    ) -> BmpResult<()> {
        let mut decoder = png::Decoder::new(self.data);
        decoder.set_transformations(
            png::Transformations::EXPAND | png::Transformations::STRIP_16,
        );
        let mut reader = match decoder.read_info() {
            Ok(reader) => reader,
            Err(error) => return Err(png_error(error, width, height)),
        };
        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(reader.output_buffer_size()).is_err() {
            return Err(BmpError::InsufficientMemory { width, height });
        }
        buffer.resize(reader.output_buffer_size(), 0);
        let info = match reader.next_frame(&mut buffer) {
            Ok(info) => info,
            Err(error) => return Err(png_error(error, width, height)),
        };
        if info.bit_depth != png::BitDepth::Eight {
            data_error!("Unsupported PNG bit depth: {:?}", info.bit_depth);
        }
        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                data_error!("PNG palette was not expanded");
            }
        };
        let bytes_per_pixel = bitmap.bytes_per_pixel;
        let rows = buffer.chunks(info.line_size).take(height as usize);
        for (y, line) in rows.enumerate() {
            let target = y as u32;
            let out = self.output_row(bitmap, target)?;
            let pixels = line.chunks_exact(channels).take(width as usize);
            let slots = out.chunks_exact_mut(bytes_per_pixel);
            for (pixel, slot) in pixels.zip(slots) {
                let rgba = match *pixel {
                    [gray] => [gray, gray, gray, u8::MAX],
                    [gray, alpha] => [gray, gray, gray, alpha],
                    [red, green, blue] => [red, green, blue, u8::MAX],
                    [red, green, blue, alpha] => [red, green, blue, alpha],
                    _ => [0, 0, 0, 0],
                };
                slot[..4].copy_from_slice(&rgba);
            }
            self.host.modified(&mut bitmap.bitmap, target..target + 1);
        }
        Ok(())
    }

    /// Returns the host storage for output row `target`.
    fn output_row<'b>(
        &self,
        bitmap: &'b mut DecodedBitmap<C::Bitmap>,
        target: u32,
    ) -> BmpResult<&'b mut [u8]> {
        let (width, height) = (bitmap.width, bitmap.height);
        let row_len = width as usize * bitmap.bytes_per_pixel;
        let start = target as usize * row_len;
        let buffer = self.host.buffer(&mut bitmap.bitmap);
        match buffer.get_mut(start..start + row_len) {
            Some(row) => Ok(row),
            None => Err(BmpError::InsufficientMemory { width, height }),
        }
    }
}

fn png_error(error: png::DecodingError, width: u32, height: u32) -> BmpError {
    match error {
        png::DecodingError::IoError(ref io_error)
            if io_error.kind() == io::ErrorKind::UnexpectedEof =>
        {
            let message = format!("PNG data ends early: {}", error);
            BmpError::InsufficientData(message)
        }
        png::DecodingError::LimitsExceeded => {
            BmpError::InsufficientMemory { width, height }
        }
        _ => BmpError::DataError(format!("Malformed PNG data: {}", error)),
    }
}

/// Reads the dimensions from the IHDR chunk of PNG data without decoding
/// it.
pub(crate) fn png_dimensions(data: &[u8]) -> BmpResult<(u32, u32)> {
    let reader = ByteReader::new(data);
    if reader.slice(12, 4)? != b"IHDR" {
        data_error!("PNG data does not start with an IHDR chunk");
    }
    Ok((reader.read_u32_be(16)?, reader.read_u32_be(20)?))
}

//===========================================================================//

/// A bitmap allocated through `BitmapCallbacks::create`, together with the
/// geometry the decoder wrote it with.
#[derive(Debug)]
pub struct DecodedBitmap<B> {
    bitmap: B,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
    invalidator: Invalidator,
}

impl<B> DecodedBitmap<B> {
    /// Returns the width of the bitmap, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the bitmap, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the size of each pixel slot in the host storage.
    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    /// Returns the host's bitmap handle.
    pub fn bitmap(&self) -> &B {
        &self.bitmap
    }

    /// Returns the host's bitmap handle, mutably.
    pub fn bitmap_mut(&mut self) -> &mut B {
        &mut self.bitmap
    }

    /// Returns the handle the host uses to discard this bitmap's pixels.
    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Returns true if the bitmap holds a fully decoded image that the host
    /// has not discarded.
    pub fn is_valid(&self) -> bool {
        self.invalidator.is_valid()
    }

    /// Takes the host's bitmap handle out, leaving its release to the
    /// caller.
    pub fn into_inner(self) -> B {
        self.bitmap
    }

    /// Hands the bitmap back to the host through `BitmapCallbacks::destroy`.
    pub fn release<C>(self, host: &C)
    where
        C: BitmapCallbacks<Bitmap = B>,
    {
        host.destroy(self.bitmap);
    }
}

//===========================================================================//


//===========================================================================//
