use crate::callbacks::BitmapCallbacks;
use crate::error::BmpResult;
use crate::header::BmpHeader;
use crate::image::{png_dimensions, Image};
use crate::reader::ByteReader;
use crate::restype::ResourceType;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

//===========================================================================//

// The signature that all PNG files start with.
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];

// Sizes of the ICONDIR header and of each ICONDIRENTRY, in bytes:
const DIRECTORY_HEADER_LEN: usize = 6;
const DIRECTORY_ENTRY_LEN: usize = 16;

//===========================================================================//

/// How the image data of an entry is encoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum EntryFormat {
    /// A BMP DIB header and pixel data, without the BMP file header.
    Bmp,
    /// A complete PNG file.
    Png,
}

//===========================================================================//

/// One entry in an ICO or CUR file; a single icon or cursor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IcoEntry {
    restype: ResourceType,
    width: u16,
    height: u16,
    color_count: u8,
    planes: u16,
    bits_per_pixel: u16,
    byte_size: u32,
    file_offset: u32,
    format: EntryFormat,
}

impl IcoEntry {
    /// Returns the type of resource stored in this entry, either an icon or a
    /// cursor.
    pub fn resource_type(&self) -> ResourceType {
        self.restype
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns the number of palette colors declared by the directory, or
    /// zero if the image is not indexed.
    pub fn color_count(&self) -> u8 {
        self.color_count
    }

    /// Returns the bits-per-pixel (color depth) of the image.  Returns zero if
    /// `self.resource_type() == ResourceType::Cursor` (since CUR files store
    /// hotspot coordinates in place of this field).
    pub fn bits_per_pixel(&self) -> u16 {
        if self.restype.has_hotspot() {
            0
        } else {
            self.bits_per_pixel
        }
    }

    /// Returns the coordinates of the cursor hotspot (pixels right from the
    /// left edge of the image, and pixels down from the top edge), or `None`
    /// if `self.resource_type() != ResourceType::Cursor`.
    pub fn cursor_hotspot(&self) -> Option<(u16, u16)> {
        if self.restype.has_hotspot() {
            Some((self.planes, self.bits_per_pixel))
        } else {
            None
        }
    }

    /// Returns the size of the encoded image data, in bytes.
    pub fn byte_size(&self) -> u32 {
        self.byte_size
    }

    /// Returns the offset of the encoded image data from the start of the
    /// file.
    pub fn file_offset(&self) -> u32 {
        self.file_offset
    }

    /// Returns how the image data is encoded.
    pub fn format(&self) -> EntryFormat {
        self.format
    }

    /// Returns true if the image is encoded as a PNG, or false if it is
    /// encoded as a BMP.
    pub fn is_png(&self) -> bool {
        self.format == EntryFormat::Png
    }

    fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Reads the true dimensions from the embedded image header.
    fn embedded_size(&self, data: &[u8]) -> BmpResult<(u32, u32)> {
        match self.format {
            EntryFormat::Png => png_dimensions(data),
            EntryFormat::Bmp => {
                let (_, plan) = BmpHeader::parse_dib(data)?;
                Ok((plan.width(), plan.height()))
            }
        }
    }
}

//===========================================================================//

/// A parsed ICO or CUR file.  Image data is borrowed from the input buffer
/// and only decoded on request.
#[derive(Clone, Debug)]
pub struct IcoCollection<'a> {
    reader: ByteReader<'a>,
    restype: ResourceType,
    entries: Vec<IcoEntry>,
    width: u16,
    height: u16,
}

impl<'a> IcoCollection<'a> {
    /// Parses the directory of an ICO or CUR file.  Every entry's image
    /// data must lie within `data`.
    pub fn parse(data: &'a [u8]) -> BmpResult<IcoCollection<'a>> {
        let reader = ByteReader::new(data);
        if reader.len() < DIRECTORY_HEADER_LEN {
            insufficient_data!(
                "ICONDIR needs {} bytes (buffer has {})",
                DIRECTORY_HEADER_LEN,
                reader.len()
            );
        }
        let reserved = reader.read_u16_le(0)?;
        if reserved != 0 {
            invalid_header!(
                "Invalid reserved field value in ICONDIR \
                 (was {}, but must be 0)",
                reserved
            );
        }
        let restype = reader.read_u16_le(2)?;
        let restype = match ResourceType::from_number(restype) {
            Some(restype) => restype,
            None => invalid_header!("Invalid resource type ({})", restype),
        };
        let num_entries = reader.read_u16_le(4)? as usize;
        let directory_len =
            DIRECTORY_HEADER_LEN + DIRECTORY_ENTRY_LEN * num_entries;
        if reader.len() < directory_len {
            insufficient_data!(
                "ICONDIR declares {} entries, which need {} bytes \
                 (buffer has {})",
                num_entries,
                directory_len,
                reader.len()
            );
        }

        let mut entries = Vec::<IcoEntry>::with_capacity(num_entries);
        for index in 0..num_entries {
            let start = DIRECTORY_HEADER_LEN + DIRECTORY_ENTRY_LEN * index;
            let width_byte = reader.read_u8(start)?;
            let height_byte = reader.read_u8(start + 1)?;
            let color_count = reader.read_u8(start + 2)?;
            let reserved = reader.read_u8(start + 3)?;
            if reserved != 0 {
                log::debug!(
                    "Ignoring reserved byte {} in ICONDIRENTRY {}",
                    reserved,
                    index
                );
            }
            let planes = reader.read_u16_le(start + 4)?;
            let bits_per_pixel = reader.read_u16_le(start + 6)?;
            let byte_size = reader.read_u32_le(start + 8)?;
            let file_offset = reader.read_u32_le(start + 12)?;
            if file_offset as usize > reader.len() {
                data_error!(
                    "ICONDIRENTRY {} data offset ({}) is past the end of \
                     the file ({} bytes)",
                    index,
                    file_offset,
                    reader.len()
                );
            }
            let end = match file_offset.checked_add(byte_size) {
                Some(end) => end,
                None => {
                    data_error!(
                        "ICONDIRENTRY {} data span overflows \
                         (offset {}, size {})",
                        index,
                        file_offset,
                        byte_size
                    );
                }
            };
            if end as usize > reader.len() {
                insufficient_data!(
                    "ICONDIRENTRY {} data ends at {}, past the end of the \
                     file ({} bytes)",
                    index,
                    end,
                    reader.len()
                );
            }
            // The ICONDIRENTRY struct uses only one byte each for width and
            // height, where zero means 256.  Images of 256 pixels or more
            // also store zero, and the true size comes from the image data.
            let width = if width_byte == 0 { 256 } else { width_byte as u16 };
            let height =
                if height_byte == 0 { 256 } else { height_byte as u16 };
            let data = reader.slice(file_offset as usize, byte_size as usize)?;
            let format = if data.starts_with(PNG_SIGNATURE) {
                EntryFormat::Png
            } else {
                EntryFormat::Bmp
            };
            entries.push(IcoEntry {
                restype,
                width,
                height,
                color_count,
                planes,
                bits_per_pixel,
                byte_size,
                file_offset,
                format,
            });
        }

        // Replace the directory's width/height with the actual width/height
        // of each image.  Malformed image data is left alone here and only
        // reported when that image is decoded.
        for (index, entry) in entries.iter_mut().enumerate() {
            let data = reader
                .slice(entry.file_offset as usize, entry.byte_size as usize)?;
            let (width, height) = match entry.embedded_size(data) {
                Ok(size) => size,
                Err(error) => {
                    log::debug!(
                        "Keeping directory size for entry {}: {}",
                        index,
                        error
                    );
                    continue;
                }
            };
            let (width, height) =
                match (u16::try_from(width), u16::try_from(height)) {
                    (Ok(width), Ok(height)) => (width, height),
                    _ => continue,
                };
            if (width, height) != (entry.width, entry.height) {
                log::debug!(
                    "Entry {} is {}x{}, but the directory says {}x{}",
                    index,
                    width,
                    height,
                    entry.width,
                    entry.height
                );
                entry.width = width;
                entry.height = height;
            }
        }

        let (width, height) = entries
            .iter()
            .enumerate()
            .max_by_key(|&(index, entry)| (entry.area(), Reverse(index)))
            .map_or((0, 0), |(_, entry)| (entry.width, entry.height));
        log::debug!(
            "Parsed {:?} directory with {} entries; largest is {}x{}",
            restype,
            entries.len(),
            width,
            height
        );
        Ok(IcoCollection { reader, restype, entries, width, height })
    }

    /// Returns the type of resource stored in this collection, either icons or
    /// cursors.
    pub fn resource_type(&self) -> ResourceType {
        self.restype
    }

    /// Returns the entries in this collection, in directory order.
    pub fn entries(&self) -> &[IcoEntry] {
        &self.entries
    }

    /// Returns the width of the selected entry: the largest one after
    /// parsing, or the one last returned by `find`.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns the height of the selected entry.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Selects the entry closest to `width` by `height`, measured by the
    /// squared distance between the dimensions.  Among equally close
    /// entries, one at least as large as the request in both dimensions is
    /// preferred, then the deepest color, then the first in the directory.
    /// Returns `None` if the collection is empty.
    pub fn find(&mut self, width: u16, height: u16) -> Option<&IcoEntry> {
        let (index, entry) =
            self.entries.iter().enumerate().min_by_key(|&(_, entry)| {
                let dw = entry.width as i64 - width as i64;
                let dh = entry.height as i64 - height as i64;
                let distance = dw * dw + dh * dh;
                let covers = entry.width >= width && entry.height >= height;
                (distance, !covers, Reverse(entry.bits_per_pixel()))
            })?;
        self.width = entry.width;
        self.height = entry.height;
        log::debug!(
            "Selected entry {} ({}x{}) for {}x{}",
            index,
            entry.width,
            entry.height,
            width,
            height
        );
        Some(&self.entries[index])
    }

    /// Parses the image header of an entry and binds it to `host` for
    /// decoding.
    pub fn image<'c, C>(
        &self,
        entry: &IcoEntry,
        host: &'c C,
    ) -> BmpResult<Image<'c, C>>
    where
        'a: 'c,
        C: BitmapCallbacks,
    {
        let data: &'a [u8] = self
            .reader
            .slice(entry.file_offset as usize, entry.byte_size as usize)?;
        Image::from_entry(data, host, entry.format, entry.cursor_hotspot())
    }
}

//===========================================================================//


//===========================================================================//
