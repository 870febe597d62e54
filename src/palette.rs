use crate::error::BmpResult;
use crate::reader::ByteReader;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// One color table entry.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Rgb {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

//===========================================================================//

/// The palette used by indexed (1, 4 and 8 bits-per-pixel) BMP images.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColorTable {
    entries: Vec<Rgb>,
}

impl ColorTable {
    /// Creates a color table from a list of entries.
    pub fn new(entries: Vec<Rgb>) -> ColorTable {
        ColorTable { entries }
    }

    /// Reads `count` entries starting at `offset`.  Each entry is stored
    /// blue first and occupies `entry_size` bytes (3 for OS/2 core headers,
    /// 4 otherwise, where the last byte is reserved).
    pub(crate) fn read(
        reader: &ByteReader,
        offset: usize,
        count: usize,
        entry_size: usize,
    ) -> BmpResult<ColorTable> {
        let table_len = count * entry_size;
        if !reader.contains(offset, table_len) {
            insufficient_data!(
                "Color table of {} entries at offset {} is truncated \
                 (buffer has {} bytes)",
                count,
                offset,
                reader.len()
            );
        }
        let bytes = reader.slice(offset, table_len)?;
        let entries = bytes
            .chunks_exact(entry_size)
            .map(|bgr| Rgb { red: bgr[2], green: bgr[1], blue: bgr[0] })
            .collect();
        Ok(ColorTable { entries })
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries of the table.
    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    /// Returns the color for a palette index, or `None` if the index is
    /// outside of the table.
    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.entries.get(index as usize).copied()
    }
}

//===========================================================================//


//===========================================================================//
