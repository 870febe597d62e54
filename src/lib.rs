//! A memory-safe library for decoding ICO/CUR files and BMP images.
//!
//! An ICO file holds a collection of images (typically the same icon at
//! several sizes), each stored either as a BMP image without its file header
//! or as a complete PNG file.  CUR files are the same, except that each entry
//! also records a cursor hotspot.
//!
//! Decoded pixels go into storage that the host application provides through
//! the [`BitmapCallbacks`] trait.  [`VecAllocator`] is a ready-made host that
//! keeps each bitmap in a `Vec<u8>`.
//!
//! # Example: decoding the best match for a size
//!
//! ```no_run
//! use icobmp::{IcoCollection, VecAllocator};
//! let data = std::fs::read("path/to/file.ico").unwrap();
//! let mut icons = IcoCollection::parse(&data).unwrap();
//! let entry = *icons.find(32, 32).expect("ICO file has no entries");
//! let image = icons.image(&entry, &VecAllocator).unwrap();
//! let bitmap = image.decode().unwrap();
//! // Top-down RGBA, four bytes per pixel:
//! let rgba = bitmap.bitmap().data();
//! let num_pixels = image.width() as usize * image.height() as usize;
//! assert_eq!(rgba.len(), 4 * num_pixels);
//! ```
//!
//! # Example: decoding a BMP file
//!
//! ```no_run
//! use icobmp::{Image, VecAllocator};
//! let data = std::fs::read("path/to/file.bmp").unwrap();
//! let image = Image::from_bmp(&data, &VecAllocator).unwrap();
//! let bitmap = image.decode().unwrap();
//! println!("{}x{}", bitmap.width(), bitmap.height());
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bmpdepth;
mod callbacks;
mod decoder;
mod error;
mod header;
mod icondir;
mod image;
mod palette;
mod reader;
mod restype;
mod rle;

pub use crate::callbacks::{
    BitmapCallbacks, BitmapState, Invalidator, RgbaBuffer, VecAllocator,
};
pub use crate::error::{BmpError, BmpResult, ErrorCode};
pub use crate::header::{
    BitMasks, BmpHeader, Compression, DecodePlan, RowOrder,
};
pub use crate::icondir::{EntryFormat, IcoCollection, IcoEntry};
pub use crate::image::{DecodedBitmap, Image};
pub use crate::palette::{ColorTable, Rgb};
pub use crate::reader::ByteReader;
pub use crate::restype::ResourceType;
