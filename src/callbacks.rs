use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//===========================================================================//

/// Hints passed to the host when a bitmap is created.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BitmapState {
    /// True if every pixel of the decoded image will be fully opaque.
    pub opaque: bool,
}

//===========================================================================//

/// A handle the host uses to report that it has discarded the pixels of a
/// suspended bitmap.  Clones share the same flag.
#[derive(Clone, Debug)]
pub struct Invalidator {
    valid: Arc<AtomicBool>,
}

impl Invalidator {
    pub(crate) fn new() -> Invalidator {
        Invalidator { valid: Arc::new(AtomicBool::new(false)) }
    }

    /// Marks the pixel data as discarded.  The owning bitmap has to be
    /// decoded again before it is used.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Returns true if the pixel data is complete and has not been
    /// discarded.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::Release);
    }
}

//===========================================================================//

/// The pixel storage a host application lends to the decoder.
///
/// The decoder calls `create` once per decode, writes top-down RGBA pixels
/// into the slice returned by `buffer` (each pixel in the first four bytes
/// of a `bytes_per_pixel`-sized slot) and never reads them back.  It never
/// calls `destroy` on a bitmap it has handed to the caller.
pub trait BitmapCallbacks {
    /// The host's handle to one bitmap.
    type Bitmap;

    /// Allocates storage for a `width` by `height` bitmap, or returns `None`
    /// if the host can't.
    fn create(
        &self,
        width: u32,
        height: u32,
        state: BitmapState,
    ) -> Option<Self::Bitmap>;

    /// Releases a bitmap.
    fn destroy(&self, bitmap: Self::Bitmap) {
        drop(bitmap);
    }

    /// Returns the writable pixel storage of a bitmap.
    fn buffer<'b>(&self, bitmap: &'b mut Self::Bitmap) -> &'b mut [u8];

    /// Returns the number of bytes each pixel occupies in the storage.
    fn bytes_per_pixel(&self, _bitmap: &Self::Bitmap) -> usize {
        4
    }

    /// Registers a bitmap whose pixels the host may discard and later ask
    /// to have regenerated.  The host calls `invalidator.invalidate()` when
    /// it discards them.
    fn set_suspendable(
        &self,
        _bitmap: &mut Self::Bitmap,
        _invalidator: Invalidator,
    ) {
    }

    /// Called after the decoder has written output rows `rows`.
    fn modified(&self, _bitmap: &mut Self::Bitmap, _rows: Range<u32>) {}
}

//===========================================================================//

/// A bitmap allocated by `VecAllocator`: tightly packed RGBA pixels.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RgbaBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaBuffer {
    /// Returns the width of the bitmap, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the bitmap, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the RGBA data for the bitmap, in row-major order from top to
    /// bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the bitmap and returns its RGBA data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// A host that keeps each bitmap in a heap-allocated `Vec<u8>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct VecAllocator;

impl BitmapCallbacks for VecAllocator {
    type Bitmap = RgbaBuffer;

    fn create(
        &self,
        width: u32,
        height: u32,
        _state: BitmapState,
    ) -> Option<RgbaBuffer> {
        let len = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, 0);
        Some(RgbaBuffer { width, height, data })
    }

    fn buffer<'b>(&self, bitmap: &'b mut RgbaBuffer) -> &'b mut [u8] {
        &mut bitmap.data
    }
}

//===========================================================================//


//===========================================================================//
