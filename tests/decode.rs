use icobmp::{
    BitmapCallbacks, BitmapState, ErrorCode, IcoCollection, Image,
    Invalidator, ResourceType, RowOrder, VecAllocator,
};
use std::cell::{Cell, RefCell};
use std::ops::Range;

//===========================================================================//

/// Builds a BITMAPINFOHEADER for an icon entry of `width` by `height`
/// pixels (the stored height covers the AND mask too).
fn dib(
    width: i32,
    height: i32,
    bpp: u16,
    compression: u32,
    colors_used: u32,
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&(2 * height).to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&bpp.to_le_bytes());
    data.extend_from_slice(&compression.to_le_bytes());
    data.extend_from_slice(&[0; 12]);
    data.extend_from_slice(&colors_used.to_le_bytes());
    data.extend_from_slice(&[0; 4]);
    data
}

/// Wraps encoded images in an ICO/CUR directory.
fn ico(restype: u8, images: &[&[u8]]) -> Vec<u8> {
    let mut data = vec![0, 0, restype, 0, images.len() as u8, 0];
    let mut offset = 6 + 16 * images.len() as u32;
    for image in images.iter() {
        data.extend_from_slice(&[0, 0, 0, 0, 1, 0, 32, 0]);
        data.extend_from_slice(&(image.len() as u32).to_le_bytes());
        data.extend_from_slice(&offset.to_le_bytes());
        offset += image.len() as u32;
    }
    for image in images.iter() {
        data.extend_from_slice(image);
    }
    data
}

fn decode_first(file: &[u8]) -> Vec<u8> {
    let icons = IcoCollection::parse(file).unwrap();
    let image = icons.image(&icons.entries()[0], &VecAllocator).unwrap();
    image.decode().unwrap().into_inner().into_data()
}

fn decode_error(file: &[u8]) -> ErrorCode {
    let icons = IcoCollection::parse(file).unwrap();
    let image = icons.image(&icons.entries()[0], &VecAllocator).unwrap();
    image.decode().unwrap_err().code()
}

// A 2x2 24-bit icon, bottom row stored first, with an empty AND mask.
fn rgb_icon(height: i32) -> Vec<u8> {
    let mut image = dib(2, height, 24, 0, 0);
    image.extend_from_slice(b"\x01\x02\x03\x04\x05\x06\x00\x00");
    image.extend_from_slice(b"\x07\x08\x09\x0a\x0b\x0c\x00\x00");
    image.extend_from_slice(&[0; 8]);
    ico(1, &[&image])
}

//===========================================================================//

#[test]
fn decode_24bpp_icon() {
    let rgba: &[u8] = b"\
        \x09\x08\x07\xff\x0c\x0b\x0a\xff\
        \x03\x02\x01\xff\x06\x05\x04\xff";
    assert_eq!(decode_first(&rgb_icon(2)), rgba);
}

#[test]
fn top_down_rows_are_mirrored() {
    let file = rgb_icon(-2);
    let icons = IcoCollection::parse(&file).unwrap();
    let image = icons.image(&icons.entries()[0], &VecAllocator).unwrap();
    assert_eq!(image.plan().unwrap().row_order(), RowOrder::TopDown);
    assert_eq!(image.header().unwrap().height(), -2);
    let bottom_up = decode_first(&rgb_icon(2));
    let top_down = decode_first(&file);
    assert_eq!(&top_down[..8], &bottom_up[8..]);
    assert_eq!(&top_down[8..], &bottom_up[..8]);
}

#[test]
fn decode_8bpp_palette_icon() {
    let mut image = dib(2, 2, 8, 0, 2);
    image.extend_from_slice(b"\x00\x00\xff\x00\x00\xff\x00\x00");
    image.extend_from_slice(b"\x00\x01\x00\x00\x01\x00\x00\x00");
    image.extend_from_slice(&[0; 8]);
    let rgba: &[u8] = b"\
        \x00\xff\x00\xff\xff\x00\x00\xff\
        \xff\x00\x00\xff\x00\xff\x00\xff";
    assert_eq!(decode_first(&ico(1, &[&image])), rgba);
}

#[test]
fn and_mask_clears_alpha() {
    let mut image = dib(2, 2, 8, 0, 2);
    image.extend_from_slice(b"\x00\x00\xff\x00\x00\xff\x00\x00");
    image.extend_from_slice(b"\x00\x01\x00\x00\x01\x00\x00\x00");
    image.extend_from_slice(b"\x80\x00\x00\x00\x40\x00\x00\x00");
    let rgba: &[u8] = b"\
        \x00\xff\x00\xff\xff\x00\x00\x00\
        \xff\x00\x00\x00\x00\xff\x00\xff";
    assert_eq!(decode_first(&ico(1, &[&image])), rgba);
}

#[test]
fn decode_rle8_icon() {
    let mut image = dib(4, 1, 8, 1, 10);
    for index in 0..10u8 {
        let color = if index == 9 { [0x30, 0x20, 0x10, 0] } else { [0; 4] };
        image.extend_from_slice(&color);
    }
    image.extend_from_slice(b"\x04\x09\x00\x00\x00\x01");
    image.extend_from_slice(&[0; 4]);
    let rgba = decode_first(&ico(1, &[&image]));
    assert_eq!(rgba, [0x10u8, 0x20, 0x30, 0xff].repeat(4));
}

#[test]
fn truncated_rle8_stream() {
    let mut image = dib(4, 2, 8, 1, 1);
    image.extend_from_slice(&[0; 4]);
    image.extend_from_slice(b"\x04\x00\x00\x00\x02");
    assert_eq!(decode_error(&ico(1, &[&image])), ErrorCode::InsufficientData);
}

#[test]
fn decode_32bpp_bmp_file_is_opaque() {
    let mut file =
        b"BM\x3e\x00\x00\x00\x00\x00\x00\x00\x36\x00\x00\x00".to_vec();
    let mut info = dib(2, 1, 32, 0, 0);
    info[8..12].copy_from_slice(&1i32.to_le_bytes());
    file.extend_from_slice(&info);
    file.extend_from_slice(b"\x10\x20\x30\x00\x40\x50\x60\x80");
    let image = Image::from_bmp(&file, &VecAllocator).unwrap();
    assert_eq!((image.width(), image.height()), (2, 1));
    let bitmap = image.decode().unwrap();
    let rgba: &[u8] = b"\x30\x20\x10\xff\x60\x50\x40\xff";
    assert_eq!(bitmap.bitmap().data(), rgba);
}

#[test]
fn find_then_decode() {
    let mut small = dib(1, 1, 24, 0, 0);
    small.extend_from_slice(b"\xff\x00\x00\x00\x00\x00\x00\x00");
    let mut large = dib(2, 2, 24, 0, 0);
    large.extend_from_slice(&[0; 24]);
    let file = ico(1, &[&small, &large]);
    let mut icons = IcoCollection::parse(&file).unwrap();
    assert_eq!((icons.width(), icons.height()), (2, 2));
    let entry = *icons.find(1, 1).unwrap();
    assert_eq!((icons.width(), icons.height()), (1, 1));
    let image = icons.image(&entry, &VecAllocator).unwrap();
    let bitmap = image.decode().unwrap();
    assert_eq!(bitmap.bitmap().data(), b"\x00\x00\xff\xff");
}

#[test]
fn cursor_hotspot_reaches_image() {
    let mut file = rgb_icon(2);
    file[2] = 2;
    file[10..14].copy_from_slice(b"\x01\x00\x00\x00");
    let cursors = IcoCollection::parse(&file).unwrap();
    assert_eq!(cursors.resource_type(), ResourceType::Cursor);
    let entry = &cursors.entries()[0];
    let image = cursors.image(entry, &VecAllocator).unwrap();
    assert_eq!(image.cursor_hotspot(), Some((1, 0)));
}

//===========================================================================//

#[derive(Default)]
struct RecordingHost {
    created: Cell<usize>,
    destroyed: Cell<usize>,
    states: RefCell<Vec<BitmapState>>,
    modified: RefCell<Vec<Range<u32>>>,
    invalidators: RefCell<Vec<Invalidator>>,
    refuse: bool,
}

impl BitmapCallbacks for RecordingHost {
    type Bitmap = Vec<u8>;

    fn create(
        &self,
        width: u32,
        height: u32,
        state: BitmapState,
    ) -> Option<Vec<u8>> {
        self.created.set(self.created.get() + 1);
        self.states.borrow_mut().push(state);
        if self.refuse {
            return None;
        }
        Some(vec![0xee; width as usize * height as usize * 5])
    }

    fn destroy(&self, _bitmap: Vec<u8>) {
        self.destroyed.set(self.destroyed.get() + 1);
    }

    fn buffer<'b>(&self, bitmap: &'b mut Vec<u8>) -> &'b mut [u8] {
        bitmap
    }

    fn bytes_per_pixel(&self, _bitmap: &Vec<u8>) -> usize {
        5
    }

    fn set_suspendable(
        &self,
        _bitmap: &mut Vec<u8>,
        invalidator: Invalidator,
    ) {
        self.invalidators.borrow_mut().push(invalidator);
    }

    fn modified(&self, _bitmap: &mut Vec<u8>, rows: Range<u32>) {
        self.modified.borrow_mut().push(rows);
    }
}

#[test]
fn host_callbacks_during_decode() {
    let file = rgb_icon(2);
    let host = RecordingHost::default();
    let icons = IcoCollection::parse(&file).unwrap();
    let image = icons.image(&icons.entries()[0], &host).unwrap();
    let mut bitmap = image.create_bitmap().unwrap();
    assert_eq!(host.created.get(), 1);
    assert!(!host.states.borrow()[0].opaque);
    assert_eq!(host.invalidators.borrow().len(), 1);
    assert_eq!(bitmap.bytes_per_pixel(), 5);

    image.decode_into(&mut bitmap).unwrap();
    assert!(bitmap.is_valid());
    assert_eq!(host.created.get(), 1);
    assert_eq!(host.destroyed.get(), 0);
    assert_eq!(*host.modified.borrow(), vec![1..2, 0..1]);
    let expected: &[u8] = b"\
        \x09\x08\x07\xff\xee\x0c\x0b\x0a\xff\xee\
        \x03\x02\x01\xff\xee\x06\x05\x04\xff\xee";
    assert_eq!(bitmap.bitmap().as_slice(), expected);

    host.invalidators.borrow()[0].invalidate();
    assert!(!bitmap.is_valid());
    image.decode_into(&mut bitmap).unwrap();
    assert!(bitmap.is_valid());

    bitmap.release(&host);
    assert_eq!(host.destroyed.get(), 1);
}

#[test]
fn host_refuses_storage() {
    let file = rgb_icon(2);
    let host = RecordingHost { refuse: true, ..RecordingHost::default() };
    let icons = IcoCollection::parse(&file).unwrap();
    let image = icons.image(&icons.entries()[0], &host).unwrap();
    let error = image.decode().unwrap_err();
    assert_eq!(error.code(), ErrorCode::InsufficientMemory);
    assert_eq!(host.created.get(), 1);
    assert_eq!(host.destroyed.get(), 0);
}

#[test]
fn missing_pixel_data_fails_before_host_is_asked() {
    let mut file = rgb_icon(2);
    file.truncate(file.len() - 16);
    file[14..18].copy_from_slice(&48u32.to_le_bytes());
    let host = RecordingHost::default();
    let icons = IcoCollection::parse(&file).unwrap();
    let image = icons.image(&icons.entries()[0], &host).unwrap();
    let error = image.decode().unwrap_err();
    assert_eq!(error.code(), ErrorCode::InsufficientData);
    assert_eq!(host.created.get(), 0);
    assert_eq!(host.destroyed.get(), 0);
}

#[test]
fn huge_declared_size_with_no_pixels() {
    let image = dib(30000, 30000, 24, 0, 0);
    let file = ico(1, &[&image]);
    assert_eq!(file.len(), 62);
    let host = RecordingHost { refuse: true, ..RecordingHost::default() };
    let icons = IcoCollection::parse(&file).unwrap();
    let image = icons.image(&icons.entries()[0], &host).unwrap();
    assert_eq!((image.width(), image.height()), (30000, 30000));
    let error = image.decode().unwrap_err();
    assert_eq!(error.code(), ErrorCode::InsufficientData);
    assert_eq!(host.created.get(), 0);
}

#[test]
fn failed_decode_into_keeps_written_rows() {
    let mut file = rgb_icon(2);
    file.truncate(file.len() - 16);
    file[14..18].copy_from_slice(&48u32.to_le_bytes());
    let host = RecordingHost::default();
    let icons = IcoCollection::parse(&file).unwrap();
    let image = icons.image(&icons.entries()[0], &host).unwrap();
    let mut bitmap = image.create_bitmap().unwrap();
    let error = image.decode_into(&mut bitmap).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InsufficientData);
    assert!(!bitmap.is_valid());
    assert_eq!(*host.modified.borrow(), vec![1..2]);
    bitmap.release(&host);
    assert_eq!(host.created.get(), 1);
    assert_eq!(host.destroyed.get(), 1);
}

//===========================================================================//
