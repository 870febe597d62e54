#![no_main]
use icobmp::{IcoCollection, Image, VecAllocator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Every entry of a parsed collection must decode or fail cleanly.
    if let Ok(mut icons) = IcoCollection::parse(data) {
        let _ = icons.find(255, 255);
        for entry in icons.entries() {
            if let Ok(image) = icons.image(entry, &VecAllocator) {
                let _ = image.decode();
            }
        }
    }

    // The same bytes as a stand-alone BMP file.
    if let Ok(image) = Image::from_bmp(data, &VecAllocator) {
        let _ = image.decode();
    }
});
