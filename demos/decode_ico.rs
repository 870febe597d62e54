use clap::{App, Arg};
use icobmp::{
    BitmapCallbacks, BitmapState, BmpError, IcoCollection, Invalidator,
};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

//===========================================================================//

const BYTES_PER_PIXEL: usize = 4;

/// A host that keeps each bitmap in a zeroed, boxed slice.
struct PpmHost;

impl BitmapCallbacks for PpmHost {
    type Bitmap = Box<[u8]>;

    fn create(
        &self,
        width: u32,
        height: u32,
        state: BitmapState,
    ) -> Option<Box<[u8]>> {
        log::debug!(
            "create {}x{} bitmap (opaque: {})",
            width,
            height,
            state.opaque
        );
        let len = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(BYTES_PER_PIXEL)?;
        Some(vec![0u8; len].into_boxed_slice())
    }

    fn destroy(&self, bitmap: Box<[u8]>) {
        log::debug!("destroy bitmap of {} bytes", bitmap.len());
    }

    fn buffer<'b>(&self, bitmap: &'b mut Box<[u8]>) -> &'b mut [u8] {
        bitmap
    }

    fn bytes_per_pixel(&self, _bitmap: &Box<[u8]>) -> usize {
        BYTES_PER_PIXEL
    }

    fn set_suspendable(&self, _bitmap: &mut Box<[u8]>, _: Invalidator) {}
}

//===========================================================================//

fn main() {
    env_logger::init();
    let matches = App::new("decode_ico")
        .version("0.1")
        .about("Prints the best-matching image of an ICO file as a PPM")
        .arg(Arg::with_name("ico").required(true))
        .arg(
            Arg::with_name("width")
                .takes_value(true)
                .value_name("PIXELS")
                .long("width")
                .help("Sets the requested width (default 255)"),
        )
        .arg(
            Arg::with_name("height")
                .takes_value(true)
                .value_name("PIXELS")
                .long("height")
                .help("Sets the requested height (default 255)"),
        )
        .get_matches();
    let path = matches.value_of("ico").unwrap();
    let width = parse_size(matches.value_of("width"));
    let height = parse_size(matches.value_of("height"));

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(error) => {
            eprintln!("{}: {}", path, error);
            process::exit(1);
        }
    };
    let mut icons = match IcoCollection::parse(&data) {
        Ok(icons) => icons,
        Err(error) => fail("ico_analyse", &error),
    };
    let entry = match icons.find(width, height) {
        Some(entry) => *entry,
        None => {
            eprintln!("{}: collection has no images", path);
            process::exit(1);
        }
    };
    let image = match icons.image(&entry, &PpmHost) {
        Ok(image) => image,
        Err(error) => fail("bmp_analyse", &error),
    };
    let bitmap = match image.decode() {
        Ok(bitmap) => bitmap,
        Err(error) => fail("bmp_decode", &error),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = write_ppm(
        &mut out,
        path,
        bitmap.width(),
        bitmap.height(),
        bitmap.bitmap(),
    );
    bitmap.release(&PpmHost);
    if let Err(error) = result.and_then(|()| out.flush()) {
        eprintln!("write failed: {}", error);
        process::exit(1);
    }
}

fn parse_size(value: Option<&str>) -> u16 {
    match value {
        None => 255,
        Some(value) => match value.parse::<u16>() {
            Ok(size) => size,
            Err(error) => {
                eprintln!("Invalid size {:?}: {}", value, error);
                process::exit(1);
            }
        },
    }
}

fn fail(context: &str, error: &BmpError) -> ! {
    log::debug!("{} failed: {}", context, error);
    eprintln!("{} failed: {}", context, error.code());
    process::exit(1);
}

fn write_ppm<W: Write>(
    out: &mut W,
    path: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> io::Result<()> {
    writeln!(out, "P3")?;
    writeln!(out, "# {}", path)?;
    writeln!(out, "# width                {} ", width)?;
    writeln!(out, "# height               {} ", height)?;
    writeln!(out, "{} {} 255", width, height)?;
    let row_len = width as usize * BYTES_PER_PIXEL;
    for row in rgba.chunks_exact(row_len).take(height as usize) {
        for pixel in row.chunks_exact(BYTES_PER_PIXEL) {
            write!(out, "{} {} {} ", pixel[0], pixel[1], pixel[2])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

//===========================================================================//
