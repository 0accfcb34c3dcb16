//! Format registration, so a generic image loader can pick this decoder by sniffing.
use crate::decode::Result;
use crate::ppm::{self, Metadata, Output};
use std::io::Read;

/// A decodable image format.
#[derive(Clone, Copy)]
pub struct Format {
    /// Logical name, e.g. `"ppm"`.
    pub name: &'static str,
    /// Any of these prefixes selects this format.
    pub magic: &'static [&'static [u8]],
    pub decode: fn(&mut dyn Read) -> Result<Output>,
    pub metadata: fn(&mut dyn Read) -> Result<Metadata>,
}

impl Format {
    /// Whether `prefix` (the first bytes of a stream) belongs to this format.
    pub fn matches(&self, prefix: &[u8]) -> bool {
        self.magic.iter().any(|m| prefix.starts_with(m))
    }
}

impl std::fmt::Debug for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Format")
            .field("name", &self.name)
            .field("magic", &self.magic)
            .finish_non_exhaustive()
    }
}

/// The binary and ascii portable pixmap.
pub const PPM: Format = Format {
    name: "ppm",
    magic: &[ppm::raw::MAGIC, ppm::plain::MAGIC],
    decode: |r| crate::decode(r),
    metadata: |r| crate::metadata(r),
};

/// Every registered format.
pub static FORMATS: &[Format] = &[PPM];

/// Pick a format from the first bytes of a stream.
pub fn guess(prefix: &[u8]) -> Option<&'static Format> {
    FORMATS.iter().find(|f| f.matches(prefix))
}

#[test]
fn test_guess() {
    assert_eq!(guess(b"P6 1 1 255\n").map(|f| f.name), Some("ppm"));
    assert_eq!(guess(b"P3").map(|f| f.name), Some("ppm"));
    assert!(guess(b"P5 1 1 255\n").is_none());
    assert!(guess(b"P").is_none());
    assert!(guess(b"\x89PNG").is_none());
}

#[test]
fn test_dispatch() {
    let data = include_bytes!("../tdata/rainbowR.ppm");
    let f = guess(data).unwrap();
    let meta = (f.metadata)(&mut &data[..]).unwrap();
    assert_eq!((meta.width, meta.height), (5, 3));
    let out = (f.decode)(&mut &data[..]).unwrap();
    assert_eq!(&**out.buffer(), include_bytes!("../tdata/rainbow.imgbuf"));
}
