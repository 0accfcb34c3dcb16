//! [Portable PixMap Format](https://en.wikipedia.org/wiki/Netpbm#PPM_example) RGB image decoding into RGBA rasters.
pub(crate) const CHANNELS: usize = 4;
pub type Output = Image<Vec<u8>, CHANNELS>;
use crate::decode::{decode_header, Cursor, Error, Header, Magic, Read, Result, Scanner};
use crate::options::DecoderOptions;
use fimg::Image;
use log::trace;

#[cfg(test)]
fn tdata() -> &'static [u8] {
    include_bytes!("../tdata/rainbow.imgbuf")
}

/// Color model of every decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    /// 8 bit red, green, blue, alpha. Alpha is always opaque.
    Rgba8,
}

impl ColorModel {
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgba8 => CHANNELS,
        }
    }
}

/// What can be known about an image from its header alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub color: ColorModel,
    pub width: u32,
    pub height: u32,
}

/// A ppm decoder over some byte stream.
///
/// The header is read at most once, so [`Decoder::metadata`] followed by
/// [`Decoder::decode`] picks up where the header left off.
/// A header error sticks: every later call returns it again.
pub struct Decoder<R> {
    cursor: Cursor<R>,
    options: DecoderOptions,
    header: Option<Result<Header>>,
}

impl<R: std::io::Read> Decoder<R> {
    /// Create a new ppm decoder with default options
    pub fn new(r: R) -> Self {
        Self::new_with_options(DecoderOptions::default(), r)
    }

    /// Create a new ppm decoder with the specified options
    pub fn new_with_options(options: DecoderOptions, r: R) -> Self {
        Self {
            cursor: Cursor::new(r),
            options,
            header: None,
        }
    }

    /// Read the header, unless that already happened.
    pub fn read_header(&mut self) -> Result<Header> {
        self.header
            .get_or_insert_with(|| decode_header(&mut self.cursor, &self.options))
            .clone()
    }

    /// The header, or none if it hasn't been read (or was invalid).
    pub fn header(&self) -> Option<Header> {
        self.header.as_ref()?.as_ref().ok().copied()
    }

    /// Return image dimensions or none if the header hasn't been read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.header().map(|h| (h.width.get(), h.height.get()))
    }

    /// Reads the header only. Never touches pixel data.
    pub fn metadata(&mut self) -> Result<Metadata> {
        let header = self.read_header()?;
        Ok(Metadata {
            color: ColorModel::Rgba8,
            width: header.width.get(),
            height: header.height.get(),
        })
    }

    /// Decode the whole image.
    pub fn decode(mut self) -> Result<Output> {
        let header = self.read_header()?;
        trace!("decoding {:?} body", header.magic);
        match header.magic {
            Magic::Raw => decode_body_into(&mut self.cursor, header, raw::pixel),
            Magic::Plain => {
                let scanner = Scanner::new(&self.options);
                let mut token = Vec::with_capacity(4);
                decode_body_into(&mut self.cursor, header, |c, x, y| {
                    plain::pixel(c, scanner, &mut token, x, y)
                })
            }
        }
    }
}

/// Fills a `width × height` raster in scan order, one `pixel` call per coordinate.
///
/// The first failing call aborts the decode and the partial raster is dropped.
pub(crate) fn decode_body_into<C: Read>(
    c: &mut C,
    header: Header,
    mut pixel: impl FnMut(&mut C, u32, u32) -> Result<[u8; 3]>,
) -> Result<Output> {
    let (width, height) = (header.width.get(), header.height.get());
    let mut buf = Vec::with_capacity(header.rgba_len());
    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = pixel(c, x, y)?;
            buf.extend_from_slice(&[r, g, b, 0xff]);
        }
    }
    Ok(Image::<_, CHANNELS>::build(width, height).buf(buf))
}

/// Module for handling plain ascii (human readable) [PPM](https://en.wikipedia.org/wiki/Netpbm#PPM_example) images.
pub mod plain {
    use super::*;
    pub const MAGIC: &[u8; 2] = b"P3";

    /// Reads one decimal sample.
    pub(crate) fn sample(
        c: &mut impl Read,
        scanner: Scanner,
        token: &mut Vec<u8>,
        x: u32,
        y: u32,
    ) -> Result<u8> {
        token.clear();
        if scanner.scan(c, 1, token) == 0 {
            return Err(Error::MissingData { x, y });
        }
        std::str::from_utf8(token)
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::BadSample {
                x,
                y,
                token: String::from_utf8_lossy(token).into_owned(),
            })
    }

    pub(crate) fn pixel(
        c: &mut impl Read,
        scanner: Scanner,
        token: &mut Vec<u8>,
        x: u32,
        y: u32,
    ) -> Result<[u8; 3]> {
        let mut px = [0; 3];
        for s in &mut px {
            *s = sample(c, scanner, token, x, y)?;
        }
        Ok(px)
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            &**Decoder::new(&include_bytes!("../tdata/rainbowA.ppm")[..])
                .decode()
                .unwrap()
                .buffer(),
            tdata()
        )
    }

    #[test]
    fn test_two_pixels() {
        let out = Decoder::new(&b"P3 2 1 255\n255 0 0 0 255 0\n"[..])
            .decode()
            .unwrap();
        assert_eq!((out.width(), out.height()), (2, 1));
        assert_eq!(&**out.buffer(), &[255, 0, 0, 255, 0, 255, 0, 255]);
    }

    #[test]
    fn test_body_comments() {
        let out = Decoder::new(&b"P3 1 2 255\n1 2 # red green\n3\n# second\n4\t5 6"[..])
            .decode()
            .unwrap();
        assert_eq!(&**out.buffer(), &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_short() {
        let Err(e) = Decoder::new(&b"P3 2 1 255\n255 0 0 0 255\n"[..]).decode() else {
            panic!("decoded a truncated image")
        };
        assert_eq!(e, Error::MissingData { x: 1, y: 0 });
    }

    #[test]
    fn test_bad_sample() {
        for (input, token) in [
            (&b"P3 1 1 255\n256 0 0\n"[..], "256"),
            (&b"P3 1 1 255\n0 -1 0\n"[..], "-1"),
            (&b"P3 1 1 255\n0 0 zz\n"[..], "zz"),
        ] {
            let Err(e) = Decoder::new(input).decode() else {
                panic!("decoded {token}")
            };
            assert_eq!(
                e,
                Error::BadSample {
                    x: 0,
                    y: 0,
                    token: token.into()
                }
            );
            assert_eq!(e.kind(), crate::decode::ErrorKind::NotEnoughData);
        }
    }

    #[test]
    fn test_strict() {
        let strict = DecoderOptions::new_strict();
        assert!(Decoder::new_with_options(strict, &b"P3 1 1 255\n9 8 7\n"[..])
            .decode()
            .is_ok());
        // doubled separators make an empty sample
        let Err(e) =
            Decoder::new_with_options(strict, &include_bytes!("../tdata/rainbowA.ppm")[..])
                .decode()
        else {
            panic!("strict mode accepted a doubled separator")
        };
        assert_eq!(
            e,
            Error::BadSample {
                x: 1,
                y: 0,
                token: String::new()
            }
        );
    }
}

/// Module for handling raw (binary) [PPM](https://en.wikipedia.org/wiki/Netpbm#PPM_example) images.
pub mod raw {
    use super::*;
    pub const MAGIC: &[u8; 2] = b"P6";

    /// Reads one pixel as three raw bytes.
    pub(crate) fn pixel(c: &mut impl Read, x: u32, y: u32) -> Result<[u8; 3]> {
        c.rd().ok_or(Error::MissingData { x, y })
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            &**Decoder::new(&include_bytes!("../tdata/rainbowR.ppm")[..])
                .decode()
                .unwrap()
                .buffer(),
            tdata()
        )
    }

    #[test]
    fn test_no_comments_in_body() {
        let out = Decoder::new(&b"P6 1 1 255\n#\n "[..]).decode().unwrap();
        assert_eq!(&**out.buffer(), &[b'#', b'\n', b' ', 255]);
    }

    #[test]
    fn test_short() {
        let mut input = b"P6 2 2 255\n".to_vec();
        input.extend([7; 11]);
        let Err(e) = Decoder::new(&input[..]).decode() else {
            panic!("decoded a truncated image")
        };
        assert_eq!(e, Error::MissingData { x: 1, y: 1 });
    }

    #[test]
    fn test_unsupported_max() {
        let mut input = b"P6 2 2 65535\n".to_vec();
        input.extend([0; 24]);
        let Err(e) = Decoder::new(&input[..]).decode() else {
            panic!("decoded a 16 bit image")
        };
        assert_eq!(e, Error::UnsupportedMax(65535));
    }
}

#[test]
fn test_plain_matches_raw() {
    let a = Decoder::new(&include_bytes!("../tdata/rainbowA.ppm")[..])
        .decode()
        .unwrap();
    let r = Decoder::new(&include_bytes!("../tdata/rainbowR.ppm")[..])
        .decode()
        .unwrap();
    assert_eq!((a.width(), a.height()), (5, 3));
    assert_eq!(a.buffer(), r.buffer());
    assert!(a.buffer().chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn test_metadata() {
    // no body at all
    let mut d = Decoder::new(&b"P6 640 480 255\n"[..]);
    assert_eq!(d.dimensions(), None);
    assert_eq!(
        d.metadata().unwrap(),
        Metadata {
            color: ColorModel::Rgba8,
            width: 640,
            height: 480
        }
    );
    assert_eq!(d.dimensions(), Some((640, 480)));
    assert_eq!(d.header().map(|h| h.magic), Some(Magic::Raw));

    // garbage body
    let mut d = Decoder::new(&b"P3 2 3 255\nnot pixels"[..]);
    assert_eq!(d.metadata().unwrap().width, 2);
    assert_eq!(ColorModel::Rgba8.channels(), 4);
}

#[test]
fn test_header_error_sticks() {
    // a rejected header followed by bytes that look like another header
    let mut d = Decoder::new(&b"P6 2 2 65535\nP6 1 1 255\n\x01\x02\x03"[..]);
    assert_eq!(d.metadata(), Err(Error::UnsupportedMax(65535)));
    assert_eq!(d.read_header(), Err(Error::UnsupportedMax(65535)));
    assert_eq!(d.dimensions(), None);
    let Err(e) = d.decode() else {
        panic!("decoded past a rejected header")
    };
    assert_eq!(e, Error::UnsupportedMax(65535));

    let mut d = Decoder::new(&b"P5 1 1 255\nP3 1 1 255\n1 2 3\n"[..]);
    assert_eq!(d.metadata(), Err(Error::BadMagic("P5".into())));
    assert_eq!(d.metadata(), Err(Error::BadMagic("P5".into())));
}

#[test]
fn test_metadata_then_decode() {
    let mut d = Decoder::new(&b"P3 1 1 255\n1 2 3\n"[..]);
    assert_eq!(d.metadata().unwrap().height, 1);
    assert_eq!(&**d.decode().unwrap().buffer(), &[1, 2, 3, 255]);
}
