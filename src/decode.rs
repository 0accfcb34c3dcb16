//! decoding utilities
use crate::options::DecoderOptions;
use log::{debug, warn};
use std::io::BufReader;
use std::num::NonZeroU32;

/// Byte source for the decoders.
pub(crate) trait Read {
    fn rd<const N: usize>(&mut self) -> Option<[u8; N]>;
    fn by(&mut self) -> Option<u8> {
        Some(self.rd::<1>()?[0])
    }
}

/// Buffered, forward only cursor over the input stream.
///
/// Every byte the decoder looks at goes through here, exactly once.
pub struct Cursor<R> {
    inner: BufReader<R>,
    pos: u64,
}

impl<R: std::io::Read> Cursor<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pos: 0,
        }
    }

    /// Number of bytes consumed so far.
    pub const fn position(&self) -> u64 {
        self.pos
    }
}

impl<R: std::io::Read> Read for Cursor<R> {
    fn rd<const N: usize>(&mut self) -> Option<[u8; N]> {
        use std::io::Read;
        let mut buf = [0; N];
        // a failed read is the end of the stream as far as decoding is concerned
        self.inner.read_exact(&mut buf).ok()?;
        self.pos += N as u64;
        Some(buf)
    }
}

/// Comment aware tokenizer shared by the header and the ascii body.
///
/// `#` starts a comment that runs to the next `\n`; comment bytes never reach the output.
#[derive(Clone, Copy)]
pub(crate) struct Scanner {
    sep: fn(u8) -> bool,
    /// every separator closes a field, even an empty one
    empty: bool,
}

impl Scanner {
    pub(crate) fn new(options: &DecoderOptions) -> Self {
        Self {
            sep: options.separator(),
            empty: options.get_strict_mode(),
        }
    }

    /// Collects up to `fields` fields into `out`, single space separated.
    /// Returns how many fields were closed before the stream ended.
    pub(crate) fn scan(self, x: &mut impl Read, fields: usize, out: &mut Vec<u8>) -> usize {
        let mut seen = 0;
        let mut comment = false;
        let mut pending = false;
        while seen < fields {
            let Some(b) = x.by() else {
                // eof closes whatever was in progress
                return seen + pending as usize;
            };
            if comment {
                comment = b != b'\n';
            } else if b == b'#' {
                comment = true;
            } else if (self.sep)(b) {
                if pending || self.empty {
                    seen += 1;
                    if seen < fields {
                        out.push(b' ');
                    }
                }
                pending = false;
            } else {
                out.push(b);
                pending = true;
            }
        }
        seen
    }
}

/// Result alias with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A numeric header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Width,
    Height,
    Max,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Max => "max value",
        })
    }
}

/// Errors that can occur on decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("header ended after {0} of 4 fields")]
    MissingFields(usize),
    #[error("{0:?} is not a valid magic number (likely not a ppm image)")]
    BadMagic(String),
    #[error("found {token:?} while decoding {field}")]
    NotNumber { field: Field, token: String },
    #[error("{field} must be positive, found {value}")]
    NotPositive { field: Field, value: i64 },
    #[error("max value {0} is unsupported, only 255 is")]
    UnsupportedMax(i64),
    #[error("image too big ({width}x{height})")]
    TooLarge { width: u64, height: u64 },
    #[error("not enough image data, ran out at ({x}, {y})")]
    MissingData { x: u32, y: u32 },
    #[error("not enough image data, bad sample {token:?} at ({x}, {y})")]
    BadSample { x: u32, y: u32, token: String },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not a readable ppm header.
    Header,
    /// A valid header this decoder does not handle.
    Unsupported,
    /// The pixel body is short or malformed.
    NotEnoughData,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields(_)
            | Self::BadMagic(_)
            | Self::NotNumber { .. }
            | Self::NotPositive { .. } => ErrorKind::Header,
            Self::UnsupportedMax(_) | Self::TooLarge { .. } => ErrorKind::Unsupported,
            Self::MissingData { .. } | Self::BadSample { .. } => ErrorKind::NotEnoughData,
        }
    }
}

/// Pixel body encoding, picked by the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    /// `P3`: decimal ascii samples.
    Plain,
    /// `P6`: one byte per sample.
    Raw,
}

impl Magic {
    pub const fn bytes(self) -> &'static [u8; 2] {
        match self {
            Self::Plain => crate::ppm::plain::MAGIC,
            Self::Raw => crate::ppm::raw::MAGIC,
        }
    }

    fn new(x: &[u8]) -> Option<Self> {
        match x {
            b"P3" => Some(Self::Plain),
            b"P6" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Header of a ppm image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: Magic,
    pub width: NonZeroU32,
    pub height: NonZeroU32,
    /// Maximum value of each sample. Always 255.
    pub max: u8,
}

impl Header {
    /// Bytes needed for the rgba raster.
    pub const fn rgba_len(&self) -> usize {
        self.width.get() as usize * self.height.get() as usize * 4
    }
}

fn number(field: Field, x: &[u8]) -> Result<i64> {
    std::str::from_utf8(x)
        .ok()
        .and_then(|x| x.parse().ok())
        .ok_or_else(|| Error::NotNumber {
            field,
            token: String::from_utf8_lossy(x).into_owned(),
        })
}

fn dimension(field: Field, x: &[u8]) -> Result<u64> {
    let value = number(field, x)?;
    if value <= 0 {
        return Err(Error::NotPositive { field, value });
    }
    Ok(value as u64)
}

/// Reads and validates the four header fields, leaving the cursor at the first body byte.
pub fn decode_header<R: std::io::Read>(
    x: &mut Cursor<R>,
    options: &DecoderOptions,
) -> Result<Header> {
    let mut text = Vec::with_capacity(24);
    Scanner::new(options).scan(x, 4, &mut text);
    let fields = text
        .split(u8::is_ascii_whitespace)
        .filter(|x| !x.is_empty())
        .take(4)
        .collect::<Vec<_>>();
    let &[magic, width, height, max] = &fields[..] else {
        return Err(Error::MissingFields(fields.len()));
    };

    let magic = Magic::new(magic)
        .ok_or_else(|| Error::BadMagic(String::from_utf8_lossy(magic).into_owned()))?;
    let width = dimension(Field::Width, width)?;
    let height = dimension(Field::Height, height)?;
    let max = number(Field::Max, max)?;
    if max != 255 {
        warn!("rejecting ppm with max value {max}");
        return Err(Error::UnsupportedMax(max));
    }

    let fits = |v: u64, max: u32| {
        u32::try_from(v)
            .ok()
            .filter(|&v| v <= max)
            .and_then(NonZeroU32::new)
    };
    let (Some(w), Some(h)) = (
        fits(width, options.get_max_width()),
        fits(height, options.get_max_height()),
    ) else {
        warn!(
            "rejecting {width}x{height} ppm, limit is {}x{}",
            options.get_max_width(),
            options.get_max_height()
        );
        return Err(Error::TooLarge { width, height });
    };
    if (w.get() as usize)
        .checked_mul(h.get() as usize)
        .and_then(|n| n.checked_mul(4))
        .is_none()
    {
        warn!("rejecting {width}x{height} ppm, raster overflows usize");
        return Err(Error::TooLarge { width, height });
    }
    let (width, height) = (w, h);

    debug!(
        "ppm header: {magic:?} {width}x{height}, {} header bytes",
        x.position()
    );
    Ok(Header {
        magic,
        width,
        height,
        max: 255,
    })
}

#[cfg(test)]
fn header(x: &[u8]) -> Result<Header> {
    decode_header(&mut Cursor::new(x), &DecoderOptions::default())
}

#[test]
fn test_scan_comments() {
    let mut out = vec![];
    let mut x = Cursor::new(&b"P6 #comment\n4 4 255\nrest"[..]);
    let n = Scanner::new(&DecoderOptions::default()).scan(&mut x, 4, &mut out);
    assert_eq!(n, 4);
    assert_eq!(out, b"P6 4 4 255");
    // stops right after the fourth separator
    assert_eq!(x.rd::<4>(), Some(*b"rest"));
}

#[test]
fn test_scan_runs() {
    let input = b"P6 \t\n 4\r\n4 255\n";
    let mut out = vec![];
    let n = Scanner::new(&DecoderOptions::default()).scan(&mut Cursor::new(&input[..]), 4, &mut out);
    assert_eq!((n, &out[..]), (4, &b"P6 4 4 255"[..]));

    let mut out = vec![];
    let n = Scanner::new(&DecoderOptions::new_strict()).scan(&mut Cursor::new(&input[..]), 4, &mut out);
    // four separators in a row, only one field had content
    assert_eq!(n, 4);
    assert_eq!(out.split(u8::is_ascii_whitespace).filter(|x| !x.is_empty()).count(), 1);
}

#[test]
fn test_scan_eof() {
    let mut out = vec![];
    let n = Scanner::new(&DecoderOptions::default()).scan(&mut Cursor::new(&b"12"[..]), 1, &mut out);
    assert_eq!((n, &out[..]), (1, &b"12"[..]));
    let mut out = vec![];
    let n = Scanner::new(&DecoderOptions::default()).scan(&mut Cursor::new(&b"  # open"[..]), 1, &mut out);
    assert_eq!(n, 0);
    assert!(out.is_empty());
}

#[test]
fn test_header() {
    let h = header(b"P6 #comment\n4 4 255\n").unwrap();
    assert_eq!(h, header(b"P6 4 4 255\n").unwrap());
    assert_eq!(h.magic, Magic::Raw);
    assert_eq!((h.width.get(), h.height.get(), h.max), (4, 4, 255));
    assert_eq!(h.rgba_len(), 64);
    assert_eq!(Magic::new(Magic::Raw.bytes()), Some(Magic::Raw));
    assert_eq!(header(b"P3\n2\t1\n255\n").unwrap().magic, Magic::Plain);
    assert_eq!(
        header(b"# leading\nP3 # a\n# b\n2 1 255\n").unwrap().width.get(),
        2
    );
}

#[test]
fn test_header_errors() {
    assert_eq!(header(b"P5 2 2 255\n"), Err(Error::BadMagic("P5".into())));
    assert_eq!(header(b"P6 2 2 65535\n"), Err(Error::UnsupportedMax(65535)));
    assert_eq!(header(b"P6 2 2").unwrap_err().kind(), ErrorKind::Header);
    assert_eq!(header(b"").unwrap_err(), Error::MissingFields(0));
    assert_eq!(
        header(b"P6 x 2 255\n").unwrap_err(),
        Error::NotNumber {
            field: Field::Width,
            token: "x".into()
        }
    );
    assert_eq!(
        header(b"P6 2 0 255\n").unwrap_err(),
        Error::NotPositive {
            field: Field::Height,
            value: 0
        }
    );
    assert_eq!(header(b"P6 -2 2 255\n").unwrap_err().kind(), ErrorKind::Header);
    assert_eq!(header(b"P6 2 2 abc\n").unwrap_err().kind(), ErrorKind::Header);
    assert_eq!(
        header(b"P6 99999 2 255\n").unwrap_err().kind(),
        ErrorKind::Unsupported
    );
    assert_eq!(
        header(b"P6 99999999999 2 255\n").unwrap_err(),
        Error::TooLarge {
            width: 99999999999,
            height: 2
        }
    );
    assert_eq!(
        header(b"P6 4 4294967296 255\n").unwrap_err().to_string(),
        "image too big (4x4294967296)"
    );
}

#[test]
fn test_header_strict() {
    let strict = DecoderOptions::new_strict();
    let h = |x: &[u8]| decode_header(&mut Cursor::new(x), &strict);
    assert!(h(b"P6 4 4 255\n").is_ok());
    assert_eq!(h(b"P6  4 4 255\n"), Err(Error::MissingFields(3)));
    assert!(header(b"P6  4 4 255\n").is_ok());
}
