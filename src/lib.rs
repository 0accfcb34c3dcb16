//! crate for decoding the portable pixmap format.
//!
//! ### a quick guide to the various functions for everyday use
//!
//! - [`decode()`]: your go-to for ppm decoding.
//! Reads both plain (`P3`) and raw (`P6`) images into an rgba [`Image`](fimg::Image).
//! - [`metadata()`]: reads only the header. Use this when you just need the dimensions.
//! - [`format::guess`]: pick a decoder from the first bytes of a stream.
//! - [`ppm::Decoder`]: when you want [options](DecoderOptions) or both of the above over one stream.
//!
//! Only 8 bit images (max value 255) are supported.
//!
//! ### functions in action
//!
//! ```
//! let data = b"P3 2 1 255\n255 0 0 0 255 0\n";
//! let out = ppm::decode(&data[..]).unwrap();
//!
//! assert_eq!(&**out.buffer(), &[255, 0, 0, 255, 0, 255, 0, 255]);
//! assert_eq!(ppm::metadata(&data[..]).unwrap().width, 2);
//! ```
#![warn(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::dbg_macro,
    clippy::use_self
)]

pub mod decode;
pub mod format;
pub mod options;
pub mod ppm;
pub use decode::{Error, ErrorKind};
pub use options::DecoderOptions;
pub use ppm::{Metadata, Output};

/// Decode a [`ppm`] image.
pub fn decode(r: impl std::io::Read) -> decode::Result<Output> {
    decode_with_options(r, DecoderOptions::default())
}

/// Decode a [`ppm`] image, with some [`DecoderOptions`].
pub fn decode_with_options(r: impl std::io::Read, options: DecoderOptions) -> decode::Result<Output> {
    ppm::Decoder::new_with_options(options, r).decode()
}

/// Read the color model and dimensions of a [`ppm`] image without decoding its pixels.
pub fn metadata(r: impl std::io::Read) -> decode::Result<Metadata> {
    metadata_with_options(r, DecoderOptions::default())
}

/// [`metadata()`], with some [`DecoderOptions`].
pub fn metadata_with_options(
    r: impl std::io::Read,
    options: DecoderOptions,
) -> decode::Result<Metadata> {
    ppm::Decoder::new_with_options(options, r).metadata()
}

#[test]
fn test_kinds() {
    let kind = |x: &[u8]| decode(x).err().map(|e| e.kind());
    assert_eq!(kind(&b"P5 2 2 255\n\0\0\0\0"[..]), Some(ErrorKind::Header));
    assert_eq!(kind(&b"P6 2 2 65535\n"[..]), Some(ErrorKind::Unsupported));
    assert_eq!(kind(&b"P6 2 2 255\n\0\0\0"[..]), Some(ErrorKind::NotEnoughData));
    assert_eq!(kind(&b"P6 1 1 255\n\0\0\0"[..]), None);
}

#[test]
fn test_limits() {
    let small = DecoderOptions::default().set_max_width(4).set_max_height(4);
    assert!(metadata_with_options(&b"P6 4 4 255\n"[..], small).is_ok());
    assert_eq!(
        metadata_with_options(&b"P6 5 4 255\n"[..], small),
        Err(Error::TooLarge {
            width: 5,
            height: 4
        })
    );
    assert_eq!(
        metadata_with_options(&b"P6 4 5 255\n"[..], small)
            .unwrap_err()
            .kind(),
        ErrorKind::Unsupported
    );
}

#[test]
fn test_metadata_never_reads_body() {
    assert_eq!(
        metadata(&b"P6 #comment\n4 4 255\n"[..]),
        Ok(Metadata {
            color: ppm::ColorModel::Rgba8,
            width: 4,
            height: 4
        })
    );
    assert_eq!(metadata(&b"P6 4 4 255"[..]).map(|m| m.height), Ok(4));
}
