//! Decoder options
//!
//! Not every input is worth decoding. These options bound what the decoder
//! will allocate, and pick how forgiving the ascii tokenizer is.

/// Options respected by [`Decoder`](crate::ppm::Decoder).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum width for which the decoder will
    /// not try to decode images larger than it.
    ///
    /// - Default value: 16384
    max_width: u32,
    /// Maximum height for which the decoder will
    /// not try to decode images larger than it.
    ///
    /// - Default value: 16384
    max_height: u32,
    /// Strict whitespace handling.
    ///
    /// When set, only space, tab and newline separate tokens and every
    /// separator byte ends a token, so doubled separators produce empty
    /// (invalid) tokens.
    ///
    /// - Default value: `false`
    strict: bool,
}

/// Lenient tokenizing, 16384 × 16384 limits.
///
/// Lenient mode collapses runs of separators and accepts any ascii whitespace,
/// so `P6  4 4 255` and CRLF files decode. Use [`DecoderOptions::new_strict`]
/// for the classic byte-per-separator tokenizing, where a doubled separator is
/// an empty (invalid) field.
impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_width: 1 << 14,
            max_height: 1 << 14,
            strict: false,
        }
    }
}

impl DecoderOptions {
    /// Lenient options, same as [`Default`].
    pub fn new_lenient() -> Self {
        Self::default()
    }

    /// Options that tokenize exactly like the classic decoder:
    /// `' '`, `'\t'` and `'\n'` are the only separators and each one closes a token.
    pub fn new_strict() -> Self {
        Self::default().set_strict_mode(true)
    }

    /// Get maximum width configured for which the decoder
    /// should not try to decode images greater than this width
    pub const fn get_max_width(&self) -> u32 {
        self.max_width
    }

    /// Get maximum height configured for which the decoder
    /// should not try to decode images greater than this height
    pub const fn get_max_height(&self) -> u32 {
        self.max_height
    }

    /// Return true if the tokenizer runs in strict mode
    pub const fn get_strict_mode(&self) -> bool {
        self.strict
    }

    /// Set maximum width for which the decoder should not try
    /// decoding images greater than that width
    #[must_use]
    pub const fn set_max_width(mut self, width: u32) -> Self {
        self.max_width = width;
        self
    }

    /// Set maximum height for which the decoder should not try
    /// decoding images greater than that height
    #[must_use]
    pub const fn set_max_height(mut self, height: u32) -> Self {
        self.max_height = height;
        self
    }

    /// Set whether the tokenizer should be in strict mode.
    #[must_use]
    pub const fn set_strict_mode(mut self, yes: bool) -> Self {
        self.strict = yes;
        self
    }

    /// The separator predicate for this mode.
    pub(crate) fn separator(&self) -> fn(u8) -> bool {
        if self.strict {
            |b: u8| matches!(b, b' ' | b'\t' | b'\n')
        } else {
            |b: u8| b.is_ascii_whitespace()
        }
    }
}

#[test]
fn builder() {
    let o = DecoderOptions::default()
        .set_max_width(10)
        .set_max_height(20);
    assert_eq!((o.get_max_width(), o.get_max_height()), (10, 20));
    assert!(!o.get_strict_mode());
    assert!(DecoderOptions::new_strict().get_strict_mode());
}

#[test]
fn default_is_lenient() {
    use crate::decode::{decode_header, Cursor, Error};
    let input = b"P6  4 4 255\n";
    assert!(decode_header(&mut Cursor::new(&input[..]), &DecoderOptions::default()).is_ok());
    assert_eq!(
        decode_header(&mut Cursor::new(&input[..]), &DecoderOptions::new_strict()),
        Err(Error::MissingFields(3))
    );
}

#[test]
fn separators() {
    let lenient = DecoderOptions::new_lenient().separator();
    let strict = DecoderOptions::new_strict().separator();
    for b in [b' ', b'\t', b'\n'] {
        assert!(lenient(b) && strict(b));
    }
    assert!(lenient(b'\r'));
    assert!(!strict(b'\r'));
    assert!(!lenient(b'#') && !strict(b'0'));
}
