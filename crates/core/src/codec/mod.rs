//! Frame header codecs for compressed audio elementary streams.
//!
//! | Format | Module | Framing |
//! |--------|--------|---------|
//! | AAC (ADIF, ADTS) | [`aac`] | 12-bit `0xFFF` sync per ADTS frame, one `ADIF` header per stream |
//! | MPEG audio layer III | [`mp3`] | 11-bit frame sync per frame |
//!
//! PCM has no framing and needs no codec.

pub mod aac;
pub mod mp3;
