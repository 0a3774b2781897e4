//! OSC 1.0 binary encoding
//!
//! Layout of a message: padded address, padded `,`-prefixed type tag string,
//! then each argument big-endian in order. Strings are NUL-terminated and
//! padded to a multiple of four bytes.

use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::types::{OscBundle, OscMessage, OscPacket, OscType};

pub(crate) const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Encode a single message
///
/// Only int, float and string arguments may be sent. Any other argument fails
/// the whole encode and no bytes are produced.
pub fn encode_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(estimate_len(msg));
    write_message(msg, &mut buf)?;
    Ok(buf.to_vec())
}

/// Encode a bundle, including nested bundles
pub fn encode_bundle(bundle: &OscBundle) -> Result<Vec<u8>> {
    let mut buf = BytesMut::new();
    write_bundle(bundle, &mut buf)?;
    Ok(buf.to_vec())
}

/// Encode either kind of packet
pub fn encode_packet(packet: &OscPacket) -> Result<Vec<u8>> {
    match packet {
        OscPacket::Message(msg) => encode_message(msg),
        OscPacket::Bundle(bundle) => encode_bundle(bundle),
    }
}

fn write_message(msg: &OscMessage, buf: &mut BytesMut) -> Result<()> {
    validate_address(&msg.address)?;

    write_padded_str(&msg.address, buf);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    tags.extend(msg.args.iter().map(OscType::tag));
    write_padded_str(&tags, buf);

    for arg in &msg.args {
        match arg {
            OscType::Int(v) => buf.put_i32(*v),
            OscType::Float(v) => buf.put_f32(*v),
            OscType::String(s) => write_padded_str(s, buf),
            // The caller discards `buf` on error, so nothing partial escapes
            other => return Err(CodecError::UnsupportedArgument(other.type_name())),
        }
    }
    Ok(())
}

fn write_bundle(bundle: &OscBundle, buf: &mut BytesMut) -> Result<()> {
    buf.put_slice(BUNDLE_TAG);
    buf.put_u64(bundle.timetag.0);

    for packet in &bundle.content {
        let element = encode_packet(packet)?;
        buf.put_i32(element.len() as i32);
        buf.put_slice(&element);
    }
    Ok(())
}

pub(crate) fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(CodecError::EmptyAddress);
    }
    if !address.starts_with('/') {
        return Err(CodecError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

fn write_padded_str(s: &str, buf: &mut BytesMut) {
    buf.put_slice(s.as_bytes());
    // Always at least one NUL, then pad to 4
    let pad = 4 - (s.len() % 4);
    buf.put_bytes(0, pad);
}

fn estimate_len(msg: &OscMessage) -> usize {
    let strings: usize = msg
        .args
        .iter()
        .map(|a| match a {
            OscType::String(s) => s.len() + 4,
            _ => 4,
        })
        .sum();
    msg.address.len() + msg.args.len() + 8 + strings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_encode_tempo_layout() {
        let bytes = encode_message(&OscMessage::new("/live/tempo", 120.5f32)).unwrap();

        // "/live/tempo" is 11 bytes -> padded to 12
        assert_eq!(&bytes[..12], b"/live/tempo\0");
        assert_eq!(&bytes[12..16], b",f\0\0");
        assert_eq!(&bytes[16..20], &120.5f32.to_be_bytes());
        assert_eq!(bytes.len(), 20);
    }

    #[rstest]
    #[case("", 4)]
    #[case("a", 4)]
    #[case("abc", 4)]
    #[case("abcd", 8)]
    #[case("abcdefg", 8)]
    fn test_string_padding(#[case] s: &str, #[case] expected: usize) {
        let mut buf = BytesMut::new();
        write_padded_str(s, &mut buf);
        assert_eq!(buf.len(), expected);
        assert_eq!(buf[s.len()], 0);
    }

    #[test]
    fn test_no_args_still_has_type_tags() {
        let bytes = encode_message(&OscMessage::empty("/live/play")).unwrap();
        assert_eq!(bytes, b"/live/play\0\0,\0\0\0".to_vec());
    }

    #[test]
    fn test_blob_rejected_atomically() {
        let msg = OscMessage::new("/x", vec![OscType::Int(1), OscType::Blob(vec![1, 2])]);
        assert_eq!(
            encode_message(&msg),
            Err(CodecError::UnsupportedArgument("blob"))
        );
    }

    #[rstest]
    #[case("", CodecError::EmptyAddress)]
    #[case("live/tempo", CodecError::InvalidAddress("live/tempo".to_string()))]
    fn test_invalid_addresses(#[case] address: &str, #[case] expected: CodecError) {
        assert_eq!(encode_message(&OscMessage::empty(address)), Err(expected));
    }

    #[test]
    fn test_bundle_header() {
        let mut bundle = OscBundle::new();
        bundle.append("/a", 1i32);
        let bytes = encode_bundle(&bundle).unwrap();

        assert_eq!(&bytes[..8], BUNDLE_TAG);
        assert_eq!(&bytes[8..16], &1u64.to_be_bytes());
        // "/a" (4) + ",i" (4) + int (4)
        assert_eq!(&bytes[16..20], &12i32.to_be_bytes());
        assert_eq!(bytes.len(), 32);
    }
}
