//! OSC 1.0 binary decoding
//!
//! Decoding is all-or-nothing. A datagram either yields every message it
//! carries, in order, or a single `CodecError`.

use crate::encoder::{validate_address, BUNDLE_TAG};
use crate::error::{CodecError, Result};
use crate::types::{OscBundle, OscMessage, OscPacket, OscType, TimeTag};

/// Decode a datagram into its messages
///
/// A plain message yields one entry. A bundle yields its messages in the
/// bundle's original order, nested bundles flattened depth first.
pub fn decode(data: &[u8]) -> Result<Vec<OscMessage>> {
    Ok(decode_packet(data)?.into_messages())
}

/// Decode a datagram, keeping the bundle structure
pub fn decode_packet(data: &[u8]) -> Result<OscPacket> {
    if data.starts_with(BUNDLE_TAG) {
        decode_bundle(data).map(OscPacket::Bundle)
    } else {
        decode_message(data).map(OscPacket::Message)
    }
}

fn decode_message(data: &[u8]) -> Result<OscMessage> {
    let mut reader = Reader::new(data);

    let address = reader.read_string()?;
    validate_address(&address)?;

    // Some senders omit the type tag string entirely for argument-less messages
    if reader.is_empty() {
        return Ok(OscMessage::empty(address));
    }

    let tags = reader.read_string()?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(CodecError::InvalidTypeTags(tags));
    };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => OscType::Int(reader.read_i32()?),
            'f' => OscType::Float(f32::from_bits(reader.read_u32()?)),
            's' => OscType::String(reader.read_string()?),
            'b' => OscType::Blob(reader.read_blob()?),
            'T' => OscType::Int(1),
            'F' => OscType::Int(0),
            'h' => OscType::Int(reader.read_i64()? as i32),
            'd' => OscType::Float(f64::from_bits(reader.read_i64()? as u64) as f32),
            other => return Err(CodecError::UnknownTypeTag(other)),
        };
        args.push(arg);
    }

    Ok(OscMessage { address, args })
}

fn decode_bundle(data: &[u8]) -> Result<OscBundle> {
    let mut reader = Reader::new(data);
    reader.take(BUNDLE_TAG.len())?;
    let timetag = TimeTag(reader.read_i64()? as u64);

    let mut content = Vec::new();
    while !reader.is_empty() {
        let offset = reader.pos;
        let size = reader.read_i32()?;
        if size <= 0 || size % 4 != 0 || size as usize > reader.remaining() {
            return Err(CodecError::BundleElementSize { offset, size });
        }
        let element = reader.take(size as usize)?;
        content.push(decode_packet(element)?);
    }

    Ok(OscBundle { timetag, content })
}

/// Bounds-checked big-endian cursor over a datagram
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.read_u32().map(|v| v as i32)
    }

    fn read_i64(&mut self) -> Result<i64> {
        let hi = self.read_u32()? as u64;
        let lo = self.read_u32()? as u64;
        Ok(((hi << 32) | lo) as i64)
    }

    fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = &self.data[start..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::InvalidString(start))?;

        let padded = (nul / 4 + 1) * 4;
        let raw = self.take(padded).map_err(|_| CodecError::InvalidString(start))?;
        if raw[nul..].iter().any(|&b| b != 0) {
            return Err(CodecError::InvalidString(start));
        }

        std::str::from_utf8(&raw[..nul])
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidString(start))
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: 0,
                available: self.remaining(),
            });
        }
        let len = len as usize;
        let padded = (len + 3) / 4 * 4;
        let raw = self.take(padded)?;
        Ok(raw[..len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_bundle, encode_message};
    use rstest::rstest;

    #[test]
    fn test_decode_tempo() {
        let bytes = encode_message(&OscMessage::new("/live/tempo", 120.5f32)).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, vec![OscMessage::new("/live/tempo", 120.5f32)]);
    }

    #[test]
    fn test_decode_without_type_tags() {
        let decoded = decode(b"/live/play\0\0").unwrap();
        assert_eq!(decoded, vec![OscMessage::empty("/live/play")]);
    }

    #[test]
    fn test_decode_blob() {
        let mut bytes = b"/blob\0\0\0,b\0\0".to_vec();
        bytes.extend_from_slice(&3i32.to_be_bytes());
        bytes.extend_from_slice(&[7, 8, 9, 0]);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded[0].args, vec![OscType::Blob(vec![7, 8, 9])]);
    }

    #[test]
    fn test_decode_bool_tags() {
        let decoded = decode(b"/x\0\0,TF\0").unwrap();
        assert_eq!(decoded[0].args, vec![OscType::Int(1), OscType::Int(0)]);
    }

    #[test]
    fn test_decode_bundle_preserves_order() {
        let mut inner = OscBundle::new();
        inner.append("/live/b", 2i32);

        let mut bundle = OscBundle::new();
        bundle.append("/live/a", 1i32);
        bundle.push(inner);
        bundle.append("/live/c", "three");

        let decoded = decode(&encode_bundle(&bundle).unwrap()).unwrap();
        assert_eq!(
            decoded,
            vec![
                OscMessage::new("/live/a", 1i32),
                OscMessage::new("/live/b", 2i32),
                OscMessage::new("/live/c", "three"),
            ]
        );
    }

    #[test]
    fn test_decode_packet_keeps_structure() {
        let mut bundle = OscBundle::new();
        bundle.append("/a", ());
        let packet = decode_packet(&encode_bundle(&bundle).unwrap()).unwrap();
        assert_eq!(packet, OscPacket::Bundle(bundle));
    }

    #[rstest]
    #[case::empty(&b""[..])]
    #[case::no_terminator(&b"/live"[..])]
    #[case::no_slash(&b"live\0\0\0\0,\0\0\0"[..])]
    #[case::bad_tags(&b"/a\0\0xi\0\0\0\0\0\x01"[..])]
    #[case::truncated_int(&b"/a\0\0,i\0\0\0\0"[..])]
    #[case::unknown_tag(&b"/a\0\0,q\0\0"[..])]
    #[case::bad_padding(&b"/a\0x,\0\0\0"[..])]
    fn test_malformed_rejected(#[case] data: &[u8]) {
        assert!(decode(data).is_err());
    }

    #[test]
    fn test_malformed_bundle_element_fails_whole_bundle() {
        let mut bundle = OscBundle::new();
        bundle.append("/ok", 1i32);
        let mut bytes = encode_bundle(&bundle).unwrap();
        // Second element claims more bytes than remain
        bytes.extend_from_slice(&64i32.to_be_bytes());
        bytes.extend_from_slice(b"/bad");

        assert!(matches!(
            decode(&bytes),
            Err(CodecError::BundleElementSize { size: 64, .. })
        ));
    }
}
