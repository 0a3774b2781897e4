//! OSC value types: arguments, messages and bundles

use std::fmt;

// ============================================================================
// OscType - a single typed argument
// ============================================================================

/// A single OSC argument
#[derive(Debug, Clone, PartialEq)]
pub enum OscType {
    /// 32-bit big-endian two's complement integer (`i`)
    Int(i32),
    /// 32-bit big-endian IEEE 754 float (`f`)
    Float(f32),
    /// NUL-terminated, 4-byte padded UTF-8 string (`s`)
    String(String),
    /// Length-prefixed opaque bytes (`b`); decode only
    Blob(Vec<u8>),
}

impl OscType {
    /// The OSC type tag character for this argument
    pub fn tag(&self) -> char {
        match self {
            OscType::Int(_) => 'i',
            OscType::Float(_) => 'f',
            OscType::String(_) => 's',
            OscType::Blob(_) => 'b',
        }
    }

    /// Human-readable type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            OscType::Int(_) => "int",
            OscType::Float(_) => "float",
            OscType::String(_) => "string",
            OscType::Blob(_) => "blob",
        }
    }

    /// Integer value, if this is an `Int`
    pub fn as_int(&self) -> Option<i32> {
        match self {
            OscType::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as a float
    ///
    /// Ints are widened, since most controllers send `1` where they mean `1.0`.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            OscType::Float(v) => Some(*v),
            OscType::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// String value, if this is a `String`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OscType::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for OscType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscType::Int(v) => write!(f, "{}", v),
            OscType::Float(v) => write!(f, "{}", v),
            OscType::String(s) => write!(f, "{:?}", s),
            OscType::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<i32> for OscType {
    fn from(v: i32) -> Self {
        OscType::Int(v)
    }
}

impl From<usize> for OscType {
    fn from(v: usize) -> Self {
        OscType::Int(i32::try_from(v).unwrap_or(i32::MAX))
    }
}

impl From<bool> for OscType {
    fn from(v: bool) -> Self {
        OscType::Int(v as i32)
    }
}

impl From<f32> for OscType {
    fn from(v: f32) -> Self {
        OscType::Float(v)
    }
}

impl From<&str> for OscType {
    fn from(v: &str) -> Self {
        OscType::String(v.to_string())
    }
}

impl From<String> for OscType {
    fn from(v: String) -> Self {
        OscType::String(v)
    }
}

impl From<Vec<u8>> for OscType {
    fn from(v: Vec<u8>) -> Self {
        OscType::Blob(v)
    }
}

// ============================================================================
// IntoOscArgs - scalars, tuples and vectors all become an argument list
// ============================================================================

/// Conversion into an ordered argument list
///
/// A scalar becomes a single-element list, a tuple keeps its element order,
/// and `()` is the empty list.
pub trait IntoOscArgs {
    fn into_osc_args(self) -> Vec<OscType>;
}

impl IntoOscArgs for Vec<OscType> {
    fn into_osc_args(self) -> Vec<OscType> {
        self
    }
}

impl IntoOscArgs for () {
    fn into_osc_args(self) -> Vec<OscType> {
        Vec::new()
    }
}

macro_rules! scalar_args {
    ($($ty:ty),*) => {
        $(
            impl IntoOscArgs for $ty {
                fn into_osc_args(self) -> Vec<OscType> {
                    vec![OscType::from(self)]
                }
            }
        )*
    };
}

scalar_args!(OscType, i32, usize, bool, f32, &str, String);

macro_rules! tuple_args {
    ($($name:ident),+) => {
        impl<$($name: Into<OscType>),+> IntoOscArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_osc_args(self) -> Vec<OscType> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_args!(A);
tuple_args!(A, B);
tuple_args!(A, B, C);
tuple_args!(A, B, C, D);
tuple_args!(A, B, C, D, E);
tuple_args!(A, B, C, D, E, F);

// ============================================================================
// OscMessage
// ============================================================================

/// An addressed message: hierarchical address plus ordered arguments
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscType>,
}

impl OscMessage {
    /// Create a message from anything convertible into an argument list
    pub fn new(address: impl Into<String>, args: impl IntoOscArgs) -> Self {
        Self {
            address: address.into(),
            args: args.into_osc_args(),
        }
    }

    /// Message with no arguments
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// True for the query form: no arguments or a single literal `"query"`
    pub fn is_query(&self) -> bool {
        match self.args.as_slice() {
            [] => true,
            [OscType::String(s)] => s == "query",
            _ => false,
        }
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for OscMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

// ============================================================================
// Bundles
// ============================================================================

/// NTP-format time tag; the bridge only ever sends "immediately"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTag(pub u64);

impl TimeTag {
    /// The special value 1 meaning "process immediately"
    pub const IMMEDIATE: TimeTag = TimeTag(1);
}

impl Default for TimeTag {
    fn default() -> Self {
        Self::IMMEDIATE
    }
}

/// Either a message or a nested bundle
#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
    Message(OscMessage),
    Bundle(OscBundle),
}

impl OscPacket {
    /// Flatten into messages, depth first, preserving order
    pub fn into_messages(self) -> Vec<OscMessage> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<OscMessage>) {
        match self {
            OscPacket::Message(msg) => out.push(msg),
            OscPacket::Bundle(bundle) => {
                for packet in bundle.content {
                    packet.flatten_into(out);
                }
            }
        }
    }
}

impl From<OscMessage> for OscPacket {
    fn from(msg: OscMessage) -> Self {
        OscPacket::Message(msg)
    }
}

impl From<OscBundle> for OscPacket {
    fn from(bundle: OscBundle) -> Self {
        OscPacket::Bundle(bundle)
    }
}

/// An ordered sequence of packets sharing one envelope
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OscBundle {
    pub timetag: TimeTag,
    pub content: Vec<OscPacket>,
}

impl OscBundle {
    /// Empty bundle with an immediate time tag
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message built from an address and arguments
    pub fn append(&mut self, address: impl Into<String>, args: impl IntoOscArgs) {
        self.content
            .push(OscPacket::Message(OscMessage::new(address, args)));
    }

    /// Append an already-built packet
    pub fn push(&mut self, packet: impl Into<OscPacket>) {
        self.content.push(packet.into());
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_is_single_element_sequence() {
        let msg = OscMessage::new("/live/tempo", 120.5f32);
        assert_eq!(msg.args, vec![OscType::Float(120.5)]);
    }

    #[test]
    fn test_tuple_preserves_order() {
        let msg = OscMessage::new("/live/send", (1i32, 2usize, 0.5f32));
        assert_eq!(
            msg.args,
            vec![OscType::Int(1), OscType::Int(2), OscType::Float(0.5)]
        );
    }

    #[test]
    fn test_query_form() {
        assert!(OscMessage::empty("/live/tempo").is_query());
        assert!(OscMessage::new("/live/tempo", "query").is_query());
        assert!(!OscMessage::new("/live/tempo", 120.0f32).is_query());
        assert!(!OscMessage::new("/live/tempo", ("query", 1i32)).is_query());
    }

    #[test]
    fn test_as_float_widens_ints() {
        assert_eq!(OscType::Int(3).as_float(), Some(3.0));
        assert_eq!(OscType::String("x".into()).as_float(), None);
        assert_eq!(OscType::Float(1.5).as_int(), None);
    }

    #[test]
    fn test_bundle_flattens_in_order() {
        let mut inner = OscBundle::new();
        inner.append("/b", 2i32);
        let mut outer = OscBundle::new();
        outer.append("/a", 1i32);
        outer.push(inner);
        outer.append("/c", 3i32);

        let addresses: Vec<_> = OscPacket::Bundle(outer)
            .into_messages()
            .into_iter()
            .map(|m| m.address)
            .collect();
        assert_eq!(addresses, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_display() {
        let msg = OscMessage::new("/live/name/track", (0i32, "Drums"));
        assert_eq!(msg.to_string(), "/live/name/track 0 \"Drums\"");
    }
}
