//! Argument access for handlers
//!
//! Handlers match on [`Args::len`] to pick the query or set form, then pull
//! typed values by position. A trailing literal `"query"` is stripped first,
//! so `/live/tempo` and `/live/tempo "query"` look the same to a handler.

use osc_codec::{OscMessage, OscType};

use crate::error::HandlerError;

pub struct Args<'a> {
    args: &'a [OscType],
}

impl<'a> Args<'a> {
    pub fn of(message: &'a OscMessage) -> Self {
        let args = match message.args.split_last() {
            Some((OscType::String(s), rest)) if s == "query" => rest,
            _ => message.args.as_slice(),
        };
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Error for an argument count no form accepts
    pub fn arity(&self, expected: &'static str) -> HandlerError {
        HandlerError::Arity {
            expected,
            got: self.args.len(),
        }
    }

    fn get(&self, index: usize) -> Result<&'a OscType, HandlerError> {
        self.args.get(index).ok_or(HandlerError::Arity {
            expected: "more",
            got: self.args.len(),
        })
    }

    /// Integer argument; floats are truncated
    pub fn int(&self, index: usize) -> Result<i32, HandlerError> {
        match self.get(index)? {
            OscType::Int(v) => Ok(*v),
            OscType::Float(v) => Ok(*v as i32),
            other => Err(HandlerError::ArgumentType {
                index,
                expected: "int",
                got: other.type_name(),
            }),
        }
    }

    /// Float argument; ints are widened
    pub fn float(&self, index: usize) -> Result<f32, HandlerError> {
        match self.get(index)? {
            OscType::Float(v) => Ok(*v),
            OscType::Int(v) => Ok(*v as f32),
            other => Err(HandlerError::ArgumentType {
                index,
                expected: "float",
                got: other.type_name(),
            }),
        }
    }

    pub fn flag(&self, index: usize) -> Result<bool, HandlerError> {
        Ok(self.int(index)? != 0)
    }

    pub fn string(&self, index: usize) -> Result<&'a str, HandlerError> {
        match self.get(index)? {
            OscType::String(s) => Ok(s),
            other => Err(HandlerError::ArgumentType {
                index,
                expected: "string",
                got: other.type_name(),
            }),
        }
    }

    /// Integer argument used as an index into `items`
    pub fn pick<T: Clone>(
        &self,
        index: usize,
        items: &[T],
        what: &'static str,
    ) -> Result<(usize, T), HandlerError> {
        let raw = self.int(index)?;
        pick(raw, items, what)
    }

    /// Every argument, `"query"` included
    pub fn all(&self) -> &'a [OscType] {
        self.args
    }
}

/// Resolve a client-supplied index
pub fn pick<T: Clone>(
    raw: i32,
    items: &[T],
    what: &'static str,
) -> Result<(usize, T), HandlerError> {
    usize::try_from(raw)
        .ok()
        .and_then(|i| items.get(i).map(|item| (i, item.clone())))
        .ok_or(HandlerError::IndexOutOfRange {
            what,
            index: raw as i64,
            len: items.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_suffix_is_stripped() {
        let msg = OscMessage::new("/live/volume", (2, "query"));
        let args = Args::of(&msg);
        assert_eq!(args.len(), 1);
        assert_eq!(args.int(0).unwrap(), 2);
    }

    #[test]
    fn test_numeric_coercion() {
        let msg = OscMessage::new("/x", (1.9f32, 3));
        let args = Args::of(&msg);
        assert_eq!(args.int(0).unwrap(), 1);
        assert_eq!(args.float(1).unwrap(), 3.0);
    }

    #[test]
    fn test_type_mismatch() {
        let msg = OscMessage::new("/x", "name");
        let err = Args::of(&msg).int(0).unwrap_err();
        assert!(matches!(
            err,
            HandlerError::ArgumentType { index: 0, expected: "int", got: "string" }
        ));
    }

    #[test]
    fn test_pick_bounds() {
        let items = ["a", "b"];
        assert_eq!(pick(1, &items, "track").unwrap(), (1, "b"));
        assert!(matches!(
            pick(-1, &items, "track"),
            Err(HandlerError::IndexOutOfRange { index: -1, len: 2, .. })
        ));
        assert!(pick(2, &items, "track").is_err());
    }
}
