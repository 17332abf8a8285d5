//! persist-runtime
//!
//! Runtime support for the converters generated by `protoc-gen-persist`.
//!
//! Generated code never performs well-known-type conversions inline. It calls
//! the helpers in this crate instead, so the semantics (nil handling, zero
//! values, error reporting) live in one tested place:
//!
//! - `google.protobuf.Timestamp` to epoch seconds and to `chrono::DateTime<Utc>`
//! - `google.protobuf.Any` to and from an opaque byte blob
//! - `uint32` to and from its base-10 string form
//!
//! It also defines [`ConversionError`], the error type every generated
//! converter returns, and the [`Decorator`] hook.

#![deny(missing_docs)]

use chrono::{DateTime, Utc};
use prost::{Message, Name};
use prost_types::{Any, Timestamp};

/// Error returned by generated converter functions
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// A persisted string could not be parsed as an unsigned integer
    #[error("invalid unsigned integer {value:?}: {source}")]
    InvalidNumber {
        /// The offending input
        value: String,
        /// Underlying parse failure
        #[source]
        source: std::num::ParseIntError,
    },

    /// A persisted payload could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A payload could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Raised by user-supplied decorators and converters
    #[error("{0}")]
    Custom(String),
}

impl ConversionError {
    /// Build a custom error from any displayable message
    pub fn custom(message: impl std::fmt::Display) -> Self {
        ConversionError::Custom(message.to_string())
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Timestamp to Unix epoch seconds (sub-second precision is dropped)
pub fn timestamp_to_unix(timestamp: &Timestamp) -> i64 {
    timestamp.seconds
}

/// Unix epoch seconds to a timestamp
///
/// Zero yields the epoch itself, not an absent timestamp.
pub fn unix_to_timestamp(seconds: &i64) -> Timestamp {
    Timestamp {
        seconds: *seconds,
        nanos: 0,
    }
}

/// Timestamp to a native time value
///
/// Out-of-range timestamps collapse to the zero time.
pub fn timestamp_to_datetime(timestamp: &Timestamp) -> DateTime<Utc> {
    let nanos = u32::try_from(timestamp.nanos).unwrap_or(0);
    DateTime::from_timestamp(timestamp.seconds, nanos).unwrap_or_default()
}

/// Native time value to a timestamp
///
/// The zero time maps to `None`: a stored zero time is treated as "absent".
pub fn datetime_to_timestamp(datetime: &DateTime<Utc>) -> Option<Timestamp> {
    if is_zero_time(datetime) {
        return None;
    }
    Some(Timestamp {
        seconds: datetime.timestamp(),
        nanos: datetime.timestamp_subsec_nanos() as i32,
    })
}

/// Whether a time value is the zero time (the Unix epoch)
pub fn is_zero_time(datetime: &DateTime<Utc>) -> bool {
    *datetime == DateTime::<Utc>::default()
}

// =============================================================================
// Any
// =============================================================================

/// Serialize a dynamic payload to bytes
pub fn any_to_bytes(any: &Any) -> Result<Vec<u8>, ConversionError> {
    let mut buf = Vec::with_capacity(any.encoded_len());
    any.encode(&mut buf)?;
    Ok(buf)
}

/// Deserialize a dynamic payload; an empty blob means "absent"
pub fn bytes_to_any(bytes: &[u8]) -> Result<Option<Any>, ConversionError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Any::decode(bytes)?))
}

/// Element adapter for repeated payloads
pub fn any_element_to_bytes(any: &Any) -> Result<Vec<u8>, ConversionError> {
    any_to_bytes(any)
}

/// Element adapter for repeated payloads
///
/// Unlike [`bytes_to_any`] an empty element decodes to an empty `Any`, so
/// list positions are preserved.
pub fn bytes_element_to_any(bytes: &[u8]) -> Result<Any, ConversionError> {
    Ok(Any::decode(bytes)?)
}

/// Pack a concrete message into the blob form stored by the backends
pub fn pack_any<M: Name>(message: &M) -> Result<Vec<u8>, ConversionError> {
    any_to_bytes(&Any::from_msg(message)?)
}

/// Unpack a stored blob into the caller's concrete message type
///
/// Fails if the blob is malformed or carries a different type URL.
pub fn unpack_any<M>(bytes: &[u8]) -> Result<Option<M>, ConversionError>
where
    M: Message + Name + Default,
{
    match bytes_to_any(bytes)? {
        Some(any) => Ok(Some(any.to_msg::<M>()?)),
        None => Ok(None),
    }
}

// =============================================================================
// Unsigned integers
// =============================================================================

/// Format an unsigned 32-bit integer in base 10
pub fn uint32_to_string(value: &u32) -> String {
    value.to_string()
}

/// Parse a base-10 unsigned 32-bit integer
pub fn string_to_uint32(value: &str) -> Result<u32, ConversionError> {
    value
        .parse::<u32>()
        .map_err(|source| ConversionError::InvalidNumber {
            value: value.to_string(),
            source,
        })
}

// =============================================================================
// Decorators
// =============================================================================

/// Hook run by generated `*_with` converters after all generated assignments
///
/// Fields the generator could not convert are left at their defaults; a
/// decorator fills them in.
pub trait Decorator<S: ?Sized, T> {
    /// Adjust `target` after conversion from `source`
    fn decorate(&self, source: &S, target: &mut T) -> Result<(), ConversionError>;
}

/// Decorator that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecorator;

impl<S: ?Sized, T> Decorator<S, T> for NoDecorator {
    fn decorate(&self, _source: &S, _target: &mut T) -> Result<(), ConversionError> {
        Ok(())
    }
}

impl<S: ?Sized, T, F> Decorator<S, T> for F
where
    F: Fn(&S, &mut T) -> Result<(), ConversionError>,
{
    fn decorate(&self, source: &S, target: &mut T) -> Result<(), ConversionError> {
        self(source, target)
    }
}
