//! Response body decoding
//!
//! Decoders turn a raw body into the caller's type once the attempt loop
//! has settled on a successful response. A decode failure is final — it is
//! delivered to the caller, never routed back through the handler chain.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors from turning a response body into the expected shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response body is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Turns a successful response body into a typed value.
pub trait ResponseDecoder: Send + Sync {
    type Output;

    fn decode(&self, body: &[u8]) -> Result<Self::Output, DecodeError>;
}

/// Decodes the body as JSON into `T`.
pub struct JsonDecoder<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResponseDecoder for JsonDecoder<T> {
    type Output = T;

    fn decode(&self, body: &[u8]) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Decodes the body as a UTF-8 string.
pub struct StringDecoder;

impl ResponseDecoder for StringDecoder {
    type Output = String;

    fn decode(&self, body: &[u8]) -> Result<String, DecodeError> {
        Ok(String::from_utf8(body.to_vec())?)
    }
}

/// Ignores the body. For endpoints whose success carries no payload.
pub struct UnitDecoder;

impl ResponseDecoder for UnitDecoder {
    type Output = ();

    fn decode(&self, _body: &[u8]) -> Result<(), DecodeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u64,
        name: String,
    }

    #[test]
    fn json_decoder_parses_typed_values() {
        let decoder = JsonDecoder::<Item>::new();
        let item = decoder.decode(br#"{"id":7,"name":"widget"}"#).unwrap();
        assert_eq!(
            item,
            Item {
                id: 7,
                name: "widget".into()
            }
        );
    }

    #[test]
    fn json_decoder_rejects_mismatched_shape() {
        let decoder = JsonDecoder::<Item>::new();
        let err = decoder.decode(br#"{"id":"not-a-number"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn string_decoder_requires_utf8() {
        assert_eq!(StringDecoder.decode(b"plain text").unwrap(), "plain text");
        let err = StringDecoder.decode(&[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn unit_decoder_ignores_any_body() {
        UnitDecoder.decode(b"").unwrap();
        UnitDecoder.decode(b"ignored").unwrap();
    }
}
