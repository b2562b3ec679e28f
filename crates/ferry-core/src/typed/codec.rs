//! PayloadCodec - serde 値と PortableValue の相互変換

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::PortableValue;

/// CodecError は変換エラーの分類
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

/// PayloadCodec は型付き入出力を portable 形式に変換
pub struct PayloadCodec;

impl PayloadCodec {
    pub fn encode<T: Serialize>(value: &T) -> Result<PortableValue, CodecError> {
        serde_json::to_value(value)
            .map(PortableValue::new)
            .map_err(CodecError::Encode)
    }

    pub fn decode<T: DeserializeOwned>(value: &PortableValue) -> Result<T, CodecError> {
        serde_json::from_value(value.json().clone()).map_err(CodecError::Decode)
    }
}
