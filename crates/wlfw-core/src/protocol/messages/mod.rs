//! Typed WLFW messages and their TLV encodings.

use super::constants::{QMI_RESULT_FAILURE, QMI_RESULT_SUCCESS};
use super::tlv::{CodecError, TlvReader, TlvWriter};

pub use ancillary::*;
pub use bringup::*;
pub use control::*;
pub use indication::*;
pub use qdss::*;
pub use resource::*;

/// Tag of the mandatory result TLV carried by every response.
pub const RESULT_TLV: u8 = 0x02;

/// A message that can be framed as TLVs.
pub trait QmiMessage: Sized {
    const MSG_ID: u16;

    fn encode(&self, w: &mut TlvWriter);

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = TlvWriter::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    fn from_bytes(payload: &[u8]) -> Result<Self, CodecError> {
        let r = TlvReader::parse(payload)?;
        Self::decode(&r)
    }
}

/// A response carrying the standard result/error pair.
pub trait QmiResponse: QmiMessage {
    fn status(&self) -> ResponseStatus;
}

/// A request and the response type it resolves to.
pub trait QmiRequest: QmiMessage {
    type Response: QmiResponse;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseStatus {
    pub result: u16,
    pub error: u16,
}

impl ResponseStatus {
    pub const SUCCESS: Self = Self {
        result: QMI_RESULT_SUCCESS,
        error: 0,
    };

    pub fn failure(error: u16) -> Self {
        Self {
            result: QMI_RESULT_FAILURE,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == QMI_RESULT_SUCCESS
    }

    pub fn encode(&self, w: &mut TlvWriter) {
        w.field(RESULT_TLV, |b| {
            b.u16(self.result).u16(self.error);
        });
    }

    pub fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        let mut v = r.require(RESULT_TLV)?;
        Ok(Self {
            result: v.u16()?,
            error: v.u16()?,
        })
    }
}

/// Response with nothing beyond the result TLV.
macro_rules! status_response {
    ($(#[$meta:meta])* $name:ident = $id:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub resp: $crate::protocol::messages::ResponseStatus,
        }

        impl $crate::protocol::messages::QmiMessage for $name {
            const MSG_ID: u16 = $id;

            fn encode(&self, w: &mut $crate::protocol::tlv::TlvWriter) {
                self.resp.encode(w);
            }

            fn decode(
                r: &$crate::protocol::tlv::TlvReader<'_>,
            ) -> Result<Self, $crate::protocol::tlv::CodecError> {
                Ok(Self {
                    resp: $crate::protocol::messages::ResponseStatus::decode(r)?,
                })
            }
        }

        impl $crate::protocol::messages::QmiResponse for $name {
            fn status(&self) -> $crate::protocol::messages::ResponseStatus {
                self.resp
            }
        }
    };
}

/// Message without any TLVs (empty requests and bare indications).
macro_rules! empty_message {
    ($(#[$meta:meta])* $name:ident = $id:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name;

        impl $crate::protocol::messages::QmiMessage for $name {
            const MSG_ID: u16 = $id;

            fn encode(&self, _w: &mut $crate::protocol::tlv::TlvWriter) {}

            fn decode(
                _r: &$crate::protocol::tlv::TlvReader<'_>,
            ) -> Result<Self, $crate::protocol::tlv::CodecError> {
                Ok(Self)
            }
        }
    };
}

/// Pairs a request type with its response type.
macro_rules! request {
    ($req:ty => $resp:ty) => {
        impl $crate::protocol::messages::QmiRequest for $req {
            type Response = $resp;
        }
    };
}

pub mod ancillary;
pub mod bringup;
pub mod control;
pub mod indication;
pub mod qdss;
pub mod resource;
