//! WLFW wire protocol: constants, TLV framing and typed messages.

pub mod constants;
pub mod messages;
pub mod tlv;

pub use constants::*;
pub use messages::{QmiMessage, QmiRequest, QmiResponse, ResponseStatus};
pub use tlv::{CodecError, TlvReader, TlvWriter};
