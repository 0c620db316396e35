pub mod mock;
pub mod traits;

pub use mock::{MockTransport, ScriptedReply, SentRequest};
pub use traits::{QmiTransport, ResponseSink, ServiceAddress, TransportError};
