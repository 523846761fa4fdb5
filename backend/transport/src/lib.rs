pub mod envelope;
pub mod http;
pub mod scripted;

pub use http::HttpTransport;
pub use scripted::{ScriptedReply, ScriptedResponse, ScriptedTransport};
