//! Command dispatch for the line protocol.
//!
//! A tokenized line becomes a [`CommandRequest`], is routed by the
//! [`Dispatcher`] to a [`CommandHandler`], and comes back as a
//! [`HandlerResult`] carrying the immediate [`Response`], optional background
//! work and an optional staged prefix change.

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub use errors::DispatchError;
pub(crate) use handler::panic_message;
pub use handler::{CommandHandler, DeferredTask, HandlerResult, TaskFailure};
pub use request::{CommandRequest, NULL_ARGUMENT, RequestId, RequestIdParseError};
pub use response::{Outcome, Response};
pub use router::Dispatcher;
