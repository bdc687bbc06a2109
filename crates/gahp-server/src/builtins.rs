//! Protocol commands every helper server answers.

use std::sync::Arc;

use crate::dispatch::{CommandRequest, DispatchError, Dispatcher, HandlerResult, Response};
use crate::session::ExecutionContext;

/// `VERSION`: reports the advertised version string.
pub const VERSION: &str = "VERSION";
/// `COMMANDS`: lists every registered command.
pub const COMMANDS: &str = "COMMANDS";
/// `QUIT`: acknowledges, then shuts the server down.
pub const QUIT: &str = "QUIT";
/// `RESULTS`: drains the result queue.
pub const RESULTS: &str = "RESULTS";
/// `ASYNC_MODE_ON`: enables the `R` notification.
pub const ASYNC_MODE_ON: &str = "ASYNC_MODE_ON";
/// `ASYNC_MODE_OFF`: disables the `R` notification.
pub const ASYNC_MODE_OFF: &str = "ASYNC_MODE_OFF";
/// `RESPONSE_PREFIX`: sets the prefix for later output lines.
pub const RESPONSE_PREFIX: &str = "RESPONSE_PREFIX";

type Builtin = fn(&CommandRequest, &ExecutionContext) -> Result<HandlerResult, DispatchError>;

const BUILTINS: [(&str, Builtin); 7] = [
    (VERSION, version),
    (COMMANDS, commands),
    (QUIT, quit),
    (RESULTS, results),
    (ASYNC_MODE_ON, async_mode_on),
    (ASYNC_MODE_OFF, async_mode_off),
    (RESPONSE_PREFIX, response_prefix),
];

/// Registers the built-in commands on `dispatcher`.
pub fn register(dispatcher: &mut Dispatcher) {
    for (name, handler) in BUILTINS {
        dispatcher.register(name, Arc::new(handler));
    }
}

fn version(
    request: &CommandRequest,
    context: &ExecutionContext,
) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(0)?;
    Ok(Response::success().raw_arg(context.version()).into())
}

fn commands(
    request: &CommandRequest,
    context: &ExecutionContext,
) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(0)?;
    Ok(Response::success().args(context.commands()).into())
}

fn quit(request: &CommandRequest, context: &ExecutionContext) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(0)?;
    context.request_exit();
    Ok(HandlerResult::success())
}

fn results(
    request: &CommandRequest,
    context: &ExecutionContext,
) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(0)?;
    let drained = context.drain_results();
    let response = drained.iter().fold(
        Response::success().raw_arg(drained.len().to_string()),
        |response, result| response.line(result.to_line()),
    );
    Ok(response.into())
}

fn async_mode_on(
    request: &CommandRequest,
    context: &ExecutionContext,
) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(0)?;
    context.set_async_mode(true);
    Ok(HandlerResult::success())
}

fn async_mode_off(
    request: &CommandRequest,
    context: &ExecutionContext,
) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(0)?;
    context.set_async_mode(false);
    Ok(HandlerResult::success())
}

fn response_prefix(
    request: &CommandRequest,
    _context: &ExecutionContext,
) -> Result<HandlerResult, DispatchError> {
    request.expect_arguments(1)?;
    let prefix = request.optional(0)?.unwrap_or_default();
    Ok(HandlerResult::success().with_prefix_change(prefix))
}
