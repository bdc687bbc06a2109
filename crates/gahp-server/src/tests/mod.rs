//! Test suites for the helper server.

pub(crate) mod support;
