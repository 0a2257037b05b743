use thiserror::Error;

/// Error returned when an empty function container is called.
///
/// This is the only error produced by the container itself.
/// Panics raised by the stored callable are not caught and propagate as is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Error)]
#[error("bad function call: no callable is stored")]
pub struct BadCall;
