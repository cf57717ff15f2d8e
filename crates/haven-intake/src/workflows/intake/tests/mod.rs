pub(crate) mod common;
mod workflow;
