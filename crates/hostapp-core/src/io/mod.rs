//! IO modules - side effects (filesystem, subprocesses)

pub mod command;
pub mod extract;
