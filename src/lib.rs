//! A small POSIX pipeline shell.
//!
//! A line such as `ls -l | grep rs | wc -l` is split on `|` into stages, each
//! stage is tokenized into arguments (double quotes group words), and the
//! stages are run as external programs connected by pipes. A line holding a
//! single built-in (`exit`, `cd`, `dragon`) runs inside the shell process.
//!
//! The main entry point is [`Interpreter`], which reads lines from a
//! [`LineSource`](io_adapters::LineSource) and reports problems to a
//! [`MessageSink`](io_adapters::MessageSink). The lower layers are public too:
//! [`CommandList::build`] parses a line and [`execute_pipeline`] runs it.

pub mod builtin;
pub mod command;
pub mod config;
pub mod error;
pub mod external;
pub mod interpreter;
pub mod io_adapters;
mod lexer;
pub mod parser;

#[cfg(test)]
mod test_support;

pub use command::{CommandBuffer, ExitCode};
pub use config::Limits;
pub use error::{ErrorKind, Severity, ShellError};
pub use external::{PipelineStatus, execute_pipeline};
/// Just a convenient re-export of the command loop.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, LoopControl};
pub use parser::CommandList;
