use crate::config::Limits;
use crate::error::ShellError;
use crate::lexer;
use std::ffi::CStr;
use std::ops::Range;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Stages killed by a signal report `128 + signal`, as POSIX shells do.
pub type ExitCode = i32;

/// One parsed pipeline stage: normalized argument text plus views into it.
///
/// The buffer reserves its storage once in [`CommandBuffer::alloc`]. Parsing a
/// new span with [`CommandBuffer::populate`] reuses that storage, and every
/// argument handed out borrows from the buffer, so no argument can outlive it.
#[derive(Debug)]
pub struct CommandBuffer {
    text: String,
    arguments: Vec<Range<usize>>,
    capacity: usize,
    max_args: usize,
}

impl CommandBuffer {
    /// Reserve storage for one stage under `limits`.
    pub fn alloc(limits: &Limits) -> Result<Self, ShellError> {
        let mut text = String::new();
        text.try_reserve_exact(limits.max_line_len)
            .map_err(|_| ShellError::Memory)?;
        let mut arguments = Vec::new();
        arguments
            .try_reserve_exact(limits.max_args)
            .map_err(|_| ShellError::Memory)?;
        Ok(Self {
            text,
            arguments,
            capacity: limits.max_line_len,
            max_args: limits.max_args,
        })
    }

    /// Tokenize `span` into this buffer, replacing whatever it held before.
    ///
    /// The span is cut to fit the buffer's capacity. On error the buffer may hold
    /// a partial parse and should be cleared or dropped.
    pub fn populate(&mut self, span: &str) -> Result<(), ShellError> {
        let span = lexer::truncate_span(span, self.capacity);
        lexer::split_into_arguments(span, &mut self.text, &mut self.arguments, self.max_args)
    }

    /// Forget the parsed arguments but keep the storage for the next span.
    pub fn clear(&mut self) {
        self.text.clear();
        self.arguments.clear();
    }

    pub fn argc(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// The program name, if the buffer holds anything.
    pub fn name(&self) -> Option<&str> {
        self.arg(0)
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.arguments
            .get(index)
            .map(|range| &self.text[range.clone()])
    }

    pub fn args(&self) -> impl Iterator<Item = &str> + '_ {
        self.arguments.iter().map(|range| &self.text[range.clone()])
    }

    /// NUL-terminated views of every argument, ready for `execvp`.
    ///
    /// `execvp` appends the terminating null pointer after the last entry.
    pub fn argv(&self) -> Vec<&CStr> {
        let bytes = self.text.as_bytes();
        self.arguments
            .iter()
            // The tokenizer writes a NUL right after every argument.
            .filter_map(|range| CStr::from_bytes_with_nul(&bytes[range.start..=range.end]).ok())
            .collect()
    }
}
