//! Splitting a command line into pipeline stages.

use crate::command::CommandBuffer;
use crate::config::{Limits, PIPE_CHAR};
use crate::error::ShellError;

/// An ordered, non-empty list of parsed stages (`cmd1 | cmd2 | ... | cmdN`).
///
/// A list only exists after a successful [`CommandList::build`], so it always
/// holds between 1 and `max_pipeline` commands.
#[derive(Debug)]
pub struct CommandList {
    commands: Vec<CommandBuffer>,
}

impl CommandList {
    /// Parse `line` into one [`CommandBuffer`] per pipe-delimited segment.
    ///
    /// Errors:
    /// - [`ShellError::NoCommands`] for an empty line or an empty segment
    ///   (`| ls`, `ls |`, `ls || wc`, `"" | wc`).
    /// - [`ShellError::TooManyCommands`] when the line has more than
    ///   `max_pipeline` segments.
    /// - Any tokenizer error for a segment.
    ///
    /// Buffers built before a failure are dropped before returning.
    pub fn build(line: &str, limits: &Limits) -> Result<Self, ShellError> {
        if line.is_empty() {
            return Err(ShellError::NoCommands);
        }

        let mut commands = Vec::new();
        commands
            .try_reserve_exact(limits.max_pipeline)
            .map_err(|_| ShellError::Memory)?;

        for segment in line.split(PIPE_CHAR) {
            if commands.len() >= limits.max_pipeline {
                return Err(ShellError::TooManyCommands(limits.max_pipeline));
            }

            let segment = segment.trim_start();
            if segment.is_empty() {
                return Err(ShellError::NoCommands);
            }

            let mut cmd = CommandBuffer::alloc(limits)?;
            cmd.populate(segment)?;
            // `""` alone tokenizes to nothing.
            if cmd.is_empty() {
                return Err(ShellError::NoCommands);
            }
            commands.push(cmd);
        }

        tracing::debug!(stages = commands.len(), "parsed command line");
        Ok(Self { commands })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Always false for a list produced by [`CommandList::build`].
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[CommandBuffer] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandBuffer> {
        self.commands.iter()
    }

    /// The only stage of a non-piped line.
    pub fn single(&self) -> Option<&CommandBuffer> {
        match self.commands.as_slice() {
            [cmd] => Some(cmd),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a CommandBuffer;
    type IntoIter = std::slice::Iter<'a, CommandBuffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
