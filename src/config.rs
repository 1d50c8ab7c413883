//! Bounds applied while reading, parsing and running a command line.

use anyhow::{Result, bail};

/// Maximum length of one input line in bytes, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 320;

/// Maximum number of arguments (program name included) in one stage.
pub const DEFAULT_MAX_ARGS: usize = 8;

/// Maximum number of stages in one pipeline.
pub const DEFAULT_MAX_PIPELINE: usize = 8;

/// The separator between pipeline stages.
pub const PIPE_CHAR: char = '|';

/// The only quoting character understood by the tokenizer.
pub const QUOTE_CHAR: char = '"';

/// Capacity limits shared by the tokenizer, the splitter and the command loop.
///
/// Every bound is enforced with an explicit error; nothing is silently dropped
/// except the tail of an over-long span handed directly to
/// [`CommandBuffer::populate`](crate::command::CommandBuffer::populate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Size of a command buffer's backing text, terminator included.
    pub max_line_len: usize,
    /// Maximum number of arguments per stage.
    pub max_args: usize,
    /// Maximum number of stages per line.
    pub max_pipeline: usize,
}

impl Limits {
    pub fn new(max_line_len: usize, max_args: usize, max_pipeline: usize) -> Result<Self> {
        let limits = Self {
            max_line_len,
            max_args,
            max_pipeline,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Reject bounds that would make every line unparseable.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_len < 2 {
            bail!("max line length must be at least 2, got {}", self.max_line_len);
        }
        if self.max_args == 0 {
            bail!("max arguments must be at least 1");
        }
        if self.max_pipeline == 0 {
            bail!("max pipeline length must be at least 1");
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_args: DEFAULT_MAX_ARGS,
            max_pipeline: DEFAULT_MAX_PIPELINE,
        }
    }
}
