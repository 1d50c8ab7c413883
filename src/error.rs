use nix::errno::Errno;

/// How loudly a condition should be reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Coarse status categories reported back to the command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or all-whitespace input, or an empty pipeline segment.
    NoCommands,
    /// Argument count or stage count exceeds its bound.
    TooManyCommands,
    /// Command storage could not be reserved.
    MemoryFailure,
    /// The input line is longer than the configured maximum.
    TooLarge,
    /// `pipe`, `fork` or `waitpid` failed in the shell process.
    ExecutionFailure,
}

/// Everything that can go wrong between reading a line and reaping its children.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("warning: no commands provided")]
    NoCommands,

    #[error("error: piping limited to {0} commands")]
    TooManyCommands(usize),

    #[error("error: too many arguments, limit is {0}")]
    TooManyArguments(usize),

    #[error("error: memory allocation failure")]
    Memory,

    #[error("error: command or arguments too large, limit is {0} bytes")]
    CmdOrArgsTooBig(usize),

    #[error("error: fail to execute external commands ({op}: {source})")]
    Execution {
        op: &'static str,
        #[source]
        source: Errno,
    },
}

impl ShellError {
    pub(crate) fn execution(op: &'static str) -> impl FnOnce(Errno) -> Self {
        move |source| ShellError::Execution { op, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ShellError::NoCommands => ErrorKind::NoCommands,
            ShellError::TooManyCommands(_) | ShellError::TooManyArguments(_) => {
                ErrorKind::TooManyCommands
            }
            ShellError::Memory => ErrorKind::MemoryFailure,
            ShellError::CmdOrArgsTooBig(_) => ErrorKind::TooLarge,
            ShellError::Execution { .. } => ErrorKind::ExecutionFailure,
        }
    }

    /// Empty input and bound violations are warnings; the shell simply skips the line.
    pub fn severity(&self) -> Severity {
        match self.kind() {
            ErrorKind::NoCommands | ErrorKind::TooManyCommands => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
