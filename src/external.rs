//! Running a [`CommandList`] as a chain of external processes.

use crate::command::ExitCode;
use crate::error::ShellError;
use crate::parser::CommandList;
use nix::errno::Errno;
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, dup2, execvp, fork, pipe};
use std::ffi::CStr;
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd};

/// Exit status reported by `_exit` in a child whose program could not be started.
const EXEC_FAILURE: i32 = 1;

/// Outcome of one pipeline run: every stage's pid and exit code, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    pub stages: Vec<(Pid, ExitCode)>,
}

impl PipelineStatus {
    /// Exit code of the last stage, which is what `$?` reports in POSIX shells.
    pub fn last_exit_code(&self) -> ExitCode {
        self.stages.last().map_or(0, |&(_, code)| code)
    }
}

/// Run every command of `list` as an external process, chained by pipes.
///
/// Standard input of the first stage and standard output of the last stage are
/// inherited from the shell. Returns once every spawned child has been reaped;
/// non-zero exit codes of the stages do not make this call fail.
pub fn execute_pipeline(list: &CommandList) -> Result<PipelineStatus, ShellError> {
    let count = list.len();

    let mut pipes = Vec::with_capacity(count.saturating_sub(1));
    for _ in 1..count {
        pipes.push(pipe().map_err(ShellError::execution("pipe"))?);
        tracing::trace!(pipe = pipes.len() - 1, "created pipe");
    }

    // Build every argument vector before forking so children allocate as little as possible.
    let argvs: Vec<Vec<&CStr>> = list.iter().map(|cmd| cmd.argv()).collect();

    // Whatever sits in our stdout buffer would otherwise be flushed twice.
    let _ = std::io::stdout().flush();

    let mut children = Vec::with_capacity(count);
    let mut spawn_error = None;
    for (position, argv) in argvs.iter().enumerate() {
        // SAFETY: the child only rewires descriptors and then execs or `_exit`s.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(
                    pid = %child,
                    position,
                    program = ?argv.first(),
                    "spawned stage"
                );
                children.push(child);
            }
            Ok(ForkResult::Child) => exec_stage(position, count, &mut pipes, argv),
            Err(errno) => {
                tracing::warn!(position, %errno, "fork failed, abandoning remaining stages");
                spawn_error = Some(ShellError::execution("fork")(errno));
                break;
            }
        }
    }

    // Close both ends of every pipe in the parent so readers see end of stream.
    drop(pipes);

    let stages = reap_children(&children);
    if let Some(err) = spawn_error {
        return Err(err);
    }
    Ok(PipelineStatus { stages: stages? })
}

/// Body of a forked child. Never returns.
fn exec_stage(
    position: usize,
    count: usize,
    pipes: &mut Vec<(OwnedFd, OwnedFd)>,
    argv: &[&CStr],
) -> ! {
    if position > 0 {
        let (read, _) = &pipes[position - 1];
        if dup2(read.as_raw_fd(), STDIN_FILENO).is_err() {
            child_exit(EXEC_FAILURE);
        }
    }
    if position + 1 < count {
        let (_, write) = &pipes[position];
        if dup2(write.as_raw_fd(), STDOUT_FILENO).is_err() {
            child_exit(EXEC_FAILURE);
        }
    }
    // Only the duplicated stdin/stdout may stay open in the child.
    pipes.clear();

    if let Some(program) = argv.first() {
        let _ = execvp(program, argv);
        report_exec_failure(program.to_bytes());
    }
    child_exit(EXEC_FAILURE)
}

/// Leave the child without running atexit handlers or flushing inherited buffers.
fn child_exit(code: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and never returns.
    unsafe { nix::libc::_exit(code) }
}

/// Write the failure straight to the unbuffered stderr; the child must not touch shell state.
fn report_exec_failure(program: &[u8]) {
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(b"dsh: ");
    let _ = stderr.write_all(program);
    let _ = stderr.write_all(b": command not found or not executable\n");
}

/// Wait for every child in spawn order, retrying on `EINTR`.
///
/// Every child is waited on even if an earlier wait fails; the first failure is
/// returned after the loop.
fn reap_children(children: &[Pid]) -> Result<Vec<(Pid, ExitCode)>, ShellError> {
    let mut stages = Vec::with_capacity(children.len());
    let mut first_error = None;
    for &child in children {
        match syscall(|| waitpid(child, None)) {
            Ok(status) => {
                let code = exit_code(status);
                tracing::debug!(pid = %child, code, "stage exited");
                stages.push((child, code));
            }
            Err(errno) => {
                first_error.get_or_insert(ShellError::execution("waitpid")(errno));
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(stages),
    }
}

/// System call wrapper that retries on `EINTR`.
fn syscall<F, T>(f: F) -> Result<T, Errno>
where
    F: Fn() -> Result<T, Errno>,
{
    loop {
        match f() {
            Err(Errno::EINTR) => (),
            result => return result,
        }
    }
}

fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}
