use crate::builtin::{BuiltinStatus, exec_built_in};
use crate::command::ExitCode;
use crate::config::Limits;
use crate::error::{ErrorKind, ShellError};
use crate::external::execute_pipeline;
use crate::io_adapters::{ConsoleSink, LineSource, MessageSink};
use crate::parser::CommandList;
use std::io::Write;

/// Whether the command loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// The command loop: reads lines, runs built-ins in-process and everything
/// else as a pipeline of external programs.
///
/// Example
/// ```no_run
/// use dsh::Interpreter;
/// use dsh::io_adapters::ScriptSource;
///
/// let mut sh = Interpreter::default();
/// let mut script = ScriptSource::new(["echo hello | tr a-z A-Z", "exit"]);
/// let code = sh.repl(&mut script).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    limits: Limits,
    sink: Box<dyn MessageSink>,
    last_status: ExitCode,
}

impl Interpreter {
    pub fn new(limits: Limits, sink: Box<dyn MessageSink>) -> Self {
        Self {
            limits,
            sink,
            last_status: 0,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Exit code of the last command that ran (last stage for a pipeline).
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Read and run lines until `exit` or end of input.
    ///
    /// Returns the exit code of the last command that ran.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> anyhow::Result<ExitCode> {
        while let Some(line) = source.read_line()? {
            if self.execute_line(&line) == LoopControl::Exit {
                break;
            }
        }
        Ok(self.last_status)
    }

    /// Run one line, writing built-in output to the process's standard output.
    pub fn execute_line(&mut self, line: &str) -> LoopControl {
        self.execute_line_with_output(line, &mut std::io::stdout())
    }

    /// Run one line, writing built-in output to `stdout`.
    ///
    /// External programs always inherit the shell's own standard streams.
    pub fn execute_line_with_output(&mut self, line: &str, stdout: &mut dyn Write) -> LoopControl {
        // Leave room for the terminator, as a bounded C read would.
        if line.len() >= self.limits.max_line_len {
            self.report(&ShellError::CmdOrArgsTooBig(self.limits.max_line_len.saturating_sub(1)));
            return LoopControl::Continue;
        }

        let list = match CommandList::build(line, &self.limits) {
            Ok(list) => list,
            Err(e) => {
                self.report(&e);
                return LoopControl::Continue;
            }
        };

        // Built-ins are only recognized on a line without pipes.
        if let Some(cmd) = list.single() {
            match exec_built_in(cmd, stdout, self.sink.as_mut()) {
                BuiltinStatus::Exit => return LoopControl::Exit,
                BuiltinStatus::Executed(code) => {
                    self.last_status = code;
                    return LoopControl::Continue;
                }
                BuiltinStatus::NotBuiltin => {}
            }
        }

        match execute_pipeline(&list) {
            Ok(status) => self.last_status = status.last_exit_code(),
            Err(e) => self.report(&e),
        }
        LoopControl::Continue
    }

    fn report(&mut self, err: &ShellError) {
        tracing::debug!(kind = ?err.kind(), "line rejected: {err}");
        if err.kind() != ErrorKind::NoCommands {
            self.last_status = 1;
        }
        self.sink.report(err.severity(), &err.to_string());
    }
}

impl Default for Interpreter {
    /// Default limits, messages printed to the console.
    fn default() -> Self {
        Self::new(Limits::default(), Box::new(ConsoleSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::io_adapters::{MemSink, ScriptSource};
    use crate::test_support::process_lock;
    use nix::errno::Errno;
    use nix::sys::wait::{WaitPidFlag, waitpid};
    use nix::unistd::Pid;
    use std::env as stdenv;
    use std::fs;

    fn interpreter() -> (Interpreter, MemSink) {
        let sink = MemSink::new();
        let sh = Interpreter::new(Limits::default(), Box::new(sink.clone()));
        (sh, sink)
    }

    fn run(sh: &mut Interpreter, line: &str) -> (LoopControl, String) {
        let mut out = Vec::new();
        let control = sh.execute_line_with_output(line, &mut out);
        (control, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_blank_line_warns_and_continues() {
        let (mut sh, sink) = interpreter();
        assert_eq!(run(&mut sh, "   ").0, LoopControl::Continue);
        assert_eq!(run(&mut sh, "").0, LoopControl::Continue);
        assert_eq!(
            sink.messages(),
            vec![
                (Severity::Warning, "warning: no commands provided".to_string()),
                (Severity::Warning, "warning: no commands provided".to_string()),
            ]
        );
        assert_eq!(sh.last_status(), 0);
    }

    #[test]
    fn test_pipeline_limit_spawns_nothing() {
        let _lock = process_lock();
        let (mut sh, sink) = interpreter();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");

        let stage = format!("touch {}", marker.display());
        let line = vec![stage.as_str(); sh.limits().max_pipeline + 1].join(" | ");
        assert_eq!(run(&mut sh, &line).0, LoopControl::Continue);

        assert!(!marker.exists());
        assert_eq!(
            waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)),
            Err(Errno::ECHILD)
        );
        assert_eq!(
            sink.messages(),
            vec![(Severity::Warning, "error: piping limited to 8 commands".to_string())]
        );
    }

    #[test]
    fn test_over_long_line_is_rejected() {
        let (mut sh, sink) = interpreter();
        let line = format!("echo {}", "x".repeat(sh.limits().max_line_len));
        assert_eq!(run(&mut sh, &line).0, LoopControl::Continue);

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, Severity::Error);
        assert!(messages[0].1.contains("too large"));
        assert_eq!(sh.last_status(), 1);
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let (mut sh, _) = interpreter();
        let (control, out) = run(&mut sh, "  exit  ");
        assert_eq!(control, LoopControl::Exit);
        assert_eq!(out, "exiting...\n");
    }

    #[test]
    fn test_builtins_ignore_flag_syntax() {
        let _lock = process_lock();
        let (mut sh, sink) = interpreter();

        let (control, out) = run(&mut sh, "dragon -x");
        assert_eq!(control, LoopControl::Continue);
        assert!(out.contains("(vvv(VVV)(VVV)vvv)"));
        assert_eq!(sh.last_status(), 0);

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("-d")).unwrap();
        let orig = stdenv::current_dir().unwrap();
        stdenv::set_current_dir(dir.path()).unwrap();
        run(&mut sh, "cd -d");
        let entered = stdenv::current_dir().unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");
        assert_eq!(entered.file_name().and_then(|n| n.to_str()), Some("-d"));

        let (control, out) = run(&mut sh, "exit --help");
        assert_eq!(control, LoopControl::Exit);
        assert_eq!(out, "exiting...\n");
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_cd_failure_keeps_shell_running() {
        let _lock = process_lock();
        let (mut sh, sink) = interpreter();
        let orig = stdenv::current_dir().unwrap();

        let (control, _) = run(&mut sh, "cd /nonexistent-path");
        assert_eq!(control, LoopControl::Continue);
        assert_eq!(stdenv::current_dir().unwrap(), orig);
        assert_eq!(sh.last_status(), 1);
        assert_eq!(sink.messages().len(), 1);

        assert_eq!(run(&mut sh, "dragon").0, LoopControl::Continue);
        assert_eq!(sh.last_status(), 0);
    }

    #[test]
    fn test_cd_affects_later_commands() {
        let _lock = process_lock();
        let (mut sh, sink) = interpreter();
        let orig = stdenv::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        run(&mut sh, &format!("cd {}", dir.path().display()));
        run(&mut sh, "touch created-here");
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert!(sink.messages().is_empty());
        assert!(dir.path().join("created-here").exists());
    }

    #[test]
    fn test_builtin_inside_pipeline_runs_as_external() {
        let _lock = process_lock();
        let (mut sh, sink) = interpreter();

        // No `exit` program exists, so that stage fails on its own and the
        // shell keeps going.
        let (control, out) = run(&mut sh, "exit | true");
        assert_eq!(control, LoopControl::Continue);
        assert!(out.is_empty());
        assert!(sink.messages().is_empty());
        assert_eq!(sh.last_status(), 0);
    }

    #[test]
    fn test_last_status_follows_last_stage() {
        let _lock = process_lock();
        let (mut sh, _) = interpreter();

        run(&mut sh, "true | sh -c \"exit 7\"");
        assert_eq!(sh.last_status(), 7);
        run(&mut sh, "false | true");
        assert_eq!(sh.last_status(), 0);
    }

    #[test]
    fn test_repl_stops_at_exit() {
        let _lock = process_lock();
        let (mut sh, _) = interpreter();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("after-exit");

        let mut script = ScriptSource::new([
            "sh -c \"exit 5\"".to_string(),
            "exit".to_string(),
            format!("touch {}", marker.display()),
        ]);
        let code = sh.repl(&mut script).unwrap();

        assert_eq!(code, 5);
        assert!(!marker.exists());
    }

    #[test]
    fn test_repl_stops_at_end_of_input() {
        let _lock = process_lock();
        let (mut sh, _) = interpreter();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("words");

        let mut script = ScriptSource::new([format!(
            "echo hello | sh -c \"wc -w > {}\"",
            out.display()
        )]);
        assert_eq!(sh.repl(&mut script).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "1");
    }
}
