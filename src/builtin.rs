use crate::command::{CommandBuffer, ExitCode};
use crate::error::Severity;
use crate::io_adapters::MessageSink;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;

/// Name of the built-in that stops the shell.
pub const EXIT_CMD: &str = "exit";

/// Classification of a command name against the closed set of built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    NotBuiltin,
    Exit,
    Cd,
    Dragon,
}

/// What happened when a command was offered to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStatus {
    /// Not a built-in; the caller should run it as an external program.
    NotBuiltin,
    /// A built-in ran in the shell process and finished with this exit code.
    Executed(ExitCode),
    /// `exit` ran; the shell must stop reading input.
    Exit,
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Executes the command, writing any regular output to `stdout`.
    fn execute(self, stdout: &mut dyn Write) -> Result<BuiltinStatus>;
}

pub fn match_command(name: &str) -> BuiltinKind {
    match name {
        EXIT_CMD => BuiltinKind::Exit,
        "cd" => BuiltinKind::Cd,
        "dragon" => BuiltinKind::Dragon,
        _ => BuiltinKind::NotBuiltin,
    }
}

/// Run `cmd` in the shell process if it names a built-in.
///
/// Failures of the built-in itself (a bad `cd` target) are reported
/// to `sink` and count as [`BuiltinStatus::Executed`] with exit code 1.
pub fn exec_built_in(
    cmd: &CommandBuffer,
    stdout: &mut dyn Write,
    sink: &mut dyn MessageSink,
) -> BuiltinStatus {
    let Some(name) = cmd.name() else {
        return BuiltinStatus::NotBuiltin;
    };
    // Everything after the name is an operand, even if it starts with a dash.
    let args: Vec<&str> = std::iter::once("--").chain(cmd.args().skip(1)).collect();

    match match_command(name) {
        BuiltinKind::NotBuiltin => BuiltinStatus::NotBuiltin,
        BuiltinKind::Exit => run::<Exit>(&args, stdout, sink),
        BuiltinKind::Cd => run::<Cd>(&args, stdout, sink),
        BuiltinKind::Dragon => run::<Dragon>(&args, stdout, sink),
    }
}

fn run<T: BuiltinCommand>(
    args: &[&str],
    stdout: &mut dyn Write,
    sink: &mut dyn MessageSink,
) -> BuiltinStatus {
    let result = match T::from_args(&[T::name()], args) {
        Ok(cmd) => cmd.execute(stdout),
        // Operands follow `--`, so argh never asks for `--help` here.
        Err(EarlyExit { output, .. }) => Err(anyhow::anyhow!(output.trim_end().to_string())),
    };

    match result {
        Ok(status) => status,
        Err(e) => {
            sink.report(Severity::Error, &format!("{e:#}"));
            BuiltinStatus::Executed(1)
        }
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        EXIT_CMD
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<BuiltinStatus> {
        writeln!(stdout, "exiting...")?;
        Ok(BuiltinStatus::Exit)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target the directory is left unchanged.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Extra operands are ignored.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write) -> Result<BuiltinStatus> {
        if let Some(target) = self.targets.first() {
            env::set_current_dir(target).with_context(|| format!("cd: {target}"))?;
            tracing::debug!(dir = %target, "changed directory");
        }
        Ok(BuiltinStatus::Executed(0))
    }
}

const DRAGON: &str = r#"
                 __====-_  _-====__
           _--^^^#####//      \\#####^^^--_
        _-^##########// (    ) \\##########^-_
       -############//  |\^^/|  \\############-
     _/############//   (@::@)   \\############\_
    /#############((     \\//     ))#############\
   -###############\\    (oo)    //###############-
  -#################\\  / VV \  //#################-
 -###################\\/      \//###################-
_#/|##########/\######(   /\   )######/\##########|\#_
|/ |#/\#/\#/\/  \#/\##\  |  |  /##/\#/  \/\#/\#/\#| \|
`  |/  V  V  `   V  \#\| |  | |/#/  V   '  V  V  \|  '
   `   `  `      `   / | |  | | \   '      '  '   '
                    (  | |  | |  )
                   __\ | |  | | /__
                  (vvv(VVV)(VVV)vvv)
"#;

#[derive(FromArgs)]
/// Print a dragon.
pub struct Dragon {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Dragon {
    fn name() -> &'static str {
        "dragon"
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<BuiltinStatus> {
        stdout.write_all(DRAGON.trim_start_matches('\n').as_bytes())?;
        Ok(BuiltinStatus::Executed(0))
    }
}
