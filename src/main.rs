use anyhow::Result;
use argh::FromArgs;
use dsh::config::{DEFAULT_MAX_ARGS, DEFAULT_MAX_LINE_LEN, DEFAULT_MAX_PIPELINE};
use dsh::io_adapters::{ConsoleSink, EditorSource, LineSource, ReaderSource, ScriptSource};
use dsh::{Interpreter, Limits};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Run commands and pipelines of external programs.
struct Args {
    /// run this line and exit
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// maximum length of an input line in bytes
    #[argh(option, default = "DEFAULT_MAX_LINE_LEN")]
    max_line: usize,

    /// maximum number of arguments per command
    #[argh(option, default = "DEFAULT_MAX_ARGS")]
    max_args: usize,

    /// maximum number of commands in a pipeline
    #[argh(option, default = "DEFAULT_MAX_PIPELINE")]
    max_pipeline: usize,

    /// do not keep a history of interactive input
    #[argh(switch)]
    no_history: bool,
}

fn main() -> Result<()> {
    // DSH_LOG controls diagnostics, e.g. DSH_LOG=dsh=debug.
    let filter = EnvFilter::try_from_env("DSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args: Args = argh::from_env();
    let limits = Limits::new(args.max_line, args.max_args, args.max_pipeline)?;

    let mut source: Box<dyn LineSource> = match args.command {
        Some(line) => Box::new(ScriptSource::new([line])),
        None if std::io::stdin().is_terminal() => Box::new(EditorSource::new(!args.no_history)?),
        None => Box::new(ReaderSource::new(std::io::stdin().lock())),
    };

    let mut sh = Interpreter::new(limits, Box::new(ConsoleSink));
    let code = sh.repl(source.as_mut())?;
    std::process::exit(code)
}
