use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use md_tape::{
    init_file_logging, prewarm_highlighting, AppendOnlySink, EnvConfig, MarkdownBackend, Sink,
    StreamError, StreamOptions, StreamRenderer,
};
use thiserror::Error;
use tracing::{debug, warn};

const USAGE: &str = "usage: md-tape [FILE]\n\nRenders markdown from FILE (or stdin) as it streams in.\n";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to read {name}: {source}")]
    Input { name: String, source: io::Error },

    #[error(transparent)]
    Stream(#[from] StreamError),
}

fn main() -> ExitCode {
    let config = EnvConfig::from_env();
    if let Some(path) = config.log_path.as_deref() {
        if let Err(err) = init_file_logging(path, &config.log_filter) {
            eprintln!("md-tape: logging disabled: {err}");
        }
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) if message.is_empty() => {
            print!("{USAGE}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("md-tape: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(config: &EnvConfig) -> Result<(), CliError> {
    let (name, mut input) = open_input(std::env::args().skip(1))?;
    let _ = thread::Builder::new()
        .name("highlight-prewarm".to_string())
        .spawn(prewarm_highlighting);

    #[cfg(unix)]
    {
        let terminal = md_tape::ProcessTerminal::new()
            .with_write_log(config.write_log.clone().map(PathBuf::from));
        if terminal.is_tty() {
            return run_on_terminal(&name, &mut input, terminal, config);
        }
    }

    let mut options = StreamOptions::from(config);
    options.partial_preview = false;
    let sink = AppendOnlySink::new(io::stdout().lock());
    let mut stream = StreamRenderer::markdown(sink, options)?;
    pump(&name, &mut input, &mut stream, config, |_| Ok(()))
}

#[cfg(unix)]
fn run_on_terminal(
    name: &str,
    input: &mut dyn Read,
    terminal: md_tape::ProcessTerminal,
    config: &EnvConfig,
) -> Result<(), CliError> {
    let mut options = StreamOptions::from(config);
    if options.width.is_none() {
        options.width = terminal.columns();
    }
    let follow_terminal = config.width.is_none();
    let watcher = match md_tape::ResizeWatcher::start() {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(error = %err, "resize watcher unavailable");
            None
        }
    };

    let mut stream = StreamRenderer::markdown(terminal, options)?;
    pump(name, input, &mut stream, config, |stream| {
        let resized = watcher.as_ref().is_some_and(|watcher| watcher.take_resized());
        if !resized || !follow_terminal {
            return Ok(());
        }
        match stream.sink().columns() {
            Some(columns) => stream.resize(columns),
            None => Ok(()),
        }
    })
}

fn open_input(mut args: impl Iterator<Item = String>) -> Result<(String, Box<dyn Read>), CliError> {
    let first = args.next();
    if let Some(extra) = args.next() {
        return Err(CliError::Usage(format!("unexpected argument '{extra}'\n{USAGE}")));
    }
    match first.as_deref() {
        None | Some("-") => Ok(("stdin".to_string(), Box::new(io::stdin().lock()))),
        Some("-h" | "--help") => Err(CliError::Usage(String::new())),
        Some(path) => {
            let file = File::open(path).map_err(|source| CliError::Input {
                name: path.to_string(),
                source,
            })?;
            Ok((path.to_string(), Box::new(file)))
        }
    }
}

/// Feeds `input` to `stream` in configured chunks, calling `between_chunks` after each.
fn pump<S, F>(
    name: &str,
    input: &mut dyn Read,
    stream: &mut StreamRenderer<MarkdownBackend, S>,
    config: &EnvConfig,
    mut between_chunks: F,
) -> Result<(), CliError>
where
    S: Sink,
    F: FnMut(&mut StreamRenderer<MarkdownBackend, S>) -> Result<(), StreamError>,
{
    let mut buf = vec![0u8; config.chunk_size.max(1)];
    let delay = Duration::from_millis(config.chunk_delay_ms);
    let mut total = 0usize;

    loop {
        let count = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(CliError::Input {
                    name: name.to_string(),
                    source,
                })
            }
        };
        total += count;
        stream.write(&buf[..count])?;
        between_chunks(stream)?;
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    stream.close()?;
    debug!(bytes = total, input = name, "input rendered");
    Ok(())
}
