//! Line-oriented input and output for sessions.
//!
//! Sessions read from a [`LineSource`] and write to a [`LineSink`]. The
//! process uses stdin/stdout; tests and embedders use [`ScriptedInput`] and
//! [`CapturedOutput`].

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Source of input lines.
#[async_trait]
pub trait LineSource: Send {
    /// Show `prompt` and wait for one line.
    ///
    /// Returns `Ok(None)` at end of input. The returned line carries no
    /// trailing newline.
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;
}

/// Write-only sink for output lines.
pub trait LineSink: Send {
    /// Emit one line of output.
    fn write_line(&mut self, line: &str);
}

/// The input/output pair a session runs against.
///
/// Exactly one session holds the terminal at a time; a parent lends it to
/// its child for the child's whole lifetime.
pub struct Terminal {
    input: Box<dyn LineSource>,
    output: Box<dyn LineSink>,
}

impl Terminal {
    /// Create a terminal from an input source and output sink.
    pub fn new(input: impl LineSource + 'static, output: impl LineSink + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Terminal on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(StdinSource::stdin(), StdoutSink)
    }

    /// Show `prompt` and read one line.
    pub async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.input.read_line(prompt).await
    }

    /// Emit one line of output.
    pub fn write_line(&mut self, line: &str) {
        self.output.write_line(line);
    }

    /// The output half, for handlers that only write.
    pub fn output(&mut self) -> &mut dyn LineSink {
        self.output.as_mut()
    }
}

/// Reads lines from a buffered reader, writing each prompt to `prompt_out`.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD, so a stray byte
/// reaches the parser as an ordinary (unknown) word.
pub struct LineReader<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R, W> LineReader<R, W> {
    /// Create a source over `reader`, echoing prompts to `prompt_out`.
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

/// Line source on the process's stdin, prompting on stdout.
pub type StdinSource = LineReader<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdinSource {
    /// Create a reader on stdin.
    pub fn stdin() -> Self {
        LineReader::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> LineSource for LineReader<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.prompt_out.write_all(prompt.as_bytes()).await?;
        self.prompt_out.flush().await?;

        let mut raw = Vec::new();
        if self.reader.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Writes lines to the process's stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&mut self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line).and_then(|_| stdout.flush()) {
            debug!("dropping output line: {}", e);
        }
    }
}

/// Input source that replays a fixed list of lines, then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedInput {
    /// Create a source that yields `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Arc::default(),
        }
    }

    /// Shared record of every prompt shown, readable after the source is
    /// moved into a [`Terminal`].
    pub fn prompt_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

#[async_trait]
impl LineSource for ScriptedInput {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}

/// Output sink that collects lines in memory.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedOutput {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: create a sink and a handle to its lines.
    pub fn with_handle() -> (Self, Arc<Mutex<Vec<String>>>) {
        let sink = Self::new();
        let handle = Arc::clone(&sink.lines);
        (sink, handle)
    }

    /// Snapshot of the lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LineSink for CapturedOutput {
    fn write_line(&mut self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }
}
