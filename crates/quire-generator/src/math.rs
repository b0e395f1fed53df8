//! LaTeX formula extraction and rendering.
//!
//! Post content marks formulas with `$...$` (inline) and `$$...$$` (display).
//! A post is scanned once, its formulas are sent to a [`MathRenderer`] in one
//! batch, and the rendered HTML is spliced back between the untouched text.

use std::{
    io::{ErrorKind, Read, Write},
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Formula delimiter.
const DELIMITER: char = '$';

/// Escapes a delimiter so it stays literal text.
const ESCAPE: char = '\\';

/// How often a running renderer is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Math rendering errors.
#[derive(Debug, Error)]
pub enum MathError {
    /// A formula was opened but never closed.
    #[error("unterminated formula starting at byte {0}")]
    Unterminated(usize),

    /// A `$$` formula was closed by a single `$`.
    #[error("display formula starting at byte {open} closed by a single `$` at byte {close}")]
    MismatchedDelimiter { open: usize, close: usize },

    /// The renderer process could not be started.
    #[error("failed to start math renderer `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer exited unsuccessfully.
    #[error("math renderer exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    /// The renderer did not finish in time.
    #[error("math renderer timed out after {0:?}")]
    Timeout(Duration),

    /// The renderer output was not a JSON array of strings.
    #[error("invalid math renderer output: {0}")]
    InvalidResponse(String),

    /// The renderer returned a different number of results than formulas sent.
    #[error("math renderer returned {actual} results for {expected} formulas")]
    CountMismatch { expected: usize, actual: usize },

    /// IO error while talking to the renderer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for math operations.
pub type Result<T> = std::result::Result<T, MathError>;

/// A formula cut out of post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Formula {
    /// LaTeX source without delimiters.
    #[serde(rename = "formula")]
    pub text: String,

    /// Whether the formula was written as `$$...$$` and should be centered.
    pub display: bool,
}

impl Formula {
    #[must_use]
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            display: false,
        }
    }

    #[must_use]
    pub fn display(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            display: true,
        }
    }
}

/// Converts a batch of formulas into HTML, one string per formula, in order.
pub trait MathRenderer {
    fn render_batch(&self, formulas: &[Formula]) -> Result<Vec<String>>;
}

/// Content split into text and formulas. `texts` always has one more element
/// than `formulas`; formula `i` sits between `texts[i]` and `texts[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathDocument<'a> {
    pub texts: Vec<&'a str>,
    pub formulas: Vec<Formula>,
}

impl MathDocument<'_> {
    /// Interleave the text with rendered formulas.
    pub fn splice(&self, rendered: &[String]) -> Result<String> {
        if rendered.len() != self.formulas.len() {
            return Err(MathError::CountMismatch {
                expected: self.formulas.len(),
                actual: rendered.len(),
            });
        }

        let capacity = self.texts.iter().map(|t| t.len()).sum::<usize>()
            + rendered.iter().map(String::len).sum::<usize>();
        let mut output = String::with_capacity(capacity);
        output.push_str(self.texts[0]);
        for (html, text) in rendered.iter().zip(&self.texts[1..]) {
            output.push_str(html);
            output.push_str(text);
        }
        Ok(output)
    }
}

/// Split content into text ranges and formulas.
pub fn extract(content: &str) -> Result<MathDocument<'_>> {
    let mut texts = Vec::new();
    let mut formulas = Vec::new();

    let mut chars = content.char_indices().peekable();
    // Start of the current text range, or of the current formula body.
    let mut start = 0;
    // Byte offset and display flag of the open formula, if any.
    let mut open: Option<(usize, bool)> = None;

    while let Some((i, c)) = chars.next() {
        match c {
            ESCAPE => {
                // The escaped character is ordinary text, so `\\$x$` still
                // opens a formula.
                chars.next();
            }
            DELIMITER => match open {
                None => {
                    texts.push(&content[start..i]);
                    let display = chars.next_if(|&(_, next)| next == DELIMITER).is_some();
                    start = i + if display { 2 } else { 1 };
                    open = Some((i, display));
                }
                Some((offset, display)) => {
                    if display && chars.next_if(|&(_, next)| next == DELIMITER).is_none() {
                        return Err(MathError::MismatchedDelimiter {
                            open: offset,
                            close: i,
                        });
                    }
                    formulas.push(Formula {
                        text: content[start..i].to_string(),
                        display,
                    });
                    start = i + if display { 2 } else { 1 };
                    open = None;
                }
            },
            _ => {}
        }
    }

    if let Some((offset, _)) = open {
        return Err(MathError::Unterminated(offset));
    }

    texts.push(&content[start..]);
    Ok(MathDocument { texts, formulas })
}

/// Render every formula in `content` with a single renderer call.
///
/// Content without formulas is returned unchanged and the renderer is not
/// invoked.
pub fn render_math(content: &str, renderer: &dyn MathRenderer) -> Result<String> {
    let document = extract(content)?;
    if document.formulas.is_empty() {
        return Ok(content.to_string());
    }

    debug!(count = document.formulas.len(), "rendering formulas");
    let rendered = renderer.render_batch(&document.formulas)?;
    document.splice(&rendered)
}

/// Renders formulas with an external program.
///
/// The program receives a JSON array of `{"formula": ..., "display": ...}`
/// objects on stdin and must print a JSON array of HTML strings on stdout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    /// Create a renderer from a command line (program followed by arguments).
    #[must_use]
    pub fn new(command: &[String], timeout: Duration) -> Self {
        let (program, args) = match command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (String::new(), Vec::new()),
        };

        Self {
            program,
            args,
            timeout,
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl MathRenderer for CommandRenderer {
    fn render_batch(&self, formulas: &[Formula]) -> Result<Vec<String>> {
        let request = serde_json::to_vec(formulas)
            .map_err(|e| MathError::InvalidResponse(e.to_string()))?;

        debug!(command = %self.command_line(), count = formulas.len(), "spawning math renderer");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MathError::Spawn {
                command: self.command_line(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty renderer cannot
        // block on a full pipe while we wait for it to exit.
        let stdout = child.stdout.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                pipe.read_to_string(&mut buf).map(|_| buf)
            })
        });
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                pipe.read_to_string(&mut buf).map(|_| buf)
            })
        });

        // Feed stdin from a thread too: a renderer that stops reading must not
        // keep us from reaching the deadline. Dropping the pipe closes it.
        let stdin = child.stdin.take().map(|mut pipe| {
            thread::spawn(move || pipe.write_all(&request))
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Err(MathError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let join = |handle: Option<thread::JoinHandle<std::io::Result<String>>>| -> Result<String> {
            match handle {
                Some(handle) => handle
                    .join()
                    .map_err(|_| MathError::InvalidResponse("output reader panicked".to_string()))?
                    .map_err(MathError::from),
                None => Ok(String::new()),
            }
        };
        let stdout = join(stdout)?;
        let stderr = join(stderr)?;
        let written = match stdin {
            Some(handle) => handle
                .join()
                .map_err(|_| MathError::InvalidResponse("input writer panicked".to_string()))?,
            None => Ok(()),
        };

        if !status.success() {
            return Err(MathError::NonZeroExit {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        // A renderer that exits cleanly without reading all of its input is
        // judged by its output alone.
        match written {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {}
        }

        let rendered: Vec<String> = serde_json::from_str(&stdout)
            .map_err(|e| MathError::InvalidResponse(e.to_string()))?;

        if rendered.len() != formulas.len() {
            return Err(MathError::CountMismatch {
                expected: formulas.len(),
                actual: rendered.len(),
            });
        }

        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use proptest::prelude::*;

    use super::*;

    /// Wraps each formula in a tag and counts invocations.
    #[derive(Default)]
    struct StubRenderer {
        calls: Cell<usize>,
    }

    impl MathRenderer for StubRenderer {
        fn render_batch(&self, formulas: &[Formula]) -> Result<Vec<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(formulas
                .iter()
                .map(|f| {
                    if f.display {
                        format!("<M>{}</M>", f.text)
                    } else {
                        format!("<m>{}</m>", f.text)
                    }
                })
                .collect())
        }
    }

    struct ShortRenderer;

    impl MathRenderer for ShortRenderer {
        fn render_batch(&self, _formulas: &[Formula]) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_extract_inline_and_display() {
        let doc = extract("a $x^2$ b $$\\sum_i i$$ c").unwrap();

        assert_eq!(doc.texts, vec!["a ", " b ", " c"]);
        assert_eq!(
            doc.formulas,
            vec![Formula::inline("x^2"), Formula::display("\\sum_i i")]
        );
    }

    #[test]
    fn test_extract_without_formulas() {
        let doc = extract("<p>plain</p>").unwrap();
        assert_eq!(doc.texts, vec!["<p>plain</p>"]);
        assert!(doc.formulas.is_empty());
    }

    #[test]
    fn test_escaped_delimiter_is_text() {
        let doc = extract("costs \\$5 and $y$").unwrap();
        assert_eq!(doc.texts, vec!["costs \\$5 and ", ""]);
        assert_eq!(doc.formulas, vec![Formula::inline("y")]);
    }

    #[test]
    fn test_adjacent_formulas() {
        let doc = extract("$a$$$b$$").unwrap();
        assert_eq!(doc.texts, vec!["", "", ""]);
        assert_eq!(doc.formulas, vec![Formula::inline("a"), Formula::display("b")]);
    }

    #[test]
    fn test_unterminated_formula() {
        let err = extract("text $x + 1").unwrap_err();
        assert!(matches!(err, MathError::Unterminated(5)));
    }

    #[test]
    fn test_render_math_single_batch() {
        let renderer = StubRenderer::default();
        let output = render_math("$a$, $b$ and $$c$$.", &renderer).unwrap();

        assert_eq!(output, "<m>a</m>, <m>b</m> and <M>c</M>.");
        assert_eq!(renderer.calls.get(), 1);
    }

    #[test]
    fn test_render_math_skips_renderer_without_formulas() {
        let renderer = StubRenderer::default();
        let output = render_math("<p>no math</p>", &renderer).unwrap();

        assert_eq!(output, "<p>no math</p>");
        assert_eq!(renderer.calls.get(), 0);
    }

    #[test]
    fn test_render_math_count_mismatch() {
        let err = render_math("$a$", &ShortRenderer).unwrap_err();
        assert!(matches!(
            err,
            MathError::CountMismatch {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_formula_request_json() {
        let json = serde_json::to_string(&[Formula::display("x")]).unwrap();
        assert_eq!(json, r#"[{"formula":"x","display":true}]"#);
    }

    #[test]
    fn test_command_renderer_missing_program() {
        let renderer = CommandRenderer::new(
            &["quire-no-such-renderer".to_string()],
            Duration::from_secs(1),
        );
        let err = renderer.render_batch(&[Formula::inline("x")]).unwrap_err();
        assert!(matches!(err, MathError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_round_trip() {
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"cat > /dev/null; printf '["<b>x</b>"]'"#.to_string(),
        ];
        let renderer = CommandRenderer::new(&command, Duration::from_secs(10));

        let rendered = renderer.render_batch(&[Formula::inline("x")]).unwrap();
        assert_eq!(rendered, vec!["<b>x</b>"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_non_zero_exit() {
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "cat > /dev/null; echo broken >&2; exit 3".to_string(),
        ];
        let renderer = CommandRenderer::new(&command, Duration::from_secs(10));

        let err = renderer.render_batch(&[Formula::inline("x")]).unwrap_err();
        match err {
            MathError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_timeout() {
        let command = vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
        let renderer = CommandRenderer::new(&command, Duration::from_millis(100));

        let err = renderer.render_batch(&[Formula::inline("x")]).unwrap_err();
        assert!(matches!(err, MathError::Timeout(_)));
    }

    fn large_batch() -> Vec<Formula> {
        (0..5000).map(|i| Formula::inline(format!("x_{{{i}}} + y"))).collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_timeout_when_input_is_not_read() {
        let command = vec!["sh".to_string(), "-c".to_string(), "sleep 4".to_string()];
        let renderer = CommandRenderer::new(&command, Duration::from_millis(200));

        let start = Instant::now();
        let err = renderer.render_batch(&large_batch()).unwrap_err();

        assert!(matches!(err, MathError::Timeout(_)), "unexpected error: {err}");
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_exit_before_reading_input() {
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo no input wanted >&2; exit 2".to_string(),
        ];
        let renderer = CommandRenderer::new(&command, Duration::from_secs(10));

        let err = renderer.render_batch(&large_batch()).unwrap_err();
        match err {
            MathError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "no input wanted"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_formula_needs_double_closer() {
        let err = extract("$$a$ b").unwrap_err();
        assert!(matches!(err, MathError::MismatchedDelimiter { open: 0, close: 3 }));

        let err = render_math("x $$a$ b$$", &StubRenderer::default()).unwrap_err();
        assert!(matches!(err, MathError::MismatchedDelimiter { open: 2, close: 5 }));
    }

    #[test]
    fn test_escaped_backslash_before_formula() {
        let doc = extract("a \\\\$x$ b").unwrap();
        assert_eq!(doc.texts, vec!["a \\\\", " b"]);
        assert_eq!(doc.formulas, vec![Formula::inline("x")]);
    }

    #[test]
    fn test_latex_line_break_inside_display() {
        let doc = extract("$$a \\\\ b\\\\$$").unwrap();
        assert_eq!(doc.formulas, vec![Formula::display("a \\\\ b\\\\")]);
    }

    proptest! {
        #[test]
        fn prop_text_without_delimiters_round_trips(content in "[^$\\\\]*") {
            let renderer = StubRenderer::default();
            prop_assert_eq!(render_math(&content, &renderer).unwrap(), content);
            prop_assert_eq!(renderer.calls.get(), 0);
        }

        #[test]
        fn prop_text_spans_survive_rendering(
            texts in proptest::collection::vec("[a-z <>/]{0,8}", 1..6),
            formulas in proptest::collection::vec(("[a-z+^]{1,6}", any::<bool>()), 0..5),
        ) {
            let count = formulas.len().min(texts.len() - 1);
            let mut content = texts[0].clone();
            let mut expected = texts[0].clone();
            for (text, (formula, display)) in texts[1..=count].iter().zip(&formulas) {
                if *display {
                    content.push_str(&format!("$${formula}$$"));
                    expected.push_str(&format!("<M>{formula}</M>"));
                } else {
                    content.push_str(&format!("${formula}$"));
                    expected.push_str(&format!("<m>{formula}</m>"));
                }
                content.push_str(text);
                expected.push_str(text);
            }

            let renderer = StubRenderer::default();
            prop_assert_eq!(render_math(&content, &renderer).unwrap(), expected);
        }
    }
}
