//! Quote-aware splitting of one pipeline stage into arguments.
//!
//! The tokenizer never allocates: it writes the normalized text of every
//! argument into a caller-owned `String` (each argument followed by a NUL)
//! and records the byte range of each argument in a caller-owned `Vec`.

use crate::config::QUOTE_CHAR;
use crate::error::ShellError;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    /// Between arguments, skipping whitespace.
    Start,
    ReadingWord,
    ReadingQuote,
}

struct LexingFSM<'a> {
    text: &'a mut String,
    arguments: &'a mut Vec<Range<usize>>,
    max_args: usize,
    state: LexingState,
    token_start: usize,
}

impl<'a> LexingFSM<'a> {
    fn new(text: &'a mut String, arguments: &'a mut Vec<Range<usize>>, max_args: usize) -> Self {
        text.clear();
        arguments.clear();
        LexingFSM {
            text,
            arguments,
            max_args,
            state: LexingState::Start,
            token_start: 0,
        }
    }

    fn feed(&mut self, ch: char) -> Result<(), ShellError> {
        match (self.state, ch) {
            (LexingState::ReadingQuote, QUOTE_CHAR) => self.state = LexingState::ReadingWord,
            (LexingState::ReadingQuote, c) => self.text.push(c),
            (_, QUOTE_CHAR) => self.state = LexingState::ReadingQuote,
            (LexingState::Start, c) if c.is_whitespace() => {}
            (LexingState::ReadingWord, c) if c.is_whitespace() => {
                self.finish_token()?;
                self.state = LexingState::Start;
            }
            (_, c) => {
                self.text.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
        Ok(())
    }

    /// Close the argument that started at `token_start`, if it has any text.
    ///
    /// `""` leaves nothing behind and therefore produces no argument.
    fn finish_token(&mut self) -> Result<(), ShellError> {
        let end = self.text.len();
        if end == self.token_start {
            return Ok(());
        }
        if self.arguments.len() >= self.max_args {
            return Err(ShellError::TooManyArguments(self.max_args));
        }
        self.arguments.push(self.token_start..end);
        self.text.push('\0');
        self.token_start = self.text.len();
        Ok(())
    }

    fn finish(mut self) -> Result<(), ShellError> {
        // An unterminated quote keeps everything up to the end of the input.
        self.finish_token()
    }
}

/// Cut `span` so that it fits in `capacity - 1` bytes, at a character boundary.
///
/// An embedded NUL ends the span, as it would end a C string.
pub(crate) fn truncate_span(span: &str, capacity: usize) -> &str {
    let span = match span.find('\0') {
        Some(nul) => &span[..nul],
        None => span,
    };
    let limit = capacity.saturating_sub(1);
    if span.len() <= limit {
        return span;
    }
    let mut end = limit;
    while !span.is_char_boundary(end) {
        end -= 1;
    }
    &span[..end]
}

/// Split `span` into arguments stored in `text`, recording their ranges in `arguments`.
///
/// Both containers are cleared first. Their previous capacity is reused.
pub(crate) fn split_into_arguments(
    span: &str,
    text: &mut String,
    arguments: &mut Vec<Range<usize>>,
    max_args: usize,
) -> Result<(), ShellError> {
    let span = span.trim_start();
    if span.is_empty() {
        text.clear();
        arguments.clear();
        return Err(ShellError::NoCommands);
    }

    let mut lexer = LexingFSM::new(text, arguments, max_args);
    for ch in span.chars() {
        lexer.feed(ch)?;
    }
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(span: &str, max_args: usize) -> Result<Vec<String>, ShellError> {
        let mut text = String::with_capacity(64);
        let mut arguments = Vec::new();
        split_into_arguments(span, &mut text, &mut arguments, max_args)?;
        Ok(arguments.into_iter().map(|r| text[r].to_string()).collect())
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let args = split("  ls   -l\t -a  ", 8).unwrap();
        assert_eq!(args, vec!["ls", "-l", "-a"]);
    }

    #[test]
    fn test_quoted_span_is_one_argument() {
        let args = split(r#"echo "a  b"   c"#, 8).unwrap();
        assert_eq!(args, vec!["echo", "a  b", "c"]);
    }

    #[test]
    fn test_quotes_join_adjacent_text() {
        let args = split(r#"grep pre"fix suf"fix"#, 8).unwrap();
        assert_eq!(args, vec!["grep", "prefix suffix"]);
    }

    #[test]
    fn test_unterminated_quote_consumes_rest_of_line() {
        let args = split(r#"echo "hello   world  "#, 8).unwrap();
        assert_eq!(args, vec!["echo", "hello   world  "]);
    }

    #[test]
    fn test_empty_quotes_produce_no_argument() {
        let args = split(r#"echo "" x"#, 8).unwrap();
        assert_eq!(args, vec!["echo", "x"]);
    }

    #[test]
    fn test_blank_span_is_no_commands() {
        assert!(matches!(split("", 8), Err(ShellError::NoCommands)));
        assert!(matches!(split(" \t  ", 8), Err(ShellError::NoCommands)));
    }

    #[test]
    fn test_argument_limit() {
        assert_eq!(split("a b c", 3).unwrap().len(), 3);
        assert!(matches!(
            split("a b c d", 3),
            Err(ShellError::TooManyArguments(3))
        ));
    }

    #[test]
    fn test_arguments_are_nul_terminated() {
        let mut text = String::new();
        let mut arguments = Vec::new();
        split_into_arguments("ab cd", &mut text, &mut arguments, 8).unwrap();
        assert_eq!(text, "ab\0cd\0");
        assert_eq!(arguments, vec![0..2, 3..5]);
    }

    #[test]
    fn test_truncate_span_respects_char_boundaries() {
        assert_eq!(truncate_span("abcdef", 4), "abc");
        assert_eq!(truncate_span("abc", 4), "abc");
        // 'é' is two bytes; cutting inside it must back off.
        assert_eq!(truncate_span("aé", 3), "a");
        assert_eq!(truncate_span("ab\0cd", 10), "ab");
    }
}
