//! Command-line tokenizer: single quotes, double quotes, backslash escapes.

use conch_types::error::{Result, ShellError};

/// Scanner state after consuming some input.
struct Scan {
    /// Finished tokens.
    tokens: Vec<String>,
    /// The token being built when input ran out.
    current: String,
    /// Byte offset where `current` began, if a token is in progress.
    current_start: Option<usize>,
    open_quote: Option<char>,
}

fn scan(input: &str) -> Scan {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_start = None;
    let mut chars = input.char_indices().peekable();
    let mut open_quote = None;

    while let Some((at, ch)) = chars.next() {
        if current_start.is_none() && (open_quote.is_some() || !ch.is_whitespace()) {
            current_start = Some(at);
        }
        match open_quote {
            Some('\'') => {
                if ch == '\'' {
                    open_quote = None;
                } else {
                    current.push(ch);
                }
            },
            Some(_) => {
                if ch == '"' {
                    open_quote = None;
                } else if ch == '\\'
                    && let Some(&(_, next)) = chars.peek()
                    && matches!(next, '"' | '\\')
                {
                    current.push(next);
                    chars.next();
                } else {
                    current.push(ch);
                }
            },
            None => match ch {
                '\'' | '"' => open_quote = Some(ch),
                '\\' => {
                    if let Some((_, next)) = chars.next() {
                        current.push(next);
                    }
                },
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    current_start = None;
                },
                _ => current.push(ch),
            },
        }
    }

    Scan {
        tokens,
        current,
        current_start,
        open_quote,
    }
}

/// Split a command line into tokens.
///
/// Single-quoted text is literal. Inside double quotes a backslash escapes
/// `"` and `\`. Outside quotes a backslash escapes any character.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let Scan {
        mut tokens,
        current,
        open_quote,
        ..
    } = scan(input);
    match open_quote {
        Some('\'') => return Err(ShellError::Command("unterminated single quote".to_string())),
        Some(_) => return Err(ShellError::Command("unterminated double quote".to_string())),
        None => {},
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// A partially typed line, split for completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialLine {
    /// Finished words.
    pub words: Vec<String>,
    /// The word under the cursor, unquoted.
    pub current: String,
    /// Byte offset in the input where the current word starts, including
    /// any opening quote. Equals the input length when the line ends in
    /// whitespace.
    pub start: usize,
}

/// Split a partially typed line. Unterminated quotes are tolerated.
pub fn partial_line(input: &str) -> PartialLine {
    let scan = scan(input);
    PartialLine {
        words: scan.tokens,
        current: scan.current,
        start: scan.current_start.unwrap_or(input.len()),
    }
}

/// Split a partially typed line into finished words and the word under the
/// cursor. The current word is empty when the line ends in whitespace.
pub fn partial_words(input: &str) -> (Vec<String>, String) {
    let line = partial_line(input);
    (line.words, line.current)
}
