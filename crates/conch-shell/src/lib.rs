//! Interactive front end for the conch module lifecycle.
//!
//! `Shell::execute` takes one line of input, resolves it against the command
//! table and loads the owning module on first use. `Shell::complete` maps a
//! partial line and cursor to ranked suggestions. Terminal I/O and line
//! editing stay with the caller.

pub mod completion;
pub mod shell;
pub mod tokenize;

#[cfg(test)]
mod testing;

pub use completion::{Completer, Completion, CompletionCache, Suggestion};
pub use shell::{BUILTINS, Shell};
pub use tokenize::{PartialLine, partial_line, partial_words, tokenize};
