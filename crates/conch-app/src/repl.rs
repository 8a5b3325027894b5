//! Line-oriented read/eval/print loop over any reader and writer.

use std::io::{self, BufRead, Write};

use conch_registry::CommandOutput;
use conch_shell::Shell;

pub const PROMPT: &str = "conch> ";

/// Read lines from `input` until EOF or an exit command, writing results
/// and errors to `out`. Command failures never end the loop.
pub fn run<R: BufRead, W: Write>(shell: &mut Shell, mut input: R, mut out: W) -> io::Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);

        match shell.execute(line) {
            Ok(CommandOutput::Exit) => break,
            Ok(output) => render(&output, &mut out)?,
            Err(e) => {
                log::debug!("Command failed: {e:?}");
                writeln!(out, "error: {e}")?;
            },
        }
    }
    Ok(())
}

/// Write one command's output.
pub fn render<W: Write>(output: &CommandOutput, out: &mut W) -> io::Result<()> {
    match output {
        CommandOutput::Text(text) => writeln!(out, "{text}"),
        CommandOutput::Table { headers, rows } => render_table(headers, rows, out),
        CommandOutput::None | CommandOutput::Exit => Ok(()),
    }
}

fn render_table<W: Write>(headers: &[String], rows: &[Vec<String>], out: &mut W) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    write_row(headers, &widths, out)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&rule, &widths, out)?;
    for row in rows {
        write_row(row, &widths, out)?;
    }
    Ok(())
}

fn write_row<W: Write>(cells: &[String], widths: &[usize], out: &mut W) -> io::Result<()> {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let width = widths.get(i).copied().unwrap_or(0);
        line.push_str(&format!("{cell:<width$}"));
    }
    writeln!(out, "{}", line.trim_end())
}
