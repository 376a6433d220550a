//! Console prompts for the operator

use std::io::{BufRead, Write};

use anyhow::{bail, Result};

/// Prints `question` and returns the next line, trimmed.
pub fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<String> {
    write!(out, "{}", question)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed while waiting for an answer");
    }
    Ok(line.trim().to_string())
}

/// Keeps asking until the answer is a positive integer.
pub fn ask_positive<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
) -> Result<usize> {
    loop {
        match ask(input, out, question)?.parse::<usize>() {
            Ok(n) if n > 0 => return Ok(n),
            _ => writeln!(out, "Please enter a positive integer.")?,
        }
    }
}

/// Blocks until the operator presses Enter.
pub fn wait_for_enter<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<()> {
    ask(input, out, message).map(|_| ())
}
