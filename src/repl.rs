//! Interactive read-eval-print loop.
//!
//! Reads one line at a time, runs it through the lexer, parser, and the
//! tree-walking evaluator, and prints the non-nil result. The evaluator (and
//! with it the global environment) persists across lines, so definitions
//! carry over. Errors print in a two-line block and the loop continues.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::evaluator::Evaluator;
use crate::value::Value;
use crate::{lexer, parser};

pub const PROMPT: &str = ">> ";
const EXIT: &str = "exit";

pub fn start(input: &mut dyn BufRead, output: &mut dyn Write) -> io::Result<()> {
    let mut evaluator = Evaluator::new();
    let mut line = String::new();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == EXIT {
            return Ok(());
        }

        let result = run_line(&mut evaluator, line);
        for printed in evaluator.take_output() {
            writeln!(output, "{printed}")?;
        }
        match result {
            Ok(Value::Nil) => {}
            Ok(value) => writeln!(output, "{}", value.inspect())?,
            Err(error) => print_error(output, &error)?,
        }
    }
}

fn run_line(evaluator: &mut Evaluator, line: &str) -> Result<Value> {
    let tokens = lexer::tokenize(line)?;
    let program = parser::parse_tokens(tokens)?;
    Ok(evaluator.evaluate(&program)?)
}

pub fn print_error(output: &mut dyn Write, error: &anyhow::Error) -> io::Result<()> {
    writeln!(output, "Oops! something wrong append here!")?;
    writeln!(output, "\t{error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_session(input: &str) -> String {
        let mut output = Vec::new();
        let mut reader = input.as_bytes();
        start(&mut reader, &mut output).expect("repl io should succeed");
        String::from_utf8(output).expect("repl output should be utf-8")
    }

    #[test]
    fn evaluates_lines_and_prints_non_nil_results() {
        let output = run_session("1 + 2;\nexit\n");
        assert_eq!(output, ">> 3\n>> ");
    }

    #[test]
    fn state_persists_across_lines() {
        let output = run_session("let a = 40;\na + 2;\nexit\n");
        assert_eq!(output, ">> >> 42\n>> ");
    }

    #[test]
    fn skips_empty_lines_and_stops_at_eof() {
        let output = run_session("\n\n1;\n");
        assert_eq!(output, ">> >> >> 1\n>> ");
    }

    #[test]
    fn prints_program_output_before_the_result() {
        let output = run_session("print 1; print 2; 3;\nexit\n");
        assert_eq!(output, ">> 1\n2\n3\n>> ");
    }

    #[test]
    fn reports_errors_and_keeps_going() {
        let output = run_session("missing;\n2;\nexit\n");
        assert_eq!(
            output,
            ">> Oops! something wrong append here!\n\
             \tidentifier not found: missing\n\
             >> 2\n>> "
        );
    }

    #[test]
    fn reports_parse_errors_in_the_same_format() {
        let output = run_session("let = 1;\nexit\n");
        assert!(output.starts_with(">> Oops! something wrong append here!\n"));
        assert!(output.contains("expected identifier after `let`"));
    }
}
