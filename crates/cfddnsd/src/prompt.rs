//! Terminal prompter used for first-run setup and backfill

use async_trait::async_trait;
use cfddns_core::config::ConfigField;
use cfddns_core::traits::Prompter;
use cfddns_core::{Error, Result};
use std::io::{self, BufRead, Write};

/// Reads answers from stdin, one line per field
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn prompt(&self, field: ConfigField) -> Result<Option<String>> {
        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let stdout = io::stdout();
            read_answer(field, &mut stdin.lock(), &mut stdout.lock())
        })
        .await
        .map_err(|e| Error::Other(format!("Prompt task failed: {}", e)))?
    }
}

/// Print the label for `field` and read one line
///
/// End of input means no answer can ever arrive.
fn read_answer(field: ConfigField, input: &mut impl BufRead, output: &mut impl Write) -> Result<Option<String>> {
    write!(output, "{}: ", field.label())?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
        return Err(Error::config_incomplete(field.key()));
    }

    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
