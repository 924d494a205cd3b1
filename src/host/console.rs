//! Console host: results on stdout, diagnostics and prompts on stderr.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use log::info;

use super::Host;
use crate::error::Error;
use crate::request::{PromptChoice, Record};

pub struct ConsoleHost {
    json: bool,
}

impl ConsoleHost {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn format_record(&self, record: &Record) -> String {
        if self.json {
            return serde_json::to_string(record).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e));
        }
        match record {
            Record::Package(p) => format!(
                "{} {} {} {}",
                p.name,
                p.version,
                p.source.as_deref().unwrap_or("-"),
                p.provider
            ),
            Record::Source(s) => format!(
                "{} {} {} {}",
                s.name,
                s.location,
                if s.trusted { "trusted" } else { "untrusted" },
                s.provider
            ),
        }
    }
}

/// Core, testable implementation that reads from any BufRead and writes to any Write.
pub(crate) fn prompt_with_io<R: BufRead, W: Write>(
    message: &str,
    input: &mut R,
    output: &mut W,
) -> Result<PromptChoice> {
    writeln!(output, "{}", message)?;
    write!(
        output,
        "[Y] Yes  [A] Yes to All  [N] No  [L] No to All (default is \"N\"): "
    )?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let choice = match line.trim().to_lowercase().as_str() {
        "y" | "yes" => PromptChoice::Yes,
        "a" | "yes to all" => PromptChoice::YesToAll,
        "l" | "no to all" => PromptChoice::NoToAll,
        _ => PromptChoice::No,
    };
    Ok(choice)
}

impl Host for ConsoleHost {
    fn write_record(&self, record: &Record) {
        println!("{}", self.format_record(record));
    }

    fn report_error(&self, error: &Error) {
        eprintln!("error: {}", error);
    }

    fn warning(&self, message: &str) {
        eprintln!("warning: {}", message);
    }

    fn verbose(&self, message: &str) {
        info!("{}", message);
    }

    fn prompt_untrusted_source(&self, provider: &str, source: &str) -> Result<PromptChoice> {
        let message = format!(
            "You are installing from an untrusted source '{}' (provider {}). Are you sure?",
            source, provider
        );
        let stdin = io::stdin();
        let mut stderr = io::stderr();
        let mut stdin_lock = stdin.lock();
        prompt_with_io(&message, &mut stdin_lock, &mut stderr)
    }
}
