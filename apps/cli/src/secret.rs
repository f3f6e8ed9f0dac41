use anyhow::{Context, Result, bail};
use std::env;
use std::io::BufRead;
use zeroize::Zeroizing;

/// Reads passwords from environment variables, falling back to successive input lines.
#[derive(Debug)]
pub(crate) struct SecretReader<R> {
    input: R,
}

impl<R: BufRead> SecretReader<R> {
    pub(crate) const fn new(input: R) -> Self {
        Self { input }
    }

    /// Returns the value of `var` when set and non-empty, otherwise the next input line
    /// without its line terminator.
    pub(crate) fn read(&mut self, var: &str, label: &str) -> Result<Zeroizing<String>> {
        if let Some(value) = env::var_os(var) {
            let value = Zeroizing::new(
                value.into_string().map_err(|_| anyhow::anyhow!("{var} is not valid UTF-8"))?,
            );
            if !value.is_empty() {
                return Ok(value);
            }
        }

        let mut line = Zeroizing::new(String::new());
        self.input.read_line(&mut line).with_context(|| format!("Failed to read {label}"))?;

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);

        if line.is_empty() {
            bail!("No {label} given: set {var} or pass it on stdin");
        }
        Ok(line)
    }
}
