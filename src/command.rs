use std::fmt;
use std::path::{Path, PathBuf};

/// An external command as a structured token list: one program path plus
/// ordered arguments. Tokens are handed to the OS individually and never
/// pass through a shell, so no quoting or escaping rules apply to the
/// values themselves. The `Display` rendering exists for logs only.
#[derive(Debug, Clone)]
pub struct StageCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl StageCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arg_tokens(&self) -> &[String] {
        &self.args
    }

    /// Every token of the command line, program first. Used by tests and
    /// for log rendering.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.args.len() + 1);
        tokens.push(self.program.to_string_lossy().into_owned());
        tokens.extend(self.args.iter().cloned());
        tokens
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_token(f, &self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " ")?;
            write_token(f, arg)?;
        }
        Ok(())
    }
}

fn write_token(f: &mut fmt::Formatter<'_>, token: &str) -> fmt::Result {
    if token.is_empty() || token.contains(char::is_whitespace) {
        write!(f, "\"{token}\"")
    } else {
        write!(f, "{token}")
    }
}
