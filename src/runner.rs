use std::io;
use std::process::{Command, Stdio};

use crate::command::StageCommand;

/// Terminal outcome of one external tool invocation. Never retried and
/// never merged across stages; a non-zero exit code is the sole failure
/// signal a stage emits.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: i32,
    pub output: String,
}

impl RunOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Process-execution contract the pipeline depends on: command line in,
/// exit code plus combined output out. The coordinator only ever talks to
/// external tools through this trait, which is what lets the whole
/// pipeline run against a recording fake in tests.
pub trait ToolRunner {
    /// Spawn the command and block until it terminates. With `capture`
    /// set, stdout and stderr are collected and returned and the child
    /// does not see the caller's console; otherwise the child inherits
    /// console I/O and the returned output is empty.
    fn run(&self, command: &StageCommand, capture: bool) -> io::Result<RunOutput>;
}

/// The real thing: spawns one child per call via [`std::process::Command`]
/// and waits for it to exit before returning. A child killed by a signal
/// reports the sentinel exit code -1.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &StageCommand, capture: bool) -> io::Result<RunOutput> {
        let mut child = Command::new(command.program());
        child.args(command.arg_tokens());

        if capture {
            // stdout first, then stderr; the streams are concatenated
            // rather than interleaved.
            let output = child.stdin(Stdio::null()).output()?;
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            Ok(RunOutput {
                exit_code: output.status.code().unwrap_or(-1),
                output: text,
            })
        } else {
            let status = child.status()?;
            Ok(RunOutput {
                exit_code: status.code().unwrap_or(-1),
                output: String::new(),
            })
        }
    }
}
