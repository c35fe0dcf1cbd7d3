//! External program invocation (`gh`, `openapi-changes`, `open`).

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `program` and return its captured stdout.
///
/// # Errors
///
/// Returns [`Error::CommandSpawn`] if the program cannot be started and
/// [`Error::Command`] (with the trimmed stderr) if it exits unsuccessfully.
pub(crate) fn capture(program: &str, args: &[&str]) -> Result<String> {
    debug!(command = %command_line(program, args), "running");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::CommandSpawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::Command {
            command: command_line(program, args),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run `program` with stdout/stderr forwarded to the terminal.
///
/// # Errors
///
/// Same as [`capture`], with an empty `stderr` in [`Error::Command`].
pub(crate) fn forward(program: &str, args: &[&str]) -> Result<()> {
    debug!(command = %command_line(program, args), "running");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| Error::CommandSpawn {
            program: program.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(Error::Command {
            command: command_line(program, args),
            status: status.to_string(),
            stderr: String::new(),
        });
    }
    Ok(())
}
