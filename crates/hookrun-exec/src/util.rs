use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::error::ExecError;

/// Split a command line on runs of whitespace into the program and its arguments.
///
/// No shell syntax is interpreted: quotes, globs and redirections are passed verbatim.
pub fn split_command_line(line: &str) -> Result<(&str, Vec<&str>), ExecError> {
    let mut parts = line.split_whitespace();
    let program = parts.next().ok_or(ExecError::MissingProgram)?;
    Ok((program, parts.collect()))
}

/// Command with stdio inherited from this process.
pub(crate) fn cmd_program(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    cmd
}

#[cfg(unix)]
pub(crate) async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    if let Some(id) = child.id() {
        // SAFETY: plain kill(2) on a pid we spawned and have not reaped yet.
        unsafe {
            libc::kill(id as libc::pid_t, libc::SIGTERM);
        }
    }
    let _ = child.kill().await;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    child.kill().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_runs() {
        let (program, args) = split_command_line("  touch\t/tmp/a   /tmp/b \n").unwrap();
        assert_eq!(program, "touch");
        assert_eq!(args, vec!["/tmp/a", "/tmp/b"]);
    }

    #[test]
    fn no_arguments() {
        let (program, args) = split_command_line("pwd").unwrap();
        assert_eq!(program, "pwd");
        assert!(args.is_empty());
    }

    #[test]
    fn quotes_are_not_interpreted() {
        let (_, args) = split_command_line(r#"echo "a b""#).unwrap();
        assert_eq!(args, vec![r#""a"#, r#"b""#]);
    }

    #[test]
    fn empty_line_has_no_program() {
        assert!(matches!(split_command_line(""), Err(ExecError::MissingProgram)));
        assert!(matches!(split_command_line(" \t\n"), Err(ExecError::MissingProgram)));
    }
}
