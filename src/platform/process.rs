// Running Windows system tools (sc.exe, netsh.exe) without flashing a console
use std::io;
use std::process::{Command, Output};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Run a system tool and capture its output
pub fn run_hidden(program: &str, args: &[&str]) -> io::Result<Output> {
    let mut command = Command::new(program);
    command.args(args);

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    log::debug!("Running {} {}", program, args.join(" "));
    command.output()
}

/// Human-readable failure text from a finished command
pub fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };

    match output.status.code() {
        Some(code) if text.is_empty() => format!("exit code {}", code),
        Some(code) => format!("exit code {}: {}", code, text),
        None => format!("terminated: {}", text),
    }
}
