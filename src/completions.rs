use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap_complete::{generate, Shell};

use crate::service::ServiceError;

const BIN_NAME: &str = "notely";

pub fn generate_completions(shell: Shell, buf: &mut dyn Write) {
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, BIN_NAME, buf);
}

fn parse_shell(raw: &str) -> Option<Shell> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bash" => Some(Shell::Bash),
        "zsh" => Some(Shell::Zsh),
        "fish" => Some(Shell::Fish),
        "elvish" => Some(Shell::Elvish),
        "powershell" | "pwsh" => Some(Shell::PowerShell),
        _ => None,
    }
}

/// Shell named by the basename of `shell_path` (the usual `$SHELL` value).
fn shell_from_path(shell_path: &str) -> Option<Shell> {
    parse_shell(shell_path.rsplit('/').next()?)
}

fn install_path(shell: Shell, home: &Path) -> Option<PathBuf> {
    let path = match shell {
        Shell::Bash => home
            .join(".local/share/bash-completion/completions")
            .join(BIN_NAME),
        Shell::Zsh => home
            .join(".notely/completions")
            .join(format!("_{BIN_NAME}")),
        Shell::Fish => home
            .join(".config/fish/completions")
            .join(format!("{BIN_NAME}.fish")),
        _ => return None,
    };
    Some(path)
}

fn install_into(shell: Shell, home: &Path) -> io::Result<PathBuf> {
    let path = install_path(shell, home).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no install path for {shell}"),
        )
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut buf = Vec::new();
    generate_completions(shell, &mut buf);
    std::fs::write(&path, buf)?;

    if shell == Shell::Zsh {
        source_from_zshrc(home, &path)?;
    }
    Ok(path)
}

/// Appends a `source` line for `script` to `~/.zshrc` unless already there.
fn source_from_zshrc(home: &Path, script: &Path) -> io::Result<()> {
    let zshrc = home.join(".zshrc");
    let source_line = format!("source \"{}\"", script.display());
    let existing = match std::fs::read_to_string(&zshrc) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err),
    };
    if existing.lines().any(|line| line.trim() == source_line) {
        return Ok(());
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&zshrc)?;
    writeln!(file)?;
    writeln!(file, "# {BIN_NAME} shell completions")?;
    writeln!(file, "{source_line}")?;
    Ok(())
}

pub fn run_completions_command(shell_arg: Option<&str>, install: bool) -> Result<(), ServiceError> {
    let shell = match shell_arg {
        Some(name) => parse_shell(name)
            .ok_or_else(|| ServiceError::InvalidArgument(format!("unknown shell '{name}'")))?,
        None => std::env::var("SHELL")
            .ok()
            .as_deref()
            .and_then(shell_from_path)
            .ok_or_else(|| {
                ServiceError::InvalidArgument(
                    "unable to detect shell from $SHELL; pass a shell name".to_string(),
                )
            })?,
    };

    if install {
        let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
            ServiceError::InvalidArgument("HOME is not set; cannot install completions".to_string())
        })?;
        let path = install_into(shell, &home)?;
        println!("completions installed to {}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        generate_completions(shell, &mut stdout);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{generate_completions, install_into, install_path, parse_shell, shell_from_path};
    use clap_complete::Shell;
    use std::path::Path;

    #[test]
    fn shells_parse_by_name_or_path() {
        assert_eq!(parse_shell(" ZSH "), Some(Shell::Zsh));
        assert_eq!(parse_shell("pwsh"), Some(Shell::PowerShell));
        assert_eq!(parse_shell("tcsh"), None);
        assert_eq!(shell_from_path("/usr/local/bin/fish"), Some(Shell::Fish));
        assert_eq!(shell_from_path("/bin/csh"), None);
    }

    #[test]
    fn bash_script_mentions_subcommands() {
        let mut buf = Vec::new();
        generate_completions(Shell::Bash, &mut buf);
        let text = String::from_utf8(buf).expect("completions should be utf-8");
        assert!(text.contains("notely"));
        assert!(text.contains("backlinks"));
    }

    #[test]
    fn only_common_shells_have_install_paths() {
        let home = Path::new("/home/someone");
        assert!(install_path(Shell::Bash, home).is_some());
        assert!(install_path(Shell::Fish, home).is_some());
        assert!(install_path(Shell::Elvish, home).is_none());
    }

    #[test]
    fn zsh_install_sources_script_once() {
        let home = std::env::temp_dir().join(format!("notely-comp-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&home).expect("temp home should be creatable");

        let script = install_into(Shell::Zsh, &home).expect("zsh install should succeed");
        assert!(script.exists());
        install_into(Shell::Zsh, &home).expect("second install should succeed");

        let zshrc = std::fs::read_to_string(home.join(".zshrc")).expect(".zshrc should exist");
        assert_eq!(zshrc.matches("source ").count(), 1);
        assert!(install_into(Shell::PowerShell, &home).is_err());

        let _ = std::fs::remove_dir_all(home);
    }
}
