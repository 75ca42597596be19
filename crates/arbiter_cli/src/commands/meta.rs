//! Shell completions and man pages.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

use crate::Cli;

const BIN_NAME: &str = "arbiter";

fn write_completions<W: Write>(shell: Shell, out: &mut W) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
}

fn write_man_page<W: Write>(out: &mut W) -> std::io::Result<()> {
    clap_mangen::Man::new(Cli::command()).render(out)
}

/// Write one page per command and subcommand into `dir`.
fn write_man_tree(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)
}

pub(crate) fn handle_completions(shell: Shell) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_completions(shell, &mut lock);
    lock.flush()?;
    Ok(())
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = output {
        write_man_tree(&dir)?;
        println!("Man pages written to {}", dir.display());
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_man_page(&mut lock)?;
    lock.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zsh_completions_cover_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Zsh, &mut buf);
        let script = String::from_utf8(buf).expect("utf-8");
        assert!(script.contains(BIN_NAME));
        assert!(script.contains("reconcile"));
        assert!(script.contains("arbitrage"));
    }

    #[test]
    fn man_page_has_title_header() {
        let mut buf = Vec::new();
        write_man_page(&mut buf).expect("render");
        let page = String::from_utf8(buf).expect("utf-8").to_lowercase();
        assert!(page.contains(".th arbiter"));
    }

    #[test]
    fn man_tree_writes_a_page_per_subcommand() {
        let dir = std::env::temp_dir().join(format!("arbiter-man-{}", uuid::Uuid::new_v4()));
        write_man_tree(&dir).expect("generate");

        let pages: Vec<String> = std::fs::read_dir(&dir)
            .expect("dir exists")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(pages.iter().any(|p| p == "arbiter.1"));
        assert!(pages.iter().any(|p| p.starts_with("arbiter-sync")));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}
