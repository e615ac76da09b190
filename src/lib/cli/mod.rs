use crate::constants::ANALYSIS_AGENT;
use clap::{Parser, ValueEnum};
use std::error::Error;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::net::SocketAddr;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "sf-agent",
    version,
    about = "Runs MCP tool-calling agents behind a REST API or once from the command line"
)]
pub struct Cli {
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long, short, value_enum, default_value_t = RunMode::Rest)]
    pub mode: RunMode,
    /// Overrides `[rest_server].bind`
    #[arg(long)]
    pub rest_addr: Option<SocketAddr>,
    /// Agent profile for `--mode cli`
    #[arg(long, default_value = ANALYSIS_AGENT)]
    pub agent: String,
    #[arg(long, default_value = "cli")]
    pub user_id: String,
    #[arg(long, default_value = "")]
    pub ticket_id: String,
    #[arg(long)]
    pub prompt_file: Option<String>,
    pub prompt: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum RunMode {
    /// REST API server
    Rest,
    /// Run one query and print the summary
    Cli,
}

/// Query for `--mode cli`, from `--prompt-file`, positional words or piped stdin.
pub fn load_prompt(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.prompt_file {
        info!(path = %path, "Loading prompt from file");
        return Ok(fs::read_to_string(path)?.trim().to_string());
    }

    if !cli.prompt.is_empty() {
        return Ok(cli.prompt.join(" ").trim().to_string());
    }

    if !io::stdin().is_terminal() {
        info!("Reading prompt from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer.trim().to_string());
    }

    warn!("Prompt not provided via arguments, file, or stdin");
    Err("prompt required via arguments, file, or stdin".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_to_rest_mode() {
        let cli = Cli::parse_from(["sf-agent"]);
        assert_eq!(cli.mode, RunMode::Rest);
        assert_eq!(cli.agent, "analysis");
        assert!(cli.rest_addr.is_none());
    }

    #[test]
    fn joins_positional_prompt_words() {
        let cli = Cli::parse_from([
            "sf-agent",
            "--mode",
            "cli",
            "--user-id",
            "005A",
            "list",
            "apex",
            "classes",
        ]);
        assert_eq!(cli.user_id, "005A");
        assert_eq!(load_prompt(&cli).expect("prompt"), "list apex classes");
    }

    #[test]
    fn prompt_file_takes_precedence() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("query.txt");
        fs::write(&path, "  from file\n").expect("write prompt");

        let cli = Cli::parse_from([
            "sf-agent",
            "--prompt-file",
            path.to_str().expect("utf-8 path"),
            "ignored",
        ]);
        assert_eq!(load_prompt(&cli).expect("prompt"), "from file");
    }
}
