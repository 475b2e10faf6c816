//! Command-line parsing. Both `-flag` and `--flag` spellings are accepted so
//! existing service definitions keep working.

use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Run { config_path: PathBuf },
    Version,
    Help,
}

pub fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--config PATH] [--version]\n\
         \x20 --config PATH   Path to config file (default {DEFAULT_CONFIG_PATH})\n\
         \x20 --version       Print version and exit"
    )
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliAction, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "nodemetrics_agent".into());
    let mut config_path: Option<String> = None;
    let mut version = false;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "-help" | "--help" => return Ok(CliAction::Help),
            "-version" | "--version" => version = true,
            "-config" | "--config" => match it.next() {
                Some(v) if !v.is_empty() => config_path = Some(v),
                _ => return Err(format!("flag needs an argument: {arg}\n{}", usage(&prog))),
            },
            _ if arg.starts_with("-config=") || arg.starts_with("--config=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if v.is_empty() {
                        return Err(format!("flag needs an argument: {arg}\n{}", usage(&prog)));
                    }
                    config_path = Some(v.to_string());
                }
            }
            _ => return Err(format!("unexpected argument: {arg}\n{}", usage(&prog))),
        }
    }

    if version {
        return Ok(CliAction::Version);
    }
    Ok(CliAction::Run {
        config_path: PathBuf::from(config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.into())),
    })
}
