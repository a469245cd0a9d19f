//! Command-line parsing
//!
//! ```text
//! twitter-client [--config PATH] get|post ENDPOINT [key=value ...]
//! twitter-client [--config PATH] stream ENDPOINT [key=value ...]
//! twitter-client [--config PATH] invalidate
//! ```

use anyhow::{Context, Result, bail};
use twitter_service::{Method, Params};

pub const USAGE: &str = "usage: twitter-client [--config PATH] <get|post> ENDPOINT [key=value ...]\n\
       twitter-client [--config PATH] stream ENDPOINT [key=value ...]\n\
       twitter-client [--config PATH] invalidate";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Rest {
        method: Method,
        endpoint: String,
        params: Params,
    },
    Stream {
        endpoint: String,
        params: Params,
    },
    Invalidate,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: Option<String>,
    pub command: Command,
}

/// Parse arguments, excluding the program name.
pub fn parse(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config requires a path")?;
            config_path = Some(path.clone());
        } else {
            rest.push(arg.as_str());
        }
    }

    let Some((&name, tail)) = rest.split_first() else {
        bail!("missing command\n{USAGE}");
    };

    let command = match name {
        "invalidate" => {
            if !tail.is_empty() {
                bail!("invalidate takes no arguments\n{USAGE}");
            }
            Command::Invalidate
        }
        "stream" => {
            let (endpoint, params) = endpoint_and_params(tail)?;
            Command::Stream { endpoint, params }
        }
        other => {
            let method: Method = other
                .parse()
                .with_context(|| format!("unknown command {other:?}\n{USAGE}"))?;
            let (endpoint, params) = endpoint_and_params(tail)?;
            Command::Rest {
                method,
                endpoint,
                params,
            }
        }
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

fn endpoint_and_params(args: &[&str]) -> Result<(String, Params)> {
    let Some((endpoint, pairs)) = args.split_first() else {
        bail!("missing endpoint\n{USAGE}");
    };
    Ok((endpoint.to_string(), parse_params(pairs)?))
}

/// `key=value` pairs into request params. Later duplicates win.
pub fn parse_params(pairs: &[&str]) -> Result<Params> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => bail!("expected key=value, got {pair:?}"),
        })
        .collect()
}
