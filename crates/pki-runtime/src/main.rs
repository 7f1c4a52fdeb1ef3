//! `pki-runtime <request.der|-> [response.der]`
//!
//! Reads one DER-encoded CMP request (stdin when the path is `-`), answers it
//! with the configured profile, and writes the DER response to the given
//! path or to stdout.

use std::fs;
use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use tracing::info;

use pki_runtime::{init_logging, CmpRuntime, RuntimeConfig};

const USAGE: &str = "usage: pki-runtime <request.der|-> [response.der]";

fn read_request(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut request = Vec::new();
        io::stdin()
            .read_to_end(&mut request)
            .context("reading request from stdin")?;
        return Ok(request);
    }
    fs::read(path).with_context(|| format!("reading request from {path}"))
}

fn write_response(path: Option<&str>, response: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, response).with_context(|| format!("writing response to {path}")),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(response).context("writing response to stdout")?;
            stdout.flush().context("flushing stdout")
        }
    }
}

fn main() -> Result<()> {
    // Load configuration
    let config = RuntimeConfig::from_env().context("loading configuration")?;
    config
        .validate_for_production()
        .context("validating configuration")?;

    init_logging(&config.log_level)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, output) = match args.as_slice() {
        [input] => (input.as_str(), None),
        [input, output] => (input.as_str(), Some(output.as_str())),
        _ => bail!(USAGE),
    };

    let request = read_request(input)?;
    let runtime = CmpRuntime::new(&config).context("starting CMP runtime")?;

    let response = runtime
        .process(&request)
        .context("processing CMP request")?;
    write_response(output, &response)?;

    info!(request_bytes = request.len(), response_bytes = response.len(), "Request answered");
    Ok(())
}
