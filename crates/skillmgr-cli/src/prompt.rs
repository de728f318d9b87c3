use std::io::{BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use skillmgr_installer::ResponderEndpoint;
use tracing::debug;

use crate::render::{render_prompt, OutputStyle};

/// Answers installer prompts from stdin on a background thread. When stdin
/// closes the endpoint is dropped and later prompts time out.
pub(crate) fn spawn_stdin_prompter(endpoint: ResponderEndpoint, style: OutputStyle) -> Result<()> {
    thread::Builder::new()
        .name("skillmgr-prompt".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            answer_prompts(endpoint, stdin.lock(), std::io::stderr(), style);
        })
        .context("failed starting prompt thread")?;
    Ok(())
}

pub(crate) fn answer_prompts<R: BufRead, W: Write>(
    endpoint: ResponderEndpoint,
    mut input: R,
    mut output: W,
    style: OutputStyle,
) {
    for prompt in endpoint.prompts.iter() {
        let _ = write!(output, "{} ", render_prompt(style, &prompt));
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                debug!("prompt input closed");
                return;
            }
            Ok(_) => {}
        }
        if endpoint.replies.send(line.trim().to_string()).is_err() {
            return;
        }
    }
}
