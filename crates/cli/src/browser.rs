// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opening the login page and asking whether to.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::BrowserArgs;

/// Decide whether to open the browser: flags first, otherwise ask on
/// `input`. Blank, `y` and `yes` mean yes; end of input means no.
pub fn resolve_open_choice<R, W>(args: &BrowserArgs, input: &mut R, output: &mut W) -> anyhow::Result<bool>
where
    R: BufRead,
    W: Write,
{
    if args.yes && args.no {
        anyhow::bail!("cannot use both -y/--yes and -n/--no");
    }
    if args.yes || args.no {
        return Ok(args.yes);
    }

    loop {
        write!(output, "Open login page in your browser now? (Y/n): ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please answer Y or n.")?,
        }
    }
}

/// Hand `url` to the platform's URL opener without waiting for it.
pub fn open(url: &str) -> std::io::Result<()> {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("rundll32", &["url.dll,FileProtocolHandler"])
    } else {
        ("xdg-open", &[])
    };
    debug!(program, "opening browser");
    Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
