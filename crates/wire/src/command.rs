// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The MCS command set: parses the 3-character command code plus its
//! argument body into a closed enum the Request Handler dispatches on.

use crate::error::WireError;
use crate::mib::MibKey;

/// The `<dr|ALL>` argument shared by `PAU`/`RES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderTarget {
    All,
    One(String),
}

impl RecorderTarget {
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("ALL") {
            RecorderTarget::All
        } else {
            RecorderTarget::One(raw.trim().to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyArgs {
    pub source_host: String,
    pub source_path: String,
    pub dest_host: String,
    pub dest_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteArgs {
    pub host: String,
    pub path: String,
    pub immediate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Report(MibKey),
    Init,
    Shutdown,
    Copy(CopyArgs),
    Delete(DeleteArgs),
    Pause(RecorderTarget),
    Resume(RecorderTarget),
    Cancel(String),
}

impl Command {
    /// The 3-character wire code for this command, for logging and for
    /// stamping the reply header's own `command` field.
    pub fn code(&self) -> &'static str {
        match self {
            Command::Ping => "PNG",
            Command::Report(_) => "RPT",
            Command::Init => "INI",
            Command::Shutdown => "SHT",
            Command::Copy(_) => "SCP",
            Command::Delete(_) => "SRM",
            Command::Pause(_) => "PAU",
            Command::Resume(_) => "RES",
            Command::Cancel(_) => "SCN",
        }
    }

    /// Parse from a 3-character command code and its argument body (the
    /// header payload with any leading command token stripped).
    pub fn parse(code: &str, body: &str) -> Result<Self, WireError> {
        let body = body.trim();
        match code {
            "PNG" => Ok(Command::Ping),
            "RPT" => MibKey::parse(body).map(Command::Report),
            "INI" => Ok(Command::Init),
            "SHT" => Ok(Command::Shutdown),
            "SCP" => parse_copy(body).map(Command::Copy),
            "SRM" => parse_delete(body).map(Command::Delete),
            "PAU" => Ok(Command::Pause(RecorderTarget::parse(body))),
            "RES" => Ok(Command::Resume(RecorderTarget::parse(body))),
            "SCN" => {
                if body.is_empty() {
                    Err(WireError::MalformedArgument(body.to_string()))
                } else {
                    Ok(Command::Cancel(body.to_string()))
                }
            }
            other => Err(WireError::UnknownCommand(other.to_string())),
        }
    }
}

fn split_host_path(part: &str) -> Option<(String, String)> {
    let (host, path) = part.split_once(':')?;
    Some((host.to_string(), path.to_string()))
}

fn parse_copy(body: &str) -> Result<CopyArgs, WireError> {
    let (src, dst) = body
        .split_once("->")
        .ok_or_else(|| WireError::MalformedArgument(body.to_string()))?;
    let (source_host, source_path) =
        split_host_path(src).ok_or_else(|| WireError::MalformedArgument(body.to_string()))?;
    let (dest_host, dest_path) =
        split_host_path(dst).ok_or_else(|| WireError::MalformedArgument(body.to_string()))?;
    Ok(CopyArgs { source_host, source_path, dest_host, dest_path })
}

fn parse_delete(body: &str) -> Result<DeleteArgs, WireError> {
    let (immediate, rest) = match body.strip_prefix("-tNOW") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, body),
    };
    let (host, path) =
        split_host_path(rest).ok_or_else(|| WireError::MalformedArgument(body.to_string()))?;
    Ok(DeleteArgs { host, path, immediate })
}
