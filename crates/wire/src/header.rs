// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed 38-byte MCS request/reply header.

use std::time::SystemTime;

use crate::error::WireError;
use crate::time::mjd_mpm;

pub const HEADER_LEN: usize = 38;

/// The 38-byte header shared by every request and reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub destination: String,
    pub sender: String,
    pub command: String,
    pub reference: u32,
    pub data_len: u32,
    pub mjd: u32,
    pub mpm: u32,
}

impl Header {
    /// Build a header for `now`, stamping the current MJD/MPM.
    pub fn new(
        destination: impl Into<String>,
        sender: impl Into<String>,
        command: impl Into<String>,
        reference: u32,
        data_len: u32,
        now: SystemTime,
    ) -> Self {
        let (mjd, mpm) = mjd_mpm(now);
        Self {
            destination: destination.into(),
            sender: sender.into(),
            command: command.into(),
            reference,
            data_len,
            mjd,
            mpm,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{:3}{:3}{:3}{:9}{:4}{:6}{:9} ",
            self.destination, self.sender, self.command, self.reference, self.data_len, self.mjd, self.mpm,
        )
    }

    pub fn decode(bytes: &str) -> Result<Self, WireError> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::HeaderTooShort(bytes.len()));
        }
        let destination = bytes[0..3].trim().to_string();
        let sender = bytes[3..6].trim().to_string();
        let command = bytes[6..9].trim().to_string();
        let reference = parse_field(&bytes[9..18], "reference")?;
        let data_len = parse_field(&bytes[18..22], "data_len")?;
        let mjd = parse_field(&bytes[22..28], "mjd")?;
        let mpm = parse_field(&bytes[28..37], "mpm")?;

        Ok(Self {
            destination,
            sender,
            command,
            reference,
            data_len,
            mjd,
            mpm,
        })
    }
}

fn parse_field(s: &str, field: &'static str) -> Result<u32, WireError> {
    s.trim()
        .parse()
        .map_err(|_| WireError::MalformedField { field, value: s.to_string() })
}
