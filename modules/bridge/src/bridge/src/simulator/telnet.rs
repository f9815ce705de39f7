// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Command frontend for a SIMICS `telnet-frontend` session

use super::CommandFrontend;
use crate::{Error, Result};
use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpStream, ToSocketAddrs},
};
use tracing::{debug, trace};

/// Telnet "interpret as command" byte, which starts a 3-byte option negotiation
const IAC: u8 = 0xff;

/// Output read up to the next prompt, or up to the end of the stream
struct Block {
    text: String,
    prompted: bool,
}

pub struct TelnetFrontend {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    prompt: String,
}

impl TelnetFrontend {
    pub const DEFAULT_PROMPT: &'static str = "simics> ";

    /// Connect to the frontend and wait for its first prompt
    pub fn connect<A, S>(address: A, prompt: S) -> Result<Self>
    where
        A: ToSocketAddrs,
        S: Into<String>,
    {
        let stream = TcpStream::connect(address)?;
        let writer = stream.try_clone()?;

        let mut frontend = Self {
            reader: BufReader::new(stream),
            writer,
            prompt: prompt.into(),
        };

        let banner = frontend.read_until_prompt()?;

        debug!("Connected to command frontend: {}", banner.trim());

        Ok(frontend)
    }

    fn read_until_prompt(&mut self) -> Result<String> {
        match self.read_block()? {
            Block {
                text,
                prompted: true,
            } => Ok(text),
            _ => Err(Error::FrontendClosed),
        }
    }

    /// Read whole buffered chunks until the prompt shows up. Only the bytes up to the end
    /// of the prompt are consumed, anything after it stays buffered for the next read.
    fn read_block(&mut self) -> Result<Block> {
        let prompt = self.prompt.as_bytes();
        let mut block = Vec::new();

        let prompted = loop {
            let available = self.reader.fill_buf()?;
            let length = available.len();

            if length == 0 {
                break false;
            }

            // The prompt may straddle two chunks
            let start = block.len().saturating_sub(prompt.len().saturating_sub(1));
            block.extend_from_slice(available);

            if let Some(position) = find(&block[start..], prompt) {
                let end = start + position + prompt.len();
                self.reader.consume(length - (block.len() - end));
                block.truncate(start + position);
                break true;
            }

            self.reader.consume(length);
        };

        Ok(Block {
            text: String::from_utf8_lossy(&strip_negotiation(&block)).into_owned(),
            prompted,
        })
    }
}

impl CommandFrontend for TelnetFrontend {
    fn run_command(&mut self, command: &str) -> Result<String> {
        self.writer.write_all(format!("{command}\n").as_bytes())?;
        self.writer.flush()?;

        let reply = self.read_until_prompt()?;

        trace!("Reply to {command:?}: {reply:?}");

        // The frontend may echo the command line back before the output
        Ok(match reply.split_once('\n') {
            Some((first, rest)) if first.trim() == command.trim() => rest.to_string(),
            _ if reply.trim() == command.trim() => String::new(),
            _ => reply,
        })
    }

    fn next_output(&mut self) -> Result<Option<String>> {
        let Block { text, prompted } = self.read_block()?;

        if !prompted && text.is_empty() {
            return Ok(None);
        }

        trace!("Frontend output: {text:?}");

        Ok(Some(text))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    (0..=haystack.len().checked_sub(needle.len())?).find(|&i| haystack[i..].starts_with(needle))
}

fn strip_negotiation(bytes: &[u8]) -> Vec<u8> {
    let mut stripped = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter();

    while let Some(&byte) = iter.next() {
        if byte == IAC {
            iter.nth(1);
        } else if byte != b'\r' {
            stripped.push(byte);
        }
    }

    stripped
}
