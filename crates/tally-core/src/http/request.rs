//! Request-line tokenizer and route table
//!
//! Parsing and routing are separate steps: the raw receive buffer is cut into
//! a borrowed [`RequestLine`], which is then classified into a [`Route`].
//! Nothing here allocates or copies out of the receive buffer.

use crate::tally::Vote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method<'a> {
    Get,
    Post,
    Other(&'a str),
}

impl<'a> From<&'a str> for Method<'a> {
    fn from(token: &'a str) -> Self {
        match token {
            "GET" => Self::Get,
            "POST" => Self::Post,
            other => Self::Other(other),
        }
    }
}

/// First line of a request, borrowed from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: Method<'a>,
    pub path: &'a str,
    pub version: Option<&'a str>,
    /// The untouched line, kept for logging unknown requests.
    pub raw: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Split `METHOD SP PATH [SP VERSION]`.
    ///
    /// Returns `None` when the line has no path token.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split(' ').filter(|t| !t.is_empty());
        let method = Method::from(tokens.next()?);
        let path = tokens.next()?;
        let version = tokens.next();
        Some(Self {
            method,
            path,
            version,
            raw: line,
        })
    }
}

/// Offset where the first line starts, past any leading `\n`.
fn line_start(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b != b'\n')
}

/// Whether `buf` already holds a `\n`-terminated first line.
pub fn has_complete_line(buf: &[u8]) -> bool {
    line_start(buf).is_some_and(|start| buf[start..].contains(&b'\n'))
}

/// Cut the first line out of a receive buffer.
///
/// Leading `\n` bytes are skipped and the line runs to the next `\n` or to
/// the end of the buffer; a trailing `\r` is dropped. Buffers holding only
/// line breaks, or whose first line is not UTF-8, yield `None`.
pub fn first_line(buf: &[u8]) -> Option<&str> {
    let rest = &buf[line_start(buf)?..];
    let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
    let line = &rest[..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    core::str::from_utf8(line).ok()
}

/// Everything the server knows how to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Scoreboard,
    Page,
    Vote(Vote),
    Favicon,
    Unknown,
}

impl Route {
    pub fn classify(line: &RequestLine<'_>) -> Self {
        match (line.method, line.path) {
            (Method::Get, "/") => Self::Scoreboard,
            (Method::Get, "/bear") => Self::Page,
            (Method::Post, "/red") => Self::Vote(Vote::Red),
            (Method::Post, "/blue") => Self::Vote(Vote::Blue),
            (Method::Get, "/favicon.ico") => Self::Favicon,
            _ => Self::Unknown,
        }
    }
}
