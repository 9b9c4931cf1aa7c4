//! Interactive keys from the terminal.
//!
//! The terminal stays in line mode: a key counts once Enter is pressed.
//! Standard input is polled with a zero timeout so the scanning loop never
//! waits on the user.

use facescan_core::KeyInput;
use std::io::BufRead;

pub struct StdinKeys {
    closed: bool,
}

impl StdinKeys {
    pub fn new() -> Self {
        Self { closed: false }
    }

    fn input_ready() -> bool {
        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `fds` is a valid pollfd for the duration of the call and
        // nfds matches the single entry passed.
        let ret = unsafe { libc::poll(&mut fds, 1, 0) };
        ret > 0 && fds.revents & (libc::POLLIN | libc::POLLHUP) != 0
    }
}

impl Default for StdinKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyInput for StdinKeys {
    fn poll_key(&mut self) -> Option<char> {
        if self.closed || !Self::input_ready() {
            return None;
        }

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => {
                // EOF: keep scanning, stop polling.
                tracing::debug!("stdin closed; interactive keys disabled");
                self.closed = true;
                None
            }
            Ok(_) => parse_key(&line),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read key from stdin");
                None
            }
        }
    }
}

/// First non-blank character of a line, lowercased.
fn parse_key(line: &str) -> Option<char> {
    line.trim().chars().next().map(|c| c.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("q\n"), Some('q'));
        assert_eq!(parse_key("  S \n"), Some('s'));
        assert_eq!(parse_key("quit\n"), Some('q'));
        assert_eq!(parse_key("\n"), None);
        assert_eq!(parse_key(""), None);
    }
}
