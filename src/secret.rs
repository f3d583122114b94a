// src/secret.rs

//! Secret stdin payloads.
//!
//! Credential helpers read passwords with `getpass()`-style line reads, so a
//! payload is the secret followed by a newline. A trailing NUL is kept for
//! in-process string handling and never written to the child.

use std::fmt;
use std::io::{self, Read};
use std::ptr;
use std::sync::atomic::{Ordering, compiler_fence};

use bytes::Bytes;

/// Longest secret accepted by [`PasswordPayload::read_line`].
pub const MAX_SECRET_LEN: usize = 4096;

/// Owned `secret ‖ '\n' ‖ '\0'` buffer, zeroed when dropped.
pub struct PasswordPayload {
    buf: Box<[u8]>,
}

impl PasswordPayload {
    pub fn build(secret: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(secret.len() + 2);
        buf.extend_from_slice(secret);
        buf.push(b'\n');
        buf.push(b'\0');
        Self {
            buf: buf.into_boxed_slice(),
        }
    }

    /// Read one line from `reader` and build a payload from it.
    ///
    /// The line terminator (`\n` or `\r\n`) is dropped; end of input also
    /// ends the line. Bytes are taken one at a time into a scratch buffer
    /// allocated once, which is wiped on every path. `reader` should be
    /// unbuffered, or its own buffer keeps a copy.
    pub fn read_line<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut scratch = vec![0u8; MAX_SECRET_LEN];
        let payload =
            read_line_into(&mut reader, &mut scratch).map(|len| Self::build(&scratch[..len]));
        wipe(&mut scratch);
        payload
    }

    /// The line sent to the child: secret plus newline.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buf.len() - 1]
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    /// Length of the line sent to the child.
    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    /// Always false: even an empty secret yields a newline.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Hand the payload to an invocation as its stdin.
    ///
    /// The buffer is wiped once the last clone of the returned `Bytes` is
    /// dropped.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from_owner(self)
    }
}

impl AsRef<[u8]> for PasswordPayload {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Drop for PasswordPayload {
    fn drop(&mut self) {
        wipe(&mut self.buf);
    }
}

impl fmt::Debug for PasswordPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordPayload")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

fn read_line_into<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut byte = [0u8; 1];
    let mut len = 0;
    let outcome = loop {
        match reader.read(&mut byte) {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => break Err(err),
        }
        if byte[0] == b'\n' {
            break Ok(());
        }
        let Some(slot) = buf.get_mut(len) else {
            break Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("secret longer than {MAX_SECRET_LEN} bytes"),
            ));
        };
        *slot = byte[0];
        len += 1;
    };
    wipe(&mut byte);
    outcome?;

    if len > 0 && buf[len - 1] == b'\r' {
        len -= 1;
    }
    Ok(len)
}

/// Overwrite `buf` with zeros in a way the optimizer can't elide.
pub fn wipe(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
        unsafe { ptr::write_volatile(byte, 0) };
    }
    compiler_fence(Ordering::SeqCst);
}
