//! Terminal abstraction
//!
//! The transport (SSH channel, Telnet socket, local stdio) implements
//! [`Terminal`]. Writes are fire-and-forget: the transport is expected to
//! queue them.

use std::sync::Mutex;

/// Terminal window dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub cols: usize,
    pub rows: usize,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Output side of a client connection.
pub trait Terminal: Send + Sync {
    /// Write bytes to the client's stdout.
    fn write(&self, data: &[u8]);

    /// Write bytes to the client's stderr. Interactive transports usually
    /// share one stream for both.
    fn error_write(&self, data: &[u8]) {
        self.write(data);
    }

    /// Current window size, used for completion listings.
    fn window_size(&self) -> WindowSize {
        WindowSize::default()
    }

    /// Close the connection.
    fn close(&self) {}
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Terminal that captures everything written, keeping stdout and stderr
/// apart. Backs command substitution and nested script contexts.
#[derive(Debug, Default)]
pub struct CaptureTerminal {
    stdout: Mutex<Vec<u8>>,
    stderr: Mutex<Vec<u8>>,
}

impl CaptureTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain captured stdout.
    pub fn take_stdout(&self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut *lock(&self.stdout))).into_owned()
    }

    /// Drain captured stderr.
    pub fn take_stderr(&self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut *lock(&self.stderr))).into_owned()
    }
}

impl Terminal for CaptureTerminal {
    fn write(&self, data: &[u8]) {
        lock(&self.stdout).extend_from_slice(data);
    }

    fn error_write(&self, data: &[u8]) {
        lock(&self.stderr).extend_from_slice(data);
    }
}

/// In-memory terminal recording the interleaved output stream a client
/// would see, plus whether the session closed it.
#[derive(Debug)]
pub struct BufferTerminal {
    output: Mutex<Vec<u8>>,
    closed: Mutex<bool>,
    size: WindowSize,
}

impl Default for BufferTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferTerminal {
    pub fn new() -> Self {
        Self::with_size(WindowSize::default())
    }

    pub fn with_size(size: WindowSize) -> Self {
        Self {
            output: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
            size,
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&lock(&self.output)).into_owned()
    }

    /// Drain everything written so far.
    pub fn take_output(&self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut *lock(&self.output))).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        *lock(&self.closed)
    }
}

impl Terminal for BufferTerminal {
    fn write(&self, data: &[u8]) {
        lock(&self.output).extend_from_slice(data);
    }

    fn window_size(&self) -> WindowSize {
        self.size
    }

    fn close(&self) {
        *lock(&self.closed) = true;
    }
}
