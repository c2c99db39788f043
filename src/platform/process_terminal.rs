//! The process's own terminal as a resettable sink, plus terminal geometry and resize signals.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use libc::{self, c_int};
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, warn};

use crate::core::sink::{Resettable, Sink};
use crate::core::terminal::CLEAR_ALL;

fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }
        return Err(io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> io::Result<usize>,
    FWait: FnMut(c_int) -> io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(count) => {
                if count > bytes.len() - written {
                    return Err(io::Error::other("write returned more bytes than requested"));
                }
                written += count;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn write_fd(fd: c_int, data: &str) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    write_all_fd_with(
        fd,
        data.as_bytes(),
        |fd, buf| {
            let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
            if result < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(result as usize)
            }
        },
        wait_writable,
    )
}

fn read_winsize(fd: c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

/// Standard output as a [`Sink`]. Resetting clears the screen and scrollback.
pub struct ProcessTerminal {
    stdout_fd: c_int,
    write_log_path: Option<PathBuf>,
    write_log_failed: bool,
}

impl ProcessTerminal {
    pub fn new() -> Self {
        Self::with_fd(libc::STDOUT_FILENO)
    }

    fn with_fd(stdout_fd: c_int) -> Self {
        Self {
            stdout_fd,
            write_log_path: None,
            write_log_failed: false,
        }
    }

    /// Also appends every byte written to the terminal to `path`.
    pub fn with_write_log(mut self, path: Option<PathBuf>) -> Self {
        self.write_log_path = path;
        self.write_log_failed = false;
        self
    }

    pub fn is_tty(&self) -> bool {
        unsafe { libc::isatty(self.stdout_fd) == 1 }
    }

    /// Terminal width in cells, if the output is a terminal that reports one.
    pub fn columns(&self) -> Option<usize> {
        read_winsize(self.stdout_fd).map(|(cols, _)| usize::from(cols))
    }

    fn log_write(&mut self, data: &str) {
        if self.write_log_failed {
            return;
        }
        let Some(path) = self.write_log_path.as_ref() else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(data.as_bytes()));
        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "write log disabled");
            self.write_log_failed = true;
        }
    }
}

impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ProcessTerminal {
    fn write(&mut self, data: &str) -> io::Result<()> {
        write_fd(self.stdout_fd, data)?;
        self.log_write(data);
        Ok(())
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }
}

impl Resettable for ProcessTerminal {
    fn reset(&mut self) -> io::Result<()> {
        Sink::write(self, CLEAR_ALL)
    }
}

/// Watches `SIGWINCH` on a background thread and latches a flag the caller polls.
pub struct ResizeWatcher {
    resized: Arc<AtomicBool>,
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl ResizeWatcher {
    pub fn start() -> io::Result<Self> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();
        let resized = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&resized);

        let thread = thread::spawn(move || {
            for _ in signals.forever() {
                flag.store(true, Ordering::SeqCst);
            }
        });
        debug!("resize watcher started");

        Ok(Self {
            resized,
            handle,
            thread: Some(thread),
        })
    }

    /// Whether a resize arrived since the last call.
    pub fn take_resized(&self) -> bool {
        self.resized.swap(false, Ordering::SeqCst)
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::{Duration, Instant};

    use libc::c_int;

    use super::{write_all_fd_with, ProcessTerminal, ResizeWatcher};
    use crate::core::sink::Sink;
    use crate::core::terminal::CLEAR_ALL;

    fn pipe() -> (c_int, c_int) {
        let mut fds = [0 as c_int; 2];
        let result = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(result, 0, "pipe failed");
        (fds[0], fds[1])
    }

    fn read_all(fd: c_int) -> String {
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let count = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
            if count <= 0 {
                break;
            }
            out.extend_from_slice(&buf[..count as usize]);
        }
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn writes_and_resets_reach_the_fd_and_the_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("write.log");
        let (read_fd, write_fd) = pipe();

        let mut terminal =
            ProcessTerminal::with_fd(write_fd).with_write_log(Some(log_path.clone()));
        terminal.write("hello").expect("write");
        let resettable = terminal.as_resettable().expect("resettable");
        resettable.reset().expect("reset");
        unsafe { libc::close(write_fd) };

        let expected = format!("hello{CLEAR_ALL}");
        assert_eq!(read_all(read_fd), expected);
        assert_eq!(std::fs::read_to_string(&log_path).expect("log"), expected);
        unsafe { libc::close(read_fd) };
    }

    #[test]
    fn unwritable_log_is_disabled_without_failing_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (read_fd, write_fd) = pipe();
        let mut terminal = ProcessTerminal::with_fd(write_fd)
            .with_write_log(Some(dir.path().join("missing").join("write.log")));
        terminal.write("a").expect("write");
        terminal.write("b").expect("write");
        assert!(terminal.write_log_failed);
        unsafe { libc::close(write_fd) };
        assert_eq!(read_all(read_fd), "ab");
        unsafe { libc::close(read_fd) };
    }

    #[test]
    fn pipes_are_not_ttys() {
        let (read_fd, write_fd) = pipe();
        let terminal = ProcessTerminal::with_fd(write_fd);
        assert!(!terminal.is_tty());
        assert_eq!(terminal.columns(), None);
        unsafe {
            libc::close(write_fd);
            libc::close(read_fd);
        }
    }

    #[test]
    fn write_all_retries_interrupts_and_waits_on_would_block() {
        let mut calls = 0;
        let mut waits = 0;
        let mut written = Vec::new();
        write_all_fd_with(
            3,
            b"abcdef",
            |_, buf| {
                calls += 1;
                match calls {
                    1 => Err(io::Error::from(io::ErrorKind::Interrupted)),
                    2 => Err(io::Error::from(io::ErrorKind::WouldBlock)),
                    _ => {
                        let take = buf.len().min(4);
                        written.extend_from_slice(&buf[..take]);
                        Ok(take)
                    }
                }
            },
            |_| {
                waits += 1;
                Ok(())
            },
        )
        .expect("write");
        assert_eq!(written, b"abcdef");
        assert_eq!(waits, 1);
    }

    #[test]
    fn write_zero_is_an_error() {
        let err = write_all_fd_with(3, b"x", |_, _| Ok(0), |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn sigwinch_sets_the_resize_flag() {
        let watcher = ResizeWatcher::start().expect("watcher");
        assert!(!watcher.take_resized());
        unsafe { libc::raise(libc::SIGWINCH) };

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = false;
        while Instant::now() < deadline {
            if watcher.take_resized() {
                seen = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(seen, "SIGWINCH was not observed");
        assert!(!watcher.take_resized());
    }
}
