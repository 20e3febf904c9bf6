//! Byte channels a connection reads frames from and writes frames to.
//!
//! The handshake, TLS and socket setup happen elsewhere; a [`Channel`] is
//! handed over already connected.

use std::{
    fmt,
    io::{self, Read, Write},
    time::Duration,
};

/// An established duplex byte channel to a single peer.
///
/// Retries are driven by the frame reader and writer. Implementations only
/// have to perform single operations.
pub trait Channel {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the peer closed the channel.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write some prefix of `buf` and return how much was written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Wait until data is available to read.
    ///
    /// Returns `Ok(false)` if the timeout elapsed first. `None` waits forever.
    fn poll_read(&mut self, timeout: Option<Duration>) -> io::Result<bool>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole frame",
                    ))
                }
                Ok(n) => buf = &buf[n..],
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn poll_read(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        (**self).poll_read(timeout)
    }
}

#[cfg(unix)]
pub use self::fd::FdChannel;

#[cfg(unix)]
mod fd {
    use std::{
        io::{self, Read, Write},
        os::unix::io::{AsRawFd, RawFd},
        time::Duration,
    };

    use super::Channel;

    /// A channel over two file descriptors, which may refer to the same socket.
    ///
    /// Readiness is checked with `poll(2)` on the read side.
    #[derive(Debug)]
    pub struct FdChannel<R, W> {
        reader: R,
        writer: W,
    }

    impl<R, W> FdChannel<R, W> {
        /// Create a channel reading from `reader` and writing to `writer`.
        ///
        /// For a single socket pass it twice, e.g. `stream.try_clone()?` as the writer.
        pub fn new(reader: R, writer: W) -> Self {
            FdChannel { reader, writer }
        }

        /// Returns shared references to the reader and writer.
        pub fn get_ref(&self) -> (&R, &W) {
            (&self.reader, &self.writer)
        }

        /// Returns mutable references to the reader and writer.
        pub fn get_mut(&mut self) -> (&mut R, &mut W) {
            (&mut self.reader, &mut self.writer)
        }

        /// Consume the channel and return the reader and writer.
        pub fn into_inner(self) -> (R, W) {
            (self.reader, self.writer)
        }
    }

    impl<R: Read + AsRawFd, W: Write> Channel for FdChannel<R, W> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reader.read(buf)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writer.write(buf)
        }

        fn poll_read(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
            poll_readable(self.reader.as_raw_fd(), timeout)
        }
    }

    fn poll_readable(fd: RawFd, timeout: Option<Duration>) -> io::Result<bool> {
        let timeout_ms = match timeout {
            None => -1,
            Some(timeout) => {
                let ms = (timeout.as_micros() + 999) / 1000;
                libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
            }
        };
        let mut pfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };
        loop {
            // SAFETY: `pfd` is a single valid pollfd that outlives the call.
            let res = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if res < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            // POLLHUP and POLLERR count as readable: the next read reports them.
            return Ok(res > 0);
        }
    }
}

type PollFn<T> = Box<dyn FnMut(&mut T, Option<Duration>) -> io::Result<bool> + Send>;

/// A channel that delegates to caller-supplied functions.
///
/// Every callback receives the user data given at construction. Without a
/// readiness callback the channel always reports data as available and the
/// read callback is expected to block.
pub struct CallbackChannel<T, R, W> {
    data: T,
    read: R,
    write: W,
    poll: Option<PollFn<T>>,
}

impl<T, R, W> CallbackChannel<T, R, W>
where
    R: FnMut(&mut T, &mut [u8]) -> io::Result<usize>,
    W: FnMut(&mut T, &[u8]) -> io::Result<usize>,
{
    /// Create a channel from user data and read/write callbacks.
    pub fn new(data: T, read: R, write: W) -> Self {
        CallbackChannel { data, read, write, poll: None }
    }

    /// Add a readiness callback used for read timeouts.
    pub fn with_poll<P>(mut self, poll: P) -> Self
    where
        P: FnMut(&mut T, Option<Duration>) -> io::Result<bool> + Send + 'static,
    {
        self.poll = Some(Box::new(poll));
        self
    }
}

impl<T, R, W> CallbackChannel<T, R, W> {
    /// Returns a shared reference to the user data.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns a mutable reference to the user data.
    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// Consume the channel and return the user data.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T, R, W> Channel for CallbackChannel<T, R, W>
where
    R: FnMut(&mut T, &mut [u8]) -> io::Result<usize>,
    W: FnMut(&mut T, &[u8]) -> io::Result<usize>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (self.read)(&mut self.data, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (self.write)(&mut self.data, buf)
    }

    fn poll_read(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        match self.poll {
            Some(ref mut poll) => poll(&mut self.data, timeout),
            None => Ok(true),
        }
    }
}

impl<T: fmt::Debug, R, W> fmt::Debug for CallbackChannel<T, R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackChannel")
            .field("data", &self.data)
            .field("poll", &self.poll.is_some())
            .finish_non_exhaustive()
    }
}

/// Callback channel over any reader and writer pair kept as user data.
pub type StreamCallbacks<S, D> = CallbackChannel<
    (S, D),
    fn(&mut (S, D), &mut [u8]) -> io::Result<usize>,
    fn(&mut (S, D), &[u8]) -> io::Result<usize>,
>;

/// Build a [`CallbackChannel`] that reads from `reader` and writes to `writer`.
pub fn stream_callbacks<S: Read, D: Write>(reader: S, writer: D) -> StreamCallbacks<S, D> {
    fn read_half<S: Read, D>(io: &mut (S, D), buf: &mut [u8]) -> io::Result<usize> {
        io.0.read(buf)
    }
    fn write_half<S, D: Write>(io: &mut (S, D), buf: &[u8]) -> io::Result<usize> {
        io.1.write(buf)
    }
    let read: fn(&mut (S, D), &mut [u8]) -> io::Result<usize> = read_half::<S, D>;
    let write: fn(&mut (S, D), &[u8]) -> io::Result<usize> = write_half::<S, D>;
    CallbackChannel::new((reader, writer), read, write)
}
