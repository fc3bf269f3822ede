use std::io::{self, Read};

/// A byte source that misbehaves at chosen points, measured in delivered bytes.
pub struct FaultyReader<R: Read> {
    inner: R,
    mode: FaultMode,
    calls: usize,
    delivered: usize,
}

#[allow(dead_code)]
pub enum FaultMode {
    /// Never hands out more than this many bytes per read.
    Chunks(usize),
    /// Every n-th read fails with `Interrupted`.
    InterruptedEvery(usize),
    /// Reports end of stream once this many bytes were delivered.
    EofAfter(usize),
    /// Fails with `BrokenPipe` once this many bytes were delivered.
    FailAfter(usize),
}

impl<R: Read> FaultyReader<R> {
    pub fn new(inner: R, mode: FaultMode) -> Self {
        Self {
            inner,
            mode,
            calls: 0,
            delivered: 0,
        }
    }

    fn read_capped(&mut self, buf: &mut [u8], cap: usize) -> io::Result<usize> {
        let len = buf.len().min(cap);
        let n = self.inner.read(&mut buf[..len])?;
        self.delivered += n;
        Ok(n)
    }
}

impl<R: Read> Read for FaultyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls += 1;
        match self.mode {
            FaultMode::Chunks(size) => self.read_capped(buf, size.max(1)),
            FaultMode::InterruptedEvery(n) if n != 0 && self.calls % n == 0 => {
                Err(io::Error::from(io::ErrorKind::Interrupted))
            }
            FaultMode::EofAfter(limit) => {
                let left = limit.saturating_sub(self.delivered);
                self.read_capped(buf, left)
            }
            FaultMode::FailAfter(limit) if self.delivered >= limit => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "Simulated I/O error",
            )),
            FaultMode::FailAfter(limit) => {
                let left = limit - self.delivered;
                self.read_capped(buf, left)
            }
            FaultMode::InterruptedEvery(_) => self.read_capped(buf, usize::MAX),
        }
    }
}
