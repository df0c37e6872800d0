//! Pull-based byte delivery.
//!
//! A consumer (a [`ByteSink`]) states how many bytes it needs next, and a driver
//! hands them over once they are available. The same consumer runs unchanged
//! over a complete buffer ([`process_buffered`]) or over input that arrives
//! in pieces ([`StreamReader`]).
use crate::Error;

/// The next read a [`ByteSink`] is waiting for
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Demand {
    /// Exactly this many bytes. Fails if the input ends first.
    Exact(usize),
    /// Between 1 and this many bytes. Fails only if no bytes are left at all.
    UpTo(usize),
}

impl Demand {
    /// How many of `available` bytes can be handed over now, or `None` if the request can't be served yet
    #[inline]
    #[must_use]
    pub fn take(self, available: usize) -> Option<usize> {
        match self {
            Demand::Exact(n) if available >= n => Some(n),
            Demand::Exact(_) => None,
            Demand::UpTo(_) if available == 0 => None,
            Demand::UpTo(n) => Some(n.min(available)),
        }
    }
}

/// A consumer of bytes that asks for its input one request at a time.
///
/// Requests are served strictly in order, and there's never more than one outstanding.
pub trait ByteSink {
    /// The current request, or `None` once the sink expects no more input
    fn demand(&self) -> Option<Demand>;

    /// Delivers bytes for the current request. `data.len()` is exactly what `demand().take()` allowed.
    fn supply(&mut self, data: &[u8]) -> Result<(), Error>;
}

/// Feeds a complete buffer to the sink.
///
/// Fails if the sink still wants bytes when the buffer runs out,
/// or if bytes are left over when the sink stops asking.
pub fn process_buffered<S: ByteSink + ?Sized>(input: &[u8], sink: &mut S) -> Result<(), Error> {
    let used = serve(input, sink)?;
    if sink.demand().is_some() {
        return Err(Error::new(100));
    }
    if used < input.len() {
        return Err(Error::new(110));
    }
    Ok(())
}

/// Serves requests for as long as `input` can satisfy them. Returns number of bytes consumed.
fn serve<S: ByteSink + ?Sized>(input: &[u8], sink: &mut S) -> Result<usize, Error> {
    let mut pos = 0;
    while let Some(demand) = sink.demand() {
        let len = match demand.take(input.len() - pos) {
            Some(len) => len,
            None => break,
        };
        sink.supply(&input[pos..pos + len])?;
        pos += len;
    }
    Ok(pos)
}

/// Incremental driver: accumulates pushed bytes until the pending request can be served.
#[derive(Debug, Default)]
pub struct StreamReader {
    buf: Vec<u8>,
}

impl StreamReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes received but not yet requested by the sink
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Adds more input and resumes the sink as far as the input allows.
    pub fn push<S: ByteSink + ?Sized>(&mut self, data: &[u8], sink: &mut S) -> Result<(), Error> {
        let used = if self.buf.is_empty() {
            // nothing pending, so serve straight from the caller's slice
            let used = serve(data, sink)?;
            self.buf.try_reserve(data.len() - used)?;
            self.buf.extend_from_slice(&data[used..]);
            used
        } else {
            self.buf.try_reserve(data.len())?;
            self.buf.extend_from_slice(data);
            let used = serve(&self.buf, sink)?;
            self.buf.drain(..used);
            used
        };
        log::trace!("stream reader: consumed {} bytes, {} buffered", used, self.buf.len());

        if !self.buf.is_empty() && sink.demand().is_none() {
            return Err(Error::new(110));
        }
        Ok(())
    }

    /// Signals the end of input. Fails if the sink is still waiting for bytes.
    pub fn finish<S: ByteSink + ?Sized>(mut self, sink: &mut S) -> Result<(), Error> {
        let buf = std::mem::take(&mut self.buf);
        process_buffered(&buf, sink)
    }
}
