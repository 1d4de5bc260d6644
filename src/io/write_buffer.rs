// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::VecDeque, io};

use bytes::{Buf, Bytes};
use tokio::io::AsyncWrite;

/// Outbound FIFO for a single TCP session. PDUs are enqueued whole; `flush`
/// drains as much as the socket will currently accept without blocking,
/// leaving the remainder queued for the next writable-readiness wakeup
/// (the Tokio equivalent of the original's re-armed write callback).
#[derive(Default)]
pub struct WriteBuffer {
    queue: VecDeque<Bytes>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        WriteBuffer { queue: VecDeque::new() }
    }

    pub fn enqueue(&mut self, pdu: Bytes) {
        self.queue.push_back(pdu);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.iter().all(|b| !b.has_remaining())
    }

    pub fn pending_bytes(&self) -> usize {
        self.queue.iter().map(|b| b.remaining()).sum()
    }

    /// Writes as much of the queue as `writer` accepts without blocking.
    /// Returns `Ok(true)` if the whole queue drained, `Ok(false)` if the
    /// writer would have blocked with data still queued.
    pub async fn flush<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> io::Result<bool> {
        use tokio::io::AsyncWriteExt;

        while let Some(front) = self.queue.front_mut() {
            if !front.has_remaining() {
                self.queue.pop_front();
                continue;
            }
            match writer.write_buf(front).await {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "write returned zero bytes",
                    ));
                },
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_drains_queue_in_order() {
        let mut wb = WriteBuffer::new();
        wb.enqueue(Bytes::from_static(b"abc"));
        wb.enqueue(Bytes::from_static(b"def"));
        assert_eq!(wb.pending_bytes(), 6);

        let mut sink = Vec::new();
        let done = wb.flush(&mut sink).await.expect("flush ok");
        assert!(done);
        assert!(wb.is_empty());
        assert_eq!(sink, b"abcdef");
    }

    #[test]
    fn is_empty_on_fresh_buffer() {
        let wb = WriteBuffer::new();
        assert!(wb.is_empty());
    }
}
