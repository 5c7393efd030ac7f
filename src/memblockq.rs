//! A FIFO queue of [`Memchunk`]s, used to buffer audio across a sink move.

use std::collections::VecDeque;

use sink_proto::Memchunk;

/// Queues memchunks up to a maximum total length, dropping the oldest data
/// once full. Used by [`crate::ghost::GhostSinkInput`] to hold audio that
/// arrives for an input mid-move, before the move target has attached.
#[derive(Debug)]
pub struct MemBlockQ {
    chunks: VecDeque<Memchunk>,
    length: usize,
    max_length: usize,
}

impl MemBlockQ {
    pub fn new(max_length: usize) -> Self {
        MemBlockQ { chunks: VecDeque::new(), length: 0, max_length }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends `chunk`, dropping the oldest queued data if that would push
    /// the queue past `max_length`.
    pub fn push(&mut self, chunk: Memchunk) {
        if chunk.is_empty() {
            return;
        }
        self.length += chunk.len();
        self.chunks.push_back(chunk);
        while self.length > self.max_length {
            let front_len = self.chunks.front().map(Memchunk::len).unwrap_or(0);
            if front_len == 0 {
                break;
            }
            let excess = self.length - self.max_length;
            if excess >= front_len {
                self.length -= front_len;
                self.chunks.pop_front();
            } else {
                let mut front = self.chunks.pop_front().unwrap();
                front.advance(excess);
                self.length -= excess;
                self.chunks.push_front(front);
            }
        }
    }

    /// Returns up to `n` bytes from the front of the queue, in original
    /// order, without removing them. A later `pop`/`drop` of the same or
    /// fewer bytes is what actually consumes them.
    pub fn peek(&self, n: usize) -> Vec<Memchunk> {
        let mut out = Vec::new();
        let mut remaining = n;
        for chunk in self.chunks.iter() {
            if remaining == 0 {
                break;
            }
            if chunk.len() <= remaining {
                remaining -= chunk.len();
                out.push(chunk.clone());
            } else {
                let mut head = chunk.clone();
                head.truncate(remaining);
                out.push(head);
                remaining = 0;
            }
        }
        out
    }

    /// Pops up to `n` bytes off the front of the queue, in original order.
    /// Returns fewer bytes only when the queue is drained.
    pub fn pop(&mut self, n: usize) -> Vec<Memchunk> {
        let mut out = Vec::new();
        let mut remaining = n;
        while remaining > 0 {
            let mut front = match self.chunks.pop_front() {
                Some(front) => front,
                None => break,
            };
            if front.len() <= remaining {
                remaining -= front.len();
                self.length -= front.len();
                out.push(front);
            } else {
                let mut rest = front.clone();
                rest.advance(remaining);
                front.truncate(remaining);
                self.length -= remaining;
                out.push(front);
                self.chunks.push_front(rest);
                remaining = 0;
            }
        }
        out
    }

    pub fn drain(&mut self) -> Vec<Memchunk> {
        self.length = 0;
        self.chunks.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_preserve_order_and_bytes() {
        let mut q = MemBlockQ::new(1024);
        q.push(Memchunk::from_vec(vec![1, 2, 3, 4]));
        q.push(Memchunk::from_vec(vec![5, 6]));
        assert_eq!(q.len(), 6);

        let popped = q.pop(3);
        let bytes: Vec<u8> = popped.iter().flat_map(|c| c.as_slice().to_vec()).collect();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(q.len(), 3);

        let rest = q.pop(10);
        let bytes: Vec<u8> = rest.iter().flat_map(|c| c.as_slice().to_vec()).collect();
        assert_eq!(bytes, vec![4, 5, 6]);
        assert!(q.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut q = MemBlockQ::new(1024);
        q.push(Memchunk::from_vec(vec![1, 2, 3, 4]));
        let peeked: Vec<u8> = q.peek(2).iter().flat_map(|c| c.as_slice().to_vec()).collect();
        assert_eq!(peeked, vec![1, 2]);
        assert_eq!(q.len(), 4);

        let popped: Vec<u8> = q.pop(2).iter().flat_map(|c| c.as_slice().to_vec()).collect();
        assert_eq!(popped, peeked);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn push_drops_oldest_bytes_past_capacity() {
        let mut q = MemBlockQ::new(4);
        q.push(Memchunk::from_vec(vec![1, 2, 3]));
        q.push(Memchunk::from_vec(vec![4, 5, 6]));
        assert_eq!(q.len(), 4);
        let all: Vec<u8> = q.pop(4).iter().flat_map(|c| c.as_slice().to_vec()).collect();
        assert_eq!(all, vec![3, 4, 5, 6]);
    }
}
