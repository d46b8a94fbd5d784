//! Single-producer/single-consumer byte queue shared between an interrupt handler and the
//! main loop.
//!
//! The write index is only ever stored by the [`Producer`], the read index only by the
//! [`Consumer`]. A slot is always left unused so that `read == write` means empty and
//! `next(write) == read` means full, giving `N - 1` usable bytes.
//!
//! The producer stores the byte before publishing the new write index (`Release`), the
//! consumer observes the write index (`Acquire`) before reading the slot. The same pairing
//! applies in the other direction for the read index.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer<const N: usize> {
    buf: [UnsafeCell<u8>; N],
    read: AtomicUsize,
    write: AtomicUsize,
}

// SAFETY: a slot is only written by the producer while it is outside `read..write` and only
// read by the consumer while it is inside, and `split` hands out exactly one of each.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    const MIN_SIZE: () = assert!(N >= 2, "a ring buffer needs at least two slots");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::MIN_SIZE;
        Self {
            buf: [const { UnsafeCell::new(0) }; N],
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        }
    }

    /// Number of bytes that fit before the producer starts dropping or waiting.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        *self.read.get_mut() = 0;
        *self.write.get_mut() = 0;
        let rb = &*self;
        (Producer { rb }, Consumer { rb })
    }

    const fn next(i: usize) -> usize {
        if i + 1 == N { 0 } else { i + 1 }
    }

    fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        (write + N - read) % N
    }
}

pub struct Producer<'a, const N: usize> {
    rb: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    pub fn is_full(&self) -> bool {
        let write = self.rb.write.load(Ordering::Relaxed);
        RingBuffer::<N>::next(write) == self.rb.read.load(Ordering::Acquire)
    }

    /// True once the consumer has drained everything pushed so far.
    pub fn is_empty(&self) -> bool {
        self.rb.write.load(Ordering::Relaxed) == self.rb.read.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.rb.len()
    }

    /// Stores `byte`, or hands it back when the queue is full. Unread data is never
    /// overwritten.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        let write = self.rb.write.load(Ordering::Relaxed);
        let next = RingBuffer::<N>::next(write);
        if next == self.rb.read.load(Ordering::Acquire) {
            return Err(byte);
        }
        // SAFETY: `write` is outside the readable region until the store below publishes it.
        unsafe { *self.rb.buf[write].get() = byte };
        self.rb.write.store(next, Ordering::Release);
        Ok(())
    }

    /// Spins on `wait` until the consumer frees a slot.
    pub fn push_blocking(&mut self, byte: u8, mut wait: impl FnMut()) {
        let mut byte = byte;
        while let Err(b) = self.push(byte) {
            byte = b;
            wait();
        }
    }
}

pub struct Consumer<'a, const N: usize> {
    rb: &'a RingBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    pub fn has_data(&self) -> bool {
        self.rb.read.load(Ordering::Relaxed) != self.rb.write.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.rb.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_data()
    }

    pub fn pop(&mut self) -> Option<u8> {
        let read = self.rb.read.load(Ordering::Relaxed);
        if read == self.rb.write.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: the producer published this slot and won't touch it until `read` moves on.
        let byte = unsafe { *self.rb.buf[read].get() };
        self.rb.read.store(RingBuffer::<N>::next(read), Ordering::Release);
        Some(byte)
    }

    /// Next byte, or `0` when nothing is buffered. Check [`Self::has_data`] first when a
    /// NUL byte is a legitimate value.
    pub fn get_char(&mut self) -> u8 {
        self.pop().unwrap_or(0)
    }

    /// Discards everything buffered so far.
    pub fn clear(&mut self) {
        let write = self.rb.write.load(Ordering::Acquire);
        self.rb.read.store(write, Ordering::Release);
    }
}
