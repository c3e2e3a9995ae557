//! Fixed-capacity bump arena for message tokens.
//!
//! Every request and response owns one [`BufferArena`]. Tokens copied into it
//! (method, path, header names and values, formatted header values) are
//! addressed by [`Span`] handles instead of borrowed slices, so the owning
//! message stays freely mutable while its tokens are alive.
//!
//! The arena never grows past the capacity it was created with and never frees
//! individual tokens. [`BufferArena::reset`] drops everything at once by moving
//! the cursor back to zero and bumping the arena generation; spans handed out
//! before the reset stop resolving.

use std::fmt;
use std::fmt::Write;

use bytes::{BufMut, BytesMut};

use crate::ensure;
use crate::protocol::CapacityError;

/// Handle to a token stored in a [`BufferArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    start: usize,
    len: usize,
    generation: u32,
}

impl Span {
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The arena generation this span was allocated in.
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
pub struct BufferArena {
    buf: BytesMut,
    capacity: usize,
    generation: u32,
    token_start: usize,
}

impl BufferArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity, generation: 0, token_start: 0 }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes handed out since the last reset.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Bump-allocates the next `n` zeroed bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::ArenaExhausted`] without moving the cursor when
    /// fewer than `n` bytes remain.
    pub fn alloc(&mut self, n: usize) -> Result<&mut [u8], CapacityError> {
        ensure!(n <= self.remaining(), CapacityError::arena_exhausted(n, self.remaining()));
        let start = self.buf.len();
        self.buf.put_bytes(0, n);
        Ok(&mut self.buf[start..])
    }

    /// Copies `src` into the arena and returns its span.
    ///
    /// # Errors
    ///
    /// Same as [`BufferArena::alloc`].
    pub fn copy_from(&mut self, src: &[u8]) -> Result<Span, CapacityError> {
        let start = self.buf.len();
        self.alloc(src.len())?.copy_from_slice(src);
        Ok(self.span_from(start))
    }

    /// Formats `args` straight into the arena.
    ///
    /// On failure the partially written bytes are given back, the cursor is
    /// left where it was before the call.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::ArenaExhausted`] when the formatted text does
    /// not fit.
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<Span, CapacityError> {
        let mark = self.buf.len();
        let mut writer = ArenaWriter { arena: self, error: None };
        if writer.write_fmt(args).is_err() {
            let error = writer.error.take().unwrap_or_else(|| CapacityError::arena_exhausted(0, 0));
            self.rollback(mark);
            return Err(error);
        }
        Ok(self.span_from(mark))
    }

    /// Resolves a span, `None` if it belongs to an earlier generation.
    pub fn get(&self, span: Span) -> Option<&[u8]> {
        if span.generation != self.generation {
            return None;
        }
        self.buf.get(span.start..span.start + span.len)
    }

    /// Resolves a span as text.
    pub fn get_str(&self, span: Span) -> Option<&str> {
        self.get(span).and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Drops every token and invalidates outstanding spans.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.token_start = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Starts a token that is filled byte by byte with [`BufferArena::push`].
    #[inline]
    pub(crate) fn begin_token(&mut self) {
        self.token_start = self.buf.len();
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), CapacityError> {
        ensure!(self.buf.len() < self.capacity, CapacityError::arena_exhausted(1, 0));
        self.buf.put_u8(byte);
        Ok(())
    }

    #[inline]
    pub(crate) fn token_len(&self) -> usize {
        self.buf.len() - self.token_start
    }

    /// Closes the token started by the last [`BufferArena::begin_token`].
    #[inline]
    pub(crate) fn finish_token(&mut self) -> Span {
        let span = self.span_from(self.token_start);
        self.token_start = self.buf.len();
        span
    }

    pub(crate) fn rollback(&mut self, mark: usize) {
        if mark <= self.buf.len() {
            self.buf.truncate(mark);
        }
    }

    #[inline]
    fn span_from(&self, start: usize) -> Span {
        Span { start, len: self.buf.len() - start, generation: self.generation }
    }
}

/// `fmt::Write` adapter that refuses to write past the arena capacity.
struct ArenaWriter<'a> {
    arena: &'a mut BufferArena,
    error: Option<CapacityError>,
}

impl Write for ArenaWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.arena.copy_from(s.as_bytes()) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.error = Some(e);
                Err(fmt::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_allocates_in_order() {
        let mut arena = BufferArena::with_capacity(16);

        let get = arena.copy_from(b"GET").unwrap();
        let path = arena.copy_from(b"/index").unwrap();

        assert_eq!(arena.cursor(), 9);
        assert_eq!(arena.remaining(), 7);
        assert_eq!(arena.get(get), Some(&b"GET"[..]));
        assert_eq!(arena.get_str(path), Some("/index"));
    }

    #[test]
    fn alloc_fails_without_moving_cursor() {
        let mut arena = BufferArena::with_capacity(8);
        arena.copy_from(b"12345").unwrap();

        let err = arena.alloc(4).unwrap_err();

        assert!(matches!(err, CapacityError::ArenaExhausted { requested: 4, remaining: 3 }));
        assert_eq!(arena.cursor(), 5);

        // the last bytes are still usable
        assert_eq!(arena.alloc(3).unwrap().len(), 3);
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn push_stops_at_capacity() {
        let mut arena = BufferArena::with_capacity(2);
        arena.begin_token();
        arena.push(b'a').unwrap();
        arena.push(b'b').unwrap();

        assert!(arena.push(b'c').is_err());
        assert_eq!(arena.token_len(), 2);

        let span = arena.finish_token();
        assert_eq!(arena.get(span), Some(&b"ab"[..]));
    }

    #[test]
    fn reset_invalidates_spans() {
        let mut arena = BufferArena::with_capacity(32);
        let span = arena.copy_from(b"keep-alive").unwrap();
        let generation = arena.generation();

        arena.reset();

        assert_eq!(arena.cursor(), 0);
        assert_eq!(arena.generation(), generation + 1);
        assert_eq!(arena.get(span), None);

        let fresh = arena.copy_from(b"close").unwrap();
        assert_eq!(arena.get_str(fresh), Some("close"));
    }

    #[test]
    fn write_fmt_rolls_back_on_overflow() {
        let mut arena = BufferArena::with_capacity(8);
        arena.copy_from(b"abc").unwrap();

        let err = arena.write_fmt(format_args!("{}-{}", 12345, 678)).unwrap_err();

        assert!(matches!(err, CapacityError::ArenaExhausted { .. }));
        assert_eq!(arena.cursor(), 3);

        let span = arena.write_fmt(format_args!("{}", 42)).unwrap();
        assert_eq!(arena.get_str(span), Some("42"));
        assert_eq!(arena.cursor(), 5);
    }
}
