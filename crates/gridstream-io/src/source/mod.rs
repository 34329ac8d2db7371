//! Row sources: lazy, forward-only producers of rows.
//!
//! Pulling the next row is one of the session's two suspension points, so
//! sources should do their blocking work inside `next_row`.

use crate::error::Result;

pub mod jsonl;

pub use jsonl::JsonlSource;

pub trait RowSource<R> {
    /// Next row, or `None` when exhausted. After `None` or an error the
    /// source is not pulled again.
    fn next_row(&mut self) -> Result<Option<R>>;
}

impl<R, S: RowSource<R> + ?Sized> RowSource<R> for &mut S {
    fn next_row(&mut self) -> Result<Option<R>> {
        (**self).next_row()
    }
}

impl<R, S: RowSource<R> + ?Sized> RowSource<R> for Box<S> {
    fn next_row(&mut self) -> Result<Option<R>> {
        (**self).next_row()
    }
}

/// Infallible rows from any iterator.
#[derive(Debug, Clone)]
pub struct IterSource<I>(I);

impl<I> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self(iter)
    }
}

impl<I: Iterator> RowSource<I::Item> for IterSource<I> {
    fn next_row(&mut self) -> Result<Option<I::Item>> {
        Ok(self.0.next())
    }
}

/// Fallible rows from an iterator of results.
#[derive(Debug, Clone)]
pub struct TryIterSource<I>(I);

impl<I> TryIterSource<I> {
    pub fn new(iter: I) -> Self {
        Self(iter)
    }
}

impl<R, I: Iterator<Item = Result<R>>> RowSource<R> for TryIterSource<I> {
    fn next_row(&mut self) -> Result<Option<R>> {
        self.0.next().transpose()
    }
}

/// Stops after `limit` rows without pulling the inner source further.
#[derive(Debug, Clone)]
pub struct Limit<S> {
    inner: S,
    remaining: u64,
}

impl<S> Limit<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<R, S: RowSource<R>> RowSource<R> for Limit<S> {
    fn next_row(&mut self) -> Result<Option<R>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let row = self.inner.next_row()?;
        if row.is_some() {
            self.remaining -= 1;
        }
        Ok(row)
    }
}

/// One row of lookahead, e.g. to infer columns from the first row.
#[derive(Debug, Clone)]
pub struct Peekable<S, R> {
    inner: S,
    peeked: Option<Option<R>>,
}

impl<S: RowSource<R>, R> Peekable<S, R> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    pub fn peek(&mut self) -> Result<Option<&R>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.inner.next_row()?);
        }
        Ok(self.peeked.as_ref().and_then(Option::as_ref))
    }
}

impl<S: RowSource<R>, R> RowSource<R> for Peekable<S, R> {
    fn next_row(&mut self) -> Result<Option<R>> {
        match self.peeked.take() {
            Some(row) => Ok(row),
            None => self.inner.next_row(),
        }
    }
}
