//! A policy value bound to an inclusive range of block indices.

use std::fmt;
use std::sync::Arc;

use tollgate_core::error::PolicyError;

/// Extra predicate a [`Span`] applies on top of its index range.
#[derive(Clone)]
pub enum IndexFilter {
    /// Matches `i` when `i % divisor == remainder`. A zero divisor never matches.
    Modulo { divisor: u64, remainder: u64 },
    /// Arbitrary deterministic predicate.
    Custom(Arc<dyn Fn(u64) -> bool + Send + Sync>),
}

impl IndexFilter {
    /// Matches multiples of `divisor`.
    pub fn every(divisor: u64) -> Self {
        IndexFilter::Modulo {
            divisor,
            remainder: 0,
        }
    }

    pub fn custom(predicate: impl Fn(u64) -> bool + Send + Sync + 'static) -> Self {
        IndexFilter::Custom(Arc::new(predicate))
    }

    pub fn accepts(&self, index: u64) -> bool {
        match self {
            IndexFilter::Modulo { divisor: 0, .. } => false,
            IndexFilter::Modulo { divisor, remainder } => index % divisor == *remainder,
            IndexFilter::Custom(predicate) => predicate(index),
        }
    }
}

impl fmt::Debug for IndexFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexFilter::Modulo { divisor, remainder } => f
                .debug_struct("Modulo")
                .field("divisor", divisor)
                .field("remainder", remainder)
                .finish(),
            IndexFilter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// `value` applies at index `i` iff `start <= i`, `i <= end` (when bounded),
/// and the filter (when present) accepts `i`.
#[derive(Clone, Debug)]
pub struct Span<V> {
    start: u64,
    end: Option<u64>,
    filter: Option<IndexFilter>,
    value: V,
}

impl<V> Span<V> {
    /// Fails with [`PolicyError::InvalidSpan`] when `end < start`.
    pub fn new(start: u64, end: Option<u64>, value: V) -> Result<Self, PolicyError> {
        if let Some(end) = end {
            if end < start {
                return Err(PolicyError::InvalidSpan { start, end });
            }
        }
        Ok(Self {
            start,
            end,
            filter: None,
            value,
        })
    }

    /// Unbounded span starting at `start`.
    pub fn starting_at(start: u64, value: V) -> Self {
        Self {
            start,
            end: None,
            filter: None,
            value,
        }
    }

    /// Span over `[0, end]`. Never fails.
    pub fn up_to(end: u64, value: V) -> Self {
        Self {
            start: 0,
            end: Some(end),
            filter: None,
            value,
        }
    }

    /// Span over `[start, end]`.
    pub fn between(start: u64, end: u64, value: V) -> Result<Self, PolicyError> {
        Self::new(start, Some(end), value)
    }

    pub fn with_filter(mut self, filter: IndexFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn applies_at(&self, index: u64) -> bool {
        index >= self.start
            && self.end.is_none_or(|end| index <= end)
            && self.filter.as_ref().is_none_or(|f| f.accepts(index))
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Inclusive upper bound, `None` when unbounded.
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    pub fn filter(&self) -> Option<&IndexFilter> {
        self.filter.as_ref()
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}
