//! One policy dimension resolved over block indices.

use crate::span::Span;

/// Default value plus spans layered on top of it.
///
/// Among spans that apply at an index, the one added last wins; when none
/// applies the default is returned. Resolution is a pure function of the
/// timeline and the index.
#[derive(Clone, Debug)]
pub struct PolicyTimeline<V> {
    default: V,
    spans: Vec<Span<V>>,
}

impl<V: Clone> PolicyTimeline<V> {
    pub fn new(default: V) -> Self {
        Self {
            default,
            spans: Vec::new(),
        }
    }

    /// A copy of this timeline with `span` layered on top. `self` is untouched.
    #[must_use]
    pub fn add(&self, span: Span<V>) -> Self {
        let mut spans = self.spans.clone();
        spans.push(span);
        Self {
            default: self.default.clone(),
            spans,
        }
    }

    /// A copy of this timeline with `default` replaced.
    #[must_use]
    pub fn with_default(&self, default: V) -> Self {
        Self {
            default,
            spans: self.spans.clone(),
        }
    }

    /// Effective value at `index`.
    pub fn resolve(&self, index: u64) -> V {
        self.resolve_ref(index).clone()
    }

    /// Borrowing form of [`resolve`](Self::resolve).
    pub fn resolve_ref(&self, index: u64) -> &V {
        self.spans
            .iter()
            .rev()
            .find(|span| span.applies_at(index))
            .map(Span::value)
            .unwrap_or(&self.default)
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    /// Spans in the order they were added.
    pub fn spans(&self) -> &[Span<V>] {
        &self.spans
    }
}

impl<V: Clone + Default> Default for PolicyTimeline<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: Clone> From<V> for PolicyTimeline<V> {
    fn from(default: V) -> Self {
        Self::new(default)
    }
}
