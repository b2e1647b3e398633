//! C1/C2: a single trait for node->int64 and (node,node)->int64 evaluators,
//! collapsing the original callback-class hierarchy (spec §9 "deep
//! inheritance"), plus a lazy memoizing cache keyed by endpoint pair.

use crate::arith::cap_add;
use crate::index::VarIndex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Whether an evaluator may be invoked arbitrarily many times ("repeatable")
/// or must be promoted (wrapped in a cache) before reuse ("one-shot").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeatability {
    Repeatable,
    OneShot,
}

/// A unary node evaluator: `node -> int64`.
pub trait UnaryEvaluator {
    fn eval(&self, node: VarIndex) -> i64;
    fn repeatability(&self) -> Repeatability {
        Repeatability::Repeatable
    }
}

/// An arc evaluator: `(from, to) -> int64`.
pub trait ArcEvaluator {
    fn eval(&self, from: VarIndex, to: VarIndex) -> i64;
    fn repeatability(&self) -> Repeatability {
        Repeatability::Repeatable
    }
}

/// Tagged-sum transit evaluator (spec §9 "dynamic dispatch": the only
/// genuinely polymorphic piece of the model). Avoids a vtable call in the
/// hot per-arc accumulation loop for the common constant/matrix cases.
#[derive(Clone)]
pub enum TransitEvaluator {
    Constant(i64),
    Vector(Rc<Vec<i64>>),
    Matrix { n: usize, data: Rc<Vec<i64>> },
    Callback(Rc<dyn Fn(VarIndex, VarIndex) -> i64>),
}

impl TransitEvaluator {
    pub fn eval(&self, from: VarIndex, to: VarIndex) -> i64 {
        match self {
            TransitEvaluator::Constant(c) => *c,
            TransitEvaluator::Vector(v) => v[from.0],
            TransitEvaluator::Matrix { n, data } => data[from.0 * n + to.0],
            TransitEvaluator::Callback(f) => f(from, to),
        }
    }
}

impl ArcEvaluator for TransitEvaluator {
    fn eval(&self, from: VarIndex, to: VarIndex) -> i64 {
        TransitEvaluator::eval(self, from, to)
    }
    fn repeatability(&self) -> Repeatability {
        match self {
            TransitEvaluator::Callback(_) => Repeatability::OneShot,
            _ => Repeatability::Repeatable,
        }
    }
}

/// Lazy memoizer (C2): wraps an arc evaluator in a per-tail hash populated
/// on first access. Eviction is never performed; caching is opt-in and
/// bounded by `max_size` — once the cache would exceed it, new entries are
/// computed but not stored (falls back to recomputing each time), matching
/// spec §4.1 "caching is opt-in and bounded by a caller-supplied size
/// threshold".
pub struct CachedArcEvaluator<E: ArcEvaluator> {
    inner: E,
    max_size: usize,
    // One hash map per tail, built lazily.
    cache: RefCell<HashMap<usize, HashMap<usize, i64>>>,
    len: RefCell<usize>,
}

impl<E: ArcEvaluator> CachedArcEvaluator<E> {
    pub fn new(inner: E, max_size: usize) -> Self {
        CachedArcEvaluator {
            inner,
            max_size,
            cache: RefCell::new(HashMap::new()),
            len: RefCell::new(0),
        }
    }

    pub fn cached_len(&self) -> usize {
        *self.len.borrow()
    }
}

impl<E: ArcEvaluator> ArcEvaluator for CachedArcEvaluator<E> {
    fn eval(&self, from: VarIndex, to: VarIndex) -> i64 {
        if let Some(heads) = self.cache.borrow().get(&from.0) {
            if let Some(v) = heads.get(&to.0) {
                return *v;
            }
        }
        let value = self.inner.eval(from, to);
        let mut len = self.len.borrow_mut();
        if *len < self.max_size {
            self.cache
                .borrow_mut()
                .entry(from.0)
                .or_default()
                .insert(to.0, value);
            *len += 1;
        }
        value
    }

    fn repeatability(&self) -> Repeatability {
        Repeatability::Repeatable
    }
}

/// Sums an arc evaluator along a full path (`start -> ... -> end`),
/// including the endpoints, using saturating arithmetic.
pub fn sum_along_path(path: &[VarIndex], eval: &dyn ArcEvaluator) -> i64 {
    let mut total = 0i64;
    for w in path.windows(2) {
        total = cap_add(total, eval.eval(w[0], w[1]));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEval {
        calls: RefCell<usize>,
    }
    impl ArcEvaluator for CountingEval {
        fn eval(&self, from: VarIndex, to: VarIndex) -> i64 {
            *self.calls.borrow_mut() += 1;
            (from.0 as i64 - to.0 as i64).abs()
        }
        fn repeatability(&self) -> Repeatability {
            Repeatability::OneShot
        }
    }

    #[test]
    fn cache_memoizes_repeated_lookups() {
        let counting = CountingEval { calls: RefCell::new(0) };
        let cached = CachedArcEvaluator::new(counting, 100);
        assert_eq!(cached.eval(VarIndex(0), VarIndex(3)), 3);
        assert_eq!(cached.eval(VarIndex(0), VarIndex(3)), 3);
        assert_eq!(*cached.inner.calls.borrow(), 1);
    }

    #[test]
    fn cache_stops_storing_past_max_size() {
        let counting = CountingEval { calls: RefCell::new(0) };
        let cached = CachedArcEvaluator::new(counting, 1);
        cached.eval(VarIndex(0), VarIndex(1));
        cached.eval(VarIndex(0), VarIndex(2)); // not stored, max_size=1 reached
        cached.eval(VarIndex(0), VarIndex(2)); // recomputed
        assert_eq!(*cached.inner.calls.borrow(), 3);
    }

    #[test]
    fn transit_evaluator_matrix_dispatch() {
        let te = TransitEvaluator::Matrix { n: 2, data: Rc::new(vec![0, 5, 7, 0]) };
        assert_eq!(te.eval(VarIndex(0), VarIndex(1)), 5);
        assert_eq!(te.eval(VarIndex(1), VarIndex(0)), 7);
    }
}
