use std::cmp::Ordering;

use crate::TimeValue;

/// Anything that occupies a span on the chart timeline.
///
/// Notes, track events, tempo changes and raw stream commands all order the
/// same way through this trait, so there is one comparator for all of them.
pub trait Timed {
    fn start_time(&self) -> TimeValue;

    fn end_time(&self) -> TimeValue {
        self.start_time()
    }
}

/// Orders by `(start, end)` scalar. Nothing else breaks ties.
pub fn timed_cmp<T: Timed + ?Sized>(a: &T, b: &T) -> Ordering {
    a.start_time()
        .cmp_scalar(&b.start_time())
        .then_with(|| a.end_time().cmp_scalar(&b.end_time()))
}

/// Stable sort: exact ties keep their input order.
pub fn sort_timed<T: Timed>(items: &mut [T]) {
    items.sort_by(timed_cmp);
}

pub fn is_time_ordered<T: Timed>(items: &[T]) -> bool {
    items
        .windows(2)
        .all(|w| timed_cmp(&w[0], &w[1]) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Span {
        start: TimeValue,
        end: TimeValue,
        tag: &'static str,
    }

    impl Timed for Span {
        fn start_time(&self) -> TimeValue {
            self.start
        }

        fn end_time(&self) -> TimeValue {
            self.end
        }
    }

    fn span(start: (i32, i32, i32), end: (i32, i32, i32), tag: &'static str) -> Span {
        Span {
            start: TimeValue::new(start.0, start.1, start.2).unwrap(),
            end: TimeValue::new(end.0, end.1, end.2).unwrap(),
            tag,
        }
    }

    #[test]
    fn equal_start_orders_by_end() {
        let mut spans = vec![
            span((1, 0, 1), (3, 0, 1), "long"),
            span((1, 0, 1), (2, 0, 1), "short"),
            span((0, 1, 2), (0, 1, 2), "first"),
        ];
        sort_timed(&mut spans);
        let tags: Vec<_> = spans.iter().map(|s| s.tag).collect();
        assert_eq!(tags, ["first", "short", "long"]);
        assert!(is_time_ordered(&spans));
    }

    #[test]
    fn exact_ties_keep_input_order() {
        // (1, 1, 2) and (1, 2, 4) are the same instant.
        let mut spans = vec![
            span((1, 1, 2), (2, 0, 1), "a"),
            span((0, 0, 1), (0, 0, 1), "zero"),
            span((1, 2, 4), (2, 0, 0), "b"),
            span((1, 1, 2), (2, 0, 1), "c"),
        ];
        sort_timed(&mut spans);
        let tags: Vec<_> = spans.iter().map(|s| s.tag).collect();
        assert_eq!(tags, ["zero", "a", "b", "c"]);
    }
}
