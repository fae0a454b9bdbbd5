//! Result ordering
//!
//! Sorts output rows by their evaluated order keys, deterministically.

use std::cmp::Ordering;

use crate::planner::SortDirection;
use crate::schema::Value;

/// Output row paired with its evaluated order keys
#[derive(Debug, Clone, PartialEq)]
pub(super) struct SortableRow {
    pub keys: Vec<Value>,
    pub values: Vec<Value>,
}

/// Sorts output rows
pub(super) struct RowSorter;

impl RowSorter {
    /// Sorts rows by keys, one direction per key.
    ///
    /// Sort is stable: rows with equal keys keep their input order.
    pub fn sort(rows: &mut [SortableRow], directions: &[SortDirection]) {
        rows.sort_by(|a, b| Self::compare_keys(&a.keys, &b.keys, directions));
    }

    /// Compares key lists left to right.
    ///
    /// Ordering rules per key:
    /// - null < number < string
    /// - for the same type, natural ordering
    /// - descending reverses the whole ordering, so nulls come last
    fn compare_keys(a: &[Value], b: &[Value], directions: &[SortDirection]) -> Ordering {
        for ((a_key, b_key), direction) in a.iter().zip(b).zip(directions) {
            let ordering = match direction {
                SortDirection::Asc => a_key.sort_cmp(b_key),
                SortDirection::Desc => a_key.sort_cmp(b_key).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(name: &str, age: Value) -> SortableRow {
        SortableRow {
            keys: vec![age.clone()],
            values: vec![Value::from(name), age],
        }
    }

    fn names(rows: &[SortableRow]) -> Vec<String> {
        rows.iter().map(|r| r.values[0].to_string()).collect()
    }

    #[test]
    fn test_sort_ascending() {
        let mut rows = vec![
            make_row("c", Value::Int(30)),
            make_row("a", Value::Int(20)),
            make_row("b", Value::Int(25)),
        ];

        RowSorter::sort(&mut rows, &[SortDirection::Asc]);

        assert_eq!(names(&rows), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_descending() {
        let mut rows = vec![
            make_row("c", Value::Int(30)),
            make_row("a", Value::Int(20)),
            make_row("b", Value::Int(25)),
        ];

        RowSorter::sort(&mut rows, &[SortDirection::Desc]);

        assert_eq!(names(&rows), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_stable() {
        // Same age, input order preserved
        let mut rows = vec![
            make_row("a", Value::Int(25)),
            make_row("b", Value::Int(25)),
            make_row("c", Value::Int(25)),
        ];

        RowSorter::sort(&mut rows, &[SortDirection::Asc]);

        assert_eq!(names(&rows), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nulls_first_ascending_last_descending() {
        let mut rows = vec![
            make_row("a", Value::Int(10)),
            make_row("b", Value::Null),
            make_row("c", Value::Int(5)),
        ];

        RowSorter::sort(&mut rows, &[SortDirection::Asc]);
        assert_eq!(names(&rows), vec!["b", "c", "a"]);

        RowSorter::sort(&mut rows, &[SortDirection::Desc]);
        assert_eq!(names(&rows), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_second_key_breaks_ties() {
        let row = |name: &str, age: i64| SortableRow {
            keys: vec![Value::Int(age), Value::from(name)],
            values: vec![Value::from(name)],
        };
        let mut rows = vec![row("member6", 100), row("member5", 100), row("member1", 10)];

        RowSorter::sort(&mut rows, &[SortDirection::Desc, SortDirection::Asc]);

        assert_eq!(names(&rows), vec!["member5", "member6", "member1"]);
    }
}
