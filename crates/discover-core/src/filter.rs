//! Row predicate and ordering shared by every store backend.
//!
//! [`RowFilter`] is the normalized form of the filtering half of a
//! [`ListQuery`]: an id allow-list, a case-insensitive name substring, and a
//! match-any tag set. In-memory stores evaluate it with
//! [`RowFilter::matches`]; SQL stores compile the same three clauses.
//!
//! Ordering follows one rule everywhere: missing and null values sort last in
//! both directions, booleans count as `0`/`1`, numbers sort before strings,
//! and ties keep insertion order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::models::{ColumnRef, ListQuery, ResolvedSort, Row, SortDirection};

/// Normalized filter clauses of a query. Empty clauses match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Row ids to restrict to.
    pub ids: Vec<String>,
    /// Lowercased name substring.
    pub search: Option<String>,
    /// Match-any tag set.
    pub tags: Vec<String>,
}

impl RowFilter {
    pub fn from_query(query: &ListQuery) -> Self {
        let search = query.search_value.trim();
        Self {
            ids: dedup(&query.ids),
            search: if search.is_empty() {
                None
            } else {
                Some(search.to_lowercase())
            },
            tags: dedup(&query.selected_tags),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.search.is_none() && self.tags.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        if !self.ids.is_empty() && !self.ids.iter().any(|id| *id == row.id) {
            return false;
        }
        if let Some(needle) = &self.search {
            if !row.name.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if !self.tags.is_empty() && !row.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        true
    }
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let v = v.trim();
        if !v.is_empty() && !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// A comparable view of one row attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> SortKey<'a> {
    pub fn of(row: &'a Row, column: &ColumnRef) -> Self {
        match column {
            ColumnRef::Id => SortKey::Text(&row.id),
            ColumnRef::Name => SortKey::Text(&row.name),
            ColumnRef::Field(key) => match row.fields.get(key) {
                Some(Value::Number(n)) => n.as_f64().map_or(SortKey::Missing, SortKey::Number),
                Some(Value::Bool(b)) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
                Some(Value::String(s)) => SortKey::Text(s),
                _ => SortKey::Missing,
            },
        }
    }
}

/// Compare two present keys in ascending order.
fn cmp_present(a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
    match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn cmp_key(a: &SortKey<'_>, b: &SortKey<'_>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => Ordering::Greater,
        (_, SortKey::Missing) => Ordering::Less,
        _ => match direction {
            SortDirection::Asc => cmp_present(a, b),
            SortDirection::Desc => cmp_present(b, a),
        },
    }
}

/// Multi-key comparison; the first non-equal key decides.
pub fn compare_rows(a: &Row, b: &Row, order: &[ResolvedSort]) -> Ordering {
    for sort in order {
        let ka = SortKey::of(a, &sort.column);
        let kb = SortKey::of(b, &sort.column);
        let ord = cmp_key(&ka, &kb, sort.direction);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable multi-key sort.
pub fn sort_rows(rows: &mut [Row], order: &[ResolvedSort]) {
    rows.sort_by(|a, b| compare_rows(a, b, order));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableSpec;

    fn rows() -> Vec<Row> {
        vec![
            Row::new("1", "Stable Diffusion XL")
                .with_tags(["Text-to-Image"])
                .with_field("runs", 10),
            Row::new("2", "Whisper")
                .with_tags(["Audio"])
                .with_field("runs", 10),
            Row::new("3", "stablelm")
                .with_tags(["Text-to-Text", "Audio"])
                .with_field("runs", 500),
            Row::new("4", "Llama").with_tags(["Text-to-Text"]),
        ]
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let f = RowFilter::from_query(&ListQuery::new("modelsData").search("   "));
        assert!(f.is_empty());
        assert!(rows().iter().all(|r| f.matches(r)));
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let f = RowFilter::from_query(&ListQuery::new("modelsData").search("STABLE"));
        let ids: Vec<_> = rows()
            .into_iter()
            .filter(|r| f.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_tags_match_any() {
        let f = RowFilter::from_query(&ListQuery::new("modelsData").tag("Audio").tag("Text-to-Image"));
        let ids: Vec<_> = rows()
            .into_iter()
            .filter(|r| f.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_ids_and_tags_combine() {
        let f = RowFilter::from_query(
            &ListQuery::new("modelsData")
                .ids(["2", "4", "2"])
                .tag("Text-to-Text"),
        );
        assert_eq!(f.ids, vec!["2", "4"]);
        let ids: Vec<_> = rows()
            .into_iter()
            .filter(|r| f.matches(r))
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["4"]);
    }

    #[test]
    fn test_descending_sort_is_stable_for_ties() {
        let spec = TableSpec::models();
        let order = spec.default_order();
        let mut data = rows();
        sort_rows(&mut data, &order);
        let ids: Vec<String> = data.iter().map(|r| r.id.clone()).collect();
        // 500 first, the two 10s keep their input order, missing runs last.
        assert_eq!(ids, vec!["3", "1", "2", "4"]);

        sort_rows(&mut data, &order);
        let again: Vec<String> = data.iter().map(|r| r.id.clone()).collect();
        assert_eq!(again, ids);
    }

    #[test]
    fn test_missing_values_sort_last_ascending() {
        let order = vec![ResolvedSort {
            column: ColumnRef::Field("runs".to_string()),
            direction: SortDirection::Asc,
        }];
        let mut data = rows();
        sort_rows(&mut data, &order);
        assert_eq!(data.last().map(|r| r.id.as_str()), Some("4"));
        assert_eq!(data[0].id, "1");
    }

    #[test]
    fn test_multi_key_sort() {
        let order = vec![
            ResolvedSort {
                column: ColumnRef::Field("runs".to_string()),
                direction: SortDirection::Desc,
            },
            ResolvedSort {
                column: ColumnRef::Name,
                direction: SortDirection::Desc,
            },
        ];
        let mut data = rows();
        sort_rows(&mut data, &order);
        let ids: Vec<_> = data.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1", "4"]);
    }

    #[test]
    fn test_numbers_before_text() {
        let a = Row::new("a", "a").with_field("v", "text");
        let b = Row::new("b", "b").with_field("v", 3);
        let c = Row::new("c", "c").with_field("v", true);
        let order = vec![ResolvedSort {
            column: ColumnRef::Field("v".to_string()),
            direction: SortDirection::Asc,
        }];
        let mut data = vec![a, b, c];
        sort_rows(&mut data, &order);
        let ids: Vec<_> = data.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
