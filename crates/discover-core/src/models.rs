//! Core data types for the listing query layer.
//!
//! A [`ListQuery`] describes one request against a collection (models or
//! papers); a [`ListResult`] carries the requested page and the total number
//! of matching rows. Collections are described by [`TableSpec`] entries held
//! in a [`Catalogue`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::QueryError;

/// Page size used by the discover pages when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One record of a collection: a model or a paper.
///
/// Only `id`, `name` and `tags` are interpreted by the query layer. Every
/// other attribute (`runs`, `creator`, `totalScore`, ...) lives in `fields`
/// and is only looked at when it is named as a sort column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Row {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: Vec::new(),
            fields: Map::new(),
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build a row from a raw JSON object using the collection's field names.
    ///
    /// The id may be a string or a number. The display name is read from
    /// `name_field`, falling back to `name`. Tags are read from `tags_field`
    /// and may be missing. All remaining keys are kept in `fields`.
    pub fn from_json(spec: &TableSpec, value: Value) -> anyhow::Result<Self> {
        let mut object = match value {
            Value::Object(object) => object,
            other => anyhow::bail!("expected a JSON object, got: {}", other),
        };

        let id = match object.remove("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => anyhow::bail!("row id must be a string or number, got: {}", other),
            None => anyhow::bail!("row is missing an \"id\""),
        };

        // `name` and `tags` are reserved on the wire, so they never stay in `fields`.
        let plain_name = object.remove("name");
        let name = match object.remove(&spec.name_field).or(plain_name) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let plain_tags = object.remove("tags");
        let tags = match object.remove(&spec.tags_field).or(plain_tags) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(s),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s],
            _ => Vec::new(),
        };

        Ok(Self {
            id,
            name,
            tags,
            fields: object,
        })
    }
}

/// Sort direction of a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(QueryError::InvalidQuery(format!(
                "unknown sort direction: '{}'. Use asc or desc.",
                other
            ))),
        }
    }
}

/// One `{column, direction}` pair of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parses `column:direction`. A bare `column` sorts descending.
impl FromStr for SortSpec {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = match s.split_once(':') {
            Some((column, direction)) => (column.trim(), direction.parse()?),
            None => (s.trim(), SortDirection::Desc),
        };
        if column.is_empty() {
            return Err(QueryError::InvalidQuery(format!(
                "sort must look like column:asc or column:desc, got '{}'",
                s
            )));
        }
        Ok(Self {
            column: column.to_string(),
            direction,
        })
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.direction.as_str())
    }
}

/// The request shape sent to the query builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub table_name: String,
    #[serde(default)]
    pub search_value: String,
    #[serde(default)]
    pub selected_tags: Vec<String>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_current_page")]
    pub current_page: u32,
    #[serde(default)]
    pub ids: Vec<String>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_current_page() -> u32 {
    1
}

impl ListQuery {
    /// First page of `table_name` with no filters and the default page size.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            search_value: String::new(),
            selected_tags: Vec::new(),
            sorts: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
            ids: Vec::new(),
        }
    }

    pub fn search(mut self, value: impl Into<String>) -> Self {
        self.search_value = value.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.selected_tags.push(tag.into());
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn page(mut self, current_page: u32, page_size: u32) -> Self {
        self.current_page = current_page;
        self.page_size = page_size;
        self
    }

    pub fn ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// One page of rows plus the number of rows matching before pagination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub data: Vec<Row>,
    pub total_count: u64,
}

/// Where a sort column is read from on a [`Row`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Id,
    Name,
    Field(String),
}

/// A sort key after validation against a [`TableSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSort {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// Describes one collection the query layer can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Collection identifier used as `tableName` (e.g. `modelsData`).
    pub name: String,
    /// JSON key carrying the display name in imported records.
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// JSON key carrying the tag array in imported records.
    #[serde(default = "default_tags_field")]
    pub tags_field: String,
    /// Column sorted descending when a query carries no sorts.
    pub default_sort: String,
    /// Columns a query may sort on. Empty allows any column.
    #[serde(default)]
    pub sortable: Vec<String>,
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_tags_field() -> String {
    "tags".to_string()
}

impl TableSpec {
    /// The `modelsData` collection, ranked by run count.
    pub fn models() -> Self {
        Self {
            name: "modelsData".to_string(),
            name_field: "modelName".to_string(),
            tags_field: "tags".to_string(),
            default_sort: "runs".to_string(),
            sortable: ["runs", "modelName", "creator", "platform", "costToRun", "createdAt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// The `papersData` collection, ranked by total score.
    pub fn papers() -> Self {
        Self {
            name: "papersData".to_string(),
            name_field: "title".to_string(),
            tags_field: "tags".to_string(),
            default_sort: "totalScore".to_string(),
            sortable: ["totalScore", "title", "publishedDate", "arxivId", "authors"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Map a column name onto the row attribute it reads.
    pub fn resolve_column(&self, column: &str) -> ColumnRef {
        if column == "id" {
            ColumnRef::Id
        } else if column == "name" || column == self.name_field {
            ColumnRef::Name
        } else {
            ColumnRef::Field(column.to_string())
        }
    }

    /// Validate a requested sort and resolve its column.
    ///
    /// Column names are restricted to ASCII letters, digits and `_` so they
    /// can be turned into a JSON path by SQL backends.
    pub fn resolve_sort(&self, sort: &SortSpec) -> Result<ResolvedSort, QueryError> {
        let column = sort.column.trim();
        if column.is_empty() {
            return Err(QueryError::InvalidQuery(
                "sort column must not be empty".to_string(),
            ));
        }
        if !column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(QueryError::InvalidQuery(format!(
                "invalid sort column: '{}'",
                column
            )));
        }
        let builtin = column == "id" || column == "name" || column == self.name_field;
        if !builtin && !self.sortable.is_empty() && !self.sortable.iter().any(|c| c == column) {
            return Err(QueryError::InvalidQuery(format!(
                "column '{}' is not sortable on {}",
                column, self.name
            )));
        }
        Ok(ResolvedSort {
            column: self.resolve_column(column),
            direction: sort.direction,
        })
    }

    /// The ordering applied when a query carries no sorts.
    pub fn default_order(&self) -> Vec<ResolvedSort> {
        vec![ResolvedSort {
            column: self.resolve_column(&self.default_sort),
            direction: SortDirection::Desc,
        }]
    }
}

/// The set of collections served, looked up by `tableName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    tables: Vec<TableSpec>,
}

impl Catalogue {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self { tables }
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Like [`get`](Self::get), failing with `InvalidQuery` for unknown names.
    pub fn require(&self, name: &str) -> Result<&TableSpec, QueryError> {
        self.get(name)
            .ok_or_else(|| QueryError::InvalidQuery(format!("unknown table: '{}'", name)))
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }
}

impl Default for Catalogue {
    fn default() -> Self {
        Self::new(vec![TableSpec::models(), TableSpec::papers()])
    }
}
