//! Sort resolution for the listing endpoint.

/// Field sorted on when `sortBy` is absent.
pub const DEFAULT_SORT_FIELD: &str = "publishedAt";

/// Sort direction. Only the literal `asc` selects ascending order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn from_param(order: Option<&str>) -> Self {
        match order {
            Some("asc") => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// The field a listing is sorted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    /// A known article field, as its column name.
    Column(&'static str),
    /// Not an article field. The store applies no ordering for it.
    Unknown(String),
}

impl SortField {
    pub fn from_param(name: &str) -> Self {
        match column_for(name) {
            Some(column) => SortField::Column(column),
            None => SortField::Unknown(name.to_string()),
        }
    }

    pub fn column(&self) -> Option<&'static str> {
        match self {
            SortField::Column(column) => Some(column),
            SortField::Unknown(_) => None,
        }
    }
}

/// Resolved sort: one field and one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn from_params(sort_by: Option<&str>, order: Option<&str>) -> Self {
        let name = sort_by.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SORT_FIELD);
        let field = SortField::from_param(name);
        if let SortField::Unknown(name) = &field {
            tracing::debug!("sortBy {:?} is not an article field, leaving order to the store", name);
        }

        Self {
            field,
            direction: SortDirection::from_param(order),
        }
    }

    /// Newest first, as used by the latest feed.
    pub fn newest_first() -> Self {
        Self {
            field: SortField::Column("published_at"),
            direction: SortDirection::Descending,
        }
    }
}

/// Map an article's JSON field name to its column.
fn column_for(field: &str) -> Option<&'static str> {
    let column = match field {
        "id" => "id",
        "title" => "title",
        "content" => "content",
        "fullContent" => "full_content",
        "preview" => "preview",
        "author" => "author",
        "tags" => "tags",
        "imageUrl" => "image_url",
        "viewCount" => "view_count",
        "isActive" => "is_active",
        "publishedAt" => "published_at",
        "createdAt" => "created_at",
        "updatedAt" => "updated_at",
        _ => return None,
    };
    Some(column)
}
