//! The fixed CMS import schema

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output columns, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    Title,
    Slug,
    Content,
    Excerpt,
    Author,
    PublishedDate,
    FeaturedImage,
    Categories,
    Tags,
    Status,
    SeoTitle,
    SeoDescription,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Title,
        Column::Slug,
        Column::Content,
        Column::Excerpt,
        Column::Author,
        Column::PublishedDate,
        Column::FeaturedImage,
        Column::Categories,
        Column::Tags,
        Column::Status,
        Column::SeoTitle,
        Column::SeoDescription,
    ];

    /// Columns every emitted row must populate
    pub const REQUIRED: [Column; 7] = [
        Column::Title,
        Column::Slug,
        Column::Content,
        Column::Excerpt,
        Column::Author,
        Column::PublishedDate,
        Column::Status,
    ];

    /// Header text
    pub fn header(&self) -> &'static str {
        match self {
            Column::Title => "Title",
            Column::Slug => "Slug",
            Column::Content => "Content",
            Column::Excerpt => "Excerpt",
            Column::Author => "Author",
            Column::PublishedDate => "Published Date",
            Column::FeaturedImage => "Featured Image",
            Column::Categories => "Categories",
            Column::Tags => "Tags",
            Column::Status => "Status",
            Column::SeoTitle => "SEO Title",
            Column::SeoDescription => "SEO Description",
        }
    }

    pub fn is_required(&self) -> bool {
        Column::REQUIRED.contains(self)
    }

    /// Position in the row
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}
