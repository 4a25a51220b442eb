use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Field used to order the file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    #[default]
    UploadTime,
    Size,
}

impl FromStr for SortField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "time" | "uploadtime" | "upload_time" | "upload-time" => Ok(SortField::UploadTime),
            "size" => Ok(SortField::Size),
            _ => Err(anyhow::anyhow!(
                "Invalid sort field: {}. Must be: name, time, or size",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}. Must be: asc or desc", s)),
        }
    }
}

/// Search and ordering applied to the displayed list.
///
/// The default shows everything, newest upload first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub search_term: String,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl FilterSpec {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search_term: term.into(),
            ..Self::default()
        }
    }

    pub fn sorted(sort_by: SortField, sort_order: SortOrder) -> Self {
        Self {
            search_term: String::new(),
            sort_by,
            sort_order,
        }
    }
}
