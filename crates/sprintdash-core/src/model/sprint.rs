use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A named iteration owned by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub name: String,
    pub project: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub finish_date: Option<NaiveDate>,
}

impl Sprint {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            project: project.into(),
            start_date: None,
            finish_date: None,
        }
    }

    #[must_use]
    pub fn with_dates(mut self, start: NaiveDate, finish: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.finish_date = Some(finish);
        self
    }
}
