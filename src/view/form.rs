//! Line filter form

/// Free-text line number filter.
///
/// Text is kept verbatim: no trimming, no format checks. Empty text means
/// "all lines".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryForm {
    text: String,
}

/// Vehicles query produced by the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleQuery {
    filter: Option<String>,
}

impl VehicleQuery {
    pub fn new(text: &str) -> Self {
        Self {
            filter: (!text.is_empty()).then(|| text.to_string()),
        }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

impl QueryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text; returns the resulting query when it changed
    pub fn input(&mut self, text: &str) -> Option<VehicleQuery> {
        if self.text == text {
            return None;
        }
        self.text = text.to_string();
        Some(self.submit())
    }

    /// Query for the current text
    pub fn submit(&self) -> VehicleQuery {
        VehicleQuery::new(&self.text)
    }
}
