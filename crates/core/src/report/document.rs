//! Markdown framing for stored reports.

use chrono::{DateTime, Utc};

/// Identifier for a report stored at `at`: `<prefix>_<YYYYmmdd_HHMMSS>`.
///
/// Identifiers sharing a prefix sort chronologically as plain strings.
pub fn report_identifier(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// A synthesized artifact with its header
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub task: String,
    pub generated_at: DateTime<Utc>,
    pub body: String,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>, task: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            task: task.into(),
            generated_at: Utc::now(),
            body: body.into(),
        }
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    /// Identifier under which this document should be stored
    pub fn identifier(&self, prefix: &str) -> String {
        report_identifier(prefix, self.generated_at)
    }

    pub fn render(&self) -> String {
        format!(
            "# {}\n\n**Generated**: {}\n\n**Task**: {}\n\n---\n\n{}",
            self.title,
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            self.task,
            self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_identifier_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(report_identifier("design_report", at), "design_report_20240309_140507");
    }

    #[test]
    fn test_render_frames_body() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let doc = ReportDocument::new("Design Report", "design a sporty SUV", "## A\n\nbody")
            .with_generated_at(at);
        assert_eq!(
            doc.render(),
            "# Design Report\n\n**Generated**: 2024-03-09 14:05:07\n\n**Task**: design a sporty SUV\n\n---\n\n## A\n\nbody"
        );
        assert_eq!(doc.identifier("r"), "r_20240309_140507");
    }
}
