/// The finished recap: headline, fact block, and the narrative when one
/// passed the fact lock.

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::consistency::LedgerStatus;
use crate::core::packager::{FactSheet, NarrativeOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecapDocument {
    pub title: String,
    pub date: NaiveDate,
    pub headline: String,
    pub fact_block: String,
    /// `None` when every attempt was rejected; the document is fact-only.
    pub narrative: Option<String>,
    pub reconciled: bool,
}

impl RecapDocument {
    pub fn assemble(sheet: &FactSheet, date: NaiveDate, outcome: &NarrativeOutcome) -> Self {
        Self {
            title: format!(
                "{} vs. {}, {}",
                sheet.subject().name,
                sheet.opponent().name,
                date.format("%B %-d, %Y")
            ),
            date,
            headline: sheet.headline(),
            fact_block: sheet.fact_block(),
            narrative: outcome.text().map(str::to_string),
            reconciled: sheet.status() != LedgerStatus::Verified,
        }
    }

    pub fn is_fact_only(&self) -> bool {
        self.narrative.is_none()
    }

    /// Plain-text rendering: headline, narrative, blank line, fact block.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.headline);
        out.push_str("\n\n");
        if let Some(narrative) = &self.narrative {
            out.push_str(narrative);
            out.push_str("\n\n");
        }
        out.push_str(&self.fact_block);
        out.push('\n');
        out
    }

    /// A self-contained HTML page.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&self.headline)));
        html.push_str(&format!(
            "<p class=\"date\">{}</p>\n",
            self.date.format("%Y-%m-%d")
        ));
        if let Some(narrative) = &self.narrative {
            for paragraph in narrative.split("\n\n").filter(|p| !p.trim().is_empty()) {
                html.push_str(&format!("<p>{}</p>\n", escape_html(paragraph.trim())));
            }
        }
        html.push_str("<ul class=\"facts\">\n");
        for line in self.fact_block.lines() {
            html.push_str(&format!("<li>{}</li>\n", escape_html(line)));
        }
        html.push_str("</ul>\n</body>\n</html>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
