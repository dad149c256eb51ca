//! Parsed PubMed article data, before it is reduced to an `ArticleRecord`.

use pharmyx_common::{ArticleRecord, NOT_AVAILABLE};

use crate::affiliation::{extract_email, is_pharma_biotech};

/// `Journal/JournalIssue/PubDate` sub-fields, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PubDate {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

impl PubDate {
    /// `Year-Month-Day`, with "N/A" standing in for any missing part.
    pub fn render(&self) -> String {
        let part = |p: &Option<String>| p.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        format!("{}-{}-{}", part(&self.year), part(&self.month), part(&self.day))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorEntry {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    /// Text of the author's first `AffiliationInfo/Affiliation`.
    pub affiliation: Option<String>,
}

impl AuthorEntry {
    pub fn display_name(&self) -> String {
        match (&self.fore_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (None, Some(l)) => l.clone(),
            (Some(f), None) => f.clone(),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

/// The fields of one `PubmedArticle` this service cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubmedArticle {
    pub pmid: String,
    pub title: Option<String>,
    pub pub_date: Option<PubDate>,
    /// Authors in document order.
    pub authors: Vec<AuthorEntry>,
}

impl PubmedArticle {
    /// First author, in document order, with an industry affiliation.
    pub fn industry_author(&self) -> Option<&AuthorEntry> {
        self.authors.iter().find(|a| {
            a.affiliation
                .as_deref()
                .is_some_and(is_pharma_biotech)
        })
    }

    pub fn to_record(&self) -> ArticleRecord {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let publication_date = self
            .pub_date
            .as_ref()
            .map(PubDate::render)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let (affiliation, author_email) = match self.industry_author() {
            Some(author) => {
                let affiliation = author.affiliation.clone().unwrap_or_default();
                let email = extract_email(&affiliation)
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                (affiliation, email)
            }
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };

        ArticleRecord {
            pmid: self.pmid.clone(),
            title,
            publication_date,
            author_email,
            affiliation,
        }
    }
}
