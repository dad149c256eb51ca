//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (JSON, query → PMIDs)
//!   efetch:  {base}/efetch.fcgi   (XML, one PMID → PubmedArticle)

use std::time::Duration;

use async_trait::async_trait;
use pharmyx_common::{EntrezCredentials, FetchError, PharmyxError};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::ArticleSource;
use crate::models::{AuthorEntry, PubDate, PubmedArticle};

pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PubMedClient {
    client: reqwest::Client,
    base: String,
}

impl PubMedClient {
    pub fn new() -> pharmyx_common::Result<Self> {
        Self::with_base_url(DEFAULT_EUTILS_BASE, DEFAULT_TIMEOUT)
    }

    /// Client pointed at another E-utilities root (a mirror, or a mock in tests).
    pub fn with_base_url(base: &str, timeout: Duration) -> pharmyx_common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pharmyx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, utility: &str) -> String {
        format!("{}/{}.fcgi", self.base, utility)
    }

    /// Search PubMed and return up to `max` PMIDs in relevance order.
    #[instrument(skip(self, credentials))]
    pub async fn esearch(
        &self,
        query: &str,
        credentials: &EntrezCredentials,
        max: usize,
    ) -> pharmyx_common::Result<Vec<String>> {
        let mut params = credentials.params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", query.to_string()));
        params.push(("retmax", max.to_string()));
        params.push(("retmode", "json".to_string()));

        let resp = self
            .client
            .get(self.endpoint("esearch"))
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PharmyxError::Status { status: status.as_u16() });
        }
        let body = resp.text().await?;
        let mut ids = parse_esearch_json(&body)?;
        ids.truncate(max);

        debug!(count = ids.len(), ?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch and parse the PubMed XML record for a single PMID.
    #[instrument(skip(self, credentials))]
    pub async fn efetch(
        &self,
        pmid: &str,
        credentials: &EntrezCredentials,
    ) -> Result<PubmedArticle, FetchError> {
        let mut params = credentials.params();
        params.push(("db", "pubmed".to_string()));
        params.push(("id", pmid.to_string()));
        params.push(("retmode", "xml".to_string()));

        let resp = self
            .client
            .get(self.endpoint("efetch"))
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }
        let xml = resp.text().await?;
        parse_pubmed_article(pmid, &xml)
    }
}

#[async_trait]
impl ArticleSource for PubMedClient {
    async fn search_ids(
        &self,
        query: &str,
        credentials: &EntrezCredentials,
        max_results: usize,
    ) -> pharmyx_common::Result<Vec<String>> {
        self.esearch(query, credentials, max_results).await
    }

    async fn fetch_article(
        &self,
        pmid: &str,
        credentials: &EntrezCredentials,
    ) -> Result<PubmedArticle, FetchError> {
        self.efetch(pmid, credentials).await
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
    /// Top-level error, e.g. an invalid API key.
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

fn parse_esearch_json(body: &str) -> pharmyx_common::Result<Vec<String>> {
    let resp: ESearchResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.error {
        return Err(PharmyxError::Entrez(err));
    }
    let result = resp
        .esearchresult
        .ok_or_else(|| PharmyxError::Entrez("response has no esearchresult".to_string()))?;
    if let Some(err) = result.error {
        return Err(PharmyxError::Entrez(err));
    }
    Ok(result.idlist)
}

// Element paths relative to <PubmedArticle>.
const TITLE_PATH: &[&str] = &["PubmedArticle", "MedlineCitation", "Article", "ArticleTitle"];
const PUB_DATE_PATH: &[&str] = &[
    "PubmedArticle", "MedlineCitation", "Article", "Journal", "JournalIssue", "PubDate",
];
const AUTHOR_PATH: &[&str] = &["PubmedArticle", "MedlineCitation", "Article", "AuthorList", "Author"];
const AFFILIATION_INFO_PATH: &[&str] = &[
    "PubmedArticle", "MedlineCitation", "Article", "AuthorList", "Author", "AffiliationInfo",
];

fn path_is(rel: &[String], expected: &[&str]) -> bool {
    rel.len() == expected.len() && rel.iter().zip(expected).all(|(a, b)| a == b)
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Year,
    Month,
    Day,
    LastName,
    ForeName,
    Affiliation,
}

/// Text being collected for one element, including any nested markup.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

struct ArticleBuilder {
    /// Index of `PubmedArticle` in the element path.
    base: usize,
    title: Option<String>,
    pub_date: Option<PubDate>,
    authors: Vec<AuthorEntry>,
    author: Option<AuthorEntry>,
    affiliation_infos: usize,
}

impl ArticleBuilder {
    fn new(base: usize) -> Self {
        Self {
            base,
            title: None,
            pub_date: None,
            authors: Vec::new(),
            author: None,
            affiliation_infos: 0,
        }
    }

    fn on_start(&mut self, rel: &[String]) -> Option<Field> {
        if path_is(rel, TITLE_PATH) {
            return Some(Field::Title);
        }
        if path_is(rel, PUB_DATE_PATH) {
            self.pub_date = Some(PubDate::default());
            return None;
        }
        if path_is(rel, AUTHOR_PATH) {
            self.author = Some(AuthorEntry::default());
            self.affiliation_infos = 0;
            return None;
        }
        if path_is(rel, AFFILIATION_INFO_PATH) {
            self.affiliation_infos += 1;
            return None;
        }

        let (leaf, parent) = rel.split_last()?;
        if path_is(parent, PUB_DATE_PATH) {
            return match leaf.as_str() {
                "Year" => Some(Field::Year),
                "Month" => Some(Field::Month),
                "Day" => Some(Field::Day),
                _ => None,
            };
        }
        if path_is(parent, AUTHOR_PATH) {
            return match leaf.as_str() {
                "LastName" | "CollectiveName" => Some(Field::LastName),
                "ForeName" => Some(Field::ForeName),
                _ => None,
            };
        }
        // Only the author's first AffiliationInfo is considered.
        if path_is(parent, AFFILIATION_INFO_PATH)
            && leaf == "Affiliation"
            && self.affiliation_infos == 1
        {
            return Some(Field::Affiliation);
        }
        None
    }

    fn on_end(&mut self, rel: &[String]) {
        if path_is(rel, AUTHOR_PATH) {
            if let Some(author) = self.author.take() {
                self.authors.push(author);
            }
        }
    }

    fn finish_capture(&mut self, capture: Capture) {
        let text = capture.text.trim();
        if text.is_empty() {
            return;
        }
        let text = text.to_string();
        match capture.field {
            Field::Title => self.title = Some(text),
            Field::Year => self.pub_date.get_or_insert_with(PubDate::default).year = Some(text),
            Field::Month => self.pub_date.get_or_insert_with(PubDate::default).month = Some(text),
            Field::Day => self.pub_date.get_or_insert_with(PubDate::default).day = Some(text),
            Field::LastName => {
                if let Some(a) = self.author.as_mut() {
                    a.last_name = Some(text);
                }
            }
            Field::ForeName => {
                if let Some(a) = self.author.as_mut() {
                    a.fore_name = Some(text);
                }
            }
            Field::Affiliation => {
                if let Some(a) = self.author.as_mut() {
                    a.affiliation = Some(text);
                }
            }
        }
    }

    fn build(self, pmid: &str) -> PubmedArticle {
        PubmedArticle {
            pmid: pmid.to_string(),
            title: self.title,
            pub_date: self.pub_date,
            authors: self.authors,
        }
    }
}

#[derive(Default)]
struct ArticleParser {
    path: Vec<String>,
    article: Option<ArticleBuilder>,
    capture: Option<Capture>,
}

impl ArticleParser {
    fn open(&mut self, name: String) {
        self.path.push(name);
        if self.article.is_none() {
            if self.path.last().is_some_and(|n| n == "PubmedArticle") {
                self.article = Some(ArticleBuilder::new(self.path.len() - 1));
            }
            return;
        }
        let Some(article) = self.article.as_mut() else {
            return;
        };
        // Markup nested inside a captured field (<i>, <sup>, ...) is flattened.
        if self.capture.is_some() {
            return;
        }
        if let Some(field) = article.on_start(&self.path[article.base..]) {
            self.capture = Some(Capture {
                field,
                depth: self.path.len(),
                text: String::new(),
            });
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    /// Returns true when the first `PubmedArticle` has just closed.
    fn close(&mut self) -> bool {
        let depth = self.path.len();
        let mut finished = false;
        if let Some(article) = self.article.as_mut() {
            if let Some(capture) = self.capture.take_if(|c| c.depth == depth) {
                article.finish_capture(capture);
            }
            if depth > article.base {
                article.on_end(&self.path[article.base..]);
            }
            finished = depth == article.base + 1;
        }
        self.path.pop();
        finished
    }
}

/// Parse an efetch XML payload into the first `PubmedArticle` it holds.
///
/// Handles the <PubmedArticleSet><PubmedArticle> structure. A payload with
/// no `PubmedArticle` (a book record, an error document) is `NoData`.
pub fn parse_pubmed_article(pmid: &str, xml: &str) -> Result<PubmedArticle, FetchError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = ArticleParser::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                parser.open(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Empty(ref e)) => {
                parser.open(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                if parser.close() {
                    break;
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FetchError::Parse(format!("bad text for PMID {pmid}: {err}")))?;
                parser.text(&text);
            }
            Ok(Event::CData(e)) => {
                parser.text(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                if parser.close() {
                    break;
                }
            }
            Ok(Event::Eof) => {
                return match parser.article {
                    Some(_) => Err(FetchError::Parse(format!(
                        "document ended inside PubmedArticle for PMID {pmid}"
                    ))),
                    None => Err(FetchError::NoData(pmid.to_string())),
                };
            }
            Err(e) => {
                return Err(FetchError::Parse(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    match parser.article {
        Some(article) => Ok(article.build(pmid)),
        None => Err(FetchError::NoData(pmid.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FULL_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <DateCompleted><Year>2024</Year><Month>02</Month><Day>01</Day></DateCompleted>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <Volume>12</Volume>
            <PubDate><Year>2023</Year><Month>Nov</Month><Day>15</Day></PubDate>
          </JournalIssue>
          <Title>Journal of Drug Discovery</Title>
        </Journal>
        <ArticleTitle>Inhibition of <i>KRAS</i> G12D &amp; tumour growth.</ArticleTitle>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y">
            <LastName>Smith</LastName><ForeName>John</ForeName>
            <AffiliationInfo><Affiliation>Department of Oncology, State University, Boston, MA.</Affiliation></AffiliationInfo>
          </Author>
          <Author ValidYN="Y">
            <LastName>Doe</LastName><ForeName>Jane</ForeName>
            <AffiliationInfo><Affiliation>Acme Biotech Inc, Cambridge, MA, USA. Electronic address: jane.doe@acmebio.com.</Affiliation></AffiliationInfo>
            <AffiliationInfo><Affiliation>Second Pharma Ltd.</Affiliation></AffiliationInfo>
          </Author>
        </AuthorList>
        <ArticleDate DateType="Electronic"><Year>2023</Year><Month>10</Month><Day>01</Day></ArticleDate>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_full_article() {
        let article = parse_pubmed_article("38000001", FULL_XML).unwrap();
        assert_eq!(article.pmid, "38000001");
        assert_eq!(article.title.as_deref(), Some("Inhibition of KRAS G12D & tumour growth."));
        assert_eq!(
            article.pub_date,
            Some(PubDate {
                year: Some("2023".into()),
                month: Some("Nov".into()),
                day: Some("15".into()),
            })
        );
        assert_eq!(article.authors.len(), 2);
        assert_eq!(article.authors[0].display_name(), "John Smith");
        assert_eq!(
            article.authors[1].affiliation.as_deref(),
            Some("Acme Biotech Inc, Cambridge, MA, USA. Electronic address: jane.doe@acmebio.com.")
        );

        let record = article.to_record();
        assert_eq!(record.publication_date, "2023-Nov-15");
        assert_eq!(record.author_email, "jane.doe@acmebio.com");
    }

    #[test]
    fn test_parse_medline_date_leaves_parts_missing() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article>
            <Journal><JournalIssue><PubDate><MedlineDate>2019 Jan-Feb</MedlineDate></PubDate></JournalIssue></Journal>
            <ArticleTitle>T</ArticleTitle>
        </Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let article = parse_pubmed_article("1", xml).unwrap();
        assert_eq!(article.to_record().publication_date, "N/A-N/A-N/A");
    }

    #[test]
    fn test_parse_year_only_date() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article>
            <Journal><JournalIssue><PubDate><Year>2021</Year></PubDate></JournalIssue></Journal>
        </Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let record = parse_pubmed_article("1", xml).unwrap().to_record();
        assert_eq!(record.publication_date, "2021-N/A-N/A");
        assert_eq!(record.title, "N/A");
    }

    #[test]
    fn test_parse_missing_pub_date_is_sentinel() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article>
            <Journal><Title>J</Title></Journal><ArticleTitle>T</ArticleTitle>
        </Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let record = parse_pubmed_article("1", xml).unwrap().to_record();
        assert_eq!(record.publication_date, "N/A");
    }

    #[test]
    fn test_only_first_affiliation_info_counts() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article>
            <AuthorList><Author><LastName>A</LastName>
              <AffiliationInfo><Affiliation>State University</Affiliation></AffiliationInfo>
              <AffiliationInfo><Affiliation>Acme Pharma</Affiliation></AffiliationInfo>
            </Author></AuthorList>
        </Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let article = parse_pubmed_article("1", xml).unwrap();
        assert_eq!(article.authors[0].affiliation.as_deref(), Some("State University"));
        assert!(!article.to_record().has_affiliation());
    }

    #[test]
    fn test_book_article_is_no_data() {
        let xml = r#"<PubmedArticleSet><PubmedBookArticle><BookDocument><PMID>9</PMID></BookDocument></PubmedBookArticle></PubmedArticleSet>"#;
        let err = parse_pubmed_article("9", xml).unwrap_err();
        assert!(matches!(err, FetchError::NoData(ref p) if p == "9"));
    }

    #[test]
    fn test_empty_payload_is_no_data() {
        let err = parse_pubmed_article("9", "").unwrap_err();
        assert!(matches!(err, FetchError::NoData(_)));
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let xml = "<PubmedArticleSet><PubmedArticle><MedlineCitation></Article></PubmedArticle>";
        let err = parse_pubmed_article("9", xml).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn test_parse_esearch_json() {
        let body = r#"{"header":{"type":"esearch"},"esearchresult":{"count":"3","retmax":"2","idlist":["111","222"]}}"#;
        assert_eq!(parse_esearch_json(body).unwrap(), vec!["111", "222"]);
    }

    #[test]
    fn test_parse_esearch_error_payload() {
        let body = r#"{"esearchresult":{"ERROR":"Invalid query"}}"#;
        assert!(matches!(parse_esearch_json(body), Err(PharmyxError::Entrez(_))));
        let body = r#"{"error":"API key invalid","api-key":"x"}"#;
        assert!(matches!(parse_esearch_json(body), Err(PharmyxError::Entrez(_))));
    }

    #[tokio::test]
    async fn esearch_sets_expected_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .and(query_param("db", "pubmed"))
            .and(query_param("term", "kinase inhibitor"))
            .and(query_param("retmax", "5"))
            .and(query_param("retmode", "json"))
            .and(query_param("email", "me@lab.org"))
            .and(query_param("api_key", "k123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "esearchresult": {"count": "2", "idlist": ["1", "2"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PubMedClient::with_base_url(&server.uri(), DEFAULT_TIMEOUT).unwrap();
        let creds = EntrezCredentials::new("me@lab.org", Some("k123".into()));
        let ids = client.esearch("kinase inhibitor", &creds, 5).await.unwrap();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn esearch_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = PubMedClient::with_base_url(&server.uri(), DEFAULT_TIMEOUT).unwrap();
        let creds = EntrezCredentials::new("me@lab.org", None);
        let err = client.esearch("q", &creds, 5).await.unwrap_err();
        assert!(matches!(err, PharmyxError::Status { status: 429 }));
    }

    #[tokio::test]
    async fn efetch_parses_single_article() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/efetch.fcgi"))
            .and(query_param("id", "38000001"))
            .and(query_param("retmode", "xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FULL_XML))
            .mount(&server)
            .await;

        let client = PubMedClient::with_base_url(&server.uri(), DEFAULT_TIMEOUT).unwrap();
        let creds = EntrezCredentials::new("me@lab.org", None);
        let article = client.efetch("38000001", &creds).await.unwrap();
        assert_eq!(article.authors.len(), 2);
    }

    #[tokio::test]
    async fn efetch_server_error_is_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/efetch.fcgi"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = PubMedClient::with_base_url(&server.uri(), DEFAULT_TIMEOUT).unwrap();
        let creds = EntrezCredentials::new("me@lab.org", None);
        let err = client.efetch("1", &creds).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 502 }));
    }
}
