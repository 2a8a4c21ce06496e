//! arXiv adapter: Atom feed from the export API, parsed with quick-xml.

use chrono::{DateTime, Duration, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::code_urls::extract_code_urls;
use super::{collapse_whitespace, http_client, map_http_error, read_body};
use super::{PaperSource, SearchProfile, SourceError};
use crate::models::{Candidate, SourceKind};

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivSource {
    profile: SearchProfile,
    categories: Vec<String>,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ArxivSource {
    pub fn new(profile: SearchProfile, categories: Vec<String>) -> Self {
        Self {
            profile,
            categories,
            base_url: ARXIV_API_URL.to_string(),
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// `(all:"kw" OR ...) AND (cat:a OR ...) AND ANDNOT all:"neg" ...`
    pub fn build_query(&self) -> String {
        let keyword_terms: Vec<String> = self
            .profile
            .include_terms()
            .into_iter()
            .map(|kw| format!("all:\"{kw}\""))
            .collect();

        let mut parts = vec![format!("({})", keyword_terms.join(" OR "))];

        if !self.categories.is_empty() {
            let category_terms: Vec<String> =
                self.categories.iter().map(|c| format!("cat:{c}")).collect();
            parts.push(format!("({})", category_terms.join(" OR ")));
        }

        for neg in &self.profile.exclude_keywords {
            parts.push(format!("ANDNOT all:\"{neg}\""));
        }

        parts.join(" AND ")
    }

    fn fetch_feed(&self) -> Result<String, SourceError> {
        let max_results = self.profile.max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", self.build_query().as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .map_err(map_http_error)?;
        read_body(response)
    }
}

impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        SourceKind::Arxiv.as_str()
    }

    fn search_recent(&self) -> Result<Vec<Candidate>, SourceError> {
        let xml = self.fetch_feed()?;
        parse_feed(&xml, Utc::now(), self.profile.window_days)
    }
}

// ─── Atom parsing ───────────────────────────────────────────

#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    Comment,
    AuthorName,
    Affiliation,
}

#[derive(Default)]
struct EntryDraft {
    id: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    comment: String,
    authors: Vec<String>,
    affiliations: Vec<String>,
    categories: Vec<String>,
    pdf_url: Option<String>,
}

impl EntryDraft {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Id => self.id = value,
            Field::Title => self.title = value,
            Field::Summary => self.summary = value,
            Field::Published => self.published = value,
            Field::Updated => self.updated = value,
            Field::Comment => self.comment = value,
            Field::AuthorName => {
                if !value.is_empty() {
                    self.authors.push(value);
                }
            }
            Field::Affiliation => {
                if !value.is_empty() && !self.affiliations.contains(&value) {
                    self.affiliations.push(value);
                }
            }
        }
    }

    /// Read `<link>` / `<category>` attributes.
    fn absorb_attributes(&mut self, element: &BytesStart<'_>) {
        let mut href = String::new();
        let mut title = String::new();
        let mut link_type = String::new();
        let mut term = String::new();

        for attr in element.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).to_string();
            match attr.key.as_ref() {
                b"href" => href = value,
                b"title" => title = value,
                b"type" => link_type = value,
                b"term" => term = value,
                _ => {}
            }
        }

        match element.local_name().as_ref() {
            b"link" => {
                let is_pdf = title.eq_ignore_ascii_case("pdf") || link_type == "application/pdf";
                if is_pdf && self.pdf_url.is_none() && !href.is_empty() {
                    self.pdf_url = Some(href);
                }
            }
            b"category" => {
                if !term.is_empty() {
                    self.categories.push(term);
                }
            }
            _ => {}
        }
    }

    fn into_candidate(self) -> Option<Candidate> {
        if self.title.is_empty() || self.summary.is_empty() {
            return None;
        }
        let published_at = parse_atom_time(&self.published)?;
        let updated_at = parse_atom_time(&self.updated)?;

        let external_id = self
            .id
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if external_id.is_empty() {
            return None;
        }

        let pdf_url = self
            .pdf_url
            .unwrap_or_else(|| format!("https://arxiv.org/pdf/{external_id}.pdf"));
        let code_urls = extract_code_urls(&format!("{}\n{}", self.summary, self.comment));

        Some(Candidate {
            source: SourceKind::Arxiv,
            external_id,
            title: self.title,
            abstract_text: self.summary,
            authors: self.authors,
            affiliations: self.affiliations,
            published_at,
            updated_at,
            link: self.id,
            pdf_url,
            code_urls,
            categories: self.categories,
        })
    }
}

fn parse_atom_time(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn text_field(local_name: &[u8]) -> Option<Field> {
    match local_name {
        b"id" => Some(Field::Id),
        b"title" => Some(Field::Title),
        b"summary" => Some(Field::Summary),
        b"published" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        b"comment" => Some(Field::Comment),
        b"name" => Some(Field::AuthorName),
        b"affiliation" => Some(Field::Affiliation),
        _ => None,
    }
}

/// Parse an arXiv Atom feed into candidates published within `window_days`
/// of `now`. Entries lacking a title, summary or timestamps are skipped.
pub fn parse_feed(
    xml: &str,
    now: DateTime<Utc>,
    window_days: u32,
) -> Result<Vec<Candidate>, SourceError> {
    let earliest = now - Duration::days(i64::from(window_days));

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut candidates = Vec::new();
    let mut entry: Option<EntryDraft> = None;
    let mut target: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                if local.as_ref() == b"entry" {
                    entry = Some(EntryDraft::default());
                    target = None;
                } else if let Some(draft) = entry.as_mut() {
                    if let Some(field) = text_field(local.as_ref()) {
                        target = Some(field);
                        text.clear();
                    } else {
                        draft.absorb_attributes(&e);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(draft) = entry.as_mut() {
                    draft.absorb_attributes(&e);
                }
            }
            Ok(Event::Text(t)) => {
                if target.is_some() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| SourceError::Parse(format!("Bad XML text: {e}")))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(c)) => {
                if target.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"entry" {
                    if let Some(candidate) = entry.take().and_then(EntryDraft::into_candidate) {
                        if candidate.published_at >= earliest {
                            candidates.push(candidate);
                        }
                    }
                    target = None;
                } else if let (Some(field), Some(draft)) = (target.take(), entry.as_mut()) {
                    draft.set(field, collapse_whitespace(&text));
                    text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query results</title>
  <id>http://arxiv.org/api/feed-id</id>
  <entry>
    <id>http://arxiv.org/abs/2602.01234v1</id>
    <updated>2026-02-04T10:00:00Z</updated>
    <published>2026-02-04T09:00:00Z</published>
    <title>Graph Learning for
      Traffic Forecasting</title>
    <summary>  We propose a graph model &amp; release code at
      https://github.com/example/traffic-gnn.  </summary>
    <author>
      <name>Alice Smith</name>
      <arxiv:affiliation>MIT</arxiv:affiliation>
    </author>
    <author>
      <name>Bob Jones</name>
      <arxiv:affiliation>MIT</arxiv:affiliation>
    </author>
    <author>
      <name>Carol White</name>
      <arxiv:affiliation>ETH Zurich</arxiv:affiliation>
    </author>
    <arxiv:comment>Project page https://gitlab.com/example/demo).</arxiv:comment>
    <link href="http://arxiv.org/abs/2602.01234v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2602.01234v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2512.00001v2</id>
    <updated>2025-12-01T00:00:00Z</updated>
    <published>2025-12-01T00:00:00Z</published>
    <title>An Old Paper</title>
    <summary>Too old for the window.</summary>
    <author><name>Dan Old</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2602.09999v1</id>
    <updated>2026-02-04T00:00:00Z</updated>
    <published>2026-02-04T00:00:00Z</published>
    <title>No Abstract Here</title>
    <author><name>Eve Blank</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2602.05555v1/</id>
    <updated>2026-02-03T12:00:00+02:00</updated>
    <published>2026-02-03T12:00:00+02:00</published>
    <title>Offset Times</title>
    <summary>Short.</summary>
  </entry>
</feed>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 8, 0, 0).unwrap()
    }

    fn source(include: &[&str], exclude: &[&str], categories: &[&str]) -> ArxivSource {
        ArxivSource::new(
            SearchProfile {
                research_field: "Traffic engineering".into(),
                include_keywords: include.iter().map(|s| s.to_string()).collect(),
                exclude_keywords: exclude.iter().map(|s| s.to_string()).collect(),
                max_results: 50,
                window_days: 7,
            },
            categories.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn parses_recent_complete_entries() {
        let candidates = parse_feed(FEED, now(), 7).unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.external_id.as_str()).collect();
        assert_eq!(ids, vec!["2602.01234v1", "2602.05555v1"]);
    }

    #[test]
    fn entry_fields_normalized() {
        let candidates = parse_feed(FEED, now(), 7).unwrap();
        let paper = &candidates[0];

        assert_eq!(paper.source, SourceKind::Arxiv);
        assert_eq!(paper.title, "Graph Learning for Traffic Forecasting");
        assert_eq!(
            paper.abstract_text,
            "We propose a graph model & release code at https://github.com/example/traffic-gnn."
        );
        assert_eq!(paper.authors, vec!["Alice Smith", "Bob Jones", "Carol White"]);
        assert_eq!(paper.affiliations, vec!["MIT", "ETH Zurich"]);
        assert_eq!(paper.categories, vec!["cs.LG", "cs.AI"]);
        assert_eq!(paper.link, "http://arxiv.org/abs/2602.01234v1");
        assert_eq!(paper.pdf_url, "http://arxiv.org/pdf/2602.01234v1");
        assert_eq!(
            paper.code_urls,
            vec!["https://github.com/example/traffic-gnn", "https://gitlab.com/example/demo"]
        );
        assert_eq!(paper.published_at, Utc.with_ymd_and_hms(2026, 2, 4, 9, 0, 0).unwrap());
    }

    #[test]
    fn offsets_converted_to_utc_and_pdf_defaulted() {
        let candidates = parse_feed(FEED, now(), 7).unwrap();
        let paper = &candidates[1];

        assert_eq!(paper.published_at, Utc.with_ymd_and_hms(2026, 2, 3, 10, 0, 0).unwrap());
        assert_eq!(paper.pdf_url, "https://arxiv.org/pdf/2602.05555v1.pdf");
        assert!(paper.authors.is_empty());
    }

    #[test]
    fn wider_window_admits_old_entries() {
        let candidates = parse_feed(FEED, now(), 120).unwrap();
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn empty_feed_yields_nothing() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert!(parse_feed(xml, now(), 7).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = "<feed><entry><title>x</summary></entry></feed>";
        assert!(matches!(parse_feed(xml, now(), 7), Err(SourceError::Parse(_))));
    }

    #[test]
    fn query_combines_keywords_categories_and_exclusions() {
        let query = source(&["graph learning", "traffic"], &["protein"], &["cs.AI", "cs.LG"])
            .build_query();
        assert_eq!(
            query,
            r#"(all:"graph learning" OR all:"traffic") AND (cat:cs.AI OR cat:cs.LG) AND ANDNOT all:"protein""#
        );
    }

    #[test]
    fn query_falls_back_to_research_field() {
        let query = source(&[], &[], &[]).build_query();
        assert_eq!(query, r#"(all:"Traffic engineering")"#);
    }

    #[test]
    fn unreachable_endpoint_raises() {
        let adapter = source(&["x"], &[], &[]).with_base_url("http://127.0.0.1:9/api/query");
        assert!(matches!(adapter.search_recent(), Err(SourceError::Http(_))));
    }

    #[test]
    fn adapter_name_is_source_tag() {
        assert_eq!(source(&[], &[], &[]).name(), "arxiv");
    }
}
