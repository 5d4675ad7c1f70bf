use std::time::Duration;

use reqwest::blocking::Response;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{IndexedDocument, SearchError, SearchHit, SearchIndex, DEFAULT_INDEX};

/// Elasticsearch REST client.
pub struct ElasticsearchClient {
    base_url: String,
    index: String,
    client: reqwest::blocking::Client,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for Elasticsearch");
                reqwest::blocking::Client::new()
            });

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            index: DEFAULT_INDEX.to_string(),
            client,
        }
    }

    /// Default local node at localhost:9200.
    pub fn default_local() -> Self {
        Self::new("http://localhost:9200", 30)
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.index = index.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` followed by percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, SearchError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| SearchError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SearchError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> SearchError {
        if e.is_connect() || e.is_timeout() {
            SearchError::Connection(self.base_url.clone())
        } else {
            SearchError::HttpClient(e.to_string())
        }
    }

    fn check_status(response: Response) -> Result<Response, SearchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(SearchError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn post_json(&self, segments: &[&str], body: &Value) -> Result<Value, SearchError> {
        let response = self
            .client
            .post(self.url(segments)?)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response)?
            .json()
            .map_err(|e| SearchError::ResponseParsing(e.to_string()))
    }

    fn run_search(&self, body: &Value) -> Result<Vec<SearchHit>, SearchError> {
        let response = self.post_json(&[self.index.as_str(), "_search"], body)?;
        parse_hits(response)
    }

    fn delete_by_query(&self, query: Value) -> Result<u64, SearchError> {
        let response = self.post_json(
            &[self.index.as_str(), "_delete_by_query"],
            &json!({ "query": query }),
        )?;
        Ok(response.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }
}

impl SearchIndex for ElasticsearchClient {
    fn ping(&self) -> bool {
        match self.client.head(&self.base_url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %self.base_url, error = %e, "Elasticsearch ping failed");
                false
            }
        }
    }

    fn ensure_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .head(self.url(&[self.index.as_str()])?)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Self::check_status(response).map(|_| ());
        }

        let response = self
            .client
            .put(self.url(&[self.index.as_str()])?)
            .json(&index_definition())
            .send()
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response)?;
        info!(index = %self.index, "Created search index");
        Ok(())
    }

    fn index_document(&self, doc: &IndexedDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.url(&[self.index.as_str(), "_doc", doc.filename.as_str()])?)
            .json(doc)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        Self::check_status(response)?;
        info!(
            document = %doc.filename,
            pages = doc.number_of_pages,
            "Indexed document"
        );
        Ok(())
    }

    fn search(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError> {
        let hits = self.run_search(&broad_query(query, size))?;
        debug!(query, hits = hits.len(), "Search complete");
        Ok(hits)
    }

    fn top_matches(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.run_search(&relevance_query(query, size))
    }

    fn delete(&self, filename: &str) -> Result<u64, SearchError> {
        let deleted = self.delete_by_query(json!({ "term": { "filename": { "value": filename } } }))?;
        info!(document = filename, deleted, "Removed document from index");
        Ok(deleted)
    }

    fn clear(&self) -> Result<u64, SearchError> {
        let deleted = self.delete_by_query(json!({ "match_all": {} }))?;
        info!(index = %self.index, deleted, "Cleared search index");
        Ok(deleted)
    }

    fn index_name(&self) -> &str {
        &self.index
    }
}

/// Settings and mappings: a light Polish stemmer for text fields and a
/// Porter-stemmed English analyzer, keywords for exact-match fields.
fn index_definition() -> Value {
    json!({
        "settings": {
            "analysis": {
                "analyzer": {
                    "custom_polish": {
                        "tokenizer": "standard",
                        "filter": ["lowercase", "polish_stem"]
                    },
                    "custom_english": {
                        "tokenizer": "standard",
                        "filter": ["lowercase", "porter_stem"]
                    }
                },
                "filter": {
                    "polish_stem": { "type": "stemmer", "language": "light_polish" }
                }
            }
        },
        "mappings": {
            "properties": {
                "filename": { "type": "keyword" },
                "path": { "type": "keyword" },
                "author": { "type": "text" },
                "number_of_pages": { "type": "integer" },
                "created_date": { "type": "date" },
                "summary": { "type": "text", "analyzer": "custom_polish" },
                "content": { "type": "text", "analyzer": "custom_polish" },
                "language": { "type": "keyword" },
                "extraction_stage": { "type": "keyword" },
                "upload_date": { "type": "date" }
            }
        }
    })
}

fn broad_query(query: &str, size: usize) -> Value {
    json!({
        "size": size,
        "query": {
            "bool": {
                "should": [
                    {
                        "multi_match": {
                            "query": query,
                            "fields": ["filename^3", "author^2", "summary^2", "content"],
                            "type": "best_fields",
                            "fuzziness": "AUTO"
                        }
                    },
                    {
                        "match_phrase_prefix": {
                            "content": { "query": query, "slop": 3 }
                        }
                    },
                    {
                        "wildcard": {
                            "content": format!("*{}*", escape_wildcard(&query.to_lowercase()))
                        }
                    }
                ],
                "minimum_should_match": 1
            }
        },
        "highlight": {
            "fields": { "content": {}, "summary": {} }
        }
    })
}

fn relevance_query(query: &str, size: usize) -> Value {
    json!({
        "size": size,
        "query": {
            "multi_match": {
                "query": query,
                "fields": ["filename^3", "summary^2", "content"],
                "fuzziness": "AUTO"
            }
        }
    })
}

/// Keep user input from acting as wildcard syntax.
fn escape_wildcard(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Deserialize)]
struct HitSource {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    language: Option<String>,
}

fn parse_hits(response: Value) -> Result<Vec<SearchHit>, SearchError> {
    let Some(hits) = response.pointer("/hits/hits").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    hits.iter()
        .map(|hit| {
            let source: HitSource = serde_json::from_value(
                hit.get("_source").cloned().unwrap_or(Value::Null),
            )
            .map_err(|e| SearchError::ResponseParsing(e.to_string()))?;

            let highlights = hit
                .get("highlight")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .values()
                        .filter_map(Value::as_array)
                        .flatten()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            Ok(SearchHit {
                filename: source.filename,
                path: source.path,
                summary: source.summary,
                content: source.content,
                language: source.language.unwrap_or_else(|| "unknown".into()),
                score: hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
                highlights,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = ElasticsearchClient::new("http://localhost:9200/", 5);
        assert_eq!(client.base_url(), "http://localhost:9200");
        assert_eq!(client.index_name(), DEFAULT_INDEX);
    }

    #[test]
    fn urls_encode_filenames() {
        let client = ElasticsearchClient::default_local();
        let url = client.url(&["pdf_documents", "_doc", "raport roczny/2024.pdf"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9200/pdf_documents/_doc/raport%20roczny%2F2024.pdf"
        );
    }

    #[test]
    fn custom_index_name() {
        let client = ElasticsearchClient::default_local().with_index("archive");
        assert_eq!(client.index_name(), "archive");
    }

    #[test]
    fn broad_query_combines_three_strategies() {
        let body = broad_query("Faktura", 10);
        let should = body.pointer("/query/bool/should").unwrap().as_array().unwrap();
        assert_eq!(should.len(), 3);
        assert_eq!(should[0]["multi_match"]["fields"][0], "filename^3");
        assert_eq!(should[1]["match_phrase_prefix"]["content"]["slop"], 3);
        assert_eq!(should[2]["wildcard"]["content"], "*faktura*");
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        assert!(body["highlight"]["fields"].get("summary").is_some());
    }

    #[test]
    fn wildcard_input_is_escaped() {
        let body = broad_query("a*b?", 10);
        assert_eq!(body["query"]["bool"]["should"][2]["wildcard"]["content"], "*a\\*b\\?*");
    }

    #[test]
    fn relevance_query_targets_three_fields() {
        let body = relevance_query("umowa", 5);
        assert_eq!(body["size"], 5);
        assert_eq!(
            body["query"]["multi_match"]["fields"],
            json!(["filename^3", "summary^2", "content"])
        );
        assert_eq!(body["query"]["multi_match"]["fuzziness"], "AUTO");
    }

    #[test]
    fn index_definition_has_polish_analyzer() {
        let def = index_definition();
        assert_eq!(
            def.pointer("/settings/analysis/filter/polish_stem/language").unwrap(),
            "light_polish"
        );
        assert_eq!(def.pointer("/mappings/properties/filename/type").unwrap(), "keyword");
    }

    #[test]
    fn hits_are_parsed_with_highlights() {
        let response = json!({
            "hits": {
                "hits": [
                    {
                        "_score": 2.5,
                        "_source": {
                            "filename": "umowa.pdf",
                            "path": "/data/umowa.pdf",
                            "summary": "Umowa najmu",
                            "content": "Umowa najmu lokalu",
                            "language": "pl"
                        },
                        "highlight": { "content": ["<em>Umowa</em> najmu lokalu"] }
                    },
                    { "_score": 1.0, "_source": { "filename": "scan.pdf" } }
                ]
            }
        });
        let hits = parse_hits(response).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].filename, "umowa.pdf");
        assert_eq!(hits[0].score, 2.5);
        assert_eq!(hits[0].highlights, vec!["<em>Umowa</em> najmu lokalu"]);
        assert_eq!(hits[1].language, "unknown");
        assert!(hits[1].summary.is_empty());
    }

    #[test]
    fn missing_hits_is_empty() {
        assert!(parse_hits(json!({ "took": 1 })).unwrap().is_empty());
    }

    #[test]
    fn unreachable_service() {
        let client = ElasticsearchClient::new("http://127.0.0.1:9", 2);
        assert!(!client.ping());
        assert!(matches!(
            client.search("x", 10),
            Err(SearchError::Connection(_))
        ));
    }
}
