use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{IndexedDocument, SearchError, SearchHit, SearchIndex, DEFAULT_INDEX};

/// In-process search index for tests and offline runs.
///
/// Scores a document by how many query terms occur in its filename (x3),
/// summary (x2) and content, case-insensitively.
pub struct MockSearchIndex {
    docs: Mutex<BTreeMap<String, IndexedDocument>>,
    online: AtomicBool,
    fail_searches: AtomicBool,
}

impl Default for MockSearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            fail_searches: AtomicBool::new(false),
        }
    }

    /// Simulate the service going down (or coming back).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make searches fail with a server error while ping still succeeds.
    pub fn set_fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.docs.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, filename: &str) -> Option<IndexedDocument> {
        self.docs.lock().ok()?.get(filename).cloned()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, IndexedDocument>>, SearchError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(SearchError::Connection("mock://offline".into()));
        }
        self.docs
            .lock()
            .map_err(|e| SearchError::HttpClient(format!("index lock poisoned: {e}")))
    }

    fn rank(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError> {
        let docs = self.guard()?;
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(SearchError::Status {
                status: 500,
                body: "mock search failure".into(),
            });
        }

        let terms: Vec<String> = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = docs
            .values()
            .filter_map(|doc| {
                let filename = doc.filename.to_lowercase();
                let summary = doc.summary.to_lowercase();
                let content = doc.content.to_lowercase();
                let score: f64 = terms
                    .iter()
                    .map(|t| {
                        let mut s = 0.0;
                        if filename.contains(t.as_str()) {
                            s += 3.0;
                        }
                        if summary.contains(t.as_str()) {
                            s += 2.0;
                        }
                        if content.contains(t.as_str()) {
                            s += 1.0;
                        }
                        s
                    })
                    .sum();
                (score > 0.0).then(|| SearchHit {
                    filename: doc.filename.clone(),
                    path: doc.path.clone(),
                    summary: doc.summary.clone(),
                    content: doc.content.clone(),
                    language: doc.language.clone(),
                    score,
                    highlights: Vec::new(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(size);
        Ok(hits)
    }
}

impl SearchIndex for MockSearchIndex {
    fn ping(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn ensure_index(&self) -> Result<(), SearchError> {
        self.guard().map(|_| ())
    }

    fn index_document(&self, doc: &IndexedDocument) -> Result<(), SearchError> {
        self.guard()?.insert(doc.filename.clone(), doc.clone());
        Ok(())
    }

    fn search(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.rank(query, size)
    }

    fn top_matches(&self, query: &str, size: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.rank(query, size)
    }

    fn delete(&self, filename: &str) -> Result<u64, SearchError> {
        Ok(self.guard()?.remove(filename).map_or(0, |_| 1))
    }

    fn clear(&self) -> Result<u64, SearchError> {
        let mut docs = self.guard()?;
        let removed = docs.len() as u64;
        docs.clear();
        Ok(removed)
    }

    fn index_name(&self) -> &str {
        DEFAULT_INDEX
    }
}

#[cfg(test)]
pub(crate) fn sample_document(filename: &str, summary: &str, content: &str) -> IndexedDocument {
    IndexedDocument {
        filename: filename.to_string(),
        path: format!("/data/{filename}"),
        content: content.to_string(),
        summary: summary.to_string(),
        author: "Unknown".to_string(),
        number_of_pages: 1,
        created_date: None,
        language: "en".to_string(),
        extraction_stage: "STRUCTURED".to_string(),
        upload_date: "2024-03-01T10:00:00Z".to_string(),
    }
}
