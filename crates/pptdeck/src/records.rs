use std::collections::BTreeSet;

use crate::api::ppts::{ListParams, PptsApi, Record, RecordInput, RecordPage};
use crate::api::{ApiClient, ApiError};

pub const DEFAULT_SORT: &str = "created_at_desc";

/// Cached list of the signed-in user's presentation records with local
/// search and tag filtering.
pub struct RecordsStore {
    client: ApiClient,
    records: Vec<Record>,
    current: Option<Record>,
    loading: bool,
    error: Option<String>,
    search_query: String,
    selected_tag: String,
    sort_by: String,
}

impl RecordsStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            records: Vec::new(),
            current: None,
            loading: false,
            error: None,
            search_query: String::new(),
            selected_tag: String::new(),
            sort_by: DEFAULT_SORT.to_string(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn current(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filtered_records(&self) -> Vec<&Record> {
        let query = self.search_query.to_lowercase();
        self.records
            .iter()
            .filter(|r| query.is_empty() || record_matches(r, &query))
            .filter(|r| self.selected_tag.is_empty() || r.tags.contains(&self.selected_tag))
            .collect()
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|r| r.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn set_selected_tag(&mut self, tag: impl Into<String>) {
        self.selected_tag = tag.into();
    }

    pub fn set_sort_by(&mut self, sort: impl Into<String>) {
        self.sort_by = sort.into();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Fetches a page using the current search, tag and sort, with any field
    /// set in `overrides` taking precedence.
    pub fn fetch_records(&mut self, overrides: ListParams) -> Result<RecordPage, ApiError> {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let params = ListParams {
            q: overrides.q.or_else(|| non_empty(&self.search_query)),
            tag: overrides.tag.or_else(|| non_empty(&self.selected_tag)),
            sort: overrides.sort.or_else(|| Some(self.sort_by.clone())),
            limit: overrides.limit,
            offset: overrides.offset,
        };
        let page = self.run("Failed to fetch records", |api| api.list(&params))?;
        self.records = page.items.clone();
        Ok(page)
    }

    pub fn fetch_record(&mut self, id: i64) -> Result<Record, ApiError> {
        let record = self.run("Failed to fetch record", |api| api.get(id))?;
        self.current = Some(record.clone());
        Ok(record)
    }

    pub fn create_record(&mut self, input: &RecordInput) -> Result<Record, ApiError> {
        let record = self.run("Failed to create record", |api| api.create(input))?;
        self.records.push(record.clone());
        Ok(record)
    }

    pub fn update_record(&mut self, id: i64, input: &RecordInput) -> Result<Record, ApiError> {
        let updated = self.run("Failed to update record", |api| api.update(id, input))?;
        if let Some(slot) = self.records.iter_mut().find(|r| r.id == id) {
            *slot = updated.clone();
        }
        if self.current.as_ref().is_some_and(|r| r.id == id) {
            self.current = Some(updated.clone());
        }
        Ok(updated)
    }

    pub fn delete_record(&mut self, id: i64) -> Result<(), ApiError> {
        self.run("Failed to delete record", |api| api.delete(id))?;
        self.records.retain(|r| r.id != id);
        if self.current.as_ref().is_some_and(|r| r.id == id) {
            self.current = None;
        }
        Ok(())
    }

    fn run<T, F>(&mut self, fallback: &str, call: F) -> Result<T, ApiError>
    where
        F: FnOnce(&PptsApi<'_>) -> Result<T, ApiError>,
    {
        self.loading = true;
        self.error = None;
        let result = call(&PptsApi::new(&self.client));
        self.loading = false;
        if let Err(e) = &result {
            self.error = Some(match e {
                ApiError::Status {
                    message: Some(m), ..
                } if !m.is_empty() => m.clone(),
                _ => fallback.to_string(),
            });
        }
        result
    }
}

fn record_matches(record: &Record, query: &str) -> bool {
    let contains = |s: &str| s.to_lowercase().contains(query);
    contains(&record.name)
        || record.title.as_deref().is_some_and(contains)
        || record.description.as_deref().is_some_and(contains)
        || record.tags.iter().any(|t| contains(t))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::http::testing::FakeTransport;
    use crate::session::SessionContext;

    fn record(id: i64, name: &str, title: Option<&str>, tags: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": name,
            "title": title,
            "tags": tags,
        })
    }

    fn store_with(transport: &Rc<FakeTransport>) -> RecordsStore {
        RecordsStore::new(ApiClient::new(
            transport.clone(),
            "http://api.test/api/v1",
            Rc::new(SessionContext::in_memory()),
        ))
    }

    fn loaded_store(transport: &Rc<FakeTransport>) -> RecordsStore {
        let page = serde_json::json!({
            "total": 3,
            "items": [
                record(1, "q3-review", Some("Quarterly Numbers"), &["finance", "internal"]),
                record(2, "launch", None, &["marketing"]),
                record(3, "onboarding", Some("Welcome aboard"), &["internal"]),
            ]
        });
        transport.respond(200, &page.to_string());
        let mut store = store_with(transport);
        store.fetch_records(ListParams::default()).unwrap();
        store
    }

    #[test]
    fn test_fetch_uses_store_filters_and_sort() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, r#"{"items":[]}"#);
        let mut store = store_with(&transport);
        store.set_search_query("deck");

        store
            .fetch_records(ListParams {
                limit: Some(5),
                ..ListParams::default()
            })
            .unwrap();
        let query = transport.requests.borrow()[0].query.clone();
        assert!(query.contains(&("q".to_string(), "deck".to_string())));
        assert!(query.contains(&("sort".to_string(), DEFAULT_SORT.to_string())));
        assert!(query.contains(&("limit".to_string(), "5".to_string())));
        assert!(!query.iter().any(|(k, _)| k == "tag"));
    }

    #[test]
    fn test_filtered_records_match_any_field_case_insensitively() {
        let transport = Rc::new(FakeTransport::new());
        let mut store = loaded_store(&transport);

        store.set_search_query("NUMBERS");
        let names: Vec<_> = store.filtered_records().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["q3-review"]);

        store.set_search_query("internal");
        assert_eq!(store.filtered_records().len(), 2);

        store.set_selected_tag("finance");
        assert_eq!(store.filtered_records().len(), 1);

        store.set_search_query("");
        store.set_selected_tag("");
        assert_eq!(store.filtered_records().len(), 3);
    }

    #[test]
    fn test_all_tags_sorted_and_deduplicated() {
        let transport = Rc::new(FakeTransport::new());
        let store = loaded_store(&transport);
        assert_eq!(store.all_tags(), vec!["finance", "internal", "marketing"]);
    }

    #[test]
    fn test_update_and_delete_keep_list_and_current_in_sync() {
        let transport = Rc::new(FakeTransport::new());
        let mut store = loaded_store(&transport);

        transport.respond(200, &record(2, "launch", None, &[]).to_string());
        store.fetch_record(2).unwrap();

        transport.respond(200, &record(2, "launch", Some("Launch plan"), &[]).to_string());
        store
            .update_record(
                2,
                &RecordInput {
                    name: "launch".into(),
                    title: Some("Launch plan".into()),
                    ..RecordInput::default()
                },
            )
            .unwrap();
        assert_eq!(store.records()[1].title.as_deref(), Some("Launch plan"));
        assert_eq!(store.current().unwrap().title.as_deref(), Some("Launch plan"));

        transport.respond(204, "");
        store.delete_record(2).unwrap();
        assert_eq!(store.records().len(), 2);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_failure_sets_error_and_keeps_records() {
        let transport = Rc::new(FakeTransport::new());
        let mut store = loaded_store(&transport);

        transport.respond(500, r#"{"code":"server_error"}"#);
        assert!(store.fetch_records(ListParams::default()).is_err());
        assert_eq!(store.error(), Some("Failed to fetch records"));
        assert_eq!(store.records().len(), 3);
        assert!(!store.loading());

        store.clear_error();
        assert!(store.error().is_none());
    }
}
