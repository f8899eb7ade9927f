//! Hosted table access over a PostgREST-style REST endpoint.
//!
//! Only the handful of operations the dashboard needs are exposed: select
//! with a row limit, distinct values of a column, delete by equality and
//! single-row insert.

use crate::config::SourceConfig;
use crate::error::{Result, RevenueError};
use crate::source::DataSource;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::{json, Value};

const REST_PATH: &str = "rest/v1";

/// Equality predicate, rendered as `column=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFilter {
    pub column: String,
    pub value: String,
}

impl StoreFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

#[derive(Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    pub async fn select_all(
        &self,
        table: &str,
        limit: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut query = vec![
            ("select".to_string(), "*".to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(column) = order_by {
            query.push(("order".to_string(), format!("{}.desc", column)));
        }

        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<Value> = check_status(response).await?.json().await?;
        debug!("Selected {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    /// Distinct non-null values of `column` among rows matching `filter`, in
    /// first-seen order.
    pub async fn select_distinct(
        &self,
        table: &str,
        column: &str,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<Value>> {
        let mut query = vec![("select".to_string(), column.to_string())];
        if let Some(filter) = filter {
            query.push(filter.query_pair());
        }

        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<Value> = check_status(response).await?.json().await?;

        let mut distinct: Vec<Value> = Vec::new();
        for value in rows.into_iter().filter_map(|mut row| row.get_mut(column).map(Value::take)) {
            if !value.is_null() && !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        Ok(distinct)
    }

    pub async fn delete_where(&self, table: &str, filter: &StoreFilter) -> Result<()> {
        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&[filter.query_pair()])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn insert_row<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RevenueError::Store {
        status: status.as_u16(),
        message,
    })
}

/// Revenue CSV uploads stored as rows of a hosted table, one text column per
/// upload. The newest row is the current dataset.
#[derive(Clone)]
pub struct RemoteStore {
    client: StoreClient,
    table: String,
    content_column: String,
    order_column: Option<String>,
}

impl RemoteStore {
    pub fn new(client: StoreClient, table: impl Into<String>, content_column: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            content_column: content_column.into(),
            order_column: None,
        }
    }

    pub fn with_order_column(mut self, column: impl Into<String>) -> Self {
        self.order_column = Some(column.into());
        self
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        match config {
            SourceConfig::Remote {
                url,
                api_key,
                table,
                content_column,
                order_column,
            } => {
                let store = Self::new(StoreClient::new(url, api_key), table, content_column);
                Ok(match order_column {
                    Some(column) => store.with_order_column(column),
                    None => store,
                })
            }
            SourceConfig::Bundled { .. } => Err(RevenueError::InvalidConfig(
                "remote store needs a remote source configuration".to_string(),
            )),
        }
    }

    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    async fn latest_content(&self) -> Result<String> {
        let rows = self
            .client
            .select_all(&self.table, 1, self.order_column.as_deref())
            .await?;
        let row = rows.into_iter().next().ok_or_else(|| {
            RevenueError::SourceUnavailable(format!("table '{}' has no uploads", self.table))
        })?;

        match row.get(&self.content_column) {
            Some(Value::String(text)) => Ok(text.clone()),
            _ => Err(RevenueError::SourceUnavailable(format!(
                "column '{}' of table '{}' holds no text",
                self.content_column, self.table
            ))),
        }
    }

    /// Replaces the dataset stored under `name` with `csv_text`.
    pub async fn upload(&self, name_column: &str, name: &str, csv_text: &str) -> Result<()> {
        let filter = StoreFilter::eq(name_column, name);
        self.client.delete_where(&self.table, &filter).await?;

        let mut row = serde_json::Map::new();
        row.insert(name_column.to_string(), json!(name));
        row.insert(self.content_column.clone(), json!(csv_text));
        self.client.insert_row(&self.table, &row).await?;

        info!("Uploaded dataset '{}' to {}", name, self.table);
        Ok(())
    }

    pub async fn dataset_names(&self, name_column: &str) -> Result<Vec<String>> {
        let values = self
            .client
            .select_distinct(&self.table, name_column, None)
            .await?;
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }
}

impl DataSource for RemoteStore {
    fn name(&self) -> String {
        format!("store:{}", self.table)
    }

    fn fetch_text(&self) -> BoxFuture<'_, Result<String>> {
        self.latest_content().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Local HTTP endpoint answering one connection per canned response and
    /// keeping the raw requests it received.
    struct CannedServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl CannedServer {
        async fn start(responses: Vec<(u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&requests);

            tokio::spawn(async move {
                for (status, body) in responses {
                    let (mut socket, _) = listener.accept().await.unwrap();
                    let request = read_request(&mut socket).await;
                    log.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    let _ = socket.shutdown().await;
                }
            });

            Self { base_url, requests }
        }

        fn client(&self) -> StoreClient {
            StoreClient {
                client: Client::builder().no_proxy().build().unwrap(),
                base_url: self.base_url.clone(),
                api_key: "key".to_string(),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn store(server: &CannedServer) -> RemoteStore {
        RemoteStore::new(server.client(), "uploads", "content").with_order_column("created_at")
    }

    #[tokio::test]
    async fn test_error_status_becomes_store_error() {
        let server = CannedServer::start(vec![(404, r#"{"message":"relation missing"}"#)]).await;

        let err = server.client().select_all("uploads", 5, None).await.unwrap_err();
        match err {
            RevenueError::Store { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("relation missing"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_reads_newest_upload() {
        let server = CannedServer::start(vec![(
            200,
            r#"[{"content":"Company,Business Line\n","created_at":"2024-10-01"}]"#,
        )])
        .await;

        let text = store(&server).fetch_text().await.unwrap();
        assert_eq!(text, "Company,Business Line\n");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = requests[0].to_lowercase();
        assert!(request.starts_with("get /rest/v1/uploads?"));
        assert!(request.contains("limit=1"));
        assert!(request.contains("order=created_at.desc"));
        assert!(request.contains("apikey: key"));
        assert!(request.contains("authorization: bearer key"));
    }

    #[tokio::test]
    async fn test_empty_table_is_unavailable() {
        let server = CannedServer::start(vec![(200, "[]")]).await;
        let err = store(&server).fetch_text().await.unwrap_err();
        assert!(matches!(err, RevenueError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_text_content_is_unavailable() {
        let server = CannedServer::start(vec![(200, r#"[{"content":null}]"#)]).await;
        let err = store(&server).fetch_text().await.unwrap_err();
        assert!(matches!(err, RevenueError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_upload_deletes_then_inserts() {
        let server = CannedServer::start(vec![(204, ""), (201, "")]).await;

        store(&server)
            .upload("name", "fy2024.csv", "Company\nACME")
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("DELETE /rest/v1/uploads?name=eq.fy2024.csv "));
        assert!(requests[1].starts_with("POST /rest/v1/uploads "));
        assert!(requests[1].contains(r#""name":"fy2024.csv""#));
        assert!(requests[1].contains(r#""content":"Company\nACME""#));
    }

    #[tokio::test]
    async fn test_failed_delete_skips_insert() {
        let server = CannedServer::start(vec![(500, "boom")]).await;

        let err = store(&server)
            .upload("name", "fy2024.csv", "Company")
            .await
            .unwrap_err();
        assert!(matches!(err, RevenueError::Store { status: 500, .. }));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_dataset_names_drop_duplicates_and_nulls() {
        let server = CannedServer::start(vec![(
            200,
            r#"[{"name":"fy2023.csv"},{"name":null},{"name":"fy2024.csv"},{"name":"fy2023.csv"},{}]"#,
        )])
        .await;

        let names = store(&server).dataset_names("name").await.unwrap();
        assert_eq!(names, vec!["fy2023.csv", "fy2024.csv"]);
        assert!(server.requests()[0].starts_with("GET /rest/v1/uploads?select=name "));
    }

    #[test]
    fn test_table_url() {
        let client = StoreClient::new("https://project.example.co/", "key");
        assert_eq!(
            client.table_url("revenue_uploads"),
            "https://project.example.co/rest/v1/revenue_uploads"
        );
    }

    #[test]
    fn test_filter_query_pair() {
        let filter = StoreFilter::eq("name", "fy2024.csv");
        assert_eq!(
            filter.query_pair(),
            ("name".to_string(), "eq.fy2024.csv".to_string())
        );
    }

    #[test]
    fn test_from_config() {
        let config = SourceConfig::Remote {
            url: "https://project.example.co".to_string(),
            api_key: "key".to_string(),
            table: "uploads".to_string(),
            content_column: "csv".to_string(),
            order_column: Some("created_at".to_string()),
        };
        let store = RemoteStore::from_config(&config).unwrap();
        assert_eq!(store.name(), "store:uploads");
        assert_eq!(store.order_column.as_deref(), Some("created_at"));

        let bundled = SourceConfig::Bundled { path: None };
        assert!(RemoteStore::from_config(&bundled).is_err());
    }
}
