//! HTTP remote store
//!
//! Talks to a PostgREST-style endpoint: `{base_url}/rest/v1/{table}` with
//! `column=op.value` filters. Selects are paged with a `Range` header over
//! rows ordered by id.

use super::remote::{Filter, RemoteError, RemoteStore, RemoteTable};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;

pub struct RestRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestRemote {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tonnage-ledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
        })
    }

    /// Authenticate requests as the logged-in user instead of the anonymous key
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, table: RemoteTable, filters: &[Filter]) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table.name());
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);

        let query: Vec<(String, String)> = filters
            .iter()
            .map(|f| (f.column.clone(), format!("{}.{}", f.condition.operator(), f.value)))
            .collect();

        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .query(&query)
    }

    fn page_request(&self, table: RemoteTable, filters: &[Filter], offset: usize, limit: usize) -> RequestBuilder {
        let last = offset + limit.max(1) - 1;
        self.request(Method::GET, table, filters)
            .query(&[("select", "*"), ("order", "id.asc")])
            .header("Range-Unit", "items")
            .header("Range", format!("{}-{}", offset, last))
    }

    async fn send(&self, operation: &str, table: RemoteTable, builder: RequestBuilder) -> Result<Response, RemoteError> {
        tracing::debug!("{} {}", operation, table);

        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!("{} {} returned {}: {}", operation, table, status, message);
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn json_rows(response: Response) -> Result<Vec<Value>, RemoteError> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn select_page(
        &self,
        table: RemoteTable,
        filters: &[Filter],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        let builder = self.page_request(table, filters, offset, limit);
        let response = self.send("select", table, builder).await?;
        Self::json_rows(response).await
    }

    async fn delete_matching(&self, table: RemoteTable, filters: &[Filter]) -> Result<(), RemoteError> {
        let builder = self.request(Method::DELETE, table, filters);
        self.send("delete", table, builder).await?;
        Ok(())
    }

    async fn insert_returning_id(&self, table: RemoteTable, row: Value) -> Result<i64, RemoteError> {
        let builder = self
            .request(Method::POST, table, &[])
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send("insert", table, builder).await?;

        Self::json_rows(response)
            .await?
            .first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| RemoteError::Decode(format!("insert into {} returned no id", table)))
    }

    async fn bulk_insert(&self, table: RemoteTable, rows: Vec<Value>) -> Result<(), RemoteError> {
        if rows.is_empty() {
            return Ok(());
        }

        let builder = self
            .request(Method::POST, table, &[])
            .header("Prefer", "return=minimal")
            .json(&rows);
        self.send("bulk insert", table, builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_filters_to_postgrest_query() {
        let remote = RestRemote::new("https://example.test/", "anon").unwrap();

        let request = remote
            .request(
                Method::GET,
                RemoteTable::DailyEntries,
                &[Filter::eq("user_id", "u1"), Filter::gte("entry_date", "2024-03-01")],
            )
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://example.test/rest/v1/daily_entries?user_id=eq.u1&entry_date=gte.2024-03-01"
        );
        assert_eq!(request.headers().get("apikey").unwrap(), "anon");
        assert_eq!(request.headers().get("authorization").unwrap(), "Bearer anon");
    }

    #[test]
    fn test_page_request_asks_for_an_ordered_item_range() {
        let remote = RestRemote::new("https://example.test", "anon").unwrap();

        let request = remote
            .page_request(RemoteTable::Workers, &[Filter::eq("user_id", "u1")], 1000, 1000)
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://example.test/rest/v1/workers?user_id=eq.u1&select=*&order=id.asc"
        );
        assert_eq!(request.headers().get("range-unit").unwrap(), "items");
        assert_eq!(request.headers().get("range").unwrap(), "1000-1999");
    }

    #[test]
    fn test_access_token_replaces_anon_bearer() {
        let remote = RestRemote::new("https://example.test", "anon")
            .unwrap()
            .with_access_token(Some("jwt".to_string()));

        let request = remote
            .request(Method::DELETE, RemoteTable::Workers, &[])
            .build()
            .unwrap();

        assert_eq!(request.headers().get("authorization").unwrap(), "Bearer jwt");
    }
}
