//! YouTube Data API v3 client.
//!
//! Fetches a channel's uploads as [`ItemRecord`]s, its headline statistics,
//! and searches for comparable channels. Only the endpoints the pipeline
//! needs are covered; every call authenticates with an API key.

mod api;
pub mod discovery;

use std::collections::HashMap;

use channelscope_shared::{
    ChannelScopeError, ChannelSummary, ComparisonChannel, ItemRecord, Result, YouTubeConfig,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::api::{ChannelResource, ListResponse, PlaylistItem, SearchResult, VideoResource};

pub use discovery::{discover_comparison_channels, discovery_keywords};

/// The API caps `maxResults` and `id` batches at 50.
const PAGE_SIZE: usize = 50;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("ChannelScope/", env!("CARGO_PKG_VERSION"));

/// Thin client over the Data API endpoints used by the pipeline.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    /// Build a client from the `[youtube]` config section and a resolved key.
    pub fn new(config: &YouTubeConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// GET `<base>/<endpoint>` with the key appended and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ChannelScopeError::Network(format!("{endpoint}: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelScopeError::Network(format!(
                "{endpoint}: HTTP {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChannelScopeError::parse(format!("{endpoint}: {}", e.without_url())))
    }

    /// ID of the channel's uploads playlist, `None` for an unknown channel.
    async fn uploads_playlist(&self, channel_id: &str) -> Result<Option<String>> {
        let response: ListResponse<ChannelResource> = self
            .get(
                "channels",
                &[("part", "contentDetails".into()), ("id", channel_id.into())],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|c| c.content_details)
            .and_then(|d| d.related_playlists.uploads))
    }

    /// Up to `limit` most recent uploads of a channel.
    ///
    /// An unknown channel yields an empty list rather than an error.
    #[instrument(skip(self))]
    pub async fn fetch_items(&self, channel_id: &str, limit: usize) -> Result<Vec<ItemRecord>> {
        let Some(playlist_id) = self.uploads_playlist(channel_id).await? else {
            debug!("channel not found");
            return Ok(Vec::new());
        };

        let mut video_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        while video_ids.len() < limit {
            let mut query = vec![
                ("part", "snippet".to_string()),
                ("playlistId", playlist_id.clone()),
                ("maxResults", PAGE_SIZE.min(limit - video_ids.len()).to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: ListResponse<PlaylistItem> = self.get("playlistItems", &query).await?;
            video_ids.extend(
                page.items
                    .into_iter()
                    .filter_map(|i| i.snippet.resource_id.video_id),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        video_ids.truncate(limit);

        let items = self.fetch_videos(&video_ids).await?;
        debug!(count = items.len(), "fetched items");
        Ok(items)
    }

    /// Full records for the given video IDs, in the order requested.
    ///
    /// IDs the API no longer knows (deleted or private uploads) are dropped.
    pub async fn fetch_videos(&self, ids: &[String]) -> Result<Vec<ItemRecord>> {
        let mut by_id: HashMap<String, ItemRecord> = HashMap::with_capacity(ids.len());

        for batch in ids.chunks(PAGE_SIZE) {
            let response: ListResponse<VideoResource> = self
                .get(
                    "videos",
                    &[
                        ("part", "snippet,statistics,contentDetails".into()),
                        ("id", batch.join(",")),
                    ],
                )
                .await?;

            for video in response.items {
                let record = ItemRecord::new(
                    video.id.clone(),
                    video.snippet.title,
                    video.statistics.view_count,
                    video.statistics.like_count,
                    video.statistics.comment_count,
                )
                .with_description(video.snippet.description)
                .with_published_at(video.snippet.published_at)
                .with_duration(video.content_details.duration);
                by_id.insert(video.id, record);
            }
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Headline statistics of a channel, `None` when the channel is unknown.
    #[instrument(skip(self))]
    pub async fn channel_summary(&self, channel_id: &str) -> Result<Option<ChannelSummary>> {
        let response: ListResponse<ChannelResource> = self
            .get(
                "channels",
                &[("part", "snippet,statistics".into()), ("id", channel_id.into())],
            )
            .await?;

        let Some(channel) = response.items.into_iter().next() else {
            return Ok(None);
        };
        let snippet = channel.snippet.unwrap_or_default();
        let stats = channel.statistics.unwrap_or_default();
        let thumbnails = snippet.thumbnails;
        let logo_url = thumbnails
            .high
            .and_then(|t| t.url)
            .or_else(|| thumbnails.default.and_then(|t| t.url));

        Ok(Some(ChannelSummary {
            channel_id: channel_id.to_string(),
            name: snippet.title,
            logo_url,
            description: snippet.description,
            subscriber_count: stats.subscriber_count,
            total_views: stats.view_count,
            total_items: stats.video_count,
        }))
    }

    /// Channels matching a free-text query. Returned channels carry no items.
    #[instrument(skip(self))]
    pub async fn search_channels(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ComparisonChannel>> {
        let response: ListResponse<SearchResult> = self
            .get(
                "search",
                &[
                    ("part", "snippet".into()),
                    ("q", query.into()),
                    ("type", "channel".into()),
                    ("maxResults", max_results.to_string()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter(|r| !r.snippet.channel_id.is_empty())
            .map(|r| ComparisonChannel {
                id: r.snippet.channel_id,
                title: r.snippet.title,
                description: r.snippet.description,
                items: Vec::new(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn client_for(server: &MockServer) -> YouTubeClient {
        let config = YouTubeConfig {
            base_url: server.uri(),
            ..YouTubeConfig::default()
        };
        YouTubeClient::new(&config, "test-key").expect("client")
    }

    async fn mount_uploads(server: &MockServer, channel_id: &str, playlist: &str) {
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("part", "contentDetails"))
            .and(query_param("id", channel_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"contentDetails": {"relatedPlaylists": {"uploads": playlist}}}]
            })))
            .mount(server)
            .await;
    }

    fn video(id: &str, title: &str, views: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "snippet": {"title": title, "description": "", "publishedAt": "2024-05-01T12:00:00Z"},
            "statistics": {"viewCount": views, "likeCount": "10", "commentCount": "2"},
            "contentDetails": {"duration": "PT4M13S"}
        })
    }

    #[tokio::test]
    async fn fetch_items_follows_pages_and_keeps_order() {
        let server = MockServer::start().await;
        mount_uploads(&server, "UC1", "UU1").await;

        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"snippet": {"resourceId": {"videoId": "v3"}}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("playlistId", "UU1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"snippet": {"resourceId": {"videoId": "v1"}}},
                    {"snippet": {"resourceId": {"videoId": "v2"}}}
                ],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/videos"))
            .and(query_param("id", "v1,v2,v3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [video("v3", "Third", "30"), video("v1", "First", "100"), video("v2", "Second", "50")]
            })))
            .mount(&server)
            .await;

        let items = client_for(&server).fetch_items("UC1", 10).await.expect("fetch");
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["v1", "v2", "v3"]);
        assert_eq!(items[0].views, 100);
        assert!((items[0].engagement_rate - 0.12).abs() < 1e-12);
        assert_eq!(items[0].duration.as_deref(), Some("PT4M13S"));
        assert_eq!(items[0].published_at.as_deref(), Some("2024-05-01T12:00:00Z"));
    }

    #[tokio::test]
    async fn fetch_items_stops_at_limit() {
        let server = MockServer::start().await;
        mount_uploads(&server, "UC1", "UU1").await;

        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .and(query_param("maxResults", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"snippet": {"resourceId": {"videoId": "v1"}}}],
                "nextPageToken": "more"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [video("v1", "Only", "5")]
            })))
            .mount(&server)
            .await;

        let items = client_for(&server).fetch_items("UC1", 1).await.expect("fetch");
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn unknown_channel_yields_no_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        let items = client_for(&server).fetch_items("UCnope", 5).await.expect("fetch");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn http_errors_are_network_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_items("UC1", 5)
            .await
            .expect_err("should fail");
        assert!(matches!(err, ChannelScopeError::Network(_)));
        assert!(err.to_string().contains("403"));
        assert!(!err.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn channel_summary_falls_back_to_default_thumbnail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("part", "snippet,statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "snippet": {
                        "title": "Rust Corner",
                        "description": "All things Rust",
                        "thumbnails": {"default": {"url": "https://img.example/d.jpg"}}
                    },
                    "statistics": {"subscriberCount": "1500", "viewCount": "90000", "videoCount": "42"}
                }]
            })))
            .mount(&server)
            .await;

        let summary = client_for(&server)
            .channel_summary("UC1")
            .await
            .expect("summary")
            .expect("present");
        assert_eq!(summary.name, "Rust Corner");
        assert_eq!(summary.logo_url.as_deref(), Some("https://img.example/d.jpg"));
        assert_eq!(summary.subscriber_count, 1500);
        assert_eq!(summary.total_items, 42);
    }

    #[tokio::test]
    async fn search_channels_maps_snippets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("type", "channel"))
            .and(query_param("q", "rust"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"snippet": {"channelId": "UCa", "title": "A", "description": "first"}},
                    {"snippet": {"title": "missing id"}}
                ]
            })))
            .mount(&server)
            .await;

        let found = client_for(&server)
            .search_channels("rust", 3)
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "UCa");
        assert_eq!(found[0].description, "first");
        assert!(found[0].items.is_empty());
    }
}
