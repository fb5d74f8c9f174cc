//! Authenticated wrapper around the X web client's GraphQL endpoints.
//!
//! Requests replay the shape the browser sends: a session cookie plus csrf
//! token, the web bearer, and JSON-encoded `variables` / `features` /
//! `fieldToggles` query parameters. Each call is one attempt; pacing and
//! failure policy belong to the collector and dispatcher.
use crate::twitter::error::LikeError;
use crate::twitter::traits::{Liker, PageSource};
use crate::twitter::types::{ConversationPage, Cursor, FavoriteResponse, PostId};
use async_trait::async_trait;
use replyliker_config::Settings;
use replyliker_http::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use replyliker_http::{HttpClient, HttpError, RequestOpts};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Clone, Debug)]
pub struct XWebApi {
    http: HttpClient,
    headers: HeaderMap,
    bearer: String,
    detail_path: String,
    favorite_path: String,
    favorite_query_id: String,
    debug_dump: Option<PathBuf>,
}

impl XWebApi {
    pub fn from_settings(settings: &Settings) -> Result<Self, HttpError> {
        let api = &settings.api;
        let creds = &settings.credentials;
        let http =
            HttpClient::new(&api.base_url)?.with_timeout(Duration::from_secs(api.timeout_secs));

        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", sensitive(&creds.csrf_token)?);
        headers.insert(
            COOKIE,
            sensitive(&format!(
                "auth_token={}; ct0={};",
                creds.auth_token, creds.csrf_token
            ))?,
        );
        headers.insert(USER_AGENT, header_value(&creds.user_agent)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(REFERER, HeaderValue::from_static("https://x.com/"));

        Ok(Self {
            http,
            headers,
            bearer: creds.frontend_bearer.clone(),
            detail_path: format!("i/api/graphql/{}/TweetDetail", api.detail_query_id),
            favorite_path: format!("i/api/graphql/{}/FavoriteTweet", api.favorite_query_id),
            favorite_query_id: api.favorite_query_id.clone(),
            debug_dump: settings.debug_dump.clone(),
        })
    }

    fn opts<'a>(&'a self, query: Option<Vec<(&'a str, Cow<'a, str>)>>) -> RequestOpts<'a> {
        RequestOpts {
            bearer: Some(&self.bearer),
            headers: Some(self.headers.clone()),
            query,
            ..Default::default()
        }
    }

    /// Query parameters for one `TweetDetail` page.
    pub fn detail_query(
        focal: &PostId,
        cursor: Option<&Cursor>,
    ) -> Vec<(&'static str, Cow<'static, str>)> {
        let mut variables = json!({
            "focalTweetId": focal.as_str(),
            "with_rux_injections": false,
            "includePromotedContent": true,
            "withCommunity": true,
            "withQuickPromoteEligibilityTweetFields": true,
            "withBirdwatchNotes": true,
            "withVoice": true,
            "withV2Timeline": true
        });
        if let Some(c) = cursor {
            variables["cursor"] = Value::String(c.as_str().to_string());
        }

        vec![
            ("variables", Cow::Owned(variables.to_string())),
            ("features", Cow::Owned(detail_features().to_string())),
            ("fieldToggles", Cow::Owned(detail_field_toggles().to_string())),
        ]
    }

    /// Append one raw page as a JSON line. Failures are logged, never raised.
    async fn dump_raw(&self, raw: &Value) {
        let Some(path) = &self.debug_dump else {
            return;
        };
        let mut line = raw.to_string();
        line.push('\n');
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "x.debug_dump.failed");
        }
    }
}

#[async_trait]
impl PageSource for XWebApi {
    async fn fetch_page(
        &self,
        focal: &PostId,
        cursor: Option<&Cursor>,
    ) -> Result<ConversationPage, HttpError> {
        let query = Self::detail_query(focal, cursor);
        let raw: Value = self
            .http
            .get_json(&self.detail_path, self.opts(Some(query)))
            .await?;

        self.dump_raw(&raw).await;

        let page: ConversationPage = serde_json::from_value(raw).map_err(|e| {
            HttpError::Decode(e.to_string(), "TweetDetail body is not an object".into())
        })?;
        if !page.errors.is_empty() {
            let messages: Vec<&str> = page.errors.iter().map(|e| e.message.as_str()).collect();
            tracing::warn!(focal = %focal, errors = ?messages, "x.tweet_detail.graphql_errors");
        }
        Ok(page)
    }
}

#[async_trait]
impl Liker for XWebApi {
    async fn like(&self, id: &PostId) -> Result<(), LikeError> {
        let body = json!({
            "variables": { "tweet_id": id.as_str() },
            "queryId": self.favorite_query_id,
        });
        let resp: FavoriteResponse = self
            .http
            .post_json(&self.favorite_path, &body, self.opts(None))
            .await?;

        if !resp.errors.is_empty() {
            let reason = resp
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{} (code {code})", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(LikeError::Rejected(reason));
        }
        tracing::debug!(
            post = %id,
            result = ?resp.data.and_then(|d| d.favorite_tweet),
            "x.favorite_tweet"
        );
        Ok(())
    }
}

fn header_value(v: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(v).map_err(|e| HttpError::Build(format!("invalid header value: {e}")))
}

fn sensitive(v: &str) -> Result<HeaderValue, HttpError> {
    let mut value = header_value(v)?;
    value.set_sensitive(true);
    Ok(value)
}

fn detail_features() -> Value {
    json!({
        "rweb_video_screen_enabled": false,
        "profile_label_improvements_pcf_label_in_post_enabled": true,
        "rweb_tipjar_consumption_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "premium_content_api_read_enabled": false,
        "communities_web_enable_tweet_community_results_fetch": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "responsive_web_grok_analyze_button_fetch_trends_enabled": false,
        "responsive_web_grok_analyze_post_followups_enabled": true,
        "responsive_web_jetfuel_frame": false,
        "responsive_web_grok_share_attachment_enabled": true,
        "articles_preview_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "responsive_web_grok_show_grok_translated_post": false,
        "responsive_web_grok_analysis_button_from_backend": true,
        "creator_subscriptions_quote_tweet_preview_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_grok_image_annotation_enabled": true,
        "responsive_web_enhance_cards_enabled": false
    })
}

fn detail_field_toggles() -> Value {
    json!({
        "withArticleRichContentState": true,
        "withArticlePlainText": false,
        "withGrokAnalyze": false,
        "withDisallowedReplyControls": false
    })
}
