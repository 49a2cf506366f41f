//! REST client for the upstream chat service.
//!
//! One call per upstream endpoint: login by email, get my team, get
//! profiles, get joined/discoverable channels, get channel extra info,
//! get posts since, update last viewed at, join channel, create direct
//! channel, create post. Retry/backoff is the caller's concern (it lives
//! in the session establisher, since unbounded retry only makes sense
//! around login and stream-open, not every call).

use std::collections::HashMap;

use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{Channel, ChannelExtra, ChannelList, Post, PostList, Team, User, UserId};

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    pub team_id: Option<String>,
}

impl Client {
    /// `server` is a bare host, e.g. `chat.example.com`.
    pub fn new(server: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("https://{server}/api/v3"),
            token: None,
            team_id: None,
        }
    }

    pub fn host(&self) -> &str {
        self.base_url.trim_start_matches("https://").trim_end_matches("/api/v3")
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            Err(Error::Api { status, message })
        }
    }

    pub async fn login_by_email(&mut self, team: &str, login: &str, password: &str) -> Result<User> {
        let url = format!("{}/users/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "team_name": team, "login_id": login, "password": password }))
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        if let Some(token) = resp
            .headers()
            .get("token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
        {
            self.token = Some(token);
        }
        let user: User = resp.json().await?;
        Ok(user)
    }

    pub async fn get_my_team(&mut self) -> Result<Team> {
        let url = format!("{}/teams/me", self.base_url);
        let resp = self.authed(self.http.get(&url)).send().await?;
        let team: Team = Self::check(resp).await?.json().await?;
        self.team_id = Some(team.id.clone());
        Ok(team)
    }

    pub async fn get_profiles(&self, team_id: &str) -> Result<HashMap<UserId, User>> {
        let url = format!("{}/teams/{team_id}/users", self.base_url);
        let resp = self.authed(self.http.get(&url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get_channels(&self) -> Result<ChannelList> {
        let url = format!(
            "{}/teams/{}/channels",
            self.base_url,
            self.team_id.as_deref().unwrap_or_default()
        );
        let resp = self.authed(self.http.get(&url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get_more_channels(&self) -> Result<ChannelList> {
        let url = format!(
            "{}/teams/{}/channels/more",
            self.base_url,
            self.team_id.as_deref().unwrap_or_default()
        );
        let resp = self.authed(self.http.get(&url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get_channel_extra_info(&self, channel_id: &str) -> Result<ChannelExtra> {
        let url = format!("{}/channels/{channel_id}/extra_info", self.base_url);
        let resp = self.authed(self.http.get(&url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get_posts_since(&self, channel_id: &str, since: i64) -> Result<PostList> {
        let url = format!("{}/channels/{channel_id}/posts/since/{since}", self.base_url);
        let resp = self.authed(self.http.get(&url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn update_last_viewed_at(&self, channel_id: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/update_last_viewed_at", self.base_url);
        let resp = self.authed(self.http.post(&url)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn join_channel(&self, channel_id: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/join", self.base_url);
        let resp = self.authed(self.http.post(&url)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn create_direct_channel(&self, user_id: &str) -> Result<Channel> {
        let url = format!("{}/channels/create_direct", self.base_url);
        let resp = self
            .authed(self.http.post(&url))
            .json(&json!({ "user_id": user_id }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_post(&self, channel_id: &str, message: &str) -> Result<Post> {
        let url = format!("{}/channels/{channel_id}/posts/create", self.base_url);
        let resp = self
            .authed(self.http.post(&url))
            .json(&json!({ "channel_id": channel_id, "message": message }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
