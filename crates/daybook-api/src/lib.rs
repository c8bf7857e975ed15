// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use daybook_app::{ListQuery, ModuleKind, Record, RecordId};
use daybook_sync::{ListSource, SaveBackend, SaveError, SaveRequest};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{ACCEPT, COOKIE};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const SESSION_COOKIE: &str = "diarygo_session";

/// Blocking client for the record server's JSON API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    session_token: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, session_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            session_token: session_token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_owned),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint(&self, module: ModuleKind, action: &str) -> String {
        format!("{}/api/{}/{action}", self.base_url, module.as_str())
    }

    pub fn ping(&self) -> Result<()> {
        let url = format!("{}/api/ping", self.base_url);
        let response = self.send(self.http.get(&url))?;
        check_status(response)?;
        Ok(())
    }

    pub fn list<R: Record>(&self, query: &ListQuery) -> Result<Vec<R>> {
        if query.module() != R::MODULE {
            bail!(
                "list query for {} used to fetch {}",
                query.module().as_str(),
                R::MODULE.as_str()
            );
        }
        let mut url = Url::parse(&self.endpoint(R::MODULE, "list")).context("build list URL")?;
        let params = query.params();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let response = self.send(self.http.get(url))?;
        let response = check_status(response)?;
        // The server answers `null` for an empty list.
        let records: Option<Vec<R>> = response
            .json()
            .with_context(|| format!("decode {} list", R::MODULE.as_str()))?;
        Ok(records.unwrap_or_default())
    }

    /// Send one save. Diary days are written whole; every other module
    /// receives `{id, ...changed fields}`.
    pub fn update<R: Record>(
        &self,
        request: &SaveRequest<R>,
    ) -> std::result::Result<(), SaveError> {
        let body =
            update_body(request).map_err(|error| SaveError::Transport(error.to_string()))?;
        let response = self
            .send(self.http.post(self.endpoint(R::MODULE, "update")).json(&body))
            .map_err(|error| SaveError::Transport(format!("{error:#}")))?;
        check_status(response).map(|_| ())
    }

    pub fn add<R: Record>(&self, record: &R) -> Result<()> {
        if R::MODULE == ModuleKind::Diary {
            bail!("diary days are created by editing them, not added");
        }
        let mut body = serde_json::to_value(record).context("encode new record")?;
        if let Value::Object(fields) = &mut body {
            fields.remove("id");
        }
        let response = self.send(self.http.post(self.endpoint(R::MODULE, "add")).json(&body))?;
        check_status(response)?;
        Ok(())
    }

    pub fn delete<R: Record>(&self, id: R::Id) -> Result<()> {
        if R::MODULE == ModuleKind::Diary {
            bail!("diary days cannot be deleted; clear their content instead");
        }
        let url = Url::parse_with_params(
            &self.endpoint(R::MODULE, "delete"),
            [("id", id.get().to_string())],
        )
        .context("build delete URL")?;
        let response = self.send(self.http.delete(url))?;
        check_status(response)?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(token) = &self.session_token {
            request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))
    }
}

impl<R: Record> SaveBackend<R> for Client {
    fn save(&self, request: &SaveRequest<R>) -> std::result::Result<(), SaveError> {
        debug!(module = R::MODULE.as_str(), id = %request.id(), "sending update");
        self.update(request)
    }
}

impl<R: Record> ListSource<R> for Client {
    fn fetch_list(&self, query: &ListQuery) -> Result<Vec<R>> {
        self.list(query)
    }
}

fn update_body<R: Record>(request: &SaveRequest<R>) -> Result<Value> {
    if R::MODULE == ModuleKind::Diary {
        return serde_json::to_value(&request.record).context("encode diary day");
    }
    let mut body = serde_json::to_value(&request.patch).context("encode patch")?;
    let Value::Object(fields) = &mut body else {
        bail!("patch did not encode as a JSON object");
    };
    fields.insert("id".to_owned(), Value::from(request.id().get()));
    Ok(body)
}

fn check_status(response: Response) -> std::result::Result<Response, SaveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(SaveError::Unauthorized);
    }
    let body = response.text().unwrap_or_default();
    Err(SaveError::Server {
        status: status.as_u16(),
        message: clean_error_message(&body),
    })
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the server running and server.base_url correct? ({})",
        base_url,
        error
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn clean_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return message;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return trimmed.to_owned();
    }
    "no details".to_owned()
}
