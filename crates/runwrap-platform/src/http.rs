//! reqwest-backed [`PlatformClient`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::client::PlatformClient;
use crate::disposition::{
    DEFAULT_FILE_NAME, filename_from_disposition, filename_from_url, sanitize_file_name,
};
use crate::error::{PlatformError, PlatformResult};
use crate::model::{
    IngestSubmission, JobState, JobStatusReport, PlatformTarget, ServiceDescriptor,
    TaskAssignment, TaskOutcome,
};

const SERVICE_PAGE_SIZE: &str = "1000";

/// Platform client speaking HTTP through a shared [`reqwest::Client`].
#[derive(Clone, Debug, Default)]
pub struct HttpPlatform {
    client: Client,
}

impl HttpPlatform {
    /// Wrap an existing client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| PlatformError::request("build_client", String::new(), source))?;
        Ok(Self { client })
    }
}

fn authed(builder: RequestBuilder, target: &PlatformTarget) -> RequestBuilder {
    if target.auth.is_empty() {
        builder
    } else {
        builder.header(AUTHORIZATION, &target.auth)
    }
}

async fn send(operation: &'static str, url: &str, builder: RequestBuilder) -> PlatformResult<Response> {
    debug!(operation, url, "platform request");
    let response = builder
        .send()
        .await
        .map_err(|source| PlatformError::request(operation, url.to_string(), source))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PlatformError::Status {
            operation,
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

async fn read_json(operation: &'static str, url: &str, response: Response) -> PlatformResult<Value> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| PlatformError::request(operation, url.to_string(), source))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|source| PlatformError::Decode { operation, source })
}

async fn write_body(
    operation: &'static str,
    url: &str,
    mut response: Response,
    path: PathBuf,
) -> PlatformResult<()> {
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|source| PlatformError::io(operation, path.clone(), source))?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| PlatformError::request(operation, url.to_string(), source))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|source| PlatformError::io(operation, path.clone(), source))?;
    }
    file.flush()
        .await
        .map_err(|source| PlatformError::io(operation, path, source))
}

fn disposition_name(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_disposition)
}

fn string_at<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|text| !text.is_empty())
}

fn parse_status_report(value: &Value) -> JobStatusReport {
    let status = string_at(value, &["/status", "/data/status"]).unwrap_or_default();
    let message = string_at(value, &["/message", "/data/message"]).unwrap_or_default();
    let data_id = string_at(value, &["/result/dataId", "/data/result/dataId"]);
    JobStatusReport {
        status: JobState::parse(status),
        message: message.to_string(),
        data_id: data_id.map(str::to_string),
    }
}

#[async_trait]
impl PlatformClient for HttpPlatform {
    async fn check_auth(&self, target: &PlatformTarget) -> PlatformResult<()> {
        let url = target.endpoint("service/me");
        let request = authed(self.client.get(&url).query(&[("per_page", "1")]), target);
        send("check_auth", &url, request).await.map(|_| ())
    }

    async fn fetch_by_id(
        &self,
        target: &PlatformTarget,
        data_id: &str,
        dest_dir: &Path,
    ) -> PlatformResult<String> {
        let url = target.endpoint(&format!("file/{data_id}"));
        let request = authed(self.client.get(&url), target);
        let response = send("fetch_by_id", &url, request).await?;
        let name = disposition_name(&response).unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        write_body("fetch_by_id", &url, response, dest_dir.join(&name)).await?;
        Ok(name)
    }

    async fn fetch_by_url(
        &self,
        url: &str,
        bearer: Option<&str>,
        dest_dir: &Path,
        desired_name: Option<&str>,
    ) -> PlatformResult<String> {
        let parsed = url::Url::parse(url).map_err(|source| PlatformError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let mut request = self.client.get(parsed);
        if let Some(bearer) = bearer.filter(|value| !value.is_empty()) {
            request = request.header(AUTHORIZATION, bearer);
        }
        let response = send("fetch_by_url", url, request).await?;
        let name = desired_name
            .and_then(sanitize_file_name)
            .or_else(|| disposition_name(&response))
            .or_else(|| filename_from_url(url))
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        write_body("fetch_by_url", url, response, dest_dir.join(&name)).await?;
        Ok(name)
    }

    async fn submit_ingest(
        &self,
        target: &PlatformTarget,
        submission: &IngestSubmission,
    ) -> PlatformResult<String> {
        const OPERATION: &str = "submit_ingest";
        let url = target.endpoint("job");
        let mut form = Form::new().text("body", submission.body().to_string());
        if let Some(path) = &submission.file {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| PlatformError::io(OPERATION, path.clone(), source))?;
            let file_name = path
                .file_name()
                .map_or_else(|| submission.metadata.name.clone(), |name| {
                    name.to_string_lossy().into_owned()
                });
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(submission.kind.mime_type())
                .map_err(|source| PlatformError::request(OPERATION, url.clone(), source))?;
            form = form.part("file", part);
        }
        let request = authed(self.client.post(&url).multipart(form), target);
        let response = send(OPERATION, &url, request).await?;
        let value = read_json(OPERATION, &url, response).await?;
        string_at(&value, &["/jobId", "/data/jobId"])
            .map(str::to_string)
            .ok_or(PlatformError::MissingField {
                operation: OPERATION,
                field: "jobId",
            })
    }

    async fn job_status(
        &self,
        target: &PlatformTarget,
        job_id: &str,
    ) -> PlatformResult<JobStatusReport> {
        const OPERATION: &str = "job_status";
        let url = target.endpoint(&format!("job/{job_id}"));
        let request = authed(self.client.get(&url), target);
        debug!(operation = OPERATION, url = %url, "platform request");
        let response = request
            .send()
            .await
            .map_err(|source| PlatformError::request(OPERATION, url.clone(), source))?;
        let status = response.status();
        // Eventual consistency: a fresh job may answer 404 with a "Job Not Found" body.
        match read_json(OPERATION, &url, response).await {
            Ok(value) if value.is_object() => Ok(parse_status_report(&value)),
            Ok(_) | Err(PlatformError::Decode { .. }) if !status.is_success() => {
                Err(PlatformError::Status {
                    operation: OPERATION,
                    url,
                    status: status.as_u16(),
                })
            }
            Ok(_) => Err(PlatformError::MissingField {
                operation: OPERATION,
                field: "status",
            }),
            Err(err) => Err(err),
        }
    }

    async fn find_service(
        &self,
        target: &PlatformTarget,
        name: &str,
    ) -> PlatformResult<Option<String>> {
        const OPERATION: &str = "find_service";
        let url = target.endpoint("service/me");
        let request = authed(
            self.client
                .get(&url)
                .query(&[("per_page", SERVICE_PAGE_SIZE), ("keyword", name)]),
            target,
        );
        let response = send(OPERATION, &url, request).await?;
        let value = read_json(OPERATION, &url, response).await?;
        let found = value
            .get("data")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|service| {
                service.pointer("/resourceMetadata/name").and_then(Value::as_str) == Some(name)
            })
            .and_then(|service| string_at(service, &["/serviceId"]))
            .map(str::to_string);
        Ok(found)
    }

    async fn register_service(
        &self,
        target: &PlatformTarget,
        descriptor: &ServiceDescriptor,
    ) -> PlatformResult<Option<String>> {
        const OPERATION: &str = "register_service";
        let url = target.endpoint("service");
        let request = authed(self.client.post(&url).json(descriptor), target);
        let response = send(OPERATION, &url, request).await?;
        let value = read_json(OPERATION, &url, response).await?;
        Ok(string_at(&value, &["/serviceId", "/data/serviceId"]).map(str::to_string))
    }

    async fn update_service(
        &self,
        target: &PlatformTarget,
        service_id: &str,
        descriptor: &ServiceDescriptor,
    ) -> PlatformResult<()> {
        let url = target.endpoint(&format!("service/{service_id}"));
        let mut body = descriptor.clone();
        body.service_id = service_id.to_string();
        let request = authed(self.client.put(&url).json(&body), target);
        send("update_service", &url, request).await.map(|_| ())
    }

    async fn claim_task(
        &self,
        target: &PlatformTarget,
        service_id: &str,
    ) -> PlatformResult<Option<TaskAssignment>> {
        const OPERATION: &str = "claim_task";
        let url = target.endpoint(&format!("service/{service_id}/task"));
        let request = authed(self.client.post(&url), target);
        let response = send(OPERATION, &url, request).await?;
        let value = read_json(OPERATION, &url, response).await?;
        let content = string_at(&value, &["/data/serviceData/data/dataInputs/body/content"]);
        let job_id = string_at(&value, &["/data/serviceData/jobId"]);
        match (content, job_id) {
            (Some(content), Some(job_id)) => Ok(Some(TaskAssignment {
                job_id: job_id.to_string(),
                content: content.to_string(),
            })),
            (Some(_), None) => Err(PlatformError::MissingField {
                operation: OPERATION,
                field: "jobId",
            }),
            (None, _) => Ok(None),
        }
    }

    async fn report_task(
        &self,
        target: &PlatformTarget,
        service_id: &str,
        job_id: &str,
        outcome: TaskOutcome,
        data_id: Option<&str>,
    ) -> PlatformResult<()> {
        let url = target.endpoint(&format!("service/{service_id}/task/{job_id}"));
        let body = data_id.map_or_else(
            || json!({ "status": outcome.as_str() }),
            |data_id| {
                json!({
                    "status": outcome.as_str(),
                    "result": { "type": "data", "dataId": data_id },
                })
            },
        );
        let request = authed(self.client.post(&url).json(&body), target);
        send("report_task", &url, request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IngestKind, IngestMetadata};
    use httpmock::prelude::*;
    use std::error::Error;

    type TestResult = Result<(), Box<dyn Error>>;

    fn target(server: &MockServer) -> PlatformTarget {
        PlatformTarget::new(server.base_url(), "Basic a2V5Og==")
    }

    #[tokio::test]
    async fn check_auth_sends_credential() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/service/me")
                    .query_param("per_page", "1")
                    .header("authorization", "Basic a2V5Og==");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        HttpPlatform::default().check_auth(&target(&server)).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn check_auth_rejection_maps_to_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/service/me");
                then.status(401);
            })
            .await;

        let result = HttpPlatform::default().check_auth(&target(&server)).await;
        assert!(matches!(
            result,
            Err(PlatformError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn fetch_by_id_uses_content_disposition() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/file/abc");
                then.status(200)
                    .header("content-disposition", "attachment; filename=\"scene.tif\"")
                    .body("tiff-bytes");
            })
            .await;
        let dir = tempfile::tempdir()?;

        let name = HttpPlatform::default()
            .fetch_by_id(&target(&server), "abc", dir.path())
            .await?;
        assert_eq!(name, "scene.tif");
        assert_eq!(std::fs::read_to_string(dir.path().join("scene.tif"))?, "tiff-bytes");
        Ok(())
    }

    #[tokio::test]
    async fn fetch_by_id_without_metadata_uses_default_name() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/file/xyz");
                then.status(200).body("plain");
            })
            .await;
        let dir = tempfile::tempdir()?;

        let name = HttpPlatform::default()
            .fetch_by_id(&target(&server), "xyz", dir.path())
            .await?;
        assert_eq!(name, DEFAULT_FILE_NAME);
        assert!(dir.path().join(DEFAULT_FILE_NAME).is_file());
        Ok(())
    }

    #[tokio::test]
    async fn fetch_by_url_prefers_desired_name_and_sends_bearer() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/data/input.json")
                    .header("authorization", "Bearer ext");
                then.status(200).body("{}");
            })
            .await;
        let dir = tempfile::tempdir()?;

        let name = HttpPlatform::default()
            .fetch_by_url(
                &server.url("/data/input.json"),
                Some("Bearer ext"),
                dir.path(),
                Some("renamed.json"),
            )
            .await?;
        assert_eq!(name, "renamed.json");
        assert!(dir.path().join("renamed.json").is_file());
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn fetch_by_url_falls_back_to_url_segment() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/data/scene.tif");
                then.status(200).body("raster");
            })
            .await;
        let dir = tempfile::tempdir()?;

        let name = HttpPlatform::default()
            .fetch_by_url(&server.url("/data/scene.tif"), None, dir.path(), None)
            .await?;
        assert_eq!(name, "scene.tif");
        Ok(())
    }

    #[tokio::test]
    async fn fetch_by_url_rejects_malformed_urls() -> TestResult {
        let dir = tempfile::tempdir()?;
        let result = HttpPlatform::default()
            .fetch_by_url("not a url", None, dir.path(), None)
            .await;
        assert!(matches!(result, Err(PlatformError::InvalidUrl { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn submit_ingest_reads_job_id_from_envelope() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/job");
                then.status(201).json_body(json!({ "data": { "jobId": "job-9" } }));
            })
            .await;
        let submission = IngestSubmission {
            kind: IngestKind::Text,
            metadata: IngestMetadata {
                name: "out.txt".to_string(),
                ..IngestMetadata::default()
            },
            file: None,
            content: Some("result text".to_string()),
        };

        let job_id = HttpPlatform::default()
            .submit_ingest(&target(&server), &submission)
            .await?;
        assert_eq!(job_id, "job-9");
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn submit_ingest_uploads_file_part() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/job");
                then.status(200).json_body(json!({ "jobId": "job-1" }));
            })
            .await;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.tif");
        std::fs::write(&path, "raster-bytes")?;
        let submission = IngestSubmission {
            kind: IngestKind::Raster,
            metadata: IngestMetadata::default(),
            file: Some(path),
            content: None,
        };

        let job_id = HttpPlatform::default()
            .submit_ingest(&target(&server), &submission)
            .await?;
        assert_eq!(job_id, "job-1");
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn job_status_tolerates_not_found_body_and_envelopes() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/job/missing");
                then.status(404).json_body(json!({ "message": "Job Not Found" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/job/done");
                then.status(200).json_body(json!({
                    "data": { "status": "Success", "result": { "dataId": "d-1" } }
                }));
            })
            .await;
        let client = HttpPlatform::default();

        let missing = client.job_status(&target(&server), "missing").await?;
        assert_eq!(missing.message, "Job Not Found");
        assert_eq!(missing.status, JobState::Other(String::new()));

        let done = client.job_status(&target(&server), "done").await?;
        assert_eq!(done.status, JobState::Success);
        assert_eq!(done.data_id.as_deref(), Some("d-1"));
        Ok(())
    }

    #[tokio::test]
    async fn find_service_matches_exact_name() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/service/me")
                    .query_param("keyword", "gdal")
                    .query_param("per_page", SERVICE_PAGE_SIZE);
                then.status(200).json_body(json!({
                    "data": [
                        { "serviceId": "s-0", "resourceMetadata": { "name": "gdal-extra" } },
                        { "serviceId": "s-1", "resourceMetadata": { "name": "gdal" } }
                    ]
                }));
            })
            .await;

        let found = HttpPlatform::default()
            .find_service(&target(&server), "gdal")
            .await?;
        assert_eq!(found.as_deref(), Some("s-1"));
        Ok(())
    }

    #[tokio::test]
    async fn claim_task_returns_none_without_content() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/service/s-1/task");
                then.status(200).json_body(json!({ "data": {} }));
            })
            .await;

        let claimed = HttpPlatform::default()
            .claim_task(&target(&server), "s-1")
            .await?;
        assert!(claimed.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn claim_and_report_task_round_trip() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/service/s-1/task");
                then.status(200).json_body(json!({
                    "data": { "serviceData": {
                        "jobId": "j-5",
                        "data": { "dataInputs": { "body": { "content": "{\"cmd\":\"-v\"}" } } }
                    } }
                }));
            })
            .await;
        let report = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/service/s-1/task/j-5")
                    .json_body(json!({
                        "status": "Success",
                        "result": { "type": "data", "dataId": "d-7" }
                    }));
                then.status(200);
            })
            .await;
        let client = HttpPlatform::default();
        let target = target(&server);

        let claimed = client
            .claim_task(&target, "s-1")
            .await?
            .ok_or("expected a task")?;
        assert_eq!(claimed.job_id, "j-5");
        assert_eq!(claimed.content, "{\"cmd\":\"-v\"}");
        client
            .report_task(&target, "s-1", "j-5", TaskOutcome::Success, Some("d-7"))
            .await?;
        report.assert_async().await;
        Ok(())
    }
}
