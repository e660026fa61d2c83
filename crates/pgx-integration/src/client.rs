//! 分析服务HTTP客户端
//!
//! 实现与远端分析服务之间唯一的网络契约：
//! - `POST {API_BASE}/analyze` multipart上传
//! - `GET {API_BASE}/health` 健康检查

use crate::response::extract_detail;
use async_trait::async_trait;
use pgx_core::{
    AnalysisOutcome, AnalysisRequest, AnalysisResponse, HealthStatus, PgxError, Result,
};
use pgx_workflow::AnalysisBackend;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// 分析服务客户端
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalysisClient {
    /// 创建新的客户端
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PgxError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 提交VCF文件与药物列表
    pub async fn submit_analysis(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        let url = self.endpoint("analyze");
        let drugs = request.drugs_field();
        info!(
            "POST {} (patient={}, drugs={}, file={}, {} bytes)",
            url,
            request.patient_id,
            drugs,
            request.file.name,
            request.file.bytes.len()
        );

        let file_part = Part::bytes(request.file.bytes)
            .file_name(request.file.name)
            .mime_str("text/plain")
            .map_err(|e| PgxError::Transport(e.to_string()))?;

        let form = Form::new()
            .part("vcf_file", file_part)
            .text("patient_id", request.patient_id)
            .text("drugs", drugs);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Analysis request failed: {}", e);
                PgxError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PgxError::Transport(e.to_string()))?;
        debug!("Analysis response: HTTP {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let detail = extract_detail(&body)
                .unwrap_or_else(|| format!("Analysis failed (HTTP {})", status.as_u16()));
            warn!("Analysis rejected by server: HTTP {}: {}", status, detail);
            return Err(PgxError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: AnalysisResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Malformed analysis response: {}", e);
            PgxError::Transport(format!("Malformed response body: {}", e))
        })?;

        if !parsed.is_success() {
            warn!("Analysis reported status {:?}: {:?}", parsed.status, parsed.errors);
        } else if !parsed.errors.is_empty() {
            warn!(
                "Analysis succeeded with {} warning(s): {:?}",
                parsed.errors.len(),
                parsed.errors
            );
        }
        parsed.into_outcome()
    }

    /// 健康检查
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoint("health");
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PgxError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PgxError::Api {
                status: status.as_u16(),
                detail: format!("Health check failed (HTTP {})", status.as_u16()),
            });
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| PgxError::Transport(format!("Malformed health response: {}", e)))
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        self.submit_analysis(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use pgx_core::UploadFile;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// (字段名, 文件名, 内容)
    type Captured = Arc<Mutex<Vec<(String, Option<String>, String)>>>;

    fn result_item(drug: &str, label: &str) -> serde_json::Value {
        json!({
            "patient id": "PATIENT_001",
            "drug": drug,
            "timestamp": "2025-02-19T10:15:00+00:00",
            "risk_assessment": {"risk_label": label, "confidence_score": 0.85, "severity": "moderate"},
            "pharmacogenomic_profile": {"primary_gene": "CYP2C9", "diplotype": "*1/*3", "phenotype": "IM"},
            "detected_variants": [{"rsid": "rs1057910", "genotype": "0/1", "clinical_recommendation": "Reduce dose."}],
            "llm_generated_explanation": {"summary": "Reduced clearance.", "mechanism": "CYP2C9*3 lowers activity."},
            "quality_metrics": {"vcf_parsing_success": true, "total_variants_extracted": 8, "pharmacogenes_found": 2}
        })
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn capture_upload(
        State(seen): State<Captured>,
        mut multipart: Multipart,
    ) -> Json<serde_json::Value> {
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);
            let text = field.text().await.unwrap_or_default();
            seen.lock().await.push((name, file_name, text));
        }
        Json(json!({
            "status": "success",
            "results": [result_item("WARFARIN", "Adjust")],
            "errors": []
        }))
    }

    fn sample_request() -> AnalysisRequest {
        AnalysisRequest {
            patient_id: "PATIENT_007".to_string(),
            drugs: vec!["WARFARIN".to_string(), "CODEINE".to_string()],
            file: UploadFile {
                name: "sample.vcf".to_string(),
                bytes: b"##fileformat=VCFv4.2\n".to_vec(),
            },
        }
    }

    fn client(base: &str) -> AnalysisClient {
        AnalysisClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_multipart_fields_and_success() {
        let seen: Captured = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/analyze", post(capture_upload))
            .with_state(seen.clone());
        let base = spawn_server(router).await;

        let outcome = client(&format!("{}/", base)).submit_analysis(sample_request()).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].drug, "WARFARIN");
        assert!(!outcome.has_warnings());

        let fields = seen.lock().await;
        let field = |name: &str| fields.iter().find(|(n, _, _)| n == name).cloned().unwrap();
        let (_, file_name, content) = field("vcf_file");
        assert_eq!(file_name.as_deref(), Some("sample.vcf"));
        assert_eq!(content, "##fileformat=VCFv4.2\n");
        assert_eq!(field("patient_id").2, "PATIENT_007");
        assert_eq!(field("drugs").2, "WARFARIN,CODEINE");
    }

    #[tokio::test]
    async fn test_http_error_reads_detail() {
        let router = Router::new().route(
            "/analyze",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"detail": "Invalid VCF: Missing #CHROM header line."})),
                )
                    .into_response()
            }),
        );
        let base = spawn_server(router).await;

        let err = client(&base).submit_analysis(sample_request()).await.unwrap_err();
        assert!(matches!(err, PgxError::Api { status: 400, .. }));
        assert_eq!(err.user_message(), "Invalid VCF: Missing #CHROM header line.");
    }

    #[tokio::test]
    async fn test_http_error_without_detail() {
        let router = Router::new().route(
            "/analyze",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down").into_response() }),
        );
        let base = spawn_server(router).await;

        let err = client(&base).submit_analysis(sample_request()).await.unwrap_err();
        assert_eq!(err.user_message(), "Analysis failed (HTTP 502)");
    }

    #[tokio::test]
    async fn test_success_status_required_even_on_2xx() {
        let router = Router::new().route(
            "/analyze",
            post(|| async {
                Json(json!({"status": "error", "results": [result_item("CODEINE", "Safe")], "errors": ["LLM unavailable"]}))
            }),
        );
        let base = spawn_server(router).await;

        let err = client(&base).submit_analysis(sample_request()).await.unwrap_err();
        assert!(matches!(err, PgxError::Analysis(_)));
        assert_eq!(err.user_message(), "LLM unavailable");
    }

    #[tokio::test]
    async fn test_success_carries_errors_as_warnings() {
        let router = Router::new().route(
            "/analyze",
            post(|| async {
                Json(json!({
                    "status": "success",
                    "results": [result_item("WARFARIN", "Adjust")],
                    "errors": ["CYP2C19: no matching haplotype"]
                }))
            }),
        );
        let base = spawn_server(router).await;

        let outcome = client(&base).submit_analysis(sample_request()).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.warnings, vec!["CYP2C19: no matching haplotype".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let router = Router::new().route("/analyze", post(|| async { "not json" }));
        let base = spawn_server(router).await;

        let err = client(&base).submit_analysis(sample_request()).await.unwrap_err();
        assert!(matches!(err, PgxError::Transport(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr))
            .submit_analysis(sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, PgxError::Transport(_)));
        assert_eq!(err.user_message(), pgx_core::error::GENERIC_TRANSPORT_MESSAGE);
    }

    #[tokio::test]
    async fn test_health() {
        let router = Router::new().route(
            "/health",
            get(|| async { Json(json!({"status": "ok", "service": "PharmaGuard API", "version": "0.1.0"})) }),
        );
        let base = spawn_server(router).await;

        let health = client(&base).health().await.unwrap();
        assert!(health.is_ok());
        assert_eq!(health.service.as_deref(), Some("PharmaGuard API"));
    }
}
