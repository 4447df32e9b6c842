use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::QueryRejection, DefaultBodyLimit, FromRequest, Multipart, Path, Query,
        Request, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ApplicantForm, AuditId, IntakeSubmission};
use super::repository::AuditStore;
use super::scoring::ScoringService;
use super::service::{CreditIntakeService, IntakeOutcome, IntakeServiceError};

/// Multipart field carrying the transaction table.
pub const TRANSACTIONS_FIELD: &str = "transactions";

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Router builder exposing intake and audit lookup endpoints.
pub fn intake_router<S, R>(service: Arc<CreditIntakeService<S, R>>) -> Router
where
    S: ScoringService + 'static,
    R: AuditStore + 'static,
{
    Router::new()
        .route("/api/verify", post(verify_handler::<S, R>))
        .route("/api/applicants", get(list_handler::<S, R>))
        .route("/api/applicants/:audit_id", get(find_handler::<S, R>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct JsonIntakeBody {
    #[serde(flatten)]
    form: ApplicantForm,
    #[serde(default)]
    transactions: Option<String>,
}

/// Accepts either a multipart form (with an optional file upload) or a JSON body.
pub struct IntakeRequest(pub IntakeSubmission);

#[async_trait]
impl<St> FromRequest<St> for IntakeRequest
where
    St: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(body) = Json::<JsonIntakeBody>::from_request(req, state)
                .await
                .map_err(|rejection| bad_request(rejection.body_text()))?;
            return Ok(Self(IntakeSubmission {
                form: body.form,
                transactions: body.transactions.map(String::into_bytes),
            }));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| bad_request(rejection.body_text()))?;

        let mut submission = IntakeSubmission::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| bad_request(err.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == TRANSACTIONS_FIELD {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| bad_request(err.to_string()))?;
                submission.transactions = Some(bytes.to_vec());
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|err| bad_request(err.to_string()))?;
                submission.form.set_field(&name, text);
            }
        }

        Ok(Self(submission))
    }
}

#[derive(Serialize)]
struct VerifyResponse {
    ok: bool,
    #[serde(flatten)]
    outcome: IntakeOutcome,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListParams {
    limit: Option<usize>,
}

pub(crate) async fn verify_handler<S, R>(
    State(service): State<Arc<CreditIntakeService<S, R>>>,
    IntakeRequest(submission): IntakeRequest,
) -> Response
where
    S: ScoringService + 'static,
    R: AuditStore + 'static,
{
    match service.verify(submission).await {
        Ok(outcome) => {
            let body = VerifyResponse { ok: true, outcome };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn list_handler<S, R>(
    State(service): State<Arc<CreditIntakeService<S, R>>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Response
where
    S: ScoringService + 'static,
    R: AuditStore + 'static,
{
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.list_recent(params.limit).await {
        Ok(applicants) => {
            let payload = json!({ "ok": true, "applicants": applicants });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn find_handler<S, R>(
    State(service): State<Arc<CreditIntakeService<S, R>>>,
    Path(audit_id): Path<String>,
) -> Response
where
    S: ScoringService + 'static,
    R: AuditStore + 'static,
{
    match service.find_by_id(&AuditId(audit_id)).await {
        Ok(applicant) => {
            let payload = json!({ "ok": true, "applicant": applicant });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(IntakeServiceError::NotFound(_)) => {
            let payload = json!({ "ok": false, "error": "not found" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => failure(err),
    }
}

/// Every pipeline failure collapses to one opaque shape.
fn failure(err: IntakeServiceError) -> Response {
    let payload = json!({ "ok": false, "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn bad_request(message: String) -> Response {
    let payload = json!({ "ok": false, "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}
