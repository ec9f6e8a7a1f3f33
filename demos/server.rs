//! Simple REST API server example for the donation ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /applicants` - Join the assistance queue (returns queue position)
//! - `GET /queue/next` - Peek at the next applicant awaiting assistance
//! - `POST /donations` - Donate to the next applicant in line
//! - `GET /donations` - List ledger records (optionally `?donor=<identity>`)
//! - `GET /donors/{identity}/summary` - Contribution totals, percentage, tier
//!
//! ## Example Usage
//!
//! ```bash
//! # Join the queue
//! curl -X POST http://localhost:3000/applicants \
//!   -H "Content-Type: application/json" \
//!   -d '{"identity": "applicant@x.com", "description": "rent assistance", "proofFilename": "paystub.pdf"}'
//!
//! # Donate
//! curl -X POST http://localhost:3000/donations \
//!   -H "Content-Type: application/json" \
//!   -d '{"donorIdentity": "donor@x.com", "amount": "50.00"}'
//!
//! # Contribution summary
//! curl http://localhost:3000/donors/donor@x.com/summary
//! ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use donation_ledger_rs::{
    AggregationEngine, AssistanceQueue, DonationError, DonationRecord, DonationSummary,
    EntrySnapshot, Identity, LedgerStore, MatchingCoordinator, QueuePosition,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for joining the assistance queue.
///
/// ```json
/// {"identity": "applicant@x.com", "description": "rent assistance", "proofFilename": "paystub.pdf"}
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub identity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub proof_filename: Option<String>,
}

/// Request body for a donation.
///
/// ```json
/// {"donorIdentity": "donor@x.com", "amount": "50.00"}
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateRequest {
    pub donor_identity: String,
    pub amount: Decimal,
}

/// Response body for a queue submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub position: QueuePosition,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Query parameters for the donations listing.
#[derive(Debug, Deserialize)]
pub struct DonationsQuery {
    pub donor: Option<String>,
}

// === Application State ===

/// Shared application state over the queue, ledger, and coordinator.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<AssistanceQueue>,
    pub ledger: Arc<LedgerStore>,
    pub coordinator: Arc<MatchingCoordinator>,
    pub stats: Arc<AggregationEngine>,
}

impl AppState {
    fn new() -> Self {
        let queue = Arc::new(AssistanceQueue::new());
        let ledger = Arc::new(LedgerStore::new());
        let coordinator = Arc::new(MatchingCoordinator::new(
            Arc::clone(&queue),
            Arc::clone(&ledger),
        ));
        let stats = Arc::new(AggregationEngine::new(Arc::clone(&ledger)));
        Self {
            queue,
            ledger,
            coordinator,
            stats,
        }
    }
}

// === Error Handling ===

/// Wrapper for converting `DonationError` into HTTP responses.
pub struct AppError(DonationError);

impl From<DonationError> for AppError {
    fn from(err: DonationError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            DonationError::InvalidRequest => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            DonationError::InvalidRecord => (StatusCode::BAD_REQUEST, "INVALID_RECORD"),
            DonationError::QueueEmpty => (StatusCode::NOT_FOUND, "QUEUE_EMPTY"),
            DonationError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DonationError::DuplicateApplicant => (StatusCode::CONFLICT, "DUPLICATE_APPLICANT"),
            DonationError::AlreadyClaimed => (StatusCode::CONFLICT, "ALREADY_CLAIMED"),
            DonationError::Contended => (StatusCode::CONFLICT, "CONTENDED"),
            DonationError::StorageFailure => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE")
            }
            DonationError::InvalidToken => (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_TOKEN"),
        };

        // Donor-facing flows get plain guidance, never raw internals.
        let error = match &self.0 {
            DonationError::QueueEmpty => "no recipients available".to_string(),
            DonationError::Contended => "another donation is in flight, try again".to_string(),
            DonationError::StorageFailure => "donation could not be recorded, try again".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /applicants - Join the assistance queue.
async fn submit_applicant(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let position = state.queue.submit(
        Identity::from(request.identity),
        request.description,
        request.proof_filename,
    )?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { position })))
}

/// GET /queue/next - Peek at the next applicant without claiming.
async fn next_applicant(
    State(state): State<AppState>,
) -> Result<Json<EntrySnapshot>, AppError> {
    let identity = state.queue.peek_next().ok_or(DonationError::QueueEmpty)?;
    let snapshot = state
        .queue
        .snapshot_of(&identity)
        .ok_or(DonationError::QueueEmpty)?;
    Ok(Json(snapshot))
}

/// POST /donations - Donate to the next applicant in line.
async fn create_donation(
    State(state): State<AppState>,
    Json(request): Json<DonateRequest>,
) -> Result<(StatusCode, Json<DonationRecord>), AppError> {
    let donor = Identity::from(request.donor_identity);
    let record = state.coordinator.donate(&donor, request.amount)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /donations - List ledger records, optionally filtered by donor.
async fn list_donations(
    State(state): State<AppState>,
    Query(query): Query<DonationsQuery>,
) -> Json<Vec<DonationRecord>> {
    let records: Vec<DonationRecord> = match query.donor {
        Some(donor) => state
            .ledger
            .find_by_donor(&Identity::from(donor))
            .map(|record| (*record).clone())
            .collect(),
        None => state
            .ledger
            .scan_all()
            .map(|record| (*record).clone())
            .collect(),
    };
    Json(records)
}

/// GET /donors/{identity}/summary - Contribution summary for one donor.
async fn donor_summary(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Json<DonationSummary> {
    Json(state.stats.summary(&Identity::from(identity)))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/applicants", post(submit_applicant))
        .route("/queue/next", get(next_applicant))
        .route("/donations", post(create_donation).get(list_donations))
        .route("/donors/{identity}/summary", get(donor_summary))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "donation_ledger_rs=debug,server=info".into()),
        )
        .init();

    let state = AppState::new();
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Donation ledger API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /applicants                - Join the assistance queue");
    println!("  GET  /queue/next                - Peek at the next applicant");
    println!("  POST /donations                 - Donate to the next applicant");
    println!("  GET  /donations                 - List ledger records");
    println!("  GET  /donors/:identity/summary  - Donor contribution summary");

    axum::serve(listener, app).await.unwrap();
}
