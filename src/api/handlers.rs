use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::PosError;
use crate::invoice::InvoiceArtifact;
use crate::manager::PosManager;
use crate::report::Report;

use super::types::{CancelResponse, CreateInvoiceRequest, PaymentStatusResponse};

pub async fn create_invoice_handler(
    State(manager): State<Arc<PosManager>>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<Json<InvoiceArtifact>, PosError> {
    let artifact = manager.create_invoice(req.amount, &req.currency).await?;
    Ok(Json(artifact))
}

pub async fn payment_status_handler(
    State(manager): State<Arc<PosManager>>,
    Path(tag): Path<String>,
) -> Result<Json<PaymentStatusResponse>, PosError> {
    let status = manager.check_payment(&tag).await?;
    Ok(Json(PaymentStatusResponse {
        tag,
        status: status.as_str(),
    }))
}

pub async fn cancel_handler(
    State(manager): State<Arc<PosManager>>,
    Path(tag): Path<String>,
) -> Json<CancelResponse> {
    let released = manager.cancel(&tag);
    Json(CancelResponse { tag, released })
}

pub async fn report_handler(
    State(manager): State<Arc<PosManager>>,
    Path(scope): Path<String>,
) -> Result<Json<Report>, PosError> {
    let report = manager.report(&scope)?;
    Ok(Json(report))
}

pub async fn health_handler() -> &'static str {
    "ok"
}
