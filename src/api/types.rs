use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub tag: String,
    /// One of "pending", "confirmed", "expired".
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub tag: String,
    pub released: bool,
}
