use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Booking;
use crate::services::confirmation;
use crate::services::payments::IntentStatus;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ConfirmResponse {
    payment_status: IntentStatus,
    changed: bool,
    booking: Booking,
}

// POST /api/payments/:intent_id/confirm
//
// The client's word is not enough: the processor is asked for the real status.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(intent_id): Path<String>,
) -> AppResult<Json<ConfirmResponse>> {
    let booking = {
        let conn = state.conn()?;
        queries::find_booking_by_transaction_id(&conn, &intent_id)?
            .ok_or_else(|| AppError::UnknownPayment(intent_id.clone()))?
    };

    let status = state
        .payments
        .retrieve_payment_status(&intent_id)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    let now = super::now();
    let (changed, booking) = match status {
        IntentStatus::Succeeded => {
            let mut conn = state.conn()?;
            let result = confirmation::on_payment_succeeded(&mut conn, &intent_id, now)?;
            (result.changed, result.booking)
        }
        IntentStatus::Failed | IntentStatus::Canceled => {
            let mut conn = state.conn()?;
            let result = confirmation::on_payment_failed_or_cancelled(&mut conn, &intent_id, now)?;
            (result.changed, result.booking)
        }
        IntentStatus::Processing => (false, booking),
    };

    Ok(Json(ConfirmResponse {
        payment_status: status,
        changed,
        booking,
    }))
}
