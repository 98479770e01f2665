// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Row actions that need a confirmation modal before they reach the backend,
//! and the detail view they are launched from.

use anyhow::{Result, bail};

use crate::modal::{
    DELETE_FLIGHT_RESERVATION, DELETE_HOTEL_RESERVATION, DELETE_PACKAGE_RESERVATION,
    FLIGHT_RESERVATION_DETAIL, HOTEL_RESERVATION_DETAIL, PACKAGE_RESERVATION_DETAIL,
    VALIDATE_FLIGHT_RESERVATION_PAYMENT, VALIDATE_HOTEL_RESERVATION_PAYMENT,
    VALIDATE_PACKAGE_RESERVATION_PAYMENT,
};
use crate::{Payment, PaymentStatus, Reservation, ReservationId, ReservationKind, ReservationStatus};

pub const VALIDATE_PAYMENT_PATH: &str = "/payment/validate";

pub const fn detail_modal_key(kind: ReservationKind) -> &'static str {
    match kind {
        ReservationKind::Flight => FLIGHT_RESERVATION_DETAIL,
        ReservationKind::Hotel => HOTEL_RESERVATION_DETAIL,
        ReservationKind::Package => PACKAGE_RESERVATION_DETAIL,
    }
}

/// DELETE endpoint for a reservation collection. The flight route is named
/// differently from the other two.
pub const fn delete_path(kind: ReservationKind) -> &'static str {
    match kind {
        ReservationKind::Flight => "/hajj-umrah/flights/reservations/delete",
        ReservationKind::Hotel => "/hajj-umrah/hotels/reservations/destroy",
        ReservationKind::Package => "/hajj-umrah/packages/reservations/destroy",
    }
}

/// A destructive or money-moving request waiting for the operator to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Delete {
        kind: ReservationKind,
        ids: Vec<ReservationId>,
    },
    ValidatePayment {
        kind: ReservationKind,
        reservation_id: ReservationId,
        payment_code: String,
    },
}

impl RowAction {
    pub fn kind(&self) -> ReservationKind {
        match self {
            Self::Delete { kind, .. } | Self::ValidatePayment { kind, .. } => *kind,
        }
    }

    pub fn modal_key(&self) -> &'static str {
        match (self, self.kind()) {
            (Self::Delete { .. }, ReservationKind::Flight) => DELETE_FLIGHT_RESERVATION,
            (Self::Delete { .. }, ReservationKind::Hotel) => DELETE_HOTEL_RESERVATION,
            (Self::Delete { .. }, ReservationKind::Package) => DELETE_PACKAGE_RESERVATION,
            (Self::ValidatePayment { .. }, ReservationKind::Flight) => {
                VALIDATE_FLIGHT_RESERVATION_PAYMENT
            }
            (Self::ValidatePayment { .. }, ReservationKind::Hotel) => {
                VALIDATE_HOTEL_RESERVATION_PAYMENT
            }
            (Self::ValidatePayment { .. }, ReservationKind::Package) => {
                VALIDATE_PACKAGE_RESERVATION_PAYMENT
            }
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::Delete { kind, ids } => {
                let listed: Vec<String> = ids.iter().map(|id| format!("#{id}")).collect();
                format!(
                    "delete {} {} reservation(s) {}? this cannot be undone",
                    ids.len(),
                    kind.as_str(),
                    listed.join(", ")
                )
            }
            Self::ValidatePayment {
                reservation_id,
                payment_code,
                ..
            } => format!("mark payment {payment_code} on reservation #{reservation_id} as paid?"),
        }
    }

    /// Modal to go back to when the confirmation is cancelled. Validation
    /// is launched from the detail view, so cancelling returns there.
    pub fn returns_to(&self) -> Option<&'static str> {
        match self {
            Self::Delete { .. } => None,
            Self::ValidatePayment { kind, .. } => Some(detail_modal_key(*kind)),
        }
    }
}

/// What the detail modal shows for one reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDetail {
    pub id: ReservationId,
    pub status: ReservationStatus,
    pub payments: Vec<Payment>,
    pub total: i64,
    pub paid: i64,
}

impl ReservationDetail {
    pub fn new(reservation: &Reservation) -> Self {
        Self {
            id: reservation.id,
            status: reservation.status,
            payments: reservation.payments(),
            total: reservation.money("total_price").unwrap_or(0),
            paid: reservation.money("amount_paid").unwrap_or(0),
        }
    }

    pub fn leftover(&self) -> i64 {
        self.total - self.paid
    }

    /// The payment `code` if it can still be validated.
    pub fn validatable(&self, code: &str) -> Result<&Payment> {
        let Some(payment) = self
            .payments
            .iter()
            .find(|payment| payment.payment_code.eq_ignore_ascii_case(code.trim()))
        else {
            bail!(
                "reservation {} has no payment {code:?} -- check the code in the detail view",
                self.id
            );
        };
        if payment.status != PaymentStatus::Unpaid {
            bail!(
                "payment {} is {} -- only unpaid payments can be validated",
                payment.payment_code,
                payment.status.as_str()
            );
        }
        Ok(payment)
    }
}

/// Whole rupiah with dot thousands separators, e.g. `Rp 1.500.000`.
pub fn rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}Rp {grouped}")
}
