// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use time::OffsetDateTime;

use crate::{Countdown, Reservation, ReservationId, ReservationStatus, TimeLeft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    Fresh,
    Refetching { request_id: u64 },
    Reconciled,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefetchRequest {
    pub reservation_id: ReservationId,
    pub request_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    Reconciled {
        reservation_id: ReservationId,
        status: ReservationStatus,
    },
    RefetchFailed {
        reservation_id: ReservationId,
        message: String,
    },
    StaleResponseDropped {
        reservation_id: ReservationId,
        request_id: u64,
    },
}

impl RowEvent {
    /// Text for the status line, if the event is worth showing.
    pub fn status_message(&self) -> Option<String> {
        match self {
            Self::Reconciled {
                reservation_id,
                status,
            } => Some(format!(
                "reservation {reservation_id} is now {}",
                status.label().to_lowercase()
            )),
            Self::RefetchFailed { message, .. } => Some(format!(
                "{message} -- refresh the list to resynchronize"
            )),
            Self::StaleResponseDropped { .. } => None,
        }
    }
}

/// One displayed reservation: a local copy of the server row plus the
/// countdown toward its `expired_at`.
///
/// The row asks for at most one refetch per expiry of a given target and
/// never because it was re-rendered. A refetch result replaces the local
/// copy wholesale; a failure leaves it untouched and is not retried.
#[derive(Debug, Clone)]
pub struct ReservationRow {
    reservation: Reservation,
    countdown: Option<Countdown>,
    phase: RowPhase,
    last_request_id: u64,
}

impl ReservationRow {
    pub fn new(reservation: Reservation, now: OffsetDateTime) -> Self {
        let countdown = countdown_for(&reservation, now);
        Self {
            reservation,
            countdown,
            phase: RowPhase::Fresh,
            last_request_id: 0,
        }
    }

    pub fn id(&self) -> ReservationId {
        self.reservation.id
    }

    pub fn reservation(&self) -> &Reservation {
        &self.reservation
    }

    pub fn phase(&self) -> RowPhase {
        self.phase
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn time_left(&self) -> TimeLeft {
        self.countdown
            .as_ref()
            .map(Countdown::time_left)
            .unwrap_or(TimeLeft::ZERO)
    }

    pub fn is_detached(&self) -> bool {
        self.phase == RowPhase::Detached
    }

    pub fn is_refetching(&self) -> bool {
        matches!(self.phase, RowPhase::Refetching { .. })
    }

    /// Advances the countdown. Returns a request when expiry is observed for
    /// the first time and the local copy does not already report expiry.
    pub fn tick(&mut self, now: OffsetDateTime) -> Option<RefetchRequest> {
        if self.is_detached() || self.is_refetching() {
            return None;
        }
        let countdown = self.countdown.as_mut()?;
        countdown.tick(now);
        if !countdown.take_expiry() {
            return None;
        }
        if self.reservation.is_expired {
            tracing::debug!(
                reservation_id = %self.reservation.id,
                "countdown expired on a row the server already marked expired"
            );
            return None;
        }

        self.last_request_id = self.last_request_id.saturating_add(1);
        self.phase = RowPhase::Refetching {
            request_id: self.last_request_id,
        };
        tracing::debug!(
            reservation_id = %self.reservation.id,
            request_id = self.last_request_id,
            "expiry observed, refetching reservation"
        );
        Some(RefetchRequest {
            reservation_id: self.reservation.id,
            request_id: self.last_request_id,
        })
    }

    /// Parent list handed this row new data. This is a re-render: it never
    /// requests a refetch by itself. A changed `expired_at` restarts the
    /// countdown, which makes a later expiry a new event.
    pub fn rerender(&mut self, reservation: Reservation, now: OffsetDateTime) {
        if self.is_detached() {
            return;
        }
        self.reservation = reservation;
        self.sync_countdown(now);
    }

    pub fn apply_refetch(
        &mut self,
        request_id: u64,
        result: Result<Reservation>,
        now: OffsetDateTime,
    ) -> RowEvent {
        let reservation_id = self.reservation.id;
        if self.phase != (RowPhase::Refetching { request_id }) {
            tracing::debug!(%reservation_id, request_id, "dropping stale refetch response");
            return RowEvent::StaleResponseDropped {
                reservation_id,
                request_id,
            };
        }

        match result {
            Ok(fresh) if fresh.id == reservation_id => {
                self.reservation = fresh;
                self.sync_countdown(now);
                self.phase = RowPhase::Reconciled;
                RowEvent::Reconciled {
                    reservation_id,
                    status: self.reservation.status,
                }
            }
            Ok(fresh) => {
                self.phase = RowPhase::Fresh;
                let message = format!(
                    "refetch for reservation {reservation_id} returned reservation {}",
                    fresh.id
                );
                tracing::warn!(%reservation_id, "{message}");
                RowEvent::RefetchFailed {
                    reservation_id,
                    message,
                }
            }
            Err(error) => {
                self.phase = RowPhase::Fresh;
                tracing::warn!(%reservation_id, error = %error, "reservation refetch failed");
                RowEvent::RefetchFailed {
                    reservation_id,
                    message: format!("failed to refetch reservation {reservation_id}: {error}"),
                }
            }
        }
    }

    /// Unmount: stops the countdown and turns any in-flight response into a
    /// no-op.
    pub fn detach(&mut self) {
        self.phase = RowPhase::Detached;
        self.countdown = None;
    }

    pub fn status_text(&self) -> String {
        match self.reservation.status {
            ReservationStatus::Pending => {
                let left = self.time_left();
                if left.is_zero() {
                    "Pending · expiring".to_owned()
                } else {
                    format!("Pending · expires in {}", left.compact())
                }
            }
            ReservationStatus::Expired => match self.reservation.expired_at.as_deref() {
                Some(at) => format!("Expired at {at}"),
                None => "Expired".to_owned(),
            },
            status => status.label().to_owned(),
        }
    }

    pub fn can_update(&self) -> bool {
        !self.reservation.is_expired
    }

    /// Payment entry needs a live row with an outstanding balance. Amounts are
    /// server-computed; they are only read here.
    pub fn can_add_payment(&self) -> bool {
        if self.reservation.is_expired {
            return false;
        }
        let amount = |key: &str| self.reservation.extra.get(key).and_then(serde_json::Value::as_f64);
        match (amount("total_price"), amount("amount_paid")) {
            (Some(total), Some(paid)) => total - paid > 0.0,
            _ => true,
        }
    }

    fn sync_countdown(&mut self, now: OffsetDateTime) {
        if self.reservation.status != ReservationStatus::Pending {
            self.countdown = None;
            return;
        }
        let target = self.reservation.expiry_instant();
        match self.countdown.as_mut() {
            Some(countdown) => {
                countdown.retarget(target, now);
            }
            None => self.countdown = Some(Countdown::new(target, now)),
        }
    }
}

fn countdown_for(reservation: &Reservation, now: OffsetDateTime) -> Option<Countdown> {
    (reservation.status == ReservationStatus::Pending)
        .then(|| Countdown::new(reservation.expiry_instant(), now))
}
