// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use time::OffsetDateTime;

use crate::search::filter_by_query;
use crate::{
    RefetchRequest, Reservation, ReservationId, ReservationKind, ReservationRow, RowEvent,
};

/// Rows whose expiry was first observed on the same tick, reconciled in one
/// pass by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchBatch {
    pub batch_id: u64,
    pub kind: ReservationKind,
    pub requests: Vec<RefetchRequest>,
}

/// Host of the per-row reconcilers for one reservation list.
#[derive(Debug, Clone)]
pub struct ReservationTable {
    kind: ReservationKind,
    rows: Vec<ReservationRow>,
    query: String,
    next_batch_id: u64,
}

impl ReservationTable {
    pub fn new(kind: ReservationKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            query: String::new(),
            next_batch_id: 0,
        }
    }

    pub fn kind(&self) -> ReservationKind {
        self.kind
    }

    pub fn rows(&self) -> &[ReservationRow] {
        &self.rows
    }

    pub fn row(&self, id: ReservationId) -> Option<&ReservationRow> {
        self.rows.iter().find(|row| row.id() == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Takes a fresh list fetch. Known ids keep their reconciler state; rows
    /// that disappeared are detached before they are dropped.
    pub fn replace_rows(&mut self, reservations: Vec<Reservation>, now: OffsetDateTime) {
        let mut previous = std::mem::take(&mut self.rows);
        let mut next = Vec::with_capacity(reservations.len());

        for reservation in reservations {
            match previous.iter().position(|row| row.id() == reservation.id) {
                Some(index) => {
                    let mut row = previous.swap_remove(index);
                    row.rerender(reservation, now);
                    next.push(row);
                }
                None => next.push(ReservationRow::new(reservation, now)),
            }
        }

        for row in &mut previous {
            row.detach();
        }
        self.rows = next;
    }

    /// Unmounts every row.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.detach();
        }
        self.rows.clear();
    }

    pub fn tick(&mut self, now: OffsetDateTime) -> Option<RefetchBatch> {
        let requests: Vec<_> = self
            .rows
            .iter_mut()
            .filter_map(|row| row.tick(now))
            .collect();
        if requests.is_empty() {
            return None;
        }
        self.next_batch_id = self.next_batch_id.saturating_add(1);
        Some(RefetchBatch {
            batch_id: self.next_batch_id,
            kind: self.kind,
            requests,
        })
    }

    pub fn apply(
        &mut self,
        request: RefetchRequest,
        result: Result<Reservation>,
        now: OffsetDateTime,
    ) -> RowEvent {
        match self
            .rows
            .iter_mut()
            .find(|row| row.id() == request.reservation_id)
        {
            Some(row) => row.apply_refetch(request.request_id, result, now),
            None => {
                tracing::debug!(
                    reservation_id = %request.reservation_id,
                    "refetch response for a row that is no longer listed"
                );
                RowEvent::StaleResponseDropped {
                    reservation_id: request.reservation_id,
                    request_id: request.request_id,
                }
            }
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn visible_rows(&self) -> Vec<&ReservationRow> {
        filter_by_query(&self.query, &self.rows, |row| row_search_fields(self.kind, row))
    }
}

fn row_search_fields(kind: ReservationKind, row: &ReservationRow) -> Vec<String> {
    let reservation = row.reservation();
    let mut fields = vec![
        reservation.id.to_string(),
        reservation.status.label().to_owned(),
    ];
    let common: &[&[&str]] = &[
        &["user", "name"],
        &["user", "email"],
        &["company", "name"],
    ];
    let specific: &[&[&str]] = match kind {
        ReservationKind::Flight => &[
            &["flight", "flight_number"],
            &["flight", "airline", "name"],
            &["flight", "departure_airport", "name"],
            &["flight", "arrival_airport", "name"],
            &["flight", "departure_airport", "iata"],
            &["flight", "arrival_airport", "iata"],
        ],
        ReservationKind::Hotel => &[&["hotel", "location_1"], &["hotel", "location_2"]],
        ReservationKind::Package => &[
            &["package", "hotel", "location_1"],
            &["package", "hotel", "location_2"],
            &["package", "flight", "flight_number"],
        ],
    };
    fields.extend(
        common
            .iter()
            .chain(specific.iter())
            .filter_map(|path| reservation.text_field(path))
            .map(str::to_owned),
    );
    fields
}
