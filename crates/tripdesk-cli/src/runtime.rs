// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tripdesk_app::{
    AppCommand, AppEvent, AppState, Candidate, FieldKey, Flight, FlightId, FormEvent, FormKind,
    FormSession, FormSettings, ModalStore, PaymentStatus, RefetchBatch, ReferenceList,
    Reservation, ReservationDetail, ReservationId, ReservationKind, ReservationRow,
    ReservationStatus, ReservationTable, RowAction, RowEvent, SelectorEvent, SubmitOutcome,
    candidates, detail_modal_key, payment_method_candidates, reservation_holder_candidates,
};
use tripdesk_testkit::{DemoDataset, ReservationBuilder, expire_if_due};

const DEMO_HOLD_MINUTES: i64 = 15;

/// Data source behind the reservation screens.
pub trait Backend {
    fn list_reservations(&mut self, kind: ReservationKind) -> Result<Vec<Reservation>>;
    fn fetch_reservation(&mut self, kind: ReservationKind, id: ReservationId)
    -> Result<Reservation>;
    fn reference(&mut self, list: ReferenceList) -> Result<Vec<Candidate>>;
    fn list_flights(&mut self) -> Result<Vec<Flight>>;
    fn submit(&mut self, path: &str, body: &Value) -> Result<SubmitOutcome>;
    fn delete_reservations(&mut self, kind: ReservationKind, ids: &[ReservationId])
    -> Result<String>;
    fn validate_payment(&mut self, payment_code: &str) -> Result<String>;
}

pub struct ApiBackend {
    client: tripdesk_api::Client,
}

impl ApiBackend {
    pub fn new(client: tripdesk_api::Client) -> Self {
        Self { client }
    }
}

impl Backend for ApiBackend {
    fn list_reservations(&mut self, kind: ReservationKind) -> Result<Vec<Reservation>> {
        self.client.list_reservations(kind)
    }

    fn fetch_reservation(
        &mut self,
        kind: ReservationKind,
        id: ReservationId,
    ) -> Result<Reservation> {
        self.client.fetch_reservation(kind, id)
    }

    fn reference(&mut self, list: ReferenceList) -> Result<Vec<Candidate>> {
        self.client.reference(list)
    }

    fn list_flights(&mut self) -> Result<Vec<Flight>> {
        self.client.list_flights()
    }

    fn submit(&mut self, path: &str, body: &Value) -> Result<SubmitOutcome> {
        self.client.submit(path, body)
    }

    fn delete_reservations(
        &mut self,
        kind: ReservationKind,
        ids: &[ReservationId],
    ) -> Result<String> {
        self.client.delete_reservations(kind, ids)
    }

    fn validate_payment(&mut self, payment_code: &str) -> Result<String> {
        self.client.validate_payment(payment_code)
    }
}

/// In-memory backend for `--demo`. Pending rows lapse on the supplied clock
/// the way the server would lapse them.
pub struct DemoBackend {
    data: DemoDataset,
    clock: Box<dyn Fn() -> OffsetDateTime>,
}

impl DemoBackend {
    pub fn new(data: DemoDataset, clock: Box<dyn Fn() -> OffsetDateTime>) -> Self {
        Self { data, clock }
    }

    #[cfg(test)]
    pub fn dataset(&self) -> &DemoDataset {
        &self.data
    }

    fn rows_mut(&mut self, kind: ReservationKind) -> &mut Vec<Reservation> {
        self.data.reservations.entry(kind.as_str()).or_default()
    }

    fn next_reservation_id(&self) -> i64 {
        self.data
            .reservations
            .values()
            .flatten()
            .map(|reservation| reservation.id.get())
            .max()
            .unwrap_or(0)
            + 1
    }

    fn store_package_reservation(&mut self, body: &Value) -> Result<SubmitOutcome> {
        let field = |key: &str| body.get(key).and_then(Value::as_i64);
        let package = field("package_id")
            .and_then(|id| self.data.packages.iter().find(|p| p.id.get() == id))
            .cloned();
        let user = field("user_id")
            .and_then(|id| self.data.users.iter().find(|u| u.id.get() == id))
            .cloned();
        let company = field("company_id")
            .and_then(|id| self.data.companies.iter().find(|c| c.id.get() == id))
            .cloned()
            .or_else(|| user.as_ref().and_then(|u| u.company.clone()));
        let amount = field("amount").unwrap_or(0);

        let mut errors = BTreeMap::new();
        for (key, missing) in [
            ("package_id", package.is_none()),
            ("user_id", user.is_none()),
            ("company_id", company.is_none()),
        ] {
            if missing {
                errors.insert(key.to_owned(), vec![format!("The selected {key} is invalid.")]);
            }
        }
        let (Some(package), Some(user), Some(company)) = (package, user, company) else {
            return Ok(SubmitOutcome::Rejected {
                message: "The given data was invalid.".to_owned(),
                errors,
            });
        };
        if amount > package.packages_left {
            let message = format!(
                "The amount field must not be greater than {}.",
                package.packages_left
            );
            errors.insert("amount".to_owned(), vec![message.clone()]);
            return Ok(SubmitOutcome::Rejected { message, errors });
        }

        let now = (self.clock)();
        let reservation = ReservationBuilder::pending_until(
            self.next_reservation_id(),
            now + time::Duration::minutes(DEMO_HOLD_MINUTES),
        )
        .holder(&user, &company)?
        .field(
            "package",
            serde_json::to_value(&package).context("encode package")?,
        )
        .field("amount", json!(amount))
        .prices(package.price_per_package * amount, 0)
        .build();

        if let Some(stored) = self.data.packages.iter_mut().find(|p| p.id == package.id) {
            stored.packages_left -= amount;
        }
        self.rows_mut(ReservationKind::Package).push(reservation);
        Ok(SubmitOutcome::Accepted {
            message: "Reservation created".to_owned(),
        })
    }

    fn add_payment(&mut self, kind: ReservationKind, body: &Value) -> Result<SubmitOutcome> {
        let id = body.get("id").and_then(Value::as_i64);
        let amount = body.get("amount").and_then(Value::as_i64).unwrap_or(0);
        let now = (self.clock)();

        let Some(reservation) = self
            .rows_mut(kind)
            .iter_mut()
            .find(|reservation| Some(reservation.id.get()) == id)
        else {
            return Ok(rejected("id", "The selected reservation is invalid."));
        };
        expire_if_due(reservation, now);
        if reservation.is_expired {
            return Ok(rejected("id", "This reservation has expired."));
        }

        settle(reservation, amount);
        Ok(SubmitOutcome::Accepted {
            message: "Payment recorded".to_owned(),
        })
    }
}

/// Credits `amount` to the row and moves it out of the pending state.
fn settle(reservation: &mut Reservation, amount: i64) {
    let total = reservation.money("total_price").unwrap_or(0);
    let paid = reservation.money("amount_paid").unwrap_or(0) + amount;
    reservation
        .extra
        .insert("amount_paid".to_owned(), json!(paid));
    reservation.status = if paid >= total {
        ReservationStatus::Paid
    } else {
        ReservationStatus::PartiallyPaid
    };
    reservation.expired_at = None;
}

fn rejected(field: &str, message: &str) -> SubmitOutcome {
    SubmitOutcome::Rejected {
        message: message.to_owned(),
        errors: BTreeMap::from([(field.to_owned(), vec![message.to_owned()])]),
    }
}

impl Backend for DemoBackend {
    fn list_reservations(&mut self, kind: ReservationKind) -> Result<Vec<Reservation>> {
        let now = (self.clock)();
        let rows = self.rows_mut(kind);
        for reservation in rows.iter_mut() {
            expire_if_due(reservation, now);
        }
        Ok(rows.clone())
    }

    fn fetch_reservation(
        &mut self,
        kind: ReservationKind,
        id: ReservationId,
    ) -> Result<Reservation> {
        let now = (self.clock)();
        let reservation = self
            .rows_mut(kind)
            .iter_mut()
            .find(|reservation| reservation.id == id)
            .ok_or_else(|| anyhow!("server error (404): Reservation not found"))?;
        expire_if_due(reservation, now);
        Ok(reservation.clone())
    }

    fn reference(&mut self, list: ReferenceList) -> Result<Vec<Candidate>> {
        Ok(match list {
            ReferenceList::ReservationHolders => reservation_holder_candidates(&self.data.users),
            ReferenceList::Companies => candidates(&self.data.companies),
            ReferenceList::Flights => candidates(&self.data.flights),
            ReferenceList::Hotels => candidates(&self.data.hotels),
            ReferenceList::Packages => candidates(&self.data.packages),
            ReferenceList::Airports => candidates(&self.data.airports),
            ReferenceList::PaymentMethods => payment_method_candidates(&self.data.payment_methods),
        })
    }

    fn list_flights(&mut self) -> Result<Vec<Flight>> {
        Ok(self.data.flights.clone())
    }

    fn submit(&mut self, path: &str, body: &Value) -> Result<SubmitOutcome> {
        if path == "/hajj-umrah/packages/reservations/store" {
            return self.store_package_reservation(body);
        }
        let payment_kind = path
            .strip_prefix("/hajj-umrah/")
            .and_then(|rest| rest.strip_suffix("/reservations/add-payment"))
            .and_then(|collection| {
                ReservationKind::ALL
                    .into_iter()
                    .find(|kind| kind.collection() == collection)
            });
        if let Some(kind) = payment_kind {
            return self.add_payment(kind, body);
        }
        tracing::debug!(path, "demo backend accepted submit without changes");
        Ok(SubmitOutcome::Accepted {
            message: "saved".to_owned(),
        })
    }

    fn delete_reservations(
        &mut self,
        kind: ReservationKind,
        ids: &[ReservationId],
    ) -> Result<String> {
        if ids.is_empty() {
            bail!("no reservations selected to delete");
        }
        let rows = self.rows_mut(kind);
        let before = rows.len();
        rows.retain(|reservation| !ids.contains(&reservation.id));
        let removed = before - rows.len();
        if removed == 0 {
            bail!("server error (404): Reservation not found");
        }
        Ok(format!("{removed} reservation(s) deleted"))
    }

    fn validate_payment(&mut self, payment_code: &str) -> Result<String> {
        let now = (self.clock)();
        for kind in ReservationKind::ALL {
            for reservation in self.rows_mut(kind).iter_mut() {
                let mut payments = reservation.payments();
                let Some(payment) = payments
                    .iter_mut()
                    .find(|payment| payment.payment_code == payment_code)
                else {
                    continue;
                };
                if payment.status != PaymentStatus::Unpaid {
                    bail!("server error (422): Payment has already been validated");
                }
                expire_if_due(reservation, now);
                if reservation.is_expired {
                    bail!("server error (422): This reservation has expired.");
                }
                payment.status = PaymentStatus::Paid;
                let amount = payment.amount;
                let encoded = serde_json::to_value(&payments).context("encode payments")?;
                reservation.extra.insert("payments".to_owned(), encoded);
                settle(reservation, amount);
                return Ok("Payment validated".to_owned());
            }
        }
        bail!("server error (404): Payment not found")
    }
}

/// Owns the screen state for one session: the active reservation list, the
/// modal slot, and whatever is open in it (a form, a reservation's detail
/// view, or an action waiting for confirmation).
pub struct Host<B: Backend> {
    backend: B,
    state: AppState,
    table: ReservationTable,
    batch: bool,
    settings: FormSettings,
    form: Option<FormSession>,
    detail: Option<ReservationId>,
    pending: Option<RowAction>,
}

impl<B: Backend> Host<B> {
    pub fn new(backend: B, kind: ReservationKind, settings: FormSettings, batch: bool) -> Self {
        let modals = ModalStore::new();
        let mut state = AppState::new(&modals);
        state.active_kind = kind;
        Self {
            backend,
            state,
            table: ReservationTable::new(kind),
            batch,
            settings,
            form: None,
            detail: None,
            pending: None,
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn table(&self) -> &ReservationTable {
        &self.table
    }

    pub fn form(&self) -> Option<&FormSession> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormSession> {
        self.form.as_mut()
    }

    /// Row behind the open detail view. `None` once the row leaves the list.
    pub fn detail_row(&self) -> Option<&ReservationRow> {
        self.detail.and_then(|id| self.table.row(id))
    }

    pub fn pending(&self) -> Option<&RowAction> {
        self.pending.as_ref()
    }

    pub fn set_query(&mut self, query: &str) {
        self.table.set_query(query);
    }

    pub fn refresh(&mut self, now: OffsetDateTime) -> Result<()> {
        let kind = self.table.kind();
        let rows = self
            .backend
            .list_reservations(kind)
            .with_context(|| format!("load {} reservations", kind.as_str()))?;
        tracing::debug!(kind = kind.as_str(), rows = rows.len(), "reservation list loaded");
        self.table.replace_rows(rows, now);
        Ok(())
    }

    /// Moves to the next reservation list. Rows of the old list are
    /// unmounted before the new list loads.
    pub fn next_kind(&mut self, now: OffsetDateTime) -> Result<()> {
        for event in self.state.dispatch(AppCommand::NextKind) {
            if let AppEvent::KindChanged(kind) = event {
                let query = self.table.query().to_owned();
                self.table.clear();
                self.table = ReservationTable::new(kind);
                self.table.set_query(query);
            }
        }
        self.refresh(now)
    }

    /// Advances every countdown and reconciles rows that crossed their
    /// deadline.
    pub fn tick(&mut self, now: OffsetDateTime) -> Vec<RowEvent> {
        let Some(batch) = self.table.tick(now) else {
            return Vec::new();
        };
        let events = if self.batch && batch.requests.len() > 1 {
            self.reconcile_with_list(batch, now)
        } else {
            self.reconcile_each(batch, now)
        };
        for event in &events {
            if let Some(message) = event.status_message() {
                self.state.dispatch(AppCommand::SetStatus(message));
            }
        }
        events
    }

    fn reconcile_each(&mut self, batch: RefetchBatch, now: OffsetDateTime) -> Vec<RowEvent> {
        batch
            .requests
            .into_iter()
            .map(|request| {
                let result = self
                    .backend
                    .fetch_reservation(batch.kind, request.reservation_id);
                self.table.apply(request, result, now)
            })
            .collect()
    }

    fn reconcile_with_list(&mut self, batch: RefetchBatch, now: OffsetDateTime) -> Vec<RowEvent> {
        tracing::debug!(
            batch_id = batch.batch_id,
            rows = batch.requests.len(),
            "reconciling expired rows with one list fetch"
        );
        let listed = self
            .backend
            .list_reservations(batch.kind)
            .map_err(|error| format!("{error:#}"));

        batch
            .requests
            .into_iter()
            .map(|request| {
                let result = match &listed {
                    Ok(rows) => rows
                        .iter()
                        .find(|row| row.id == request.reservation_id)
                        .cloned()
                        .ok_or_else(|| {
                            anyhow!("reservation {} is no longer listed", request.reservation_id)
                        }),
                    Err(message) => Err(anyhow!("{message}")),
                };
                self.table.apply(request, result, now)
            })
            .collect()
    }

    /// Opens a form in the modal slot, loads its reference lists, and
    /// prefills it from `target` when one is given.
    pub fn open_form(&mut self, kind: FormKind, target: Option<ReservationId>) -> Result<()> {
        let reservation = match target {
            Some(id) => Some(
                self.table
                    .row(id)
                    .map(|row| row.reservation().clone())
                    .ok_or_else(|| {
                        anyhow!("reservation {id} is not in the current list -- refresh and retry")
                    })?,
            ),
            None => None,
        };
        if let Some(reservation) = &reservation
            && reservation.is_expired
        {
            bail!("reservation {} has expired -- it can no longer be changed", reservation.id);
        }

        self.detail = None;
        self.pending = None;
        self.state
            .dispatch(AppCommand::OpenModal(kind.modal_key().to_owned()));
        let mut form = FormSession::new(kind, &self.settings);
        for (field, list) in kind.reference_lists() {
            let loaded = self.backend.reference(list);
            if let Some(message) = form.selector_mut().load(field, loaded) {
                self.state.dispatch(AppCommand::SetStatus(message));
            }
        }
        if let Some(reservation) = &reservation {
            form.edit_reservation(reservation);
        }
        self.form = Some(form);
        Ok(())
    }

    /// Opens the flight edit form prefilled from the backend's flight list.
    pub fn edit_flight(&mut self, id: FlightId) -> Result<()> {
        let flight = self
            .backend
            .list_flights()?
            .into_iter()
            .find(|flight| flight.id == id)
            .ok_or_else(|| anyhow!("flight {id} was not found -- check the id and retry"))?;
        self.open_form(FormKind::UpdateFlight, None)?;
        if let Some(form) = self.form.as_mut() {
            form.edit_flight(&flight);
        }
        Ok(())
    }

    /// Focuses a choice field, refetching its list if the last load failed.
    pub fn open_field(&mut self, field: FieldKey) -> Result<()> {
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| anyhow!("no form is open"))?;
        let kind = form.kind();
        for event in form.selector_mut().open(field) {
            if let SelectorEvent::ReloadRequested { field } = event {
                let list = kind
                    .reference_lists()
                    .into_iter()
                    .find_map(|(key, list)| (key == field).then_some(list))
                    .ok_or_else(|| anyhow!("{field} has no reference list"))?;
                let loaded = self.backend.reference(list);
                if let Some(message) = form.selector_mut().load(field, loaded) {
                    self.state.dispatch(AppCommand::SetStatus(message));
                }
            }
        }
        Ok(())
    }

    /// Closes whatever is open. Cancelling a payment validation goes back to
    /// the detail view it was started from.
    pub fn close_modal(&mut self) {
        if let Some(action) = self.pending.take()
            && let Some(key) = action.returns_to()
            && self.detail_row().is_some()
        {
            self.state.dispatch(AppCommand::OpenModal(key.to_owned()));
            return;
        }
        self.state.dispatch(AppCommand::CloseModal);
        self.form = None;
        self.detail = None;
    }

    /// Opens the detail view of a row in the current list.
    pub fn show_detail(&mut self, id: ReservationId) -> Result<()> {
        if self.table.row(id).is_none() {
            bail!("reservation {id} is not in the current list -- refresh and retry");
        }
        self.form = None;
        self.pending = None;
        self.detail = Some(id);
        self.state.dispatch(AppCommand::OpenModal(
            detail_modal_key(self.table.kind()).to_owned(),
        ));
        Ok(())
    }

    /// Asks for confirmation before deleting `ids`. Expired rows can be
    /// deleted too.
    pub fn request_delete(&mut self, ids: Vec<ReservationId>) -> Result<()> {
        if ids.is_empty() {
            bail!("delete requires at least one reservation id");
        }
        if let Some(missing) = ids.iter().find(|id| self.table.row(**id).is_none()) {
            bail!("reservation {missing} is not in the current list -- refresh and retry");
        }
        let action = RowAction::Delete {
            kind: self.table.kind(),
            ids,
        };
        self.form = None;
        self.detail = None;
        self.state
            .dispatch(AppCommand::OpenModal(action.modal_key().to_owned()));
        self.pending = Some(action);
        Ok(())
    }

    /// Asks for confirmation before validating an unpaid payment of the
    /// reservation in the open detail view.
    pub fn request_validation(&mut self, payment_code: &str) -> Result<()> {
        let row = self
            .detail_row()
            .ok_or_else(|| anyhow!("no reservation is open -- run `show <id>` first"))?;
        let detail = ReservationDetail::new(row.reservation());
        let payment = detail.validatable(payment_code)?;
        let action = RowAction::ValidatePayment {
            kind: self.table.kind(),
            reservation_id: detail.id,
            payment_code: payment.payment_code.clone(),
        };
        self.state
            .dispatch(AppCommand::OpenModal(action.modal_key().to_owned()));
        self.pending = Some(action);
        Ok(())
    }

    /// Runs the action waiting for confirmation. Success closes the modal
    /// and reloads the list; a failure keeps the confirmation open.
    pub fn confirm(&mut self, now: OffsetDateTime) -> Result<String> {
        let action = self
            .pending
            .clone()
            .ok_or_else(|| anyhow!("nothing is waiting for confirmation"))?;
        let result = match &action {
            RowAction::Delete { kind, ids } => self.backend.delete_reservations(*kind, ids),
            RowAction::ValidatePayment { payment_code, .. } => {
                self.backend.validate_payment(payment_code)
            }
        };
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                self.state
                    .dispatch(AppCommand::SetStatus(format!("{error:#}")));
                return Err(error);
            }
        };

        tracing::info!(modal = action.modal_key(), "confirmed row action");
        self.pending = None;
        self.detail = None;
        let events = self.state.dispatch(AppCommand::FormSubmitted {
            message: message.clone(),
            refresh: Some(action.kind()),
        });
        for event in events {
            if let AppEvent::RefetchRequested(kind) = event
                && kind == self.table.kind()
            {
                self.refresh(now)?;
            }
        }
        Ok(message)
    }

    /// Sends the open form. An accepted form closes its modal and reloads
    /// the list it changed when that list is on screen.
    pub fn submit_form(&mut self, now: OffsetDateTime) -> Result<FormEvent> {
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| anyhow!("no form is open"))?;
        let ticket = form.begin_submit(now)?;
        let result = self.backend.submit(&ticket.path, &ticket.body);
        let event = form.finish_submit(ticket.submit_id, result, &self.state.modal());

        match &event {
            FormEvent::Submitted { message, refresh } => {
                let events = self.state.dispatch(AppCommand::FormSubmitted {
                    message: message.clone(),
                    refresh: *refresh,
                });
                self.form = None;
                for event in events {
                    if let AppEvent::RefetchRequested(kind) = event
                        && kind == self.table.kind()
                    {
                        self.refresh(now)?;
                    }
                }
            }
            FormEvent::Rejected { message } => {
                self.state.dispatch(AppCommand::SetStatus(message.clone()));
            }
            FormEvent::Dropped { .. } => {}
        }
        Ok(event)
    }

    /// True while some visible row still has a running countdown.
    pub fn has_live_countdowns(&self) -> bool {
        self.table
            .rows()
            .iter()
            .any(|row| row.countdown().is_some_and(|countdown| countdown.is_ticking()))
    }

    pub fn render(&self) -> String {
        let kind = self.table.kind();
        let rows = self.table.visible_rows();
        let mut out = format!(
            "{} reservations ({} of {})",
            kind.as_str(),
            rows.len(),
            self.table.len()
        );
        if !self.table.query().trim().is_empty() {
            out.push_str(&format!(" matching {:?}", self.table.query()));
        }
        out.push('\n');

        for row in rows {
            let reservation = row.reservation();
            let holder = reservation.text_field(&["user", "name"]).unwrap_or("-");
            let company = reservation.text_field(&["company", "name"]).unwrap_or("-");
            let mut actions = Vec::new();
            if row.can_update() {
                actions.push("update");
            }
            if row.can_add_payment() {
                actions.push("pay");
            }
            actions.push("show");
            actions.push("delete");
            out.push_str(&format!(
                "  #{:<6} {:<24} {:<28} {}",
                reservation.id.get(),
                holder,
                company,
                row.status_text()
            ));
            if !actions.is_empty() {
                out.push_str(&format!("  [{}]", actions.join(", ")));
            }
            out.push('\n');
        }

        if let Some(status) = &self.state.status_line {
            out.push_str(&format!("> {status}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiBackend, Backend, DemoBackend, Host};
    use anyhow::{Result, anyhow};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::thread;
    use time::{Duration, OffsetDateTime};
    use tiny_http::{Header, Response, Server};
    use tripdesk_app::{
        AMOUNT, FormEvent, FormKind, FormSettings, PACKAGE, PAYMENT_METHOD, ReservationId,
        ReservationKind, ReservationStatus, RowEvent, USER, UserType,
    };
    use tripdesk_testkit::{demo_dataset, demo_payment_code, fixture_now};

    fn demo_host(batch: bool) -> Result<(Host<DemoBackend>, Rc<Cell<OffsetDateTime>>)> {
        let clock = Rc::new(Cell::new(fixture_now()));
        let data = demo_dataset(7, fixture_now())?;
        let source = Rc::clone(&clock);
        let backend = DemoBackend::new(data, Box::new(move || source.get()));
        let host = Host::new(backend, ReservationKind::Flight, FormSettings::default(), batch);
        Ok((host, clock))
    }

    fn pending_ids(host: &Host<DemoBackend>) -> Vec<ReservationId> {
        host.table()
            .rows()
            .iter()
            .filter(|row| row.reservation().status == ReservationStatus::Pending)
            .map(|row| row.id())
            .collect()
    }

    #[test]
    fn demo_rows_lapse_and_reconcile_one_by_one() -> Result<()> {
        let (mut host, clock) = demo_host(false)?;
        host.refresh(fixture_now())?;
        let pending = pending_ids(&host);
        assert_eq!(pending.len(), 2);
        assert!(host.has_live_countdowns());

        let later = fixture_now() + Duration::minutes(1);
        clock.set(later);
        let events = host.tick(later);
        assert_eq!(events.len(), 2);
        for event in &events {
            let RowEvent::Reconciled { status, .. } = event else {
                return Err(anyhow!("expected reconciliation, got {event:?}"));
            };
            assert_eq!(*status, ReservationStatus::Expired);
        }
        assert!(pending_ids(&host).is_empty());
        assert!(!host.has_live_countdowns());
        assert!(host.tick(later + Duration::seconds(1)).is_empty());
        assert!(
            host.state()
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("is now expired"))
        );
        Ok(())
    }

    #[test]
    fn batched_reconciliation_uses_the_list() -> Result<()> {
        let (mut host, clock) = demo_host(true)?;
        host.refresh(fixture_now())?;

        let later = fixture_now() + Duration::minutes(1);
        clock.set(later);
        let events = host.tick(later);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| matches!(
            event,
            RowEvent::Reconciled {
                status: ReservationStatus::Expired,
                ..
            }
        )));
        let rendered = host.render();
        assert!(rendered.contains("Expired at"));
        Ok(())
    }

    #[test]
    fn next_kind_loads_the_new_list() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.refresh(fixture_now())?;
        host.next_kind(fixture_now())?;
        assert_eq!(host.state().active_kind, ReservationKind::Hotel);
        assert_eq!(host.table().kind(), ReservationKind::Hotel);
        assert_eq!(host.table().len(), 6);
        assert!(host.render().starts_with("hotel reservations (6 of 6)"));
        Ok(())
    }

    #[test]
    fn package_reservation_for_a_company_user_resolves_its_company() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.next_kind(fixture_now())?;
        host.next_kind(fixture_now())?;
        assert_eq!(host.table().kind(), ReservationKind::Package);
        let before = host.table().len();

        let data = host.backend().dataset();
        let company_user = data
            .users
            .iter()
            .find(|user| user.user_type == UserType::Company)
            .ok_or_else(|| anyhow!("demo data has a company user"))?
            .id
            .get();
        let package = data
            .packages
            .iter()
            .find(|package| package.packages_left > 0)
            .ok_or_else(|| anyhow!("demo data has a package with stock"))?
            .id
            .get();

        host.open_form(FormKind::CreatePackageReservation, None)?;
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some(FormKind::CreatePackageReservation.modal_key())
        );
        let form = host.form_mut().ok_or_else(|| anyhow!("form should be open"))?;
        form.selector_mut().select(USER, company_user)?;
        form.selector_mut().select(PACKAGE, package)?;
        form.selector_mut().set_number(AMOUNT, 1);

        let event = host.submit_form(fixture_now())?;
        assert_eq!(
            event,
            FormEvent::Submitted {
                message: "Reservation created".to_owned(),
                refresh: Some(ReservationKind::Package),
            }
        );
        assert!(host.form().is_none());
        assert_eq!(host.state().modal().active(), None);
        assert_eq!(host.table().len(), before + 1);
        assert_eq!(
            host.state().status_line.as_deref(),
            Some("Reservation created")
        );
        Ok(())
    }

    #[test]
    fn payment_on_a_pending_row_settles_it() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.refresh(fixture_now())?;
        let target = pending_ids(&host)
            .first()
            .copied()
            .ok_or_else(|| anyhow!("expected a pending row"))?;

        host.open_form(FormKind::AddPayment(ReservationKind::Flight), Some(target))?;
        let form = host.form_mut().ok_or_else(|| anyhow!("form should be open"))?;
        form.selector_mut().select(PAYMENT_METHOD, 1)?;
        form.selector_mut().set_number(AMOUNT, 1_000_000_000);

        let event = host.submit_form(fixture_now())?;
        assert!(matches!(event, FormEvent::Submitted { .. }));
        let row = host
            .table()
            .row(target)
            .ok_or_else(|| anyhow!("row should still be listed"))?;
        assert_eq!(row.reservation().status, ReservationStatus::Paid);
        assert!(!row.can_add_payment());
        Ok(())
    }

    #[test]
    fn expired_rows_cannot_be_opened_for_update() -> Result<()> {
        let (mut host, clock) = demo_host(true)?;
        let later = fixture_now() + Duration::minutes(1);
        clock.set(later);
        host.refresh(later)?;
        let expired = host
            .table()
            .rows()
            .iter()
            .find(|row| row.reservation().is_expired)
            .map(|row| row.id())
            .ok_or_else(|| anyhow!("expected an expired row"))?;

        let error = host
            .open_form(FormKind::UpdateFlightReservation, Some(expired))
            .expect_err("expired rows are read-only");
        assert!(error.to_string().contains("has expired"));
        assert!(host.form().is_none());
        Ok(())
    }

    #[test]
    fn closing_the_form_clears_the_modal() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.open_form(FormKind::CreatePackage, None)?;
        assert!(host.form().is_some());
        host.close_modal();
        assert!(host.form().is_none());
        assert_eq!(host.state().modal().active(), None);
        assert!(host.submit_form(fixture_now()).is_err());
        Ok(())
    }

    #[test]
    fn validating_from_the_detail_view_settles_the_row() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.refresh(fixture_now())?;
        let target = pending_ids(&host)
            .first()
            .copied()
            .ok_or_else(|| anyhow!("expected a pending row"))?;
        let code = demo_payment_code(target.get());

        host.show_detail(target)?;
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some("flightReservationDetailModal")
        );
        host.request_validation(&code)?;
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some("validateFlightReservationPaymentModal")
        );

        host.close_modal();
        assert!(host.pending().is_none());
        assert!(host.detail_row().is_some());
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some("flightReservationDetailModal")
        );

        host.request_validation(&code)?;
        assert_eq!(host.confirm(fixture_now())?, "Payment validated");
        assert_eq!(host.state().modal().active(), None);
        assert!(host.detail_row().is_none());
        let row = host
            .table()
            .row(target)
            .ok_or_else(|| anyhow!("row should still be listed"))?;
        assert_eq!(row.reservation().status, ReservationStatus::PartiallyPaid);
        assert!(row.countdown().is_none_or(|countdown| !countdown.is_ticking()));
        assert_eq!(host.state().status_line.as_deref(), Some("Payment validated"));
        Ok(())
    }

    #[test]
    fn failed_validation_keeps_the_confirmation_open() -> Result<()> {
        let (mut host, clock) = demo_host(true)?;
        host.refresh(fixture_now())?;
        let target = pending_ids(&host)
            .first()
            .copied()
            .ok_or_else(|| anyhow!("expected a pending row"))?;

        let error = host
            .request_validation(&demo_payment_code(target.get()))
            .expect_err("no detail view is open");
        assert!(error.to_string().contains("show <id>"));

        host.show_detail(target)?;
        host.request_validation(&demo_payment_code(target.get()))?;
        clock.set(fixture_now() + Duration::minutes(1));
        let error = host.confirm(fixture_now()).expect_err("hold lapsed");
        assert!(error.to_string().contains("expired"));
        assert!(host.pending().is_some());
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some("validateFlightReservationPaymentModal")
        );
        assert!(
            host.state()
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("expired"))
        );
        Ok(())
    }

    #[test]
    fn expired_rows_can_still_be_deleted() -> Result<()> {
        let (mut host, clock) = demo_host(true)?;
        let later = fixture_now() + Duration::minutes(1);
        clock.set(later);
        host.refresh(later)?;
        let before = host.table().len();
        let expired: Vec<ReservationId> = host
            .table()
            .rows()
            .iter()
            .filter(|row| row.reservation().is_expired)
            .map(|row| row.id())
            .collect();
        assert_eq!(expired.len(), 2);

        host.request_delete(expired.clone())?;
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some("deleteFlightReservationModal")
        );
        assert_eq!(host.confirm(later)?, "2 reservation(s) deleted");
        assert_eq!(host.table().len(), before - 2);
        assert!(expired.iter().all(|id| host.table().row(*id).is_none()));
        assert_eq!(host.state().modal().active(), None);

        let error = host
            .request_delete(vec![ReservationId::new(999_999)])
            .expect_err("unknown row");
        assert!(error.to_string().contains("not in the current list"));
        Ok(())
    }

    #[test]
    fn opening_a_form_replaces_the_detail_view() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.refresh(fixture_now())?;
        let target = pending_ids(&host)
            .first()
            .copied()
            .ok_or_else(|| anyhow!("expected a pending row"))?;
        host.show_detail(target)?;
        host.open_form(FormKind::AddPayment(ReservationKind::Flight), Some(target))?;
        assert!(host.detail_row().is_none());
        assert_eq!(
            host.state().modal().active().as_deref(),
            Some("createFlightReservationPaymentModal")
        );
        Ok(())
    }

    #[test]
    fn search_narrows_the_rendered_rows() -> Result<()> {
        let (mut host, _clock) = demo_host(true)?;
        host.refresh(fixture_now())?;
        let first = host
            .table()
            .rows()
            .first()
            .map(|row| row.id())
            .ok_or_else(|| anyhow!("expected rows"))?;
        host.set_query(&first.to_string());
        let rendered = host.render();
        assert!(rendered.contains(&format!("#{first}")));
        assert!(rendered.contains("matching"));
        Ok(())
    }

    #[test]
    fn api_backend_fetches_through_the_client() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}/api", server.server_addr());

        let handle = thread::spawn(move || {
            let request = server.recv().expect("list request expected");
            assert_eq!(request.url(), "/api/hajj-umrah/hotels/reservations");
            let response = Response::from_string(
                r#"{"reservations":[{"id":4,"status":"paid","expired_at":null,"is_expired":false}]}"#,
            )
            .with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
            request.respond(response).expect("response should succeed");
        });

        let client = tripdesk_api::Client::new(&addr, std::time::Duration::from_secs(1))?;
        let mut backend = ApiBackend::new(client);
        let rows = backend.list_reservations(ReservationKind::Hotel)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ReservationStatus::Paid);

        handle.join().expect("server thread should join");
        Ok(())
    }
}
