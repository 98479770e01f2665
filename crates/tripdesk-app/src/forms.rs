// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::candidates::{
    ATTR_AVAILABLE_SEATS, ATTR_COMPANY_ID, ATTR_DEPARTS_AT, ATTR_OWNER_COMPANY_ID,
    ATTR_PACKAGES_LEFT, TAG_CODE, TAG_USER_TYPE,
};
use crate::modal::{
    ADD_FLIGHT_RESERVATION_PAYMENT, ADD_HOTEL_RESERVATION_PAYMENT,
    ADD_PACKAGE_RESERVATION_PAYMENT, CREATE_PACKAGE, CREATE_PACKAGE_RESERVATION, ModalReader,
    UPDATE_FLIGHT, UPDATE_FLIGHT_RESERVATION, UPDATE_HOTEL_RESERVATION,
};
use crate::selector::{
    Candidate, ConstraintEdge, FieldError, FieldKey, FieldSpec, IntoCandidate, Selector,
};
use crate::{
    AirportId, Company, CompanyId, Flight, FlightId, Hotel, HotelId, PackageId, Reservation,
    ReservationId, ReservationKind, User, UserId,
};

pub const USER: FieldKey = "user";
pub const COMPANY: FieldKey = "company";
pub const PACKAGE: FieldKey = "package";
pub const FLIGHT: FieldKey = "flight";
pub const HOTEL: FieldKey = "hotel";
pub const AMOUNT: FieldKey = "amount";
pub const SEATS: FieldKey = "seats";
pub const PRICE_PER_PACKAGE: FieldKey = "price_per_package";
pub const PACKAGES_AVAILABLE: FieldKey = "packages_available";
pub const SEATS_PER_PACKAGE: FieldKey = "seats_per_package";
pub const HOTELS_PER_PACKAGE: FieldKey = "hotels_per_package";
pub const PROGRAM_TYPE: FieldKey = "program_type";
pub const DEPARTURE_AIRPORT: FieldKey = "departure_airport";
pub const ARRIVAL_AIRPORT: FieldKey = "arrival_airport";
pub const PAYMENT_METHOD: FieldKey = "payment_method";

pub const DEFAULT_AIRPORT_MIN_QUERY: usize = 3;
pub const PROGRAM_TYPES: [i64; 2] = [9, 12];
pub const POOL_WINDOW_DAYS: i64 = 45;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    CreatePackageReservation,
    UpdateFlightReservation,
    UpdateHotelReservation,
    CreatePackage,
    UpdateFlight,
    AddPayment(ReservationKind),
}

/// Backend list a choice field draws its candidates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceList {
    ReservationHolders,
    Companies,
    Flights,
    Hotels,
    Packages,
    Airports,
    PaymentMethods,
}

impl FormKind {
    pub const fn modal_key(self) -> &'static str {
        match self {
            Self::CreatePackageReservation => CREATE_PACKAGE_RESERVATION,
            Self::UpdateFlightReservation => UPDATE_FLIGHT_RESERVATION,
            Self::UpdateHotelReservation => UPDATE_HOTEL_RESERVATION,
            Self::CreatePackage => CREATE_PACKAGE,
            Self::UpdateFlight => UPDATE_FLIGHT,
            Self::AddPayment(ReservationKind::Flight) => ADD_FLIGHT_RESERVATION_PAYMENT,
            Self::AddPayment(ReservationKind::Hotel) => ADD_HOTEL_RESERVATION_PAYMENT,
            Self::AddPayment(ReservationKind::Package) => ADD_PACKAGE_RESERVATION_PAYMENT,
        }
    }

    pub fn from_modal_key(key: &str) -> Option<Self> {
        [
            Self::CreatePackageReservation,
            Self::UpdateFlightReservation,
            Self::UpdateHotelReservation,
            Self::CreatePackage,
            Self::UpdateFlight,
            Self::AddPayment(ReservationKind::Flight),
            Self::AddPayment(ReservationKind::Hotel),
            Self::AddPayment(ReservationKind::Package),
        ]
        .into_iter()
        .find(|kind| kind.modal_key() == key)
    }

    /// Reservation list to refetch after a successful submit.
    pub const fn refreshes(self) -> Option<ReservationKind> {
        match self {
            Self::CreatePackageReservation => Some(ReservationKind::Package),
            Self::UpdateFlightReservation => Some(ReservationKind::Flight),
            Self::UpdateHotelReservation => Some(ReservationKind::Hotel),
            Self::AddPayment(kind) => Some(kind),
            Self::CreatePackage | Self::UpdateFlight => None,
        }
    }

    pub fn reference_lists(self) -> Vec<(FieldKey, ReferenceList)> {
        match self {
            Self::CreatePackageReservation => vec![
                (USER, ReferenceList::ReservationHolders),
                (COMPANY, ReferenceList::Companies),
                (PACKAGE, ReferenceList::Packages),
            ],
            Self::UpdateFlightReservation => vec![
                (USER, ReferenceList::ReservationHolders),
                (COMPANY, ReferenceList::Companies),
                (FLIGHT, ReferenceList::Flights),
            ],
            Self::UpdateHotelReservation => vec![
                (USER, ReferenceList::ReservationHolders),
                (COMPANY, ReferenceList::Companies),
                (HOTEL, ReferenceList::Hotels),
            ],
            Self::CreatePackage => vec![
                (FLIGHT, ReferenceList::Flights),
                (HOTEL, ReferenceList::Hotels),
            ],
            Self::UpdateFlight => vec![
                (COMPANY, ReferenceList::Companies),
                (DEPARTURE_AIRPORT, ReferenceList::Airports),
                (ARRIVAL_AIRPORT, ReferenceList::Airports),
            ],
            Self::AddPayment(_) => vec![(PAYMENT_METHOD, ReferenceList::PaymentMethods)],
        }
    }

    pub fn selector(self, settings: &FormSettings) -> Selector {
        let holder = [
            FieldSpec::choice(USER, "User"),
            FieldSpec::choice(COMPANY, "Company"),
        ];
        let holder_edge = ConstraintEdge::shown_unless(USER, COMPANY, TAG_USER_TYPE, "company");

        match self {
            Self::CreatePackageReservation => Selector::new(
                [
                    holder.as_slice(),
                    &[
                        FieldSpec::choice(PACKAGE, "Package"),
                        FieldSpec::number(AMOUNT, "Amount", 1),
                    ],
                ]
                .concat(),
                vec![
                    holder_edge,
                    ConstraintEdge::bound(PACKAGE, AMOUNT, ATTR_PACKAGES_LEFT),
                ],
            ),
            Self::UpdateFlightReservation => Selector::new(
                [
                    holder.as_slice(),
                    &[
                        FieldSpec::choice(FLIGHT, "Flight"),
                        FieldSpec::number(SEATS, "Seats", 1),
                    ],
                ]
                .concat(),
                vec![
                    holder_edge,
                    ConstraintEdge::bound(FLIGHT, SEATS, ATTR_AVAILABLE_SEATS),
                ],
            ),
            Self::UpdateHotelReservation => Selector::new(
                [
                    holder.as_slice(),
                    &[
                        FieldSpec::choice(HOTEL, "Hotel"),
                        FieldSpec::number(AMOUNT, "Amount", 1),
                    ],
                ]
                .concat(),
                vec![
                    holder_edge,
                    ConstraintEdge::bound(HOTEL, AMOUNT, ATTR_PACKAGES_LEFT),
                ],
            ),
            Self::CreatePackage => Selector::new(
                vec![
                    FieldSpec::choice(FLIGHT, "Flight"),
                    FieldSpec::choice(HOTEL, "Hotel"),
                    FieldSpec::number(PRICE_PER_PACKAGE, "Price", 0),
                    FieldSpec::number(PACKAGES_AVAILABLE, "Packages available", 0),
                    FieldSpec::number(SEATS_PER_PACKAGE, "Seats per package", 0),
                    FieldSpec::number(HOTELS_PER_PACKAGE, "Hotel packages per package", 0),
                    FieldSpec::number(PROGRAM_TYPE, "Program type", 1),
                ],
                vec![
                    ConstraintEdge::bound(FLIGHT, SEATS_PER_PACKAGE, ATTR_AVAILABLE_SEATS),
                    ConstraintEdge::bound(HOTEL, HOTELS_PER_PACKAGE, ATTR_PACKAGES_LEFT),
                ],
            ),
            Self::UpdateFlight => Selector::new(
                vec![
                    FieldSpec::choice(COMPANY, "Company").optional(),
                    FieldSpec::choice(DEPARTURE_AIRPORT, "Departure airport")
                        .min_query(settings.airport_min_query),
                    FieldSpec::choice(ARRIVAL_AIRPORT, "Arrival airport")
                        .min_query(settings.airport_min_query),
                    FieldSpec::number(SEATS, "Seats", 1),
                ],
                Vec::new(),
            ),
            Self::AddPayment(_) => Selector::new(
                vec![
                    FieldSpec::choice(PAYMENT_METHOD, "Payment method"),
                    FieldSpec::number(AMOUNT, "Amount", 1),
                ],
                Vec::new(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSettings {
    pub airport_min_query: usize,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            airport_min_query: DEFAULT_AIRPORT_MIN_QUERY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReservationInput {
    pub package_id: PackageId,
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightReservationUpdateInput {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
    pub flight_id: FlightId,
    pub seats: i64,
    pub pool: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelReservationUpdateInput {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
    pub hotel_id: HotelId,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInput {
    pub flight_id: FlightId,
    pub hotel_id: HotelId,
    pub price_per_package: i64,
    pub packages_available: i64,
    pub seats_per_package: i64,
    pub hotels_per_package: i64,
    pub program_type: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightUpdateInput {
    pub flight_id: FlightId,
    pub company_id: Option<CompanyId>,
    pub departure_airport_id: AirportId,
    pub arrival_airport_id: AirportId,
    pub seats: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInput {
    pub kind: ReservationKind,
    pub reservation_id: ReservationId,
    pub payment_method_code: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    PackageReservation(PackageReservationInput),
    FlightReservationUpdate(FlightReservationUpdateInput),
    HotelReservationUpdate(HotelReservationUpdateInput),
    Package(PackageInput),
    FlightUpdate(FlightUpdateInput),
    Payment(PaymentInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::PackageReservation(_) => FormKind::CreatePackageReservation,
            Self::FlightReservationUpdate(_) => FormKind::UpdateFlightReservation,
            Self::HotelReservationUpdate(_) => FormKind::UpdateHotelReservation,
            Self::Package(_) => FormKind::CreatePackage,
            Self::FlightUpdate(_) => FormKind::UpdateFlight,
            Self::Payment(payment) => FormKind::AddPayment(payment.kind),
        }
    }

    pub fn submit_path(&self) -> String {
        match self {
            Self::PackageReservation(_) => "/hajj-umrah/packages/reservations/store".to_owned(),
            Self::FlightReservationUpdate(_) => "/hajj-umrah/flights/reservations/update".to_owned(),
            Self::HotelReservationUpdate(_) => "/hajj-umrah/hotels/reservations/update".to_owned(),
            Self::Package(_) => "/hajj-umrah/packages/store".to_owned(),
            Self::FlightUpdate(_) => "/hajj-umrah/flights/update".to_owned(),
            Self::Payment(payment) => format!(
                "/hajj-umrah/{}/reservations/add-payment",
                payment.kind.collection()
            ),
        }
    }

    pub fn to_body(&self) -> Value {
        match self {
            Self::PackageReservation(input) => json!({
                "package_id": input.package_id,
                "user_id": input.user_id,
                "company_id": input.company_id,
                "amount": input.amount,
            }),
            Self::FlightReservationUpdate(input) => json!({
                "reservation_id": input.reservation_id,
                "user_id": input.user_id,
                "company_id": input.company_id,
                "flight_id": input.flight_id,
                "seats": input.seats,
                "pool": input.pool,
            }),
            Self::HotelReservationUpdate(input) => json!({
                "id": input.reservation_id,
                "user_id": input.user_id,
                "company_id": input.company_id,
                "hotel_id": input.hotel_id,
                "amount": input.amount,
            }),
            Self::Package(input) => json!({
                "flight_id": input.flight_id,
                "hotel_id": input.hotel_id,
                "packages_available": input.packages_available,
                "price_per_package": input.price_per_package,
                "seats_per_package": input.seats_per_package,
                "hotels_per_package": input.hotels_per_package,
                "program_type": input.program_type,
            }),
            Self::FlightUpdate(input) => json!({
                "id": input.flight_id,
                "company_id": input.company_id,
                "departure_airport_id": input.departure_airport_id,
                "arrival_airport_id": input.arrival_airport_id,
                "seats": input.seats,
            }),
            Self::Payment(input) => json!({
                "id": input.reservation_id,
                "payment_method_code": input.payment_method_code,
                "amount": input.amount,
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::PackageReservation(input) => {
                if input.company_id.is_none() {
                    bail!("reservation company is required -- choose a company and retry");
                }
                if input.amount < 1 {
                    bail!("reservation amount must be at least 1");
                }
            }
            Self::FlightReservationUpdate(input) => {
                if input.company_id.is_none() {
                    bail!("reservation company is required -- choose a company and retry");
                }
                if input.seats < 1 {
                    bail!("reserved seats must be at least 1");
                }
            }
            Self::HotelReservationUpdate(input) => {
                if input.company_id.is_none() {
                    bail!("reservation company is required -- choose a company and retry");
                }
                if input.amount < 1 {
                    bail!("reservation amount must be at least 1");
                }
            }
            Self::Package(input) => {
                if !PROGRAM_TYPES.contains(&input.program_type) {
                    bail!(
                        "program type must be 9 or 12 days, got {}",
                        input.program_type
                    );
                }
                if input.price_per_package < 0 {
                    bail!("package price cannot be negative");
                }
                if input.packages_available < 1 {
                    bail!("packages available must be at least 1");
                }
            }
            Self::FlightUpdate(input) => {
                if input.departure_airport_id == input.arrival_airport_id {
                    bail!("departure and arrival airports must differ -- choose another airport");
                }
                if input.seats < 1 {
                    bail!("flight seats must be at least 1");
                }
            }
            Self::Payment(input) => {
                if input.payment_method_code.trim().is_empty() {
                    bail!("payment method is required -- choose a method and retry");
                }
                if input.amount <= 0 {
                    bail!("payment amount must be positive");
                }
            }
        }
        Ok(())
    }
}

/// Server reply to a form submission. Transport failures are `Err` values
/// on the client side, not variants here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted {
        message: String,
    },
    Rejected {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    pub submit_id: u64,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Submitted {
        message: String,
        refresh: Option<ReservationKind>,
    },
    Rejected {
        message: String,
    },
    /// The modal was closed or a newer submit superseded this one.
    Dropped {
        submit_id: u64,
    },
}

/// One open form: its selector, the record it edits, and submission state.
#[derive(Debug, Clone)]
pub struct FormSession {
    kind: FormKind,
    selector: Selector,
    editing: Option<i64>,
    /// `(user, company)` of the reservation being edited.
    held_by: Option<(i64, i64)>,
    pending_submit: Option<u64>,
    next_submit_id: u64,
    message: Option<String>,
    server_errors: BTreeMap<String, Vec<String>>,
}

impl FormSession {
    pub fn new(kind: FormKind, settings: &FormSettings) -> Self {
        Self {
            kind,
            selector: kind.selector(settings),
            editing: None,
            held_by: None,
            pending_submit: None,
            next_submit_id: 0,
            message: None,
            server_errors: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn server_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.server_errors
    }

    /// Prefills an update or payment form from a reservation row.
    pub fn edit_reservation(&mut self, reservation: &Reservation) {
        self.editing = Some(reservation.id.get());
        let extra = &reservation.extra;

        let user = decode::<User>(extra.get("user"));
        let company = decode::<Company>(extra.get("company"));
        if let Some(user) = &user {
            self.selector.select_candidate(USER, user.to_candidate());
        }
        if let (Some(user), Some(company)) = (&user, &company) {
            self.held_by = Some((user.id.get(), company.id.get()));
        }
        if let Some(company) = company
            && self.selector.is_visible(COMPANY)
        {
            self.selector.select_candidate(COMPANY, company.to_candidate());
        }
        match self.kind {
            FormKind::UpdateFlightReservation => {
                if let Some(flight) = decode::<Flight>(extra.get("flight")) {
                    self.selector.select_candidate(FLIGHT, flight.to_candidate());
                }
                if let Some(seats) = extra.get("seats").and_then(Value::as_i64) {
                    self.selector.set_number(SEATS, seats);
                }
            }
            FormKind::UpdateHotelReservation => {
                if let Some(hotel) = decode::<Hotel>(extra.get("hotel")) {
                    self.selector.select_candidate(HOTEL, hotel.to_candidate());
                }
                if let Some(amount) = extra.get("amount").and_then(Value::as_i64) {
                    self.selector.set_number(AMOUNT, amount);
                }
            }
            _ => {}
        }
    }

    /// Prefills the flight edit form.
    pub fn edit_flight(&mut self, flight: &Flight) {
        self.editing = Some(flight.id.get());
        self.selector
            .select_candidate(DEPARTURE_AIRPORT, flight.departure_airport.to_candidate());
        self.selector
            .select_candidate(ARRIVAL_AIRPORT, flight.arrival_airport.to_candidate());
        self.selector.set_number(SEATS, flight.available_seats);
    }

    pub fn field_errors(&self) -> Vec<FieldError> {
        self.selector.validate()
    }

    /// The user's own company when the company field is hidden. A holder
    /// listed without its company falls back to the company the edited
    /// reservation was booked under.
    fn company_id(&self) -> Option<CompanyId> {
        if self.selector.is_visible(COMPANY) {
            return self
                .selector
                .selection(COMPANY)
                .map(|company| CompanyId::new(company.id));
        }
        let user = self.selector.selection(USER)?;
        user.attribute(ATTR_COMPANY_ID)
            .or_else(|| {
                self.held_by
                    .and_then(|(holder, company)| (holder == user.id).then_some(company))
            })
            .map(CompanyId::new)
    }

    fn choice(&self, key: FieldKey) -> Result<i64> {
        self.selector
            .selection(key)
            .map(|candidate| candidate.id)
            .ok_or_else(|| anyhow!("{key} is required -- choose one and retry"))
    }

    fn number(&self, key: FieldKey) -> Result<i64> {
        self.selector
            .number(key)
            .ok_or_else(|| anyhow!("{key} is required -- enter a number and retry"))
    }

    fn editing(&self) -> Result<i64> {
        self.editing
            .ok_or_else(|| anyhow!("no record loaded for {} -- reopen the form", self.kind.modal_key()))
    }

    pub fn payload(&self, now: OffsetDateTime) -> Result<FormPayload> {
        if let Some(error) = self.selector.validate().into_iter().next() {
            bail!("{}", error.message);
        }

        let payload = match self.kind {
            FormKind::CreatePackageReservation => {
                FormPayload::PackageReservation(PackageReservationInput {
                    package_id: PackageId::new(self.choice(PACKAGE)?),
                    user_id: UserId::new(self.choice(USER)?),
                    company_id: self.company_id(),
                    amount: self.number(AMOUNT)?,
                })
            }
            FormKind::UpdateFlightReservation => {
                FormPayload::FlightReservationUpdate(FlightReservationUpdateInput {
                    reservation_id: ReservationId::new(self.editing()?),
                    user_id: UserId::new(self.choice(USER)?),
                    company_id: self.company_id(),
                    flight_id: FlightId::new(self.choice(FLIGHT)?),
                    seats: self.number(SEATS)?,
                    pool: self
                        .selector
                        .selection(FLIGHT)
                        .is_some_and(|flight| draws_from_pool(flight, now)),
                })
            }
            FormKind::UpdateHotelReservation => {
                FormPayload::HotelReservationUpdate(HotelReservationUpdateInput {
                    reservation_id: ReservationId::new(self.editing()?),
                    user_id: UserId::new(self.choice(USER)?),
                    company_id: self.company_id(),
                    hotel_id: HotelId::new(self.choice(HOTEL)?),
                    amount: self.number(AMOUNT)?,
                })
            }
            FormKind::CreatePackage => FormPayload::Package(PackageInput {
                flight_id: FlightId::new(self.choice(FLIGHT)?),
                hotel_id: HotelId::new(self.choice(HOTEL)?),
                price_per_package: self.number(PRICE_PER_PACKAGE)?,
                packages_available: self.number(PACKAGES_AVAILABLE)?,
                seats_per_package: self.number(SEATS_PER_PACKAGE)?,
                hotels_per_package: self.number(HOTELS_PER_PACKAGE)?,
                program_type: self.number(PROGRAM_TYPE)?,
            }),
            FormKind::UpdateFlight => FormPayload::FlightUpdate(FlightUpdateInput {
                flight_id: FlightId::new(self.editing()?),
                company_id: self
                    .selector
                    .selection(COMPANY)
                    .map(|company| CompanyId::new(company.id)),
                departure_airport_id: AirportId::new(self.choice(DEPARTURE_AIRPORT)?),
                arrival_airport_id: AirportId::new(self.choice(ARRIVAL_AIRPORT)?),
                seats: self.number(SEATS)?,
            }),
            FormKind::AddPayment(kind) => FormPayload::Payment(PaymentInput {
                kind,
                reservation_id: ReservationId::new(self.editing()?),
                payment_method_code: self
                    .selector
                    .selection(PAYMENT_METHOD)
                    .and_then(|method| method.tag(TAG_CODE))
                    .unwrap_or_default()
                    .to_owned(),
                amount: self.number(AMOUNT)?,
            }),
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Validates and hands out the request to send. A later ticket
    /// supersedes an earlier one still in flight.
    pub fn begin_submit(&mut self, now: OffsetDateTime) -> Result<SubmitTicket> {
        self.message = None;
        self.server_errors.clear();
        let payload = self.payload(now)?;
        self.next_submit_id = self.next_submit_id.saturating_add(1);
        self.pending_submit = Some(self.next_submit_id);
        Ok(SubmitTicket {
            submit_id: self.next_submit_id,
            path: payload.submit_path(),
            body: payload.to_body(),
        })
    }

    /// Applies the server reply. Replies for a closed modal or a superseded
    /// ticket change nothing.
    pub fn finish_submit(
        &mut self,
        submit_id: u64,
        result: Result<SubmitOutcome>,
        modal: &ModalReader,
    ) -> FormEvent {
        if self.pending_submit != Some(submit_id) || !modal.is_open(self.kind.modal_key()) {
            tracing::debug!(
                form = self.kind.modal_key(),
                submit_id,
                "dropping submit reply for a closed or superseded form"
            );
            return FormEvent::Dropped { submit_id };
        }
        self.pending_submit = None;

        match result {
            Ok(SubmitOutcome::Accepted { message }) => FormEvent::Submitted {
                message,
                refresh: self.kind.refreshes(),
            },
            Ok(SubmitOutcome::Rejected { message, errors }) => {
                self.message = Some(message.clone());
                self.server_errors = errors;
                FormEvent::Rejected { message }
            }
            Err(error) => {
                let message = format!("{error:#}");
                tracing::warn!(form = self.kind.modal_key(), error = %message, "form submit failed");
                self.message = Some(message.clone());
                FormEvent::Rejected { message }
            }
        }
    }
}

/// Seats come from the shared pool on flights no company chartered, and on
/// any flight leaving within [`POOL_WINDOW_DAYS`] whole days. A flight with
/// no departure on record counts as leaving now.
pub fn draws_from_pool(flight: &Candidate, now: OffsetDateTime) -> bool {
    if flight.attribute(ATTR_OWNER_COMPANY_ID).is_none() {
        return true;
    }
    let departs = flight
        .attribute(ATTR_DEPARTS_AT)
        .unwrap_or_else(|| now.unix_timestamp());
    (departs - now.unix_timestamp()) / SECONDS_PER_DAY < POOL_WINDOW_DAYS
}

fn decode<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    value.and_then(|value| serde_json::from_value(value.clone()).ok())
}
