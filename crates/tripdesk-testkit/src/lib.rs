// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use tripdesk_app::{
    Airline, Airport, AirportId, Company, CompanyId, Flight, FlightId, Hotel, HotelId, NamedRef,
    Package, PackageId, Payment, PaymentMethod, PaymentStatus, Reservation, ReservationId,
    ReservationKind, ReservationStatus, User, UserId, UserType,
};

const FIRST_NAMES: [&str; 16] = [
    "Aisyah", "Budi", "Citra", "Dewi", "Eko", "Fajar", "Gita", "Hadi", "Indah", "Joko", "Kartika",
    "Lestari", "Mahmud", "Nur", "Putri", "Rizki",
];
const LAST_NAMES: [&str; 12] = [
    "Santoso", "Wijaya", "Hidayat", "Saputra", "Pratama", "Kusuma", "Nugroho", "Rahman",
    "Siregar", "Lubis", "Harahap", "Sari",
];
const COMPANY_WORDS: [&str; 10] = [
    "Amanah", "Barokah", "Mabrur", "Rahmah", "Hikmah", "Salam", "Nur Ilahi", "Al Falah",
    "Madani", "Zamzam",
];
const AIRLINES: [(&str, &str); 4] = [
    ("GA", "Garuda Indonesia"),
    ("SV", "Saudia"),
    ("JT", "Lion Air"),
    ("QG", "Citilink"),
];
const AIRPORTS: [(&str, &str, &str, &str); 6] = [
    ("CGK", "Soekarno-Hatta International", "Jakarta", "Indonesia"),
    ("SUB", "Juanda International", "Surabaya", "Indonesia"),
    ("KNO", "Kualanamu International", "Medan", "Indonesia"),
    ("UPG", "Sultan Hasanuddin International", "Makassar", "Indonesia"),
    ("JED", "King Abdulaziz International", "Jeddah", "Saudi Arabia"),
    ("MED", "Prince Mohammad bin Abdulaziz", "Madinah", "Saudi Arabia"),
];
const HOTEL_AREAS: [(&str, &str); 6] = [
    ("Makkah", "Misfalah"),
    ("Makkah", "Ajyad"),
    ("Makkah", "Aziziyah"),
    ("Madinah", "Markaziyah"),
    ("Madinah", "Bab As Salam"),
    ("Madinah", "Quba"),
];
const PAYMENT_METHODS: [(&str, &str); 4] = [
    ("bca_va", "BCA Virtual Account"),
    ("mandiri_va", "Mandiri Virtual Account"),
    ("bank_transfer", "Bank Transfer"),
    ("cash", "Cash"),
];
const PROGRAM_TYPES: [i64; 2] = [9, 12];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of back-office reference data and reservations.
#[derive(Debug, Clone)]
pub struct TripFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl TripFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 0,
        }
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as u64;
        min + (self.rng.next_u64() % span) as i64
    }

    pub fn company(&mut self) -> Company {
        let id = self.id();
        let word = *self.pick(&COMPANY_WORDS);
        let slug = word.to_ascii_lowercase().replace(' ', "");
        Company {
            id: CompanyId::new(id),
            name: format!("PT {word} Tour & Travel"),
            email: Some(format!("info@{slug}.co.id")),
            ppiu_number: format!("PPIU-{:04}", self.int_range(1, 9_999)),
            phone: Some(format!("+62 21 {:04} {:04}", self.int_range(1000, 9999), self.int_range(0, 9999))),
        }
    }

    pub fn agent(&mut self) -> User {
        let id = self.id();
        let first = *self.pick(&FIRST_NAMES);
        let last = *self.pick(&LAST_NAMES);
        User {
            id: UserId::new(id),
            name: format!("{first} {last}"),
            email: format!(
                "{}.{}{id}@example.com",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            phone: Some(format!("+62 812 {:04} {:04}", self.int_range(0, 9999), self.int_range(0, 9999))),
            user_type: UserType::Agent,
            company: None,
        }
    }

    /// A company account; its reservations belong to `company`.
    pub fn company_user(&mut self, company: &Company) -> User {
        let id = self.id();
        User {
            id: UserId::new(id),
            name: company.name.clone(),
            email: company
                .email
                .clone()
                .unwrap_or_else(|| format!("company{id}@example.com")),
            phone: company.phone.clone(),
            user_type: UserType::Company,
            company: Some(company.clone()),
        }
    }

    pub fn airports(&mut self) -> Vec<Airport> {
        AIRPORTS
            .iter()
            .map(|(iata, name, city, country)| Airport {
                id: AirportId::new(self.id()),
                iata: (*iata).to_owned(),
                name: (*name).to_owned(),
                city: Some(NamedRef {
                    name: (*city).to_owned(),
                }),
                country: Some(NamedRef {
                    name: (*country).to_owned(),
                }),
            })
            .collect()
    }

    pub fn flight(&mut self, airports: &[Airport], now: OffsetDateTime) -> Flight {
        let id = self.id();
        let (code, name) = *self.pick(&AIRLINES);
        let departure = self.pick(&airports[..airports.len().saturating_sub(2).max(1)]).clone();
        let arrival = self.pick(&airports[airports.len().saturating_sub(2)..]).clone();
        let number = self.int_range(100, 999);
        let depart_at = now + Duration::days(self.int_range(14, 120));
        Flight {
            id: FlightId::new(id),
            airline: Airline {
                code: code.to_owned(),
                name: name.to_owned(),
            },
            flight_number: format!("{code}{number}"),
            return_flight_number: Some(format!("{code}{}", number + 1)),
            departure_airport: departure,
            arrival_airport: arrival,
            program_type: *self.pick(&PROGRAM_TYPES),
            depart_at: Some(stamp(depart_at)),
            available_seats: self.int_range(0, 45),
            company_id: None,
        }
    }

    pub fn hotel(&mut self, company: Option<&Company>, now: OffsetDateTime) -> Hotel {
        let id = self.id();
        let (city, area) = *self.pick(&HOTEL_AREAS);
        Hotel {
            id: HotelId::new(id),
            location_1: city.to_owned(),
            location_2: area.to_owned(),
            program_type: *self.pick(&PROGRAM_TYPES),
            company: company.cloned(),
            first_check_in_at: Some(stamp(now + Duration::days(self.int_range(14, 120)))),
            price_per_package: self.int_range(8, 40) * 1_000_000,
            packages_left: self.int_range(0, 30),
        }
    }

    pub fn package(&mut self, flight: &Flight, hotel: &Hotel, now: OffsetDateTime) -> Package {
        Package {
            id: PackageId::new(self.id()),
            created_at: Some(stamp(now - Duration::days(self.int_range(1, 60)))),
            program_type: flight.program_type,
            price_per_package: self.int_range(25, 45) * 1_000_000,
            packages_left: self.int_range(0, 20),
            flight: flight.clone(),
            hotel: hotel.clone(),
        }
    }

    pub fn payment_methods(&self) -> Vec<PaymentMethod> {
        PAYMENT_METHODS
            .iter()
            .map(|(code, name)| PaymentMethod {
                code: (*code).to_owned(),
                name: (*name).to_owned(),
            })
            .collect()
    }
}

/// Builder for a reservation row as the list endpoint returns it.
#[derive(Debug, Clone)]
pub struct ReservationBuilder {
    reservation: Reservation,
}

impl ReservationBuilder {
    pub fn new(id: i64, status: ReservationStatus) -> Self {
        Self {
            reservation: Reservation::new(ReservationId::new(id), status),
        }
    }

    pub fn pending_until(id: i64, expires_at: OffsetDateTime) -> Self {
        Self::new(id, ReservationStatus::Pending).expires_at(expires_at)
    }

    pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
        self.reservation.expired_at = Some(stamp(instant));
        self
    }

    pub fn raw_expiry(mut self, raw: &str) -> Self {
        self.reservation.expired_at = Some(raw.to_owned());
        self
    }

    pub fn flagged_expired(mut self) -> Self {
        self.reservation.is_expired = true;
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.reservation.extra.insert(key.to_owned(), value);
        self
    }

    pub fn holder(self, user: &User, company: &Company) -> Result<Self> {
        Ok(self
            .field("user", serde_json::to_value(user).context("encode user")?)
            .field("company", serde_json::to_value(company).context("encode company")?))
    }

    pub fn payment(mut self, payment: Payment) -> Result<Self> {
        record_payment(&mut self.reservation, payment)?;
        Ok(self)
    }

    pub fn prices(self, total: i64, paid: i64) -> Self {
        self.field("total_price", json!(total))
            .field("amount_paid", json!(paid))
    }

    pub fn build(self) -> Reservation {
        self.reservation
    }
}

/// Everything the demo backend serves.
#[derive(Debug, Clone)]
pub struct DemoDataset {
    pub users: Vec<User>,
    pub companies: Vec<Company>,
    pub airports: Vec<Airport>,
    pub flights: Vec<Flight>,
    pub hotels: Vec<Hotel>,
    pub packages: Vec<Package>,
    pub payment_methods: Vec<PaymentMethod>,
    pub reservations: BTreeMap<&'static str, Vec<Reservation>>,
}

impl DemoDataset {
    pub fn reservations(&self, kind: ReservationKind) -> &[Reservation] {
        self.reservations
            .get(kind.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Seeded dataset whose pending rows expire a few seconds after `now`, so a
/// demo session shows rows crossing their deadline.
pub fn demo_dataset(seed: u64, now: OffsetDateTime) -> Result<DemoDataset> {
    let mut faker = TripFaker::new(seed);
    let companies: Vec<Company> = (0..4).map(|_| faker.company()).collect();
    let mut users: Vec<User> = (0..4).map(|_| faker.agent()).collect();
    users.extend(companies.iter().take(2).map(|company| faker.company_user(company)));
    let airports = faker.airports();
    let flights: Vec<Flight> = (0..5).map(|_| faker.flight(&airports, now)).collect();
    let hotels: Vec<Hotel> = (0..5)
        .map(|index| faker.hotel(companies.get(index % companies.len()), now))
        .collect();
    let packages: Vec<Package> = flights
        .iter()
        .zip(&hotels)
        .map(|(flight, hotel)| faker.package(flight, hotel, now))
        .collect();
    let payment_methods = faker.payment_methods();

    let mut reservations = BTreeMap::new();
    for kind in ReservationKind::ALL {
        let mut rows = Vec::new();
        for index in 0..6_i64 {
            let id = faker.id();
            let user = &users[faker.rng.int_n(users.len())];
            let company = user
                .company
                .clone()
                .unwrap_or_else(|| companies[faker.rng.int_n(companies.len())].clone());
            let total = faker.int_range(10, 90) * 1_000_000;

            let builder = match index % 3 {
                0 => ReservationBuilder::pending_until(id, now + Duration::seconds(3 + index * 2))
                    .prices(total, 0)
                    .payment(bank_transfer(id, PaymentStatus::Unpaid, total / 2, now))?,
                1 => ReservationBuilder::new(id, ReservationStatus::PartiallyPaid)
                    .prices(total, total / 2)
                    .payment(bank_transfer(id, PaymentStatus::Paid, total / 2, now))?,
                _ => ReservationBuilder::new(id, ReservationStatus::Paid)
                    .prices(total, total)
                    .payment(bank_transfer(id, PaymentStatus::Paid, total, now))?,
            };
            let builder = builder.holder(user, &company)?;
            let builder = match kind {
                ReservationKind::Flight => {
                    let flight = &flights[faker.rng.int_n(flights.len())];
                    builder
                        .field("flight", serde_json::to_value(flight).context("encode flight")?)
                        .field("seats", json!(faker.int_range(1, 4)))
                }
                ReservationKind::Hotel => {
                    let hotel = &hotels[faker.rng.int_n(hotels.len())];
                    builder
                        .field("hotel", serde_json::to_value(hotel).context("encode hotel")?)
                        .field("amount", json!(faker.int_range(1, 4)))
                }
                ReservationKind::Package => {
                    let package = &packages[faker.rng.int_n(packages.len())];
                    builder
                        .field("package", serde_json::to_value(package).context("encode package")?)
                        .field("amount", json!(faker.int_range(1, 4)))
                }
            };
            rows.push(builder.build());
        }
        reservations.insert(kind.as_str(), rows);
    }

    Ok(DemoDataset {
        users,
        companies,
        airports,
        flights,
        hotels,
        packages,
        payment_methods,
        reservations,
    })
}

/// Demo payment codes are derived from the reservation id: `PAY000007`.
pub fn demo_payment_code(reservation_id: i64) -> String {
    format!("PAY{reservation_id:06}")
}

fn bank_transfer(
    reservation_id: i64,
    status: PaymentStatus,
    amount: i64,
    now: OffsetDateTime,
) -> Payment {
    Payment {
        payment_code: demo_payment_code(reservation_id),
        payment_method: Some(NamedRef {
            name: "Bank Transfer".to_owned(),
        }),
        status,
        amount,
        created_at: Some(stamp(now - Duration::hours(1))),
    }
}

/// Appends `payment` to the row's `payments` list.
pub fn record_payment(reservation: &mut Reservation, payment: Payment) -> Result<()> {
    let encoded = serde_json::to_value(payment).context("encode payment")?;
    match reservation.extra.get_mut("payments") {
        Some(Value::Array(list)) => list.push(encoded),
        _ => {
            reservation
                .extra
                .insert("payments".to_owned(), Value::Array(vec![encoded]));
        }
    }
    Ok(())
}

/// What the server does to a pending row once its hold lapses.
pub fn expire_if_due(reservation: &mut Reservation, now: OffsetDateTime) -> bool {
    if reservation.status != ReservationStatus::Pending {
        return false;
    }
    let due = match reservation.expiry_instant() {
        Some(deadline) => deadline <= now,
        None => true,
    };
    if due {
        reservation.status = ReservationStatus::Expired;
        reservation.is_expired = true;
    }
    due
}

pub fn stamp(instant: OffsetDateTime) -> String {
    instant.format(&Rfc3339).unwrap_or_default()
}

pub fn fixture_now() -> OffsetDateTime {
    datetime!(2026-03-01 08:00:00 UTC)
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}
