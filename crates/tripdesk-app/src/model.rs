// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Expired,
}

impl ReservationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::PartiallyPaid => "partially_paid",
            Self::Expired => "expired",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::PartiallyPaid => "Partially Paid",
            Self::Expired => "Expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationKind {
    Flight,
    Hotel,
    Package,
}

impl ReservationKind {
    pub const ALL: [Self; 3] = [Self::Flight, Self::Hotel, Self::Package];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Hotel => "hotel",
            Self::Package => "package",
        }
    }

    /// Collection segment used by the backend routes.
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Flight => "flights",
            Self::Hotel => "hotels",
            Self::Package => "packages",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "flight" | "flights" => Some(Self::Flight),
            "hotel" | "hotels" => Some(Self::Hotel),
            "package" | "packages" => Some(Self::Package),
            _ => None,
        }
    }
}

/// Server-owned booking record. Anything beyond the fields the client reasons
/// about is carried in `extra` and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub status: ReservationStatus,
    #[serde(default)]
    pub expired_at: Option<String>,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reservation {
    pub fn new(id: ReservationId, status: ReservationStatus) -> Self {
        Self {
            id,
            status,
            expired_at: None,
            is_expired: false,
            extra: Map::new(),
        }
    }

    /// Parsed `expired_at`. `None` when missing or unparseable.
    pub fn expiry_instant(&self) -> Option<OffsetDateTime> {
        self.expired_at.as_deref().and_then(parse_instant)
    }

    /// Payments listed on the row, oldest first. Empty when the backend sent
    /// none or sent a shape this client does not understand.
    pub fn payments(&self) -> Vec<Payment> {
        self.extra
            .get("payments")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Whole-rupiah amount such as `total_price` or `amount_paid`.
    pub fn money(&self, key: &str) -> Option<i64> {
        let value = self.extra.get(key)?;
        let amount = match value {
            Value::String(raw) => raw.trim().parse::<f64>().ok()?,
            other => other.as_f64()?,
        };
        Some(amount as i64)
    }

    pub fn text_field(&self, path: &[&str]) -> Option<&str> {
        let mut current = self.extra.get(*path.first()?)?;
        for key in &path[1..] {
            current = current.get(key)?;
        }
        current.as_str()
    }
}

/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS` shape some backends emit
/// (interpreted as UTC).
pub fn parse_instant(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed);
    }
    PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// `05 January 2024`, the long form shown next to candidates.
pub fn long_date(raw: &str) -> Option<String> {
    let instant = parse_instant(raw)?;
    instant
        .format(format_description!("[day] [month repr:long] [year]"))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Admin,
    Agent,
    Company,
    #[serde(other)]
    Other,
}

impl UserType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::Company => "company",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ppiu_number: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub user_type: UserType,
    #[serde(default)]
    pub company: Option<Company>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub id: AirportId,
    pub iata: String,
    pub name: String,
    #[serde(default)]
    pub city: Option<NamedRef>,
    #[serde(default)]
    pub country: Option<NamedRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub airline: Airline,
    pub flight_number: String,
    #[serde(default)]
    pub return_flight_number: Option<String>,
    pub departure_airport: Airport,
    pub arrival_airport: Airport,
    #[serde(default)]
    pub program_type: i64,
    #[serde(default)]
    pub depart_at: Option<String>,
    #[serde(default)]
    pub available_seats: i64,
    /// Owning company for chartered seats; `None` for pool flights.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub location_1: String,
    pub location_2: String,
    #[serde(default)]
    pub program_type: i64,
    #[serde(default)]
    pub company: Option<Company>,
    #[serde(default)]
    pub first_check_in_at: Option<String>,
    #[serde(default)]
    pub price_per_package: i64,
    #[serde(default)]
    pub packages_left: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub program_type: i64,
    #[serde(default)]
    pub price_per_package: i64,
    #[serde(default)]
    pub packages_left: i64,
    pub flight: Flight,
    pub hotel: Hotel,
}

impl Package {
    /// `PKG-20240105` followed by the id, the reference printed on invoices.
    pub fn reference(&self) -> String {
        let stamp = self
            .created_at
            .as_deref()
            .and_then(parse_instant)
            .and_then(|instant| instant.format(format_description!("[year][month][day]")).ok())
            .unwrap_or_default();
        format!("PKG-{stamp}{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    #[serde(other)]
    Other,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Other => "other",
        }
    }
}

/// One instalment recorded against a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_code: String,
    #[serde(default)]
    pub payment_method: Option<NamedRef>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{
        PaymentStatus, Reservation, ReservationKind, ReservationStatus, long_date, parse_instant,
    };
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn reservation_keeps_unknown_fields_opaque() -> Result<()> {
        let raw = json!({
            "id": 7,
            "status": "partially_paid",
            "expired_at": null,
            "is_expired": false,
            "total_price": 12_500_000,
            "user": { "name": "Siti" }
        });
        let reservation: Reservation = serde_json::from_value(raw.clone())?;
        assert_eq!(reservation.status, ReservationStatus::PartiallyPaid);
        assert_eq!(reservation.text_field(&["user", "name"]), Some("Siti"));
        assert_eq!(serde_json::to_value(&reservation)?, raw);
        Ok(())
    }

    #[test]
    fn payments_and_amounts_read_from_the_row() -> Result<()> {
        let reservation: Reservation = serde_json::from_value(json!({
            "id": 8,
            "status": "partially_paid",
            "total_price": "30000000.00",
            "amount_paid": 10_000_000,
            "payments": [
                {
                    "payment_code": "PAY000008",
                    "payment_method": { "name": "Bank Transfer" },
                    "status": "unpaid",
                    "amount": 5_000_000,
                    "created_at": "2026-03-01T08:00:00Z"
                },
                { "payment_code": "PAY000009", "status": "refunded" }
            ]
        }))?;
        let payments = reservation.payments();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].status, PaymentStatus::Unpaid);
        assert_eq!(payments[1].status, PaymentStatus::Other);
        assert_eq!(reservation.money("total_price"), Some(30_000_000));
        assert_eq!(reservation.money("amount_paid"), Some(10_000_000));
        assert_eq!(reservation.money("discount"), None);

        let bare = Reservation::new(crate::ReservationId::new(9), ReservationStatus::Paid);
        assert!(bare.payments().is_empty());
        Ok(())
    }

    #[test]
    fn parse_instant_accepts_rfc3339_and_plain_datetime() {
        assert!(parse_instant("2024-03-01T10:00:00.000000Z").is_some());
        assert!(parse_instant("2024-03-01 10:00:00").is_some());
        assert!(parse_instant("soon").is_none());
        assert!(parse_instant("  ").is_none());
    }

    #[test]
    fn long_date_uses_month_names() {
        assert_eq!(
            long_date("2024-01-05T08:00:00Z").as_deref(),
            Some("05 January 2024")
        );
    }

    #[test]
    fn kind_parse_accepts_plural_segments() {
        for kind in ReservationKind::ALL {
            assert_eq!(ReservationKind::parse(kind.collection()), Some(kind));
            assert_eq!(ReservationKind::parse(kind.as_str()), Some(kind));
        }
    }
}
