// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Projections of reference entities into selector candidates.

use crate::selector::{Candidate, IntoCandidate};
use crate::{
    Airport, Company, Flight, Hotel, Package, PaymentMethod, User, UserType, long_date,
    parse_instant,
};

pub const ATTR_AVAILABLE_SEATS: &str = "available_seats";
pub const ATTR_PACKAGES_LEFT: &str = "packages_left";
pub const ATTR_COMPANY_ID: &str = "company_id";
pub const ATTR_OWNER_COMPANY_ID: &str = "owner_company_id";
/// Unix seconds.
pub const ATTR_DEPARTS_AT: &str = "departs_at";
pub const TAG_USER_TYPE: &str = "user_type";
pub const TAG_CODE: &str = "code";

fn with_date(candidate: Candidate, raw: Option<&str>) -> Candidate {
    match raw {
        Some(raw) => {
            let candidate = candidate.with_field(raw);
            match long_date(raw) {
                Some(formatted) => candidate.with_field(formatted),
                None => candidate,
            }
        }
        None => candidate,
    }
}

impl IntoCandidate for User {
    fn to_candidate(&self) -> Candidate {
        let candidate = Candidate::new(self.id.get(), self.name.clone())
            .with_field(self.email.clone())
            .with_field(self.phone.clone().unwrap_or_default())
            .with_tag(TAG_USER_TYPE, self.user_type.as_str());
        match &self.company {
            Some(company) => candidate.with_attribute(ATTR_COMPANY_ID, company.id.get()),
            None => candidate,
        }
    }
}

impl IntoCandidate for Company {
    fn to_candidate(&self) -> Candidate {
        Candidate::new(self.id.get(), self.name.clone())
            .with_field(self.email.clone().unwrap_or_default())
            .with_field(self.ppiu_number.clone())
            .with_field(self.phone.clone().unwrap_or_default())
    }
}

impl IntoCandidate for Airport {
    fn to_candidate(&self) -> Candidate {
        let mut candidate = Candidate::new(self.id.get(), format!("{} - {}", self.iata, self.name))
            .with_field(self.iata.clone())
            .with_field(self.name.clone());
        for place in [&self.city, &self.country].into_iter().flatten() {
            candidate = candidate.with_field(place.name.clone());
        }
        candidate
    }
}

impl IntoCandidate for Flight {
    fn to_candidate(&self) -> Candidate {
        let label = format!(
            "{} {} {} -> {}",
            self.airline.name,
            self.flight_number,
            self.departure_airport.iata,
            self.arrival_airport.iata
        );
        let mut candidate = Candidate::new(self.id.get(), label)
            .with_field(self.airline.name.clone())
            .with_field(self.flight_number.clone())
            .with_field(self.return_flight_number.clone().unwrap_or_default())
            .with_field(self.departure_airport.name.clone())
            .with_field(self.arrival_airport.name.clone())
            .with_field(self.departure_airport.iata.clone())
            .with_field(self.arrival_airport.iata.clone())
            .with_attribute(ATTR_AVAILABLE_SEATS, self.available_seats)
            .disabled(self.available_seats <= 0);
        if let Some(owner) = self.company_id {
            candidate = candidate.with_attribute(ATTR_OWNER_COMPANY_ID, owner.get());
        }
        if let Some(departs) = self.depart_at.as_deref().and_then(parse_instant) {
            candidate = candidate.with_attribute(ATTR_DEPARTS_AT, departs.unix_timestamp());
        }
        with_date(candidate, self.depart_at.as_deref())
    }
}

impl IntoCandidate for Hotel {
    fn to_candidate(&self) -> Candidate {
        let label = format!("{} / {}", self.location_1, self.location_2);
        let mut candidate = Candidate::new(self.id.get(), label)
            .with_field(self.location_1.clone())
            .with_field(self.location_2.clone())
            .with_attribute(ATTR_PACKAGES_LEFT, self.packages_left)
            .disabled(self.packages_left <= 0);
        if let Some(company) = &self.company {
            candidate = candidate.with_field(company.name.clone());
        }
        with_date(candidate, self.first_check_in_at.as_deref())
    }
}

impl IntoCandidate for Package {
    fn to_candidate(&self) -> Candidate {
        let candidate = Candidate::new(self.id.get(), self.reference())
            .with_field(self.hotel.location_1.clone())
            .with_field(self.hotel.location_2.clone())
            .with_field(self.flight.airline.name.clone())
            .with_field(self.flight.flight_number.clone())
            .with_field(self.flight.return_flight_number.clone().unwrap_or_default())
            .with_attribute(ATTR_PACKAGES_LEFT, self.packages_left)
            .disabled(self.packages_left <= 0);
        let candidate = with_date(candidate, self.flight.depart_at.as_deref());
        with_date(candidate, self.hotel.first_check_in_at.as_deref())
    }
}

pub fn candidates<T: IntoCandidate>(items: &[T]) -> Vec<Candidate> {
    items.iter().map(IntoCandidate::to_candidate).collect()
}

/// Only agents and company accounts can hold reservations.
pub fn reservation_holder_candidates(users: &[User]) -> Vec<Candidate> {
    users
        .iter()
        .filter(|user| matches!(user.user_type, UserType::Agent | UserType::Company))
        .map(IntoCandidate::to_candidate)
        .collect()
}

/// Payment methods are keyed by code; ids are list positions.
pub fn payment_method_candidates(methods: &[PaymentMethod]) -> Vec<Candidate> {
    methods
        .iter()
        .zip(1_i64..)
        .map(|(method, id)| {
            Candidate::new(id, method.name.clone())
                .with_field(method.code.clone())
                .with_tag(TAG_CODE, method.code.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        ATTR_AVAILABLE_SEATS, ATTR_COMPANY_ID, ATTR_DEPARTS_AT, ATTR_OWNER_COMPANY_ID, TAG_CODE,
        TAG_USER_TYPE, payment_method_candidates, reservation_holder_candidates,
    };
    use crate::search::matches_all_terms;
    use crate::selector::IntoCandidate;
    use crate::{Flight, PaymentMethod, User};
    use anyhow::Result;
    use serde_json::json;

    fn flight(seats: i64) -> Result<Flight> {
        Ok(serde_json::from_value(json!({
            "id": 4,
            "airline": { "code": "GA", "name": "Garuda Indonesia" },
            "flight_number": "GA980",
            "departure_airport": { "id": 1, "iata": "CGK", "name": "Jakarta Soekarno-Hatta" },
            "arrival_airport": { "id": 2, "iata": "JED", "name": "King Abdulaziz" },
            "depart_at": "2024-01-05 09:30:00",
            "available_seats": seats
        }))?)
    }

    #[test]
    fn flight_candidate_is_searchable_by_long_date() -> Result<()> {
        let candidate = flight(12)?.to_candidate();
        assert_eq!(candidate.attribute(ATTR_AVAILABLE_SEATS), Some(12));
        assert!(!candidate.disabled);
        assert!(matches_all_terms("jakarta january", &candidate.search_fields));
        assert!(matches_all_terms("ga980 2024", &candidate.search_fields));
        Ok(())
    }

    #[test]
    fn flight_candidate_carries_owner_and_departure() -> Result<()> {
        let pool = flight(3)?.to_candidate();
        assert_eq!(pool.attribute(ATTR_OWNER_COMPANY_ID), None);
        assert_eq!(pool.attribute(ATTR_DEPARTS_AT), Some(1_704_447_000));

        let mut charter = flight(3)?;
        charter.company_id = Some(crate::CompanyId::new(30));
        charter.depart_at = Some("whenever".to_owned());
        let charter = charter.to_candidate();
        assert_eq!(charter.attribute(ATTR_OWNER_COMPANY_ID), Some(30));
        assert_eq!(charter.attribute(ATTR_DEPARTS_AT), None);
        Ok(())
    }

    #[test]
    fn sold_out_inventory_is_disabled() -> Result<()> {
        assert!(flight(0)?.to_candidate().disabled);
        Ok(())
    }

    #[test]
    fn only_agents_and_company_accounts_hold_reservations() -> Result<()> {
        let users: Vec<User> = serde_json::from_value(json!([
            { "id": 1, "name": "Admin", "email": "admin@example.com", "user_type": "admin" },
            { "id": 2, "name": "Ani", "email": "ani@example.com", "user_type": "agent" },
            {
                "id": 3,
                "name": "PT Amanah",
                "email": "amanah@example.com",
                "user_type": "company",
                "company": { "id": 30, "name": "PT Amanah" }
            }
        ]))?;
        let holders = reservation_holder_candidates(&users);
        let ids: Vec<_> = holders.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(holders[1].tag(TAG_USER_TYPE), Some("company"));
        assert_eq!(holders[1].attribute(ATTR_COMPANY_ID), Some(30));
        assert_eq!(holders[0].attribute(ATTR_COMPANY_ID), None);
        Ok(())
    }

    #[test]
    fn payment_methods_carry_their_code() {
        let methods = vec![
            PaymentMethod {
                code: "bca_va".to_owned(),
                name: "BCA Virtual Account".to_owned(),
            },
            PaymentMethod {
                code: "cash".to_owned(),
                name: "Cash".to_owned(),
            },
        ];
        let candidates = payment_method_candidates(&methods);
        assert_eq!(candidates[1].id, 2);
        assert_eq!(candidates[1].tag(TAG_CODE), Some("cash"));
    }
}
