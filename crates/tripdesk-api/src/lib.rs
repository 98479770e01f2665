// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tripdesk_app::{
    Airport, Candidate, Company, Flight, Hotel, Package, PaymentMethod, ReferenceList,
    Reservation, ReservationId, ReservationKind, SubmitOutcome, User, VALIDATE_PAYMENT_PATH,
    candidates, delete_path, payment_method_candidates, reservation_holder_candidates,
};
use url::Url;

/// Blocking client for the back-office API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url).with_context(|| {
            format!("api.base_url {base_url:?} is not a URL -- use e.g. http://localhost:8000/api")
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }

        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert("X-Trp-App", HeaderValue::from_static("1"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))
            .with_context(|| format!("build request URL for {path}"))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(path, query)?;
        tracing::debug!(url = %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let response = ensure_success(response)?;
        response
            .json()
            .with_context(|| format!("decode response from {path}"))
    }

    pub fn list_reservations(&self, kind: ReservationKind) -> Result<Vec<Reservation>> {
        let envelope: ReservationsEnvelope = self.get(&reservations_path(kind), &[])?;
        Ok(envelope.reservations)
    }

    /// Single-row read used by the reconciler.
    pub fn fetch_reservation(
        &self,
        kind: ReservationKind,
        id: ReservationId,
    ) -> Result<Reservation> {
        let envelope: ReservationEnvelope =
            self.get(&reservations_path(kind), &[("id", id.to_string())])?;
        Ok(envelope.reservation)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let envelope: UsersEnvelope = self.get("/users", &[])?;
        Ok(envelope.users)
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let envelope: DataEnvelope<Company> = self.get("/companies", &[])?;
        Ok(envelope.data)
    }

    pub fn list_flights(&self) -> Result<Vec<Flight>> {
        let envelope: FlightsEnvelope = self.get("/hajj-umrah/flights", &[])?;
        Ok(envelope.flights)
    }

    pub fn list_hotels(&self) -> Result<Vec<Hotel>> {
        let envelope: HotelsEnvelope = self.get("/hajj-umrah/hotels", &[])?;
        Ok(envelope.hotels)
    }

    pub fn list_packages(&self) -> Result<Vec<Package>> {
        let envelope: PackagesEnvelope = self.get("/hajj-umrah/packages", &[])?;
        Ok(envelope.packages)
    }

    pub fn list_airports(&self) -> Result<Vec<Airport>> {
        let envelope: AirportsEnvelope = self.get("/airports", &[("intl", "1".to_owned())])?;
        Ok(envelope.airports)
    }

    pub fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let envelope: DataEnvelope<PaymentMethod> = self.get("/payment/payment-methods", &[])?;
        Ok(envelope.data)
    }

    /// Candidates for a form's choice field.
    pub fn reference(&self, list: ReferenceList) -> Result<Vec<Candidate>> {
        Ok(match list {
            ReferenceList::ReservationHolders => reservation_holder_candidates(&self.list_users()?),
            ReferenceList::Companies => candidates(&self.list_companies()?),
            ReferenceList::Flights => candidates(&self.list_flights()?),
            ReferenceList::Hotels => candidates(&self.list_hotels()?),
            ReferenceList::Packages => candidates(&self.list_packages()?),
            ReferenceList::Airports => candidates(&self.list_airports()?),
            ReferenceList::PaymentMethods => {
                payment_method_candidates(&self.list_payment_methods()?)
            }
        })
    }

    /// Posts a form body. A 422 reply is a [`SubmitOutcome::Rejected`], not
    /// an error.
    pub fn submit(&self, path: &str, body: &Value) -> Result<SubmitOutcome> {
        let url = self.endpoint(path, &[])?;
        tracing::debug!(url = %url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().unwrap_or_default();
            let parsed: ValidationEnvelope = serde_json::from_str(&body)
                .with_context(|| format!("decode validation errors from {path}"))?;
            return Ok(SubmitOutcome::Rejected {
                message: parsed
                    .message
                    .unwrap_or_else(|| "the submitted data was invalid".to_owned()),
                errors: parsed.errors,
            });
        }

        let response = ensure_success(response)?;
        let parsed: MessageEnvelope = response
            .json()
            .with_context(|| format!("decode response from {path}"))?;
        Ok(SubmitOutcome::Accepted {
            message: parsed.message.unwrap_or_else(|| "saved".to_owned()),
        })
    }

    /// Deletes reservations in one request. Returns the server's message.
    pub fn delete_reservations(
        &self,
        kind: ReservationKind,
        ids: &[ReservationId],
    ) -> Result<String> {
        if ids.is_empty() {
            bail!("no reservations selected to delete");
        }
        let query: Vec<(&str, String)> = ids.iter().map(|id| ("ids[]", id.to_string())).collect();
        let url = self.endpoint(delete_path(kind), &query)?;
        tracing::debug!(url = %url, "DELETE");
        let response = self
            .http
            .delete(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        message_of(ensure_success(response)?, "deleted")
    }

    /// Marks an unpaid payment as paid.
    pub fn validate_payment(&self, payment_code: &str) -> Result<String> {
        let url = self.endpoint(VALIDATE_PAYMENT_PATH, &[])?;
        tracing::debug!(url = %url, payment_code, "POST");
        let response = self
            .http
            .post(url)
            .json(&json!({ "payment_code": payment_code }))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        message_of(ensure_success(response)?, "payment validated")
    }
}

fn message_of(response: Response, fallback: &str) -> Result<String> {
    let body = response.text().context("read response body")?;
    let message = serde_json::from_str::<MessageEnvelope>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|message| !message.is_empty());
    Ok(message.unwrap_or_else(|| fallback.to_owned()))
}

fn reservations_path(kind: ReservationKind) -> String {
    format!("/hajj-umrah/{}/reservations", kind.collection())
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(clean_error_response(status, &body))
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!(
            "request to {} timed out -- raise [api].timeout or check the server ({})",
            base_url,
            error
        );
    }
    anyhow!(
        "cannot reach {} -- check [api].base_url and that the backend is running ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<MessageEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "server returned {} -- sign in to the back office and retry",
            status.as_u16()
        );
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ReservationsEnvelope {
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
struct ReservationEnvelope {
    reservation: Reservation,
}

#[derive(Debug, Deserialize)]
struct UsersEnvelope {
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct FlightsEnvelope {
    flights: Vec<Flight>,
}

#[derive(Debug, Deserialize)]
struct HotelsEnvelope {
    hotels: Vec<Hotel>,
}

#[derive(Debug, Deserialize)]
struct PackagesEnvelope {
    packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct AirportsEnvelope {
    airports: Vec<Airport>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidationEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}
