// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::json;
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};
use tripdesk_api::Client;
use tripdesk_app::{ReferenceList, ReservationId, ReservationKind, ReservationStatus, SubmitOutcome};

fn start_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

fn respond_json(request: Request, status: u16, body: &str) {
    let response = Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        );
    request.respond(response).expect("response should succeed");
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

#[test]
fn unreachable_backend_error_names_the_config_key() {
    let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .list_reservations(ReservationKind::Flight)
        .expect_err("list should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(message.contains("127.0.0.1:1"));
    assert!(message.contains("[api]"));
}

#[test]
fn list_and_fetch_reservations_send_app_headers() -> Result<()> {
    let (server, addr) = start_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("list request expected");
        assert_eq!(request.url(), "/api/hajj-umrah/flights/reservations");
        assert_eq!(
            header_value(&request, "X-Requested-With").as_deref(),
            Some("XMLHttpRequest")
        );
        assert_eq!(header_value(&request, "X-Trp-App").as_deref(), Some("1"));
        respond_json(
            request,
            200,
            r#"{"reservations":[
                {"id":1,"status":"pending","expired_at":"2026-03-01T08:00:00Z","is_expired":false,"seats":2},
                {"id":2,"status":"paid","expired_at":null,"is_expired":false}
            ]}"#,
        );

        let request = server.recv().expect("fetch request expected");
        assert_eq!(request.url(), "/api/hajj-umrah/flights/reservations?id=1");
        respond_json(
            request,
            200,
            r#"{"reservation":{"id":1,"status":"expired","expired_at":"2026-03-01T08:00:00Z","is_expired":true}}"#,
        );
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let rows = client.list_reservations(ReservationKind::Flight)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, ReservationStatus::Pending);
    assert_eq!(rows[0].extra.get("seats"), Some(&json!(2)));
    assert_eq!(rows[1].expired_at, None);

    let fresh = client.fetch_reservation(ReservationKind::Flight, ReservationId::new(1))?;
    assert_eq!(fresh.status, ReservationStatus::Expired);
    assert!(fresh.is_expired);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn reference_lists_unwrap_their_envelopes() -> Result<()> {
    let (server, addr) = start_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("users request expected");
        assert_eq!(request.url(), "/api/users");
        respond_json(
            request,
            200,
            r#"{"users":[
                {"id":1,"name":"Admin","email":"admin@example.com","user_type":"admin"},
                {"id":2,"name":"Ani","email":"ani@example.com","user_type":"agent"}
            ]}"#,
        );

        let request = server.recv().expect("companies request expected");
        assert_eq!(request.url(), "/api/companies");
        respond_json(
            request,
            200,
            r#"{"data":[{"id":30,"name":"PT Amanah","ppiu_number":"PPIU-1"}]}"#,
        );

        let request = server.recv().expect("airports request expected");
        assert_eq!(request.url(), "/api/airports?intl=1");
        respond_json(
            request,
            200,
            r#"{"airports":[{"id":1,"iata":"CGK","name":"Soekarno-Hatta"}]}"#,
        );
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let holders = client.reference(ReferenceList::ReservationHolders)?;
    assert_eq!(holders.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);

    let companies = client.list_companies()?;
    assert_eq!(companies[0].ppiu_number, "PPIU-1");

    let airports = client.reference(ReferenceList::Airports)?;
    assert_eq!(airports[0].label, "CGK - Soekarno-Hatta");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn submit_maps_validation_failures_and_success() -> Result<()> {
    let (server, addr) = start_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("first submit expected");
        assert_eq!(request.url(), "/api/hajj-umrah/packages/reservations/store");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body should be readable");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(parsed["amount"], json!(9));
        respond_json(
            request,
            422,
            r#"{"message":"The amount field must not be greater than 4.","errors":{"amount":["The amount field must not be greater than 4."]}}"#,
        );

        let request = server.recv().expect("second submit expected");
        respond_json(request, 200, r#"{"message":"Reservation created"}"#);
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let body = json!({ "package_id": 7, "user_id": 3, "company_id": 30, "amount": 9 });

    let rejected = client.submit("/hajj-umrah/packages/reservations/store", &body)?;
    let SubmitOutcome::Rejected { message, errors } = rejected else {
        return Err(anyhow!("expected validation rejection"));
    };
    assert!(message.contains("greater than 4"));
    assert_eq!(errors.get("amount").map(Vec::len), Some(1));

    let accepted = client.submit("/hajj-umrah/packages/reservations/store", &body)?;
    assert_eq!(
        accepted,
        SubmitOutcome::Accepted {
            message: "Reservation created".to_owned(),
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_errors_surface_the_message_envelope() -> Result<()> {
    let (server, addr) = start_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        respond_json(request, 500, r#"{"message":"Database unavailable"}"#);
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch_reservation(ReservationKind::Hotel, ReservationId::new(3))
        .expect_err("500 should be an error");
    assert_eq!(error.to_string(), "server error (500): Database unavailable");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn delete_sends_every_id_as_a_list_parameter() -> Result<()> {
    let (server, addr) = start_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("delete request expected");
        assert_eq!(*request.method(), Method::Delete);
        assert_eq!(
            request.url(),
            "/api/hajj-umrah/flights/reservations/delete?ids%5B%5D=4&ids%5B%5D=9"
        );
        respond_json(request, 200, r#"{"message":"Reservations deleted"}"#);
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let message = client.delete_reservations(
        ReservationKind::Flight,
        &[ReservationId::new(4), ReservationId::new(9)],
    )?;
    assert_eq!(message, "Reservations deleted");
    handle.join().expect("server thread should join");

    let nothing = client
        .delete_reservations(ReservationKind::Hotel, &[])
        .expect_err("empty selection");
    assert!(nothing.to_string().contains("no reservations selected"));
    Ok(())
}

#[test]
fn validate_posts_the_payment_code() -> Result<()> {
    let (server, addr) = start_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("validate request expected");
        assert_eq!(*request.method(), Method::Post);
        assert_eq!(request.url(), "/api/payment/validate");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body should be readable");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(parsed["payment_code"], json!("PAY000031"));
        respond_json(request, 200, r#"{"message":"Payment validated"}"#);

        let request = server.recv().expect("second validate request expected");
        respond_json(request, 404, r#"{"message":"Payment not found"}"#);
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert_eq!(client.validate_payment("PAY000031")?, "Payment validated");
    let error = client
        .validate_payment("PAY999999")
        .expect_err("unknown code");
    assert_eq!(error.to_string(), "server error (404): Payment not found");

    handle.join().expect("server thread should join");
    Ok(())
}
