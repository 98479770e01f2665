// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::fmt::Write as _;
use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tripdesk_app::{
    CandidateView, FieldKind, FlightId, FormEvent, FormKind, FormSession, PaymentStatus,
    ReservationDetail, ReservationId, ReservationKind, ReservationRow, RowEvent, rupiah,
};

use crate::runtime::{Backend, Host};

const MAX_LISTED_CANDIDATES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Detail(ReservationId),
    Delete(Vec<ReservationId>),
    Validate(String),
    Confirm,
    Next,
    Refresh,
    Search(String),
    Open {
        form: FormKind,
        target: Option<ReservationId>,
    },
    EditFlight(FlightId),
    Field(String),
    Find(String),
    Pick(i64),
    Set {
        field: String,
        value: i64,
    },
    Clear(String),
    Submit,
    Close,
    Help,
    Quit,
}

/// Parses one console line. `pay` targets the list currently on screen.
pub fn parse_command(line: &str, active: ReservationKind) -> Result<Command> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let id = |value: &str, what: &str| -> Result<i64> {
        value
            .parse()
            .map_err(|_| anyhow!("{what} must be a number, got {value:?}"))
    };
    let target = |value: &str| -> Result<Option<ReservationId>> {
        if value.is_empty() {
            return Ok(None);
        }
        id(value, "reservation id").map(|value| Some(ReservationId::new(value)))
    };

    let command = match verb {
        "" | "ls" => Command::Show,
        "show" => match target(rest)? {
            Some(id) => Command::Detail(id),
            None => Command::Show,
        },
        "delete" => {
            let ids = rest
                .split(|ch: char| ch == ',' || ch.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(|part| id(part, "reservation id").map(ReservationId::new))
                .collect::<Result<Vec<_>>>()?;
            if ids.is_empty() {
                bail!("delete requires at least one reservation id");
            }
            Command::Delete(ids)
        }
        "validate" => {
            if rest.is_empty() {
                bail!("validate requires a payment code");
            }
            Command::Validate(rest.to_owned())
        }
        "confirm" | "yes" | "y" => Command::Confirm,
        "next" => Command::Next,
        "refresh" => Command::Refresh,
        "search" => Command::Search(rest.to_owned()),
        "reserve-package" => Command::Open {
            form: FormKind::CreatePackageReservation,
            target: None,
        },
        "create-package" => Command::Open {
            form: FormKind::CreatePackage,
            target: None,
        },
        "update" => {
            let form = match active {
                ReservationKind::Flight => FormKind::UpdateFlightReservation,
                ReservationKind::Hotel => FormKind::UpdateHotelReservation,
                ReservationKind::Package => {
                    bail!("package reservations have no update form -- use pay instead")
                }
            };
            let target = target(rest)?
                .ok_or_else(|| anyhow!("update requires a reservation id"))?;
            Command::Open {
                form,
                target: Some(target),
            }
        }
        "pay" => {
            let target = target(rest)?.ok_or_else(|| anyhow!("pay requires a reservation id"))?;
            Command::Open {
                form: FormKind::AddPayment(active),
                target: Some(target),
            }
        }
        "edit-flight" => Command::EditFlight(FlightId::new(id(rest, "flight id")?)),
        "field" => {
            if rest.is_empty() {
                bail!("field requires a field name");
            }
            Command::Field(rest.to_owned())
        }
        "find" => Command::Find(rest.to_owned()),
        "pick" => Command::Pick(id(rest, "option id")?),
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("set requires a field name and a number"))?;
            Command::Set {
                field: field.to_owned(),
                value: id(value.trim(), field)?,
            }
        }
        "clear" => {
            if rest.is_empty() {
                bail!("clear requires a field name");
            }
            Command::Clear(rest.to_owned())
        }
        "submit" => Command::Submit,
        "close" | "cancel" => Command::Close,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        unknown => bail!("unknown command {unknown:?}; type help to list commands"),
    };
    Ok(command)
}

/// Runs one command and returns what to print.
pub fn apply<B: Backend>(host: &mut Host<B>, command: Command, now: OffsetDateTime) -> Result<String> {
    match command {
        Command::Show => {}
        Command::Detail(id) => host.show_detail(id)?,
        Command::Delete(ids) => host.request_delete(ids)?,
        Command::Validate(code) => host.request_validation(&code)?,
        Command::Confirm => {
            host.confirm(now)?;
        }
        Command::Next => host.next_kind(now)?,
        Command::Refresh => host.refresh(now)?,
        Command::Search(query) => host.set_query(&query),
        Command::Open { form, target } => host.open_form(form, target)?,
        Command::EditFlight(id) => host.edit_flight(id)?,
        Command::Field(name) => {
            let key = field_key(host, &name)?;
            host.open_field(key)?;
        }
        Command::Find(text) => open_form(host)?.selector_mut().search(text),
        Command::Pick(id) => {
            let form = open_form(host)?;
            let key = form
                .selector()
                .active()
                .ok_or_else(|| anyhow!("no field is open -- run `field <name>` first"))?;
            form.selector_mut().select(key, id)?;
        }
        Command::Set { field, value } => {
            let key = field_key(host, &field)?;
            open_form(host)?.selector_mut().set_number(key, value);
        }
        Command::Clear(field) => {
            let key = field_key(host, &field)?;
            for event in open_form(host)?.selector_mut().clear(key) {
                tracing::debug!(?event, "selection cleared");
            }
        }
        Command::Submit => {
            if let FormEvent::Dropped { .. } = host.submit_form(now)? {
                return Ok(String::new());
            }
        }
        Command::Close => host.close_modal(),
        Command::Help => return Ok(help_text()),
        Command::Quit => {}
    }

    Ok(screen(host))
}

/// Whatever is on top: the open form, a pending confirmation, a detail view,
/// or the list.
pub fn screen<B: Backend>(host: &Host<B>) -> String {
    if let Some(form) = host.form() {
        return render_form(form);
    }
    if let Some(action) = host.pending() {
        let mut out = format!("{}
  {}
", action.modal_key(), action.prompt());
        out.push_str("  type confirm to proceed or cancel to go back
");
        if let Some(status) = &host.state().status_line {
            let _ = writeln!(out, "> {status}");
        }
        return out;
    }
    if let Some(row) = host.detail_row() {
        return render_detail(row);
    }
    host.render()
}

pub fn render_detail(row: &ReservationRow) -> String {
    let reservation = row.reservation();
    let detail = ReservationDetail::new(reservation);
    let mut out = format!("reservation #{}  {}
", detail.id, row.status_text());
    for (label, path) in [
        ("holder", ["user", "name"]),
        ("email", ["user", "email"]),
        ("company", ["company", "name"]),
    ] {
        let value = reservation.text_field(&path).unwrap_or("-");
        let _ = writeln!(out, "  {label:<12} {value}");
    }

    if detail.payments.is_empty() {
        out.push_str("  no payments yet
");
    } else {
        out.push_str("  payments
");
        for payment in &detail.payments {
            let method = payment
                .payment_method
                .as_ref()
                .map(|method| method.name.as_str())
                .unwrap_or("-");
            let created = payment.created_at.as_deref().unwrap_or("-");
            let action = if payment.status == PaymentStatus::Unpaid {
                "  [validate]"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "    {:<12} {:<24} {:<22} {:<7} {:>16}{action}",
                payment.payment_code,
                method,
                created,
                payment.status.as_str(),
                rupiah(payment.amount)
            );
        }
    }

    let _ = writeln!(out, "  {:<12} {}", "total paid", rupiah(detail.paid));
    let _ = writeln!(out, "  {:<12} {}", "leftover", rupiah(detail.leftover()));
    let _ = writeln!(out, "  {:<12} {}", "total", rupiah(detail.total));
    out
}

fn open_form<B: Backend>(host: &mut Host<B>) -> Result<&mut FormSession> {
    host.form_mut()
        .ok_or_else(|| anyhow!("no form is open -- open one first (type help)"))
}

fn field_key<B: Backend>(host: &Host<B>, name: &str) -> Result<&'static str> {
    let form = host
        .form()
        .ok_or_else(|| anyhow!("no form is open -- open one first (type help)"))?;
    form.selector()
        .fields()
        .iter()
        .find(|field| field.key == name)
        .map(|field| field.key)
        .ok_or_else(|| {
            let known: Vec<_> = form.selector().fields().iter().map(|f| f.key).collect();
            anyhow!("unknown field {name:?}; this form has: {}", known.join(", "))
        })
}

pub fn render_form(form: &FormSession) -> String {
    let selector = form.selector();
    let mut out = format!("form {}\n", form.kind().modal_key());

    for field in selector.fields() {
        if !selector.is_visible(field.key) {
            let _ = writeln!(out, "  {:<20} (hidden)", field.key);
            continue;
        }
        let value = match field.kind {
            FieldKind::Choice { .. } => selector
                .selection(field.key)
                .map(|candidate| candidate.label.clone())
                .unwrap_or_else(|| "-".to_owned()),
            FieldKind::Number { .. } => {
                let current = selector
                    .number(field.key)
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "-".to_owned());
                match selector.bound(field.key) {
                    Some(max) => format!("{current} (max {max})"),
                    None => current,
                }
            }
        };
        let marker = if selector.active() == Some(field.key) { '>' } else { ' ' };
        let _ = writeln!(out, "{marker} {:<20} {value}", field.key);
        if selector.number(field.key).is_some() {
            for error in selector.errors_for(field.key) {
                let _ = writeln!(out, "    ! {}", error.message);
            }
        }
        if let Some(errors) = form.server_errors().get(field.key) {
            for error in errors {
                let _ = writeln!(out, "    ! {error}");
            }
        }
    }

    match selector.view() {
        CandidateView::Closed => {}
        CandidateView::Loading => out.push_str("    loading options\n"),
        CandidateView::AwaitingQuery { min } => {
            let _ = writeln!(out, "    type at least {min} characters to search");
        }
        CandidateView::TypeMore { remaining } => {
            let _ = writeln!(out, "    type {remaining} more to search");
        }
        CandidateView::NoneFound => out.push_str("    none found\n"),
        CandidateView::Unavailable { message } => {
            let _ = writeln!(out, "    {message} -- reopen the field to retry");
        }
        CandidateView::Matches(found) => {
            for candidate in found.iter().take(MAX_LISTED_CANDIDATES) {
                let suffix = if candidate.disabled { " (unavailable)" } else { "" };
                let _ = writeln!(out, "    [{}] {}{suffix}", candidate.id, candidate.label);
            }
            if found.len() > MAX_LISTED_CANDIDATES {
                let _ = writeln!(
                    out,
                    "    ... {} more, narrow with find",
                    found.len() - MAX_LISTED_CANDIDATES
                );
            }
        }
    }

    if let Some(message) = form.message() {
        let _ = writeln!(out, "> {message}");
    }
    out
}

fn help_text() -> String {
    [
        "show                     redraw the list or the open form",
        "show <id>                open a reservation with its payments",
        "validate <code>          validate an unpaid payment of the open reservation",
        "delete <id>...           delete reservations from the current list",
        "confirm                  run the action waiting for confirmation",
        "next                     switch to the next reservation list",
        "refresh                  reload the current list",
        "search <query>           filter rows (empty query shows all)",
        "reserve-package          open the package reservation form",
        "create-package           open the package form",
        "update <id>              edit a flight or hotel reservation",
        "pay <id>                 add a payment to a reservation",
        "edit-flight <id>         edit a flight",
        "field <name>             open a field's option list",
        "find <text>              search the open option list",
        "pick <id>                choose an option from the open list",
        "set <name> <number>      set a numeric field",
        "clear <name>             clear a field's selection",
        "submit                   send the open form",
        "close                    close the open form or view",
        "quit                     exit",
    ]
    .join("\n")
        + "\n"
}

/// Next reconciliation deadline, kept apart from console input so a stream of
/// commands cannot hold ticks back.
#[derive(Debug, Clone, Copy)]
struct TickSchedule {
    interval: Duration,
    last: Instant,
}

impl TickSchedule {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    fn wait(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last))
    }

    fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;
        true
    }
}

/// Prints the list, then reads console commands while ticking. When stdin
/// closes the loop keeps reconciling until no row is counting down.
pub fn run<B: Backend>(
    host: &mut Host<B>,
    tick: Duration,
    once: bool,
    clock: impl Fn() -> OffsetDateTime,
) -> Result<()> {
    host.refresh(clock())?;
    print!("{}", host.render());
    if once {
        return Ok(());
    }

    let (lines, input) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines.send(line).is_err() {
                break;
            }
        }
    });

    let mut schedule = TickSchedule::new(tick, Instant::now());
    let mut input_open = true;
    loop {
        if input_open {
            match input.recv_timeout(schedule.wait(Instant::now())) {
                Ok(line) => match parse_command(&line, host.table().kind()) {
                    Ok(Command::Quit) => return Ok(()),
                    Ok(command) => match apply(host, command, clock()) {
                        Ok(output) => print!("{output}"),
                        Err(error) => eprintln!("{error:#}"),
                    },
                    Err(error) => eprintln!("{error:#}"),
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => input_open = false,
            }
        } else {
            if !host.has_live_countdowns() {
                break;
            }
            thread::sleep(schedule.wait(Instant::now()));
        }

        if !schedule.due(Instant::now()) {
            continue;
        }
        let events = host.tick(clock());
        if host.form().is_none()
            && host.pending().is_none()
            && events
                .iter()
                .any(|event| !matches!(event, RowEvent::StaleResponseDropped { .. }))
        {
            print!("{}", screen(host));
        }
    }
    tracing::info!("no pending reservations left to watch");
    Ok(())
}
