// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ReservationKind;
use crate::modal::{ModalReader, ModalStore, ModalWriter};

#[derive(Debug, Clone)]
pub struct AppState {
    pub active_kind: ReservationKind,
    pub status_line: Option<String>,
    modal: ModalWriter,
}

impl AppState {
    pub fn new(modals: &ModalStore) -> Self {
        Self {
            active_kind: ReservationKind::Flight,
            status_line: None,
            modal: modals.writer(),
        }
    }

    pub fn modal(&self) -> ModalReader {
        self.modal.reader()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextKind,
    OpenModal(String),
    CloseModal,
    FormSubmitted {
        message: String,
        refresh: Option<ReservationKind>,
    },
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    KindChanged(ReservationKind),
    ModalChanged(Option<String>),
    RefetchRequested(ReservationKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextKind => {
                let kinds = ReservationKind::ALL;
                let current = kinds
                    .iter()
                    .position(|kind| *kind == self.active_kind)
                    .unwrap_or(0);
                self.active_kind = kinds[(current + 1) % kinds.len()];
                vec![AppEvent::KindChanged(self.active_kind)]
            }
            AppCommand::OpenModal(key) => {
                self.modal.open(&key);
                vec![AppEvent::ModalChanged(self.modal.reader().active())]
            }
            AppCommand::CloseModal => {
                if self.modal.close() {
                    vec![AppEvent::ModalChanged(None)]
                } else {
                    Vec::new()
                }
            }
            AppCommand::FormSubmitted { message, refresh } => {
                let mut events = Vec::new();
                if self.modal.close() {
                    events.push(AppEvent::ModalChanged(None));
                }
                if let Some(kind) = refresh {
                    events.push(AppEvent::RefetchRequested(kind));
                }
                events.push(self.set_status(&message));
                events
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
