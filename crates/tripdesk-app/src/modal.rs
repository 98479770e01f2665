// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cell::RefCell;
use std::rc::Rc;

pub const CREATE_PACKAGE_RESERVATION: &str = "createPackageReservationModal";
pub const UPDATE_FLIGHT_RESERVATION: &str = "updateFlightReservationModal";
pub const UPDATE_HOTEL_RESERVATION: &str = "updateHotelReservationModal";
pub const CREATE_PACKAGE: &str = "createPackageModal";
pub const UPDATE_FLIGHT: &str = "updateFlightModal";
pub const ADD_FLIGHT_RESERVATION_PAYMENT: &str = "createFlightReservationPaymentModal";
pub const ADD_HOTEL_RESERVATION_PAYMENT: &str = "createHotelReservationPaymentModal";
pub const ADD_PACKAGE_RESERVATION_PAYMENT: &str = "createPackageReservationPaymentModal";
pub const FLIGHT_RESERVATION_DETAIL: &str = "flightReservationDetailModal";
pub const HOTEL_RESERVATION_DETAIL: &str = "hotelReservationDetailModal";
pub const PACKAGE_RESERVATION_DETAIL: &str = "packageReservationDetailModal";
pub const DELETE_FLIGHT_RESERVATION: &str = "deleteFlightReservationModal";
pub const DELETE_HOTEL_RESERVATION: &str = "deleteHotelReservationModal";
pub const DELETE_PACKAGE_RESERVATION: &str = "deletePackageReservationModal";
pub const VALIDATE_FLIGHT_RESERVATION_PAYMENT: &str = "validateFlightReservationPaymentModal";
pub const VALIDATE_HOTEL_RESERVATION_PAYMENT: &str = "validateHotelReservationPaymentModal";
pub const VALIDATE_PACKAGE_RESERVATION_PAYMENT: &str = "validatePackageReservationPaymentModal";

/// The one overlay allowed to be open. Setting a key replaces the previous
/// one; the empty key means nothing is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalSlot {
    active: Option<String>,
}

impl ModalSlot {
    /// Returns the key that was replaced, if any.
    pub fn open(&mut self, key: &str) -> Option<String> {
        if key.is_empty() {
            return self.active.take();
        }
        self.active.replace(key.to_owned())
    }

    /// `false` when nothing was open.
    pub fn close(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_open(&self, key: &str) -> bool {
        !key.is_empty() && self.active.as_deref() == Some(key)
    }
}

/// Session-scoped slot handed out as separate read and write handles.
#[derive(Debug, Clone, Default)]
pub struct ModalStore {
    slot: Rc<RefCell<ModalSlot>>,
}

impl ModalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> ModalReader {
        ModalReader {
            slot: Rc::clone(&self.slot),
        }
    }

    pub fn writer(&self) -> ModalWriter {
        ModalWriter {
            slot: Rc::clone(&self.slot),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModalReader {
    slot: Rc<RefCell<ModalSlot>>,
}

impl ModalReader {
    pub fn active(&self) -> Option<String> {
        self.slot.borrow().active().map(str::to_owned)
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.slot.borrow().is_open(key)
    }
}

#[derive(Debug, Clone)]
pub struct ModalWriter {
    slot: Rc<RefCell<ModalSlot>>,
}

impl ModalWriter {
    pub fn open(&self, key: &str) -> Option<String> {
        let replaced = self.slot.borrow_mut().open(key);
        if let Some(previous) = &replaced {
            tracing::debug!(previous = %previous, next = key, "modal replaced");
        }
        replaced
    }

    pub fn close(&self) -> bool {
        self.slot.borrow_mut().close()
    }

    pub fn reader(&self) -> ModalReader {
        ModalReader {
            slot: Rc::clone(&self.slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CREATE_PACKAGE_RESERVATION, ModalSlot, ModalStore, UPDATE_FLIGHT_RESERVATION};

    #[test]
    fn opening_a_key_replaces_the_previous_one() {
        let mut slot = ModalSlot::default();
        assert_eq!(slot.open("x"), None);
        assert_eq!(slot.open("y"), Some("x".to_owned()));
        assert!(slot.is_open("y"));
        assert!(!slot.is_open("x"));
    }

    #[test]
    fn empty_key_and_close_leave_nothing_open() {
        let mut slot = ModalSlot::default();
        slot.open("x");
        slot.open("");
        assert_eq!(slot.active(), None);
        assert!(!slot.is_open(""));

        slot.open("x");
        assert!(slot.close());
        assert!(!slot.close());
        assert_eq!(slot.active(), None);
    }

    #[test]
    fn readers_observe_writer_changes() {
        let store = ModalStore::new();
        let table = store.reader();
        let form = store.reader();
        let opener = store.writer();

        opener.open(CREATE_PACKAGE_RESERVATION);
        assert!(table.is_open(CREATE_PACKAGE_RESERVATION));
        assert!(!form.is_open(UPDATE_FLIGHT_RESERVATION));

        opener.open(UPDATE_FLIGHT_RESERVATION);
        assert!(form.is_open(UPDATE_FLIGHT_RESERVATION));
        assert!(!table.is_open(CREATE_PACKAGE_RESERVATION));

        assert!(store.writer().close());
        assert_eq!(form.active(), None);
    }
}
