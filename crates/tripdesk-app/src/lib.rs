// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod actions;
pub mod candidates;
pub mod countdown;
pub mod forms;
pub mod ids;
pub mod modal;
pub mod model;
pub mod reconcile;
pub mod search;
pub mod selector;
pub mod state;
pub mod table;

pub use actions::*;
pub use candidates::*;
pub use countdown::*;
pub use forms::*;
pub use ids::*;
pub use modal::{ModalReader, ModalSlot, ModalStore, ModalWriter};
pub use model::*;
pub use reconcile::*;
pub use search::filter_by_query;
pub use selector::*;
pub use state::*;
pub use table::*;
