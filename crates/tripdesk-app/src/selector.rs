// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, BTreeSet};

use crate::search::{filter_by_query, normalize};

pub type FieldKey = &'static str;

/// Uniform projection of a reference entity offered by a choice field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: i64,
    pub label: String,
    pub search_fields: Vec<String>,
    pub attributes: BTreeMap<String, i64>,
    pub tags: BTreeMap<String, String>,
    pub disabled: bool,
}

impl Candidate {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id,
            search_fields: vec![label.clone()],
            label,
            attributes: BTreeMap::new(),
            tags: BTreeMap::new(),
            disabled: false,
        }
    }

    pub fn with_field(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.search_fields.push(value);
        }
        self
    }

    pub fn with_attribute(mut self, name: &str, value: i64) -> Self {
        self.attributes.insert(name.to_owned(), value);
        self
    }

    pub fn with_tag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.tags.insert(name.to_owned(), value.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<i64> {
        self.attributes.get(name).copied()
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

pub trait IntoCandidate {
    fn to_candidate(&self) -> Candidate;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Pick one candidate. `min_query` > 0 withholds results until the query
    /// has that many characters.
    Choice { min_query: usize },
    Number { min: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn choice(key: FieldKey, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Choice { min_query: 0 },
            required: true,
        }
    }

    pub const fn number(key: FieldKey, label: &'static str, min: i64) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Number { min },
            required: true,
        }
    }

    pub const fn min_query(mut self, min_query: usize) -> Self {
        self.kind = FieldKind::Choice { min_query };
        self
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// The target is shown unless the source's `tag` equals `hidden_when`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityRule {
    pub tag: &'static str,
    pub hidden_when: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintEdge {
    pub source: FieldKey,
    pub target: FieldKey,
    pub bound_attribute: Option<&'static str>,
    pub visibility: Option<VisibilityRule>,
}

impl ConstraintEdge {
    pub const fn bound(source: FieldKey, target: FieldKey, attribute: &'static str) -> Self {
        Self {
            source,
            target,
            bound_attribute: Some(attribute),
            visibility: None,
        }
    }

    pub const fn shown_unless(
        source: FieldKey,
        target: FieldKey,
        tag: &'static str,
        hidden_when: &'static str,
    ) -> Self {
        Self {
            source,
            target,
            bound_attribute: None,
            visibility: Some(VisibilityRule { tag, hidden_when }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateState {
    Loading,
    Loaded(Vec<Candidate>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateView<'a> {
    Closed,
    Loading,
    /// Field has a minimum query length and nothing has been typed.
    AwaitingQuery { min: usize },
    TypeMore { remaining: usize },
    NoneFound,
    /// Reference list failed to load; shown as an empty list.
    Unavailable { message: &'a str },
    Matches(Vec<&'a Candidate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorEvent {
    Selected { field: FieldKey, id: i64 },
    Cleared { field: FieldKey },
    BoundChanged { field: FieldKey, max: i64, violated: bool },
    VisibilityChanged { field: FieldKey, visible: bool },
    ReloadRequested { field: FieldKey },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FieldKey,
    pub message: String,
}

/// Selection context for one form: chosen values, dependent bounds and
/// visibility, plus one shared query for whichever field is open.
///
/// Constraint propagation is synchronous; every edge leaving a field is
/// applied before `select` returns. Filtering never touches stored
/// candidate lists.
#[derive(Debug, Clone)]
pub struct Selector {
    fields: Vec<FieldSpec>,
    edges: Vec<ConstraintEdge>,
    candidates: BTreeMap<FieldKey, CandidateState>,
    selections: BTreeMap<FieldKey, Candidate>,
    numbers: BTreeMap<FieldKey, i64>,
    bounds: BTreeMap<FieldKey, i64>,
    hidden: BTreeSet<FieldKey>,
    active: Option<FieldKey>,
    query: String,
}

impl Selector {
    pub fn new(fields: Vec<FieldSpec>, edges: Vec<ConstraintEdge>) -> Self {
        let candidates = fields
            .iter()
            .filter(|field| matches!(field.kind, FieldKind::Choice { .. }))
            .map(|field| (field.key, CandidateState::Loading))
            .collect();
        let hidden = edges
            .iter()
            .filter(|edge| edge.visibility.is_some())
            .map(|edge| edge.target)
            .collect();
        let bounds = edges
            .iter()
            .filter(|edge| edge.bound_attribute.is_some())
            .map(|edge| (edge.target, 0))
            .collect();

        Self {
            fields,
            edges,
            candidates,
            selections: BTreeMap::new(),
            numbers: BTreeMap::new(),
            bounds,
            hidden,
            active: None,
            query: String::new(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn active(&self) -> Option<FieldKey> {
        self.active
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selection(&self, key: &str) -> Option<&Candidate> {
        self.selections.get(key)
    }

    pub fn number(&self, key: &str) -> Option<i64> {
        self.numbers.get(key).copied()
    }

    pub fn bound(&self, key: &str) -> Option<i64> {
        self.bounds.get(key).copied()
    }

    pub fn is_visible(&self, key: &str) -> bool {
        !self.hidden.contains(key)
    }

    pub fn candidate_state(&self, key: &str) -> Option<&CandidateState> {
        self.candidates.get(key)
    }

    /// Stores a fetched reference list. A failure is kept as an empty,
    /// retryable list and returned as a message for the status line.
    pub fn load(&mut self, key: FieldKey, result: Result<Vec<Candidate>>) -> Option<String> {
        let state = match result {
            Ok(list) => CandidateState::Loaded(list),
            Err(error) => {
                let label = self.field(key).map(|field| field.label).unwrap_or(key);
                let message = format!("failed to load {} options: {error}", label.to_lowercase());
                tracing::warn!(field = key, error = %error, "reference list fetch failed");
                self.candidates
                    .insert(key, CandidateState::Failed(message.clone()));
                return Some(message);
            }
        };
        self.candidates.insert(key, state);
        None
    }

    /// Opens `key`'s list and resets the query. Opening a field whose list
    /// failed to load asks the host to fetch it again.
    pub fn open(&mut self, key: FieldKey) -> Vec<SelectorEvent> {
        self.active = Some(key);
        self.query.clear();
        if matches!(self.candidates.get(key), Some(CandidateState::Failed(_))) {
            self.candidates.insert(key, CandidateState::Loading);
            return vec![SelectorEvent::ReloadRequested { field: key }];
        }
        Vec::new()
    }

    pub fn close(&mut self) {
        self.active = None;
        self.query.clear();
    }

    pub fn search(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    /// Filtered view of the open field.
    pub fn view(&self) -> CandidateView<'_> {
        match self.active {
            Some(key) => self.view_for(key),
            None => CandidateView::Closed,
        }
    }

    fn view_for(&self, key: FieldKey) -> CandidateView<'_> {
        let Some(state) = self.candidates.get(key) else {
            return CandidateView::Closed;
        };
        let min_query = match self.field(key).map(|field| field.kind) {
            Some(FieldKind::Choice { min_query }) => min_query,
            _ => 0,
        };
        let typed = normalize(&self.query).chars().count();

        match state {
            CandidateState::Loading => CandidateView::Loading,
            CandidateState::Failed(message) => CandidateView::Unavailable { message },
            CandidateState::Loaded(_) if min_query > 0 && typed == 0 => {
                CandidateView::AwaitingQuery { min: min_query }
            }
            CandidateState::Loaded(_) if typed < min_query => CandidateView::TypeMore {
                remaining: min_query - typed,
            },
            CandidateState::Loaded(list) => {
                let found =
                    filter_by_query(&self.query, list, |candidate| candidate.search_fields.clone());
                if found.is_empty() {
                    CandidateView::NoneFound
                } else {
                    CandidateView::Matches(found)
                }
            }
        }
    }

    /// Picks a loaded candidate by id.
    pub fn select(&mut self, key: FieldKey, id: i64) -> Result<Vec<SelectorEvent>> {
        let candidate = match self.candidates.get(key) {
            Some(CandidateState::Loaded(list)) => list
                .iter()
                .find(|candidate| candidate.id == id)
                .cloned()
                .ok_or_else(|| anyhow!("{key} option {id} is not in the loaded list"))?,
            Some(_) => bail!("{key} options are not loaded yet -- reopen the field and retry"),
            None => bail!("{key} is not a choice field"),
        };
        if candidate.disabled {
            bail!("{} is unavailable -- pick another option", candidate.label);
        }
        Ok(self.select_candidate(key, candidate))
    }

    /// Sets a value directly (also used to prefill update forms) and applies
    /// every edge leaving `key`.
    pub fn select_candidate(&mut self, key: FieldKey, candidate: Candidate) -> Vec<SelectorEvent> {
        let id = candidate.id;
        self.selections.insert(key, candidate);
        if self.active == Some(key) {
            self.close();
        }
        let mut events = vec![SelectorEvent::Selected { field: key, id }];
        events.extend(self.propagate(key));
        events
    }

    pub fn clear(&mut self, key: FieldKey) -> Vec<SelectorEvent> {
        if self.selections.remove(key).is_none() {
            return Vec::new();
        }
        let mut events = vec![SelectorEvent::Cleared { field: key }];
        events.extend(self.propagate(key));
        events
    }

    pub fn set_number(&mut self, key: FieldKey, value: i64) {
        self.numbers.insert(key, value);
    }

    fn propagate(&mut self, source: FieldKey) -> Vec<SelectorEvent> {
        let outgoing: Vec<ConstraintEdge> = self
            .edges
            .iter()
            .filter(|edge| edge.source == source)
            .copied()
            .collect();
        let mut events = Vec::new();

        for edge in outgoing {
            let entity = self.selections.get(source);

            if let Some(attribute) = edge.bound_attribute {
                let max = entity
                    .and_then(|candidate| candidate.attribute(attribute))
                    .unwrap_or(0);
                self.bounds.insert(edge.target, max);
                let violated = self.number(edge.target).is_some_and(|value| value > max);
                events.push(SelectorEvent::BoundChanged {
                    field: edge.target,
                    max,
                    violated,
                });
            }

            if let Some(rule) = edge.visibility {
                let visible = match entity {
                    Some(candidate) => candidate.tag(rule.tag) != Some(rule.hidden_when),
                    None => false,
                };
                let changed = if visible {
                    self.hidden.remove(edge.target)
                } else {
                    self.hidden.insert(edge.target)
                };
                if changed {
                    events.push(SelectorEvent::VisibilityChanged {
                        field: edge.target,
                        visible,
                    });
                }
            }
        }
        events
    }

    /// Field-level problems for visible fields. Never coerces values.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for field in &self.fields {
            if !self.is_visible(field.key) {
                continue;
            }
            let label = field.label.to_lowercase();
            match field.kind {
                FieldKind::Choice { .. } => {
                    if field.required && !self.selections.contains_key(field.key) {
                        errors.push(FieldError {
                            field: field.key,
                            message: format!("{label} is required -- choose one and retry"),
                        });
                    }
                }
                FieldKind::Number { min } => {
                    let Some(value) = self.number(field.key) else {
                        if field.required {
                            errors.push(FieldError {
                                field: field.key,
                                message: format!("{label} is required"),
                            });
                        }
                        continue;
                    };
                    if value < min {
                        errors.push(FieldError {
                            field: field.key,
                            message: format!("{label} must be at least {min}"),
                        });
                        continue;
                    }
                    match self.bound(field.key) {
                        Some(max) if value > max => errors.push(FieldError {
                            field: field.key,
                            message: format!("{label} cannot exceed {max} (currently available)"),
                        }),
                        _ => {}
                    }
                }
            }
        }
        errors
    }

    pub fn errors_for(&self, key: &str) -> Vec<FieldError> {
        self.validate()
            .into_iter()
            .filter(|error| error.field == key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Candidate, CandidateState, CandidateView, ConstraintEdge, FieldSpec, Selector,
        SelectorEvent,
    };
    use anyhow::{Result, anyhow};

    fn package_form() -> Selector {
        Selector::new(
            vec![
                FieldSpec::choice("user", "User"),
                FieldSpec::choice("company", "Company"),
                FieldSpec::choice("package", "Package"),
                FieldSpec::number("amount", "Amount", 1),
            ],
            vec![
                ConstraintEdge::shown_unless("user", "company", "user_type", "company"),
                ConstraintEdge::bound("package", "amount", "remaining_inventory"),
            ],
        )
    }

    fn packages() -> Vec<Candidate> {
        vec![
            Candidate::new(1, "PKG-1")
                .with_field("Madinah")
                .with_attribute("remaining_inventory", 5),
            Candidate::new(2, "PKG-2")
                .with_field("Makkah")
                .with_attribute("remaining_inventory", 0),
        ]
    }

    #[test]
    fn selecting_source_sets_and_updates_bound() -> Result<()> {
        let mut selector = package_form();
        assert_eq!(selector.load("package", Ok(packages())), None);

        let events = selector.select_candidate("package", packages()[0].clone());
        assert!(events.contains(&SelectorEvent::BoundChanged {
            field: "amount",
            max: 5,
            violated: false,
        }));
        assert_eq!(selector.bound("amount"), Some(5));

        selector.set_number("amount", 3);
        let events = selector.select_candidate("package", packages()[1].clone());
        assert!(events.contains(&SelectorEvent::BoundChanged {
            field: "amount",
            max: 0,
            violated: true,
        }));
        assert_eq!(selector.bound("amount"), Some(0));
        assert_eq!(selector.number("amount"), Some(3));
        Ok(())
    }

    #[test]
    fn bound_violation_is_a_field_error_not_a_coercion() {
        let mut selector = package_form();
        selector.select_candidate("package", packages()[0].clone());
        selector.set_number("amount", 9);

        let errors = selector.errors_for("amount");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot exceed 5"));
        assert_eq!(selector.number("amount"), Some(9));
        assert!(selector.errors_for("package").is_empty());
    }

    #[test]
    fn disabled_candidates_cannot_be_picked() -> Result<()> {
        let mut selector = package_form();
        selector.load("package", Ok(vec![packages()[1].clone().disabled(true)]));
        let error = selector
            .select("package", 2)
            .expect_err("disabled package should be rejected");
        assert!(error.to_string().contains("unavailable"));
        assert!(selector.select("package", 42).is_err());
        Ok(())
    }

    #[test]
    fn visibility_follows_discriminant_and_preserves_value() {
        let mut selector = package_form();
        assert!(!selector.is_visible("company"));

        let agent = Candidate::new(10, "Agent Ani").with_tag("user_type", "agent");
        let company_user = Candidate::new(11, "PT Amanah").with_tag("user_type", "company");
        let company = Candidate::new(20, "PT Barokah");

        let events = selector.select_candidate("user", agent.clone());
        assert!(events.contains(&SelectorEvent::VisibilityChanged {
            field: "company",
            visible: true,
        }));
        selector.select_candidate("company", company);

        selector.select_candidate("user", company_user);
        assert!(!selector.is_visible("company"));
        assert_eq!(selector.selection("company").map(|c| c.id), Some(20));
        assert!(selector.errors_for("company").is_empty());

        selector.select_candidate("user", agent);
        assert!(selector.is_visible("company"));
        assert_eq!(selector.selection("company").map(|c| c.id), Some(20));
    }

    #[test]
    fn search_filters_view_without_losing_candidates() -> Result<()> {
        let mut selector = package_form();
        selector.load("package", Ok(packages()));
        selector.open("package");

        selector.search("makkah");
        let CandidateView::Matches(found) = selector.view() else {
            return Err(anyhow!("expected matches"));
        };
        assert_eq!(found.len(), 1);

        selector.search("zzz");
        assert_eq!(selector.view(), CandidateView::NoneFound);

        selector.open("user");
        assert_eq!(selector.query(), "");
        selector.open("package");
        let CandidateView::Matches(all) = selector.view() else {
            return Err(anyhow!("expected full list"));
        };
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[test]
    fn min_query_fields_distinguish_waiting_from_empty() {
        let mut selector = Selector::new(
            vec![FieldSpec::choice("departure_airport", "Departure airport").min_query(3)],
            Vec::new(),
        );
        selector.open("departure_airport");
        assert_eq!(selector.view(), CandidateView::Loading);

        selector.load(
            "departure_airport",
            Ok(vec![Candidate::new(1, "Soekarno-Hatta").with_field("CGK")]),
        );
        assert_eq!(selector.view(), CandidateView::AwaitingQuery { min: 3 });

        selector.search("cg");
        assert_eq!(selector.view(), CandidateView::TypeMore { remaining: 1 });

        selector.search("cgk");
        assert!(matches!(selector.view(), CandidateView::Matches(found) if found.len() == 1));

        selector.search("xyz");
        assert_eq!(selector.view(), CandidateView::NoneFound);
    }

    #[test]
    fn min_query_counts_characters_without_whitespace() {
        let mut selector = Selector::new(
            vec![FieldSpec::choice("arrival_airport", "Arrival airport").min_query(3)],
            Vec::new(),
        );
        selector.load(
            "arrival_airport",
            Ok(vec![Candidate::new(2, "King Abdulaziz").with_field("JED")]),
        );
        selector.open("arrival_airport");

        selector.search("   ");
        assert_eq!(selector.view(), CandidateView::AwaitingQuery { min: 3 });

        selector.search("j e");
        assert_eq!(selector.view(), CandidateView::TypeMore { remaining: 1 });

        selector.search("j e d");
        assert!(matches!(selector.view(), CandidateView::Matches(found) if found.len() == 1));
    }

    #[test]
    fn failed_reference_list_is_empty_and_reopen_retries() {
        let mut selector = package_form();
        let message = selector.load("user", Err(anyhow!("503 service unavailable")));
        assert!(message.is_some_and(|text| text.contains("failed to load user options")));

        selector.open("package");
        selector.open("user");
        assert_eq!(selector.candidate_state("user"), Some(&CandidateState::Loading));

        selector.load("user", Err(anyhow!("still down")));
        selector.close();
        let events = selector.open("user");
        assert_eq!(events, vec![SelectorEvent::ReloadRequested { field: "user" }]);
    }

    #[test]
    fn select_closes_the_open_list() -> Result<()> {
        let mut selector = package_form();
        selector.load("package", Ok(packages()));
        selector.open("package");
        selector.search("madinah");
        selector.select("package", 1)?;
        assert_eq!(selector.active(), None);
        assert_eq!(selector.query(), "");
        assert_eq!(selector.view(), CandidateView::Closed);
        Ok(())
    }

    #[test]
    fn clearing_source_resets_bound_to_zero() {
        let mut selector = package_form();
        selector.select_candidate("package", packages()[0].clone());
        let events = selector.clear("package");
        assert!(events.contains(&SelectorEvent::BoundChanged {
            field: "amount",
            max: 0,
            violated: false,
        }));
        assert!(selector.clear("package").is_empty());
    }
}
