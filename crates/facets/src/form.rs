//! A facet form: the set of facets rendered next to one result table.
//!
//! Each form owns its own copy of every facet it exposes. User gestures go
//! through the same state-change path as replayed sync messages; the only
//! difference is the [`ChangeOrigin`], which decides whether the change is
//! published to sibling forms. Either way the form's change listeners fire,
//! so every bound table refetches.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FacetError, Result};
use crate::range::{RangeFacet, RangeHandle};
use crate::sync::{ChangeOrigin, FacetSubscriber, FacetSyncBus, FacetSyncMessage, FacetValue};
use crate::tree::{CheckState, CheckboxTree};

/// Separator used when a tree facet has several selected values.
const MULTI_VALUE_SEPARATOR: &str = ",";

/// Request parameters derived from a form's facets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSelection {
    params: BTreeMap<String, String>,
}

impl FacetSelection {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }
}

/// A removable filter chip.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetChip {
    Term {
        facet: String,
        value: String,
        label: String,
    },
    Range {
        facet: String,
        label: String,
    },
}

impl FacetChip {
    pub fn facet(&self) -> &str {
        match self {
            Self::Term { facet, .. } | Self::Range { facet, .. } => facet,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Term { label, .. } | Self::Range { label, .. } => label,
        }
    }
}

type ChangeListener = Arc<dyn Fn(&FacetSelection) + Send + Sync>;

#[derive(Default)]
struct FormState {
    trees: BTreeMap<String, CheckboxTree>,
    ranges: BTreeMap<String, RangeFacet>,
}

impl FormState {
    fn selection(&self) -> FacetSelection {
        let mut params = BTreeMap::new();
        for (name, tree) in &self.trees {
            let values = tree.selected_values();
            if !values.is_empty() {
                params.insert(name.clone(), values.join(MULTI_VALUE_SEPARATOR));
            }
        }
        for range in self.ranges.values() {
            params.extend(range.query_params());
        }
        FacetSelection { params }
    }

    fn tree_mut(&mut self, facet: &str) -> Result<&mut CheckboxTree> {
        self.trees
            .get_mut(facet)
            .ok_or_else(|| FacetError::UnknownFacet(facet.to_string()))
    }

    fn range_mut(&mut self, facet: &str) -> Result<&mut RangeFacet> {
        self.ranges
            .get_mut(facet)
            .ok_or_else(|| FacetError::UnknownFacet(facet.to_string()))
    }
}

struct FormInner {
    form_id: String,
    bus: FacetSyncBus,
    state: Mutex<FormState>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl FormInner {
    fn set_checked(
        &self,
        facet: &str,
        value: &str,
        checked: bool,
        origin: ChangeOrigin,
    ) -> Result<bool> {
        let selection = {
            let mut state = self.state.lock();
            let changed = state.tree_mut(facet)?.set_checked(value, checked)?;
            if !changed {
                return Ok(false);
            }
            state.selection()
        };

        if origin.should_publish() {
            self.bus.publish(&FacetSyncMessage {
                facet_name: facet.to_string(),
                facet_value: FacetValue::Term(value.to_string()),
                checked,
                origin_form_id: self.form_id.clone(),
            });
        }
        self.notify(&selection);
        Ok(true)
    }

    /// The single path for committed range changes.
    ///
    /// `change` mutates the facet and reports whether committed state moved.
    /// Bounds moved on a facet that stays disabled are kept locally only: they
    /// reach siblings and listeners when the facet is enabled.
    fn change_range(
        &self,
        facet: &str,
        origin: ChangeOrigin,
        change: impl FnOnce(&mut RangeFacet) -> bool,
    ) -> Result<bool> {
        let (selection, committed, enabled) = {
            let mut state = self.state.lock();
            let range = state.range_mut(facet)?;
            let was_enabled = range.is_enabled();
            if !change(range) {
                return Ok(false);
            }
            let committed = range.committed();
            let enabled = range.is_enabled();
            if !was_enabled && !enabled {
                log::debug!(
                    "form {}: range {} moved while disabled, not published",
                    self.form_id,
                    facet
                );
                return Ok(true);
            }
            (state.selection(), committed, enabled)
        };

        if origin.should_publish() {
            self.bus.publish(&FacetSyncMessage {
                facet_name: facet.to_string(),
                facet_value: FacetValue::Range {
                    min: committed.min,
                    max: committed.max,
                },
                checked: enabled,
                origin_form_id: self.form_id.clone(),
            });
        }
        self.notify(&selection);
        Ok(true)
    }

    fn notify(&self, selection: &FacetSelection) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(selection);
        }
    }
}

impl FacetSubscriber for FormInner {
    fn form_id(&self) -> &str {
        &self.form_id
    }

    fn apply_sync(&self, message: &FacetSyncMessage) -> bool {
        let result = match &message.facet_value {
            FacetValue::Term(value) => self.set_checked(
                &message.facet_name,
                value,
                message.checked,
                ChangeOrigin::Sync,
            ),
            FacetValue::Range { min, max } => {
                self.change_range(&message.facet_name, ChangeOrigin::Sync, |range| {
                    let moved = range.commit(*min, *max).is_some();
                    let toggled = range.set_enabled(message.checked);
                    moved || toggled
                })
            }
        };
        match result {
            Ok(changed) => changed,
            Err(error) => {
                log::debug!(
                    "facet sync target missing in form {}: {}",
                    self.form_id,
                    error
                );
                false
            }
        }
    }
}

/// Handle to a facet form. Clones share the same form.
#[derive(Clone)]
pub struct FacetForm {
    inner: Arc<FormInner>,
}

impl std::fmt::Debug for FacetForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetForm")
            .field("form_id", &self.inner.form_id)
            .finish()
    }
}

impl FacetForm {
    pub fn new(form_id: impl Into<String>, bus: &FacetSyncBus) -> Self {
        Self {
            inner: Arc::new(FormInner {
                form_id: form_id.into(),
                bus: bus.clone(),
                state: Mutex::new(FormState::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn form_id(&self) -> &str {
        &self.inner.form_id
    }

    /// Adds a hierarchical facet and subscribes the form to its topic.
    pub fn add_tree(&self, facet: impl Into<String>, tree: CheckboxTree) {
        let facet = facet.into();
        self.inner.bus.subscribe(&facet, &self.inner);
        self.inner.state.lock().trees.insert(facet, tree);
    }

    /// Adds a range facet and subscribes the form to its topic.
    pub fn add_range(&self, range: RangeFacet) {
        self.inner.bus.subscribe(range.name(), &self.inner);
        self.inner
            .state
            .lock()
            .ranges
            .insert(range.name().to_string(), range);
    }

    /// Registers a listener fired after every committed change, whatever its origin.
    pub fn on_change(&self, listener: impl Fn(&FacetSelection) + Send + Sync + 'static) {
        self.inner.listeners.lock().push(Arc::new(listener));
    }

    pub fn selection(&self) -> FacetSelection {
        self.inner.state.lock().selection()
    }

    /// Chips for every active filter: tree selections first, then ranges.
    pub fn chips(&self) -> Vec<FacetChip> {
        let state = self.inner.state.lock();
        let mut chips = Vec::new();
        for (facet, tree) in &state.trees {
            for node in tree.selected() {
                chips.push(FacetChip::Term {
                    facet: facet.clone(),
                    value: node.value().to_string(),
                    label: node.label().to_string(),
                });
            }
        }
        for (facet, range) in &state.ranges {
            if let Some(label) = range.chip_label() {
                chips.push(FacetChip::Range {
                    facet: facet.clone(),
                    label,
                });
            }
        }
        chips
    }

    pub fn tree_state(&self, facet: &str, value: &str) -> Result<CheckState> {
        self.inner.state.lock().tree_mut(facet)?.state(value)
    }

    /// Runs `f` against a tree facet, e.g. to render it.
    pub fn with_tree<R>(&self, facet: &str, f: impl FnOnce(&CheckboxTree) -> R) -> Result<R> {
        let mut state = self.inner.state.lock();
        Ok(f(state.tree_mut(facet)?))
    }

    /// Runs `f` against a range facet, e.g. to render it.
    pub fn with_range<R>(&self, facet: &str, f: impl FnOnce(&RangeFacet) -> R) -> Result<R> {
        let mut state = self.inner.state.lock();
        Ok(f(state.range_mut(facet)?))
    }

    /// A user click on a tree checkbox.
    pub fn check(&self, facet: &str, value: &str, checked: bool) -> Result<bool> {
        self.set_checked(facet, value, checked, ChangeOrigin::User)
    }

    /// Sets a tree node with an explicit origin. `Sync` changes are not published.
    pub fn set_checked(
        &self,
        facet: &str,
        value: &str,
        checked: bool,
        origin: ChangeOrigin,
    ) -> Result<bool> {
        self.inner.set_checked(facet, value, checked, origin)
    }

    /// Removes a chip through the same path as clearing its control by hand.
    pub fn remove_chip(&self, chip: &FacetChip) -> Result<bool> {
        match chip {
            FacetChip::Term { facet, value, .. } => self.check(facet, value, false),
            FacetChip::Range { facet, .. } => self.set_range_enabled(facet, false),
        }
    }

    pub fn toggle_expanded(&self, facet: &str, value: &str) -> Result<bool> {
        self.inner
            .state
            .lock()
            .tree_mut(facet)?
            .toggle_expanded(value)
    }

    /// Live handle movement; nothing is committed or published.
    pub fn drag_range(&self, facet: &str, handle: RangeHandle, value: f64) -> Result<(f64, f64)> {
        Ok(self
            .inner
            .state
            .lock()
            .range_mut(facet)?
            .drag(handle, value))
    }

    /// Ends a user drag and commits the live bounds.
    pub fn release_range(&self, facet: &str) -> Result<bool> {
        self.inner
            .change_range(facet, ChangeOrigin::User, |range| range.release().is_some())
    }

    /// A user edit of one of the paired numeric inputs.
    pub fn input_range(&self, facet: &str, handle: RangeHandle, value: f64) -> Result<bool> {
        self.inner.change_range(facet, ChangeOrigin::User, |range| {
            range.input(handle, value).is_some()
        })
    }

    /// The enable/disable toggle of a range facet.
    pub fn set_range_enabled(&self, facet: &str, enabled: bool) -> Result<bool> {
        self.inner
            .change_range(facet, ChangeOrigin::User, |range| range.set_enabled(enabled))
    }

    /// Unsubscribes the form from the bus. Call when the owning view is torn down.
    pub fn detach(&self) {
        self.inner.bus.unsubscribe_form(&self.inner.form_id);
    }
}
