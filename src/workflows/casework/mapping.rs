use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Translates extended (operational) stage codes into the simplified codes the
/// public progress board understands.
///
/// The forward direction is total: a code the mapping never heard of resolves
/// to the first visual stage. That fallback exists for display compatibility
/// only — it used to make every unmapped case look "not started", so it is
/// logged loudly instead of applied in silence. State-mutating paths never go
/// through this type; the catalogs stay authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMap {
    forward: BTreeMap<String, String>,
    representative: BTreeMap<String, String>,
    fallback: String,
}

impl StageMap {
    /// Builds the mapping from `(extended, simplified)` pairs.
    ///
    /// The first extended code seen for each simplified target becomes that
    /// target's representative for [`StageMap::to_extended_representative`].
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>, fallback: String) -> Self {
        let mut forward = BTreeMap::new();
        let mut representative = BTreeMap::new();

        for (extended, simplified) in pairs {
            representative
                .entry(simplified.clone())
                .or_insert_with(|| extended.clone());
            forward.insert(extended, simplified);
        }

        Self {
            forward,
            representative,
            fallback,
        }
    }

    /// Resolves an extended code to its simplified counterpart. Total.
    pub fn to_simplified<'a>(&'a self, extended: &str) -> &'a str {
        match self.forward.get(extended) {
            Some(simplified) => simplified,
            None => {
                warn!(
                    stage = extended,
                    fallback = %self.fallback,
                    "stage code missing from display mapping; falling back to the first visual stage"
                );
                &self.fallback
            }
        }
    }

    /// Best-effort inverse used only for optional synchronization.
    ///
    /// The forward mapping is many-to-one, so this picks one representative
    /// extended code per simplified code and is never authoritative.
    pub fn to_extended_representative<'a>(&'a self, simplified: &str) -> Option<&'a str> {
        self.representative.get(simplified).map(String::as_str)
    }

    /// Extended codes the mapping covers, in code order.
    pub fn extended_codes(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(String::as_str)
    }
}
