//! Names for sum-of-angle variables.
//!
//! Only adjacent joints share a compound symbol. A pair with no entry in the
//! table cannot be compounded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundEntry {
    pub first: String,
    pub second: String,
    pub name: String,
}

/// Lookup table from a joint pair to its compound symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundTable {
    entries: Vec<CompoundEntry>,
}

impl CompoundTable {
    pub fn new(entries: Vec<CompoundEntry>) -> Self {
        Self { entries }
    }

    /// One entry per consecutive pair of `symbols`, in chain order.
    pub fn adjacent<S: AsRef<str>>(symbols: &[S]) -> Self {
        let entries = symbols
            .windows(2)
            .map(|pair| {
                let (a, b) = (pair[0].as_ref(), pair[1].as_ref());
                CompoundEntry {
                    first: a.to_string(),
                    second: b.to_string(),
                    name: compound_name(a, b),
                }
            })
            .collect();
        Self { entries }
    }

    /// Compound symbol for the unordered pair `{a, b}`.
    pub fn lookup(&self, a: &str, b: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| (e.first == a && e.second == b) || (e.first == b && e.second == a))
            .map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[CompoundEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `th_1` + `th_2` -> `th_12`; symbols without a common stem are joined.
fn compound_name(a: &str, b: &str) -> String {
    match (a.rsplit_once('_'), b.rsplit_once('_')) {
        (Some((stem_a, idx_a)), Some((stem_b, idx_b))) if stem_a == stem_b => {
            format!("{}_{}{}", stem_a, idx_a, idx_b)
        }
        _ => format!("{}_{}", a, b),
    }
}
