//! Audit log of decisions taken while editing a taxonomy.
//!
//! Every event is tallied by kind. Full [Event] records are kept only for
//! interesting events: those with a verdict other than
//! [Verdict::NoInformation], those about a taxon on the name allow-list, and
//! those affecting a subtree of at least [Interest::min_size] taxa.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Predicates deciding which events are kept in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interest {
    /// Taxon names whose events are always kept.
    pub names: HashSet<String>,
    /// Events touching at least this many taxa are kept.
    pub min_size: usize,
}

impl Default for Interest {
    fn default() -> Self {
        Interest {
            names: HashSet::new(),
            min_size: usize::MAX,
        }
    }
}

impl Interest {
    /// Whether an event about `name` touching `size` taxa is interesting.
    pub fn matches(&self, name: Option<&str>, size: usize) -> bool {
        size >= self.min_size || name.is_some_and(|n| self.names.contains(n))
    }
}

/// How much an event tells about the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Routine bookkeeping (e.g. each pruned descendant).
    NoInformation,
    /// A decision worth reviewing.
    Interesting,
    /// Something looks wrong with the data.
    Warning,
}

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub name: Option<String>,
    pub id: Option<String>,
    pub size: usize,
    pub verdict: Verdict,
    pub detail: String,
}

/// Tallies and interesting events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    interest: Interest,
    tallies: BTreeMap<String, usize>,
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log with the given interest predicates.
    pub fn new(interest: Interest) -> Self {
        EventLog {
            interest,
            tallies: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn interest(&self) -> &Interest {
        &self.interest
    }

    /// Records an event, returning whether it was kept in full.
    pub fn record(&mut self, event: Event) -> bool {
        *self.tallies.entry(event.kind.clone()).or_insert(0) += 1;

        let keep = event.verdict != Verdict::NoInformation
            || self.interest.matches(event.name.as_deref(), event.size);
        if keep {
            tracing::debug!(
                kind = %event.kind,
                name = ?event.name,
                id = ?event.id,
                size = event.size,
                verdict = ?event.verdict,
                "{}", event.detail
            );
            self.events.push(event);
        }
        keep
    }

    /// Number of events recorded for `kind`.
    pub fn tally(&self, kind: &str) -> usize {
        self.tallies.get(kind).copied().unwrap_or(0)
    }

    /// All tallies, ordered by kind.
    pub fn tallies(&self) -> &BTreeMap<String, usize> {
        &self.tallies
    }

    /// Events kept in full, in recording order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Kept events of one kind.
    pub fn events_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// One line per kind: `kind: count`.
    pub fn summary(&self) -> String {
        self.tallies
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, name: &str, size: usize, verdict: Verdict) -> Event {
        Event {
            kind: kind.to_string(),
            name: Some(name.to_string()),
            id: None,
            size,
            verdict,
            detail: String::new(),
        }
    }

    #[test]
    fn keeps_only_interesting_events() {
        let mut interest = Interest::default();
        interest.names.insert("Homo".to_string());
        interest.min_size = 100;
        let mut log = EventLog::new(interest);

        assert!(!log.record(event("prune", "Pan", 1, Verdict::NoInformation)));
        assert!(log.record(event("prune", "Homo", 1, Verdict::NoInformation)));
        assert!(log.record(event("prune", "Big", 100, Verdict::NoInformation)));
        assert!(log.record(event("collision", "Pan", 1, Verdict::Warning)));

        assert_eq!(log.tally("prune"), 3);
        assert_eq!(log.events().len(), 3);
        assert_eq!(log.events_of("prune").count(), 2);
        assert_eq!(log.summary(), "collision: 1\nprune: 3");
    }
}
