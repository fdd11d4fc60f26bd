use crate::model::{DEFAULT_NAMESPACE, Namespace};
use tracing::{debug, warn};

/// New current namespace reported to the owner of a resolver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NamespaceChange {
    pub namespace: Option<String>,
}

/// Result of pointing the resolver at another cluster.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ClusterSwitch {
    /// Generation the caller must attach to the namespace lookup it starts.
    pub fetch: Option<u64>,
    pub change: Option<NamespaceChange>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FetchOutcome {
    Applied { change: Option<NamespaceChange> },
    Stale,
}

/// Namespace picker whose option list cascades from the selected cluster.
///
/// Every lookup is tagged with a generation. Only the result carrying the
/// latest generation may touch the option list or the current selection.
#[derive(Debug, Clone, Default)]
pub struct NamespaceResolver {
    cluster: Option<String>,
    generation: u64,
    loading: bool,
    options: Vec<Namespace>,
    current: Option<Namespace>,
    query: String,
    highlighted: Option<usize>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn options(&self) -> &[Namespace] {
        &self.options
    }

    pub fn current(&self) -> Option<&Namespace> {
        self.current.as_ref()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_ref().map(|namespace| namespace.name.as_str())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn set_cluster(&mut self, cluster: Option<&str>) -> ClusterSwitch {
        let cluster = cluster
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if cluster == self.cluster {
            return ClusterSwitch::default();
        }

        self.generation += 1;
        self.cluster = cluster;
        self.options.clear();
        self.highlighted = None;

        match self.cluster.as_deref() {
            Some(cluster) => {
                self.loading = true;
                debug!(cluster, generation = self.generation, "namespace lookup issued");
                ClusterSwitch {
                    fetch: Some(self.generation),
                    change: None,
                }
            }
            None => {
                self.loading = false;
                ClusterSwitch {
                    fetch: None,
                    change: self.replace_current(None),
                }
            }
        }
    }

    pub fn apply_fetch(
        &mut self,
        generation: u64,
        result: Result<Vec<Namespace>, String>,
    ) -> FetchOutcome {
        if generation != self.generation || self.cluster.is_none() {
            debug!(
                generation,
                active = self.generation,
                "discarding stale namespace lookup"
            );
            return FetchOutcome::Stale;
        }

        self.loading = false;
        self.highlighted = None;
        match result {
            Ok(namespaces) => {
                self.options = namespaces;
                let default = self
                    .options
                    .iter()
                    .find(|namespace| namespace.name == DEFAULT_NAMESPACE)
                    .cloned();
                FetchOutcome::Applied {
                    change: default.and_then(|namespace| self.replace_current(Some(namespace))),
                }
            }
            Err(error) => {
                warn!(
                    cluster = self.cluster.as_deref().unwrap_or_default(),
                    "namespace lookup failed: {error}"
                );
                self.options.clear();
                FetchOutcome::Applied { change: None }
            }
        }
    }

    pub fn select(&mut self, namespace: Namespace) -> Option<NamespaceChange> {
        self.query.clear();
        self.highlighted = None;
        self.replace_current(Some(namespace))
    }

    /// Commits typed text as the namespace without asking the cluster.
    /// Text that names a listed option selects that option instead.
    pub fn select_free_text(&mut self, text: &str) -> Option<NamespaceChange> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let namespace = self
            .options
            .iter()
            .find(|namespace| namespace.name == text)
            .cloned()
            .unwrap_or_else(|| Namespace::free_text(text));
        self.select(namespace)
    }

    pub fn clear_selection(&mut self) -> Option<NamespaceChange> {
        self.query.clear();
        self.highlighted = None;
        self.replace_current(None)
    }

    pub fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.highlighted = None;
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.highlighted = None;
    }

    /// Options matching the typed text, in list order.
    pub fn suggestions(&self) -> Vec<&Namespace> {
        let needle = self.query.trim().to_ascii_lowercase();
        self.options
            .iter()
            .filter(|namespace| {
                needle.is_empty() || namespace.name.to_ascii_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn move_highlight(&mut self, delta: isize) {
        let len = self.suggestions().len();
        if len == 0 {
            self.highlighted = None;
            return;
        }
        let next = match self.highlighted {
            None if delta >= 0 => 0,
            None => len - 1,
            Some(index) => (index as isize + delta).rem_euclid(len as isize) as usize,
        };
        self.highlighted = Some(next);
    }

    /// Commits the highlighted suggestion, or the typed text when nothing is
    /// highlighted.
    pub fn confirm(&mut self) -> Option<NamespaceChange> {
        let highlighted = self
            .highlighted
            .and_then(|index| self.suggestions().get(index).map(|namespace| (*namespace).clone()));
        match highlighted {
            Some(namespace) => self.select(namespace),
            None => {
                let text = self.query.clone();
                self.select_free_text(&text)
            }
        }
    }

    fn replace_current(&mut self, next: Option<Namespace>) -> Option<NamespaceChange> {
        let changed = self.current_name() != next.as_ref().map(|namespace| namespace.name.as_str());
        self.current = next;
        changed.then(|| NamespaceChange {
            namespace: self.current_name().map(str::to_string),
        })
    }
}
