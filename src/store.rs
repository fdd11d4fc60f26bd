use crate::model::Application;
use std::cell::RefCell;
use std::rc::Rc;

/// Receiver of applications created by a successful deployment.
pub trait ApplicationSink {
    fn append(&self, application: Application);
}

/// Shared, append-only list of applications owned by the page.
///
/// Clones share the same list, so the page can keep reading it while a
/// deploy dialog holds a handle for appending.
#[derive(Debug, Clone, Default)]
pub struct ApplicationStore {
    items: Rc<RefCell<Vec<Application>>>,
}

impl ApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, items: Vec<Application>) {
        *self.items.borrow_mut() = items;
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Application> {
        self.items.borrow().clone()
    }
}

impl ApplicationSink for ApplicationStore {
    fn append(&self, application: Application) {
        self.items.borrow_mut().push(application);
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationSink, ApplicationStore};
    use crate::model::Application;
    use std::collections::BTreeMap;

    fn application(name: &str) -> Application {
        Application {
            name: name.to_string(),
            context_name: "kind".to_string(),
            namespace: "default".to_string(),
            status: "running".to_string(),
            template_id: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn clones_share_appends() {
        let store = ApplicationStore::new();
        store.replace(vec![application("a")]);
        let handle = store.clone();

        handle.append(application("b"));

        let names = store
            .snapshot()
            .into_iter()
            .map(|application| application.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn replace_swaps_contents() {
        let store = ApplicationStore::new();
        assert!(store.is_empty());

        store.replace(vec![application("a"), application("b")]);

        assert_eq!(store.len(), 2);
    }
}
