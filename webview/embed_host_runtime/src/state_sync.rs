use serde_json::{Map, Value};

/// Widget state as observed by the host.
pub type Snapshot = Map<String, Value>;

/// Key whose presence marks a snapshot as primed for rendering.
pub const POSTS_KEY: &str = "posts";

pub fn has_posts(snapshot: &Snapshot) -> bool {
    snapshot.contains_key(POSTS_KEY)
}

type Subscriber = Box<dyn FnMut(&Snapshot)>;

/// Single overwritable cell holding the current snapshot.
///
/// Updates are applied in arrival order with no history; every applied update
/// is pushed to all subscribers.
#[derive(Default)]
pub struct StateSync {
    current: Snapshot,
    subscribers: Vec<Subscriber>,
}

impl StateSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&Snapshot) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn replace(&mut self, snapshot: Snapshot) {
        self.current = snapshot;
        for subscriber in &mut self.subscribers {
            subscriber(&self.current);
        }
    }

    pub fn patch(&mut self, partial: Snapshot) {
        let merged = merge_shallow(&self.current, partial);
        self.replace(merged);
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }
}

impl std::fmt::Debug for StateSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSync")
            .field("current", &self.current)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Top-level key-wise override; nested values are replaced wholesale.
pub fn merge_shallow(current: &Snapshot, partial: Snapshot) -> Snapshot {
    let mut merged = current.clone();
    for (key, value) in partial {
        merged.insert(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn snapshot(value: Value) -> Snapshot {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn starts_empty() {
        assert!(StateSync::new().current().is_empty());
    }

    #[test]
    fn patch_overrides_and_preserves_keys() {
        let mut sync = StateSync::new();
        sync.replace(snapshot(json!({"a": 0, "b": 2})));
        sync.patch(snapshot(json!({"a": 1})));
        assert_eq!(sync.current(), &snapshot(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn replace_discards_previous_keys() {
        let mut sync = StateSync::new();
        sync.replace(snapshot(json!({"a": 0, "b": 2})));
        sync.replace(snapshot(json!({"a": 1})));
        assert_eq!(sync.current(), &snapshot(json!({"a": 1})));
    }

    #[test]
    fn nested_objects_are_not_deep_merged() {
        let mut sync = StateSync::new();
        sync.replace(snapshot(json!({"ui": {"badge": 3, "open": false}})));
        sync.patch(snapshot(json!({"ui": {"open": true}})));
        assert_eq!(sync.current()["ui"], json!({"open": true}));
    }

    #[test]
    fn subscribers_see_the_merged_snapshot() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut sync = StateSync::new();
        sync.subscribe(move |state| sink.borrow_mut().push(state.clone()));

        sync.replace(snapshot(json!({"posts": [], "unread": 0})));
        sync.patch(snapshot(json!({"unread": 4})));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], snapshot(json!({"posts": [], "unread": 4})));
    }

    #[test]
    fn posts_presence_is_the_render_gate() {
        assert!(!has_posts(&snapshot(json!({}))));
        assert!(has_posts(&snapshot(json!({"posts": []}))));
    }
}
