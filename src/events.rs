//! Change notifications
//!
//! Components queue semantic [`ChangeEvent`]s as they mutate; the caller
//! drains the queue with the owning component's `take_events` and rebuilds
//! whatever display it keeps. The engine is single-threaded, so a polled
//! queue replaces listener registration.

/// A semantic change notification with enough payload to rebuild a display.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A function or parameter definition changed (added, removed, renamed,
    /// or its expression replaced). `old`/`new` carry the affected name.
    Function {
        old: Option<String>,
        new: Option<String>,
    },

    /// A single parameter value was edited.
    Edit { name: String, old: f64, new: f64 },

    /// A fit pass completed (any outcome).
    Fit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payloads() {
        let e = ChangeEvent::Edit {
            name: "a".to_string(),
            old: 1.0,
            new: 2.0,
        };
        match e {
            ChangeEvent::Edit { name, old, new } => {
                assert_eq!(name, "a");
                assert_eq!(old, 1.0);
                assert_eq!(new, 2.0);
            }
            _ => panic!("Expected Edit"),
        }
    }
}
