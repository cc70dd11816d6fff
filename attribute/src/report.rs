//! Report what happened while recovering an attribute.
//!
//! Reporting never influences recovery: a [Reporter] receives each [Event] and returns nothing.
//! [Traced] forwards events to `tracing`.

use crate::descriptor::Descriptor;
use std::time::Duration;
use tracing::{info, warn};

/// Something notable that happened during recovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The persisted attribute was created after the current serial number.
    TooNew {
        file: String,
        created: u64,
        current: u64,
    },

    /// The persisted attribute has a descriptor that is not accepted.
    WrongType {
        file: String,
        expected: Descriptor,
        actual: Descriptor,
    },

    /// The persisted attribute was discarded in favor of an empty one.
    ReturningEmpty { file: String },

    /// Loading of persisted data started.
    LoadStarted { sub_db: String, attribute: String },

    /// Loading of persisted data completed.
    LoadCompleted {
        sub_db: String,
        attribute: String,
        elapsed: Duration,
    },

    /// Persisted data that passed all checks could not be loaded.
    LoadFailed { file: String, reason: String },
}

/// Receives [Event]s.
pub trait Reporter {
    fn report(&self, event: Event);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, event: Event) {
        (**self).report(event)
    }
}

/// A [Reporter] that emits every [Event] with `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Traced;

impl Reporter for Traced {
    fn report(&self, event: Event) {
        match event {
            Event::TooNew {
                file,
                created,
                current,
            } => {
                info!(%file, created, current, "attribute is too new");
            }
            Event::WrongType {
                file,
                expected,
                actual,
            } => {
                info!(%file, %expected, %actual, "attribute is of wrong type");
            }
            Event::ReturningEmpty { file } => {
                info!(%file, "returning empty attribute");
            }
            Event::LoadStarted { sub_db, attribute } => {
                info!(%sub_db, %attribute, "loading attribute");
            }
            Event::LoadCompleted {
                sub_db,
                attribute,
                elapsed,
            } => {
                info!(%sub_db, %attribute, ?elapsed, "loaded attribute");
            }
            Event::LoadFailed { file, reason } => {
                warn!(%file, %reason, "could not load attribute");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BasicType, CollectionType};
    use std::{
        collections::BTreeMap,
        fmt,
        sync::{Arc, Mutex},
    };
    use tracing::{
        field::{Field, Visit},
        Level, Subscriber,
    };
    use tracing_subscriber::{
        layer::{Context, SubscriberExt},
        Layer,
    };

    // Fields of one emitted event, rendered as text.
    type Fields = BTreeMap<String, String>;

    #[derive(Default)]
    struct Visitor(Fields);

    impl Visit for Visitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    // Keeps every event emitted while installed.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, Fields)>>>);

    impl<S: Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &tracing::Event<'_>, _: Context<'_, S>) {
            let mut visitor = Visitor::default();
            event.record(&mut visitor);
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), visitor.0));
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_traced_emits_structured_events() {
        let file = "snapshot-50/price".to_string();
        let events = vec![
            Event::TooNew {
                file: file.clone(),
                created: 120,
                current: 100,
            },
            Event::WrongType {
                file: file.clone(),
                expected: Descriptor::new(BasicType::Int32, CollectionType::Single),
                actual: Descriptor::new(BasicType::String, CollectionType::Array),
            },
            Event::ReturningEmpty { file: file.clone() },
            Event::LoadStarted {
                sub_db: "ready".to_string(),
                attribute: "price".to_string(),
            },
            Event::LoadCompleted {
                sub_db: "ready".to_string(),
                attribute: "price".to_string(),
                elapsed: Duration::from_millis(12),
            },
            Event::LoadFailed {
                file,
                reason: "corrupt".to_string(),
            },
        ];

        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        tracing::subscriber::with_default(subscriber, || {
            for event in events {
                Traced.report(event);
            }
        });

        let captured = captured.0.lock().unwrap().clone();
        assert_eq!(
            captured,
            vec![
                (
                    Level::INFO,
                    fields(&[
                        ("message", "attribute is too new"),
                        ("file", "snapshot-50/price"),
                        ("created", "120"),
                        ("current", "100"),
                    ])
                ),
                (
                    Level::INFO,
                    fields(&[
                        ("message", "attribute is of wrong type"),
                        ("file", "snapshot-50/price"),
                        ("expected", "int32/single/"),
                        ("actual", "string/array/"),
                    ])
                ),
                (
                    Level::INFO,
                    fields(&[
                        ("message", "returning empty attribute"),
                        ("file", "snapshot-50/price"),
                    ])
                ),
                (
                    Level::INFO,
                    fields(&[
                        ("message", "loading attribute"),
                        ("sub_db", "ready"),
                        ("attribute", "price"),
                    ])
                ),
                (
                    Level::INFO,
                    fields(&[
                        ("message", "loaded attribute"),
                        ("sub_db", "ready"),
                        ("attribute", "price"),
                        ("elapsed", "12ms"),
                    ])
                ),
                (
                    Level::WARN,
                    fields(&[
                        ("message", "could not load attribute"),
                        ("file", "snapshot-50/price"),
                        ("reason", "corrupt"),
                    ])
                ),
            ]
        );
    }
}
