//!This is the core library for the pwmthing project. It holds the minimal property contract
//!that device adapters are built against: a named property carrying metadata and an observable
//!value whose external writes are forwarded to whatever drives the hardware.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;

pub mod error;

///Hook invoked with the new value whenever an external writer sets a `PropertyValue`.
pub type ValueForwarder = Box<dyn Fn(f64) + Send + Sync>;

///Holds the current value of a property. External writers call `set`, which runs the installed
///forwarder (if any) before the stored value updates. Observers can `subscribe` to changes.
pub struct PropertyValue {
    current: watch::Sender<f64>,
    forwarder: Mutex<Option<ValueForwarder>>,
}

impl PropertyValue {
    pub fn new(start: f64) -> Self {
        let (current, _) = watch::channel(start);
        PropertyValue {
            current,
            forwarder: Mutex::new(None),
        }
    }

    pub fn get(&self) -> f64 {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.current.subscribe()
    }

    ///Set a new value on behalf of an external writer. The forwarder runs first, the stored
    ///value updates after, whether or not a forwarder is installed.
    pub fn set(&self, value: f64) {
        let forwarder = match self.forwarder.lock() {
            Ok(forwarder) => forwarder,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(forward) = forwarder.as_ref() {
            forward(value);
        }
        drop(forwarder);
        self.current.send_replace(value);
    }

    ///Install the forwarder. Device adapters call this once their hardware is ready to accept
    ///writes; any previously installed forwarder is replaced.
    pub fn set_forwarder(&self, forwarder: ValueForwarder) {
        let mut slot = match self.forwarder.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(forwarder);
    }

    ///Remove the forwarder. Later writes only update the stored value.
    pub fn clear_forwarder(&self) {
        let mut slot = match self.forwarder.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }
}

///Descriptive metadata supplied once when a property is constructed. Immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyMetadata {
    #[serde(rename = "@type")]
    pub type_tag: String,
    pub title: String,
    pub description: String,
    pub minimum: f64,
    pub maximum: f64,
    pub unit: String,
    pub read_only: bool,
}

///A named property: metadata plus a shared observable value.
pub struct Property {
    name: String,
    metadata: PropertyMetadata,
    value: Arc<PropertyValue>,
}

impl Property {
    pub fn new(name: String, metadata: PropertyMetadata, value: Arc<PropertyValue>) -> Self {
        Property {
            name,
            metadata,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &PropertyMetadata {
        &self.metadata
    }

    pub fn value(&self) -> &Arc<PropertyValue> {
        &self.value
    }
}
