//! Scripted collaborators for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::document::DocumentKind;
use crate::error::{PayError, Result};
use crate::host::{FormHost, Indicator};
use crate::remote::RemoteMethods;
use crate::store::{DocumentStore, MemoryDocumentStore};

/// Remote that answers every call the same way and records the calls
pub struct ScriptedRemote {
    reply: std::result::Result<Option<Value>, String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedRemote {
    pub fn new(reply: Option<Value>) -> Self {
        Self { reply: Ok(reply), calls: Mutex::new(Vec::new()) }
    }

    pub fn reply(message: Value) -> Self {
        Self::new(Some(message))
    }

    pub fn fail(reason: &str) -> Self {
        Self { reply: Err(reason.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteMethods for ScriptedRemote {
    async fn call(&self, method: &str, args: Value) -> Result<Option<Value>> {
        self.calls.lock().unwrap().push((method.to_string(), args));
        self.reply.clone().map_err(PayError::Transport)
    }
}

/// Memory store that counts writes
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDocumentStore,
    puts: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, kind: DocumentKind, name: &str) -> Result<Option<Value>> {
        self.inner.get(kind, name).await
    }

    async fn put(&self, kind: DocumentKind, name: &str, doc: Value) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(kind, name, doc).await
    }

    async fn find(&self, kind: DocumentKind, field: &str, value: &str) -> Result<Vec<String>> {
        self.inner.find(kind, field, value).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    Alert(String, Indicator),
    Message(String),
    Open(String),
    Reload(String, String),
}

/// Host that records every side effect in order
#[derive(Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::Open(_)))
    }

    pub fn reloads(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::Reload(..)))
    }

    pub fn negative_alerts(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::Alert(_, indicator) if indicator.is_negative()))
    }

    fn count(&self, pred: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl FormHost for RecordingHost {
    fn show_alert(&self, message: &str, indicator: Indicator) {
        self.push(HostEvent::Alert(message.to_string(), indicator));
    }

    fn msgprint(&self, message: &str) {
        self.push(HostEvent::Message(message.to_string()));
    }

    fn open_window(&self, url: &str) {
        self.push(HostEvent::Open(url.to_string()));
    }

    fn reload_doc(&self, doctype: &str, name: &str) {
        self.push(HostEvent::Reload(doctype.to_string(), name.to_string()));
    }
}
