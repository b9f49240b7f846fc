//! Fakes shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    errors::Error, fetch::RemoteSource, messaging::port::NotificationSink, Result,
};

/// Ordered record of side effects across fakes.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub(crate) fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count_prefix(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

pub(crate) struct RecordingSink {
    label: &'static str,
    log: EventLog,
    fail: AtomicBool,
}

impl RecordingSink {
    pub(crate) fn new(label: &'static str, log: EventLog) -> Self {
        Self {
            label,
            log,
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            self.log.push(format!("{}-failed:{text}", self.label));
            return Err(Error::Notification(format!("{} unavailable", self.label)));
        }
        self.log.push(format!("{}:{text}", self.label));
        Ok(())
    }
}

/// Returns scripted results in order; the last entry repeats once the script runs out.
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<std::result::Result<Vec<u8>, String>>>,
    last: Mutex<Option<std::result::Result<Vec<u8>, String>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<std::result::Result<Vec<u8>, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn always_failing(cause: &str) -> Self {
        Self::new(vec![Err(cause.to_string())])
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    async fn get(&self, _url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(r.clone());
                r
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("empty script".to_string())),
        };
        result.map_err(Error::External)
    }
}

/// Serves bodies per URL, logging `get:<url>` for every request.
pub(crate) struct RoutedSource {
    routes: Mutex<HashMap<String, Vec<u8>>>,
    log: EventLog,
    latency: Duration,
}

impl RoutedSource {
    pub(crate) fn new(log: EventLog) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            log,
            latency: Duration::ZERO,
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }

    pub(crate) fn remove(&self, url: &str) {
        self.routes.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl RemoteSource for RoutedSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.log.push(format!("get:{url}"));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::External("unexpected status 404 Not Found".to_string()))
    }
}
