#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use siaka_bot::{
    AuthError, FetchError, MemoryStore, Orchestrator, Portal, Reply, Store, StoreError,
    session::{Cookie, Credentials, SessionCookies, UserId},
};
use tokio::sync::mpsc;

pub const PAYMENT_PAGE: &str = r#"<html><body><div>
    <table class="table-common">
      <tr><th>No</th><th>Semester</th><th>Tanggal Bayar</th><th>BPP</th></tr>
      <tr><td>1</td><td>2023/1</td><td>2023-09-01</td><td>1500000</td></tr>
    </table>
    </div></body></html>"#;

pub const SCHEDULE_PAGE: &str = r#"<table class="table-common">
    <tr><td>1</td><td>Basis Data</td><td>A</td><td>Senin</td><td>08:00</td><td>R.101</td><td>Dr. Budi</td></tr>
    </table>"#;

pub const LECTURER_PAGE: &str = r#"<table><tbody>
    <tr><td>0901</td><td>Andi</td><td>TI</td><td>0812-3456</td></tr>
    <tr><td>0902</td><td>Rina</td><td>SI</td><td></td></tr>
    </tbody></table>"#;

/// Portal double that serves canned pages and counts fetches.
pub struct FakePortal {
    pub accept_login: bool,
    pub pages: HashMap<String, String>,
    pub fetches: AtomicUsize,
    pub logins: AtomicUsize,
}

impl FakePortal {
    pub fn new() -> Self {
        let pages = [("vbpp", PAYMENT_PAGE), ("kelas", SCHEDULE_PAGE), ("vdosen", LECTURER_PAGE)]
            .into_iter()
            .map(|(page, html)| (format!("http://portal.test/?page={page}"), html.to_string()))
            .collect();
        Self {
            accept_login: true,
            pages,
            fetches: AtomicUsize::new(0),
            logins: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept_login: false,
            ..Self::new()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Portal for FakePortal {
    fn page_url(&self, page: &str) -> String {
        format!("http://portal.test/?page={page}")
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<SessionCookies, AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.accept_login {
            Ok(session_cookies())
        } else {
            Err(AuthError::Rejected)
        }
    }

    async fn fetch_page(&self, url: &str, cookies: &SessionCookies) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        assert!(!cookies.is_empty(), "fetch without session cookies");
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Unparseable(format!("no page at {url}")))
    }
}

/// Memory store that records writes and can be switched off.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub writes: Mutex<Vec<(String, Duration)>>,
    pub down: AtomicBool,
}

impl RecordingStore {
    pub fn writes(&self) -> Vec<(String, Duration)> {
        self.writes.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check()?;
        self.writes.lock().unwrap().push((key.to_string(), ttl));
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(key).await
    }
}

pub fn session_cookies() -> SessionCookies {
    SessionCookies(vec![Cookie {
        path: Some("/".to_string()),
        ..Cookie::new("PHPSESSID", "abc123")
    }])
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub portal: Arc<FakePortal>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(portal: FakePortal) -> Self {
        let store = Arc::new(RecordingStore::default());
        let portal = Arc::new(portal);
        let orchestrator = Orchestrator::new(store.clone(), portal.clone());
        Self {
            store,
            portal,
            orchestrator,
        }
    }

    pub async fn login(&self, user: UserId) {
        let raw = session_cookies().to_json().unwrap();
        self.store
            .inner
            .set(&user.session_key(), &raw, Duration::from_secs(2400))
            .await
            .unwrap();
    }

    pub async fn send(&self, user: UserId, text: &str) -> Vec<Reply> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.orchestrator.handle(user, text, &tx).await;
        drop(tx);
        let mut replies = Vec::new();
        while let Some(reply) = rx.recv().await {
            replies.push(reply);
        }
        replies
    }
}

pub fn text(reply: &str) -> Reply {
    Reply::Text(reply.to_string())
}
