//! Session Store
//!
//! Owns the encrypted persistence of the one session per site identity.
//! Every persisted record is sealed with the per-install standard key;
//! the caller can layer biometric encryption on top, after which the
//! in-memory session is absent ("locked") until a hardware-gated decrypt
//! hands the plaintext back.
//!
//! Concurrency: one `tokio::sync::Mutex` serializes all state access, so
//! mutations never interleave. The expiration task is one-shot, carries
//! the generation it was scheduled for, and loses any race against a
//! newer write (last-writer-wins on clear).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use zeroize::Zeroize;

use platform::cipher::StandardCipher;
use platform::crypto;
use platform::storage::SecureStorage;

use crate::domain::session::{Session, SessionRecord, SessionSecurityLevel};
use crate::error::{CoreError, CoreResult};

/// Session lifecycle signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session's absolute expiry passed; state has been cleared
    Expired,
}

struct StoreState {
    /// Decrypted session, absent when cleared or biometric-locked
    session: Option<Session>,
    /// Biometric record present but not yet unlocked
    locked: bool,
    /// Bumped on every mutation; stale expiry tasks compare against it
    generation: u64,
    expiry_task: Option<JoinHandle<()>>,
}

struct StoreInner {
    storage: Arc<dyn SecureStorage>,
    record_key: String,
    cipher_key_key: String,
    state: Mutex<StoreState>,
    events: broadcast::Sender<SessionEvent>,
}

/// Encrypted, expiring session persistence for one site identity
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store keyed by the site API key
    pub fn new(storage: Arc<dyn SecureStorage>, api_key: &str) -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            inner: Arc::new(StoreInner {
                storage,
                record_key: format!("{api_key}.session"),
                cipher_key_key: format!("{api_key}.session_key"),
                state: Mutex::new(StoreState {
                    session: None,
                    locked: false,
                    generation: 0,
                    expiry_task: None,
                }),
                events,
            }),
        }
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Encrypt with the standard key, persist, and (re)schedule expiry
    pub async fn set_session(&self, session: Session) -> CoreResult<()> {
        let mut state = self.inner.state.lock().await;

        let cipher = self.standard_cipher()?;
        let sealed = cipher.seal(&serde_json::to_vec(&session)?)?;
        let expires_at_ms = session
            .expires()
            .then(|| Utc::now().timestamp_millis() + session.expiration * 1000);

        let record = SessionRecord {
            ciphertext: crypto::to_base64(&sealed),
            level: SessionSecurityLevel::Standard,
            iv: None,
            expires_at_ms,
        };
        self.persist(&record)?;

        state.session = Some(session);
        state.locked = false;
        state.generation += 1;
        self.reschedule(&mut state, expires_at_ms);

        tracing::debug!(expires = expires_at_ms.is_some(), "session secured");
        Ok(())
    }

    /// Current session, `None` when absent, expired, or biometric-locked.
    /// Decrypt failures degrade to `None`, never raise.
    pub async fn get_session(&self) -> Option<Session> {
        let mut state = self.inner.state.lock().await;

        if !state.locked {
            if let Some(session) = &state.session {
                return Some(session.clone());
            }
        }

        // Cold start: rebuild in-memory state from the persisted record
        let record = self.load()?;
        if self.purge_if_expired(&record) {
            state.session = None;
            state.locked = false;
            return None;
        }

        match record.level {
            SessionSecurityLevel::Biometric => {
                state.locked = true;
                None
            }
            SessionSecurityLevel::Standard => {
                let session = self.decrypt_standard(&record)?;
                state.session = Some(session.clone());
                state.locked = false;
                state.generation += 1;
                self.reschedule(&mut state, record.expires_at_ms);
                Some(session)
            }
        }
    }

    /// Quick presence check without decrypting
    pub async fn available_session(&self) -> bool {
        let state = self.inner.state.lock().await;
        if state.session.is_some() && !state.locked {
            return true;
        }
        match self.load() {
            Some(record) => !record
                .expires_at_ms
                .is_some_and(|at| at <= Utc::now().timestamp_millis()),
            None => false,
        }
    }

    /// Drop the in-memory session; with `invalidate` also purge the
    /// persisted record and cancel the expiry task. Safe to repeat.
    pub async fn clear_session(&self, invalidate: bool) -> CoreResult<()> {
        let mut state = self.inner.state.lock().await;
        state.session = None;
        state.locked = false;
        state.generation += 1;
        if let Some(task) = state.expiry_task.take() {
            task.abort();
        }
        if invalidate {
            self.inner.storage.remove(&self.inner.record_key)?;
        }
        tracing::debug!(invalidate, "session cleared");
        Ok(())
    }

    /// Layer biometric encryption atop the already-persisted record.
    /// `ciphertext`/`iv` come from the host's biometric encrypt cipher
    /// applied to the session plaintext.
    pub async fn secure_biometric_session(&self, ciphertext: &[u8], iv: &[u8]) -> CoreResult<()> {
        let _state = self.inner.state.lock().await;
        let existing = self.load().ok_or(CoreError::NoSession)?;
        let record = SessionRecord {
            ciphertext: crypto::to_base64(ciphertext),
            level: SessionSecurityLevel::Biometric,
            iv: Some(crypto::to_base64(iv)),
            expires_at_ms: existing.expires_at_ms,
        };
        self.persist(&record)?;
        tracing::info!("session biometric layer applied");
        Ok(())
    }

    /// Install the plaintext produced by a successful biometric decrypt
    pub async fn unlock_biometric_session(&self, plaintext: &[u8]) -> CoreResult<()> {
        let mut state = self.inner.state.lock().await;
        let session: Session = serde_json::from_slice(plaintext)?;
        let expires_at_ms = self.load().and_then(|record| record.expires_at_ms);
        state.session = Some(session);
        state.locked = false;
        state.generation += 1;
        self.reschedule(&mut state, expires_at_ms);
        tracing::info!("biometric session unlocked");
        Ok(())
    }

    /// Opt out of biometric protection: strip the layer and re-persist
    /// under the standard key. The hardware key material is abandoned.
    pub async fn opt_out_biometric_session(&self, plaintext: &[u8]) -> CoreResult<()> {
        let mut state = self.inner.state.lock().await;
        let session: Session = serde_json::from_slice(plaintext)?;

        let cipher = self.standard_cipher()?;
        let sealed = cipher.seal(plaintext)?;
        let record = SessionRecord {
            ciphertext: crypto::to_base64(&sealed),
            level: SessionSecurityLevel::Standard,
            iv: None,
            expires_at_ms: self.load().and_then(|record| record.expires_at_ms),
        };
        self.persist(&record)?;

        let expires_at_ms = record.expires_at_ms;
        state.session = Some(session);
        state.locked = false;
        state.generation += 1;
        self.reschedule(&mut state, expires_at_ms);
        tracing::info!("session biometric layer removed");
        Ok(())
    }

    /// Encryption level of the persisted record
    pub async fn security_level(&self) -> SessionSecurityLevel {
        let _state = self.inner.state.lock().await;
        self.load()
            .map(|record| record.level)
            .unwrap_or(SessionSecurityLevel::Standard)
    }

    /// Whether a biometric record exists whose plaintext is not in memory
    pub async fn biometric_locked(&self) -> bool {
        let state = self.inner.state.lock().await;
        if state.session.is_some() && !state.locked {
            return false;
        }
        self.load()
            .is_some_and(|record| record.level == SessionSecurityLevel::Biometric)
    }

    fn persist(&self, record: &SessionRecord) -> CoreResult<()> {
        let json = serde_json::to_string(record)?;
        self.inner.storage.put(&self.inner.record_key, &json)?;
        Ok(())
    }

    /// Load the persisted record; unreadable records are dropped
    fn load(&self) -> Option<SessionRecord> {
        let raw = self.inner.storage.get(&self.inner.record_key).ok()??;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(%error, "dropping unreadable session record");
                let _ = self.inner.storage.remove(&self.inner.record_key);
                None
            }
        }
    }

    fn purge_if_expired(&self, record: &SessionRecord) -> bool {
        let expired = record
            .expires_at_ms
            .is_some_and(|at| at <= Utc::now().timestamp_millis());
        if expired {
            let _ = self.inner.storage.remove(&self.inner.record_key);
            tracing::info!("purged expired session record");
        }
        expired
    }

    fn decrypt_standard(&self, record: &SessionRecord) -> Option<Session> {
        let open = || -> CoreResult<Session> {
            let sealed = crypto::from_base64(&record.ciphertext)
                .map_err(|_| CoreError::Internal("session record is not base64".to_string()))?;
            let plaintext = self.standard_cipher()?.open(&sealed)?;
            Ok(serde_json::from_slice(&plaintext)?)
        };
        match open() {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::warn!(%error, "session decrypt failed, degrading to no session");
                None
            }
        }
    }

    /// Load or create the per-install standard key
    fn standard_cipher(&self) -> CoreResult<StandardCipher> {
        let mut key = match self.inner.storage.get(&self.inner.cipher_key_key)? {
            Some(encoded) => crypto::from_base64(&encoded)
                .map_err(|_| CoreError::Internal("corrupt session key".to_string()))?,
            None => {
                let key = crypto::random_bytes(StandardCipher::KEY_LEN);
                self.inner
                    .storage
                    .put(&self.inner.cipher_key_key, &crypto::to_base64(&key))?;
                key
            }
        };
        let cipher = StandardCipher::new(&key);
        key.zeroize();
        Ok(cipher?)
    }

    /// Replace the one-shot expiry task. The task captures the current
    /// generation; by the time it fires, a newer write wins.
    fn reschedule(&self, state: &mut StoreState, expires_at_ms: Option<i64>) {
        if let Some(task) = state.expiry_task.take() {
            task.abort();
        }
        let Some(deadline) = expires_at_ms else {
            return;
        };

        let delay_ms = (deadline - Utc::now().timestamp_millis()).max(0) as u64;
        let inner = Arc::clone(&self.inner);
        let generation = state.generation;
        state.expiry_task = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            let mut state = inner.state.lock().await;
            if state.generation != generation {
                return;
            }
            state.session = None;
            state.locked = false;
            let _ = inner.storage.remove(&inner.record_key);
            let _ = inner.events.send(SessionEvent::Expired);
            tracing::info!("session expired");
        }));
    }
}
