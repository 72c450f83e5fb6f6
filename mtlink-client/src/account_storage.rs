//! Account credential storage.
//!
//! [`AccountStorage`] holds the long-lived tuple a connection needs to skip
//! the handshake on reconnect: the auth key, its id, the server clock
//! offset and the DC the key belongs to. Two backends exist, chosen at
//! construction:
//! * [`StorageBackend::InMemory`]: nothing is persisted; `sync` only notifies.
//! * [`StorageBackend::File`]: `sync` writes the binary file described below.
//!
//! File layout (all integers little-endian, `bytes` = `u32` length + data):
//!
//! ```text
//! "TelegramQt"  10-byte magic
//! i32           delta time
//! u32           dc id
//! bytes         dc address (Latin-1)
//! u16           dc port
//! bytes         auth key
//! u64           auth id
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use mtlink_tl::Cursor;
use tokio::sync::broadcast;

use crate::dc::DcOption;
use crate::errors::StorageError;

const MAGIC_LEN: usize = 10;
const MAGIC: &[u8; MAGIC_LEN] = b"TelegramQt";

/// Where credentials live.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum StorageBackend {
    #[default]
    InMemory,
    File { file_name: Option<PathBuf> },
}

/// Notifications raised by [`AccountStorage`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StorageEvent {
    Synced,
    FileNameChanged(PathBuf),
}

pub struct AccountStorage {
    backend:            StorageBackend,
    account_identifier: String,
    phone_number:       String,
    auth_key:           Vec<u8>,
    auth_id:            u64,
    delta_time:         i32,
    dc_info:            DcOption,
    events:             broadcast::Sender<StorageEvent>,
}

impl AccountStorage {
    pub fn new(backend: StorageBackend) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            backend,
            account_identifier: String::new(),
            phone_number:       String::new(),
            auth_key:           Vec::new(),
            auth_id:            0,
            delta_time:         0,
            dc_info:            DcOption::default(),
            events,
        }
    }

    pub fn in_memory() -> Self { Self::new(StorageBackend::InMemory) }

    pub fn file(file_name: impl Into<PathBuf>) -> Self {
        Self::new(StorageBackend::File { file_name: Some(file_name.into()) })
    }

    pub fn backend(&self) -> &StorageBackend { &self.backend }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    /// `true` once a DC address and an auth key are both known.
    pub fn has_minimal_data_set(&self) -> bool {
        !self.dc_info.address.is_empty() && !self.auth_key.is_empty()
    }

    pub fn account_identifier(&self) -> &str { &self.account_identifier }
    pub fn set_account_identifier(&mut self, account: impl Into<String>) {
        self.account_identifier = account.into();
    }

    pub fn phone_number(&self) -> &str { &self.phone_number }
    pub fn set_phone_number(&mut self, phone_number: impl Into<String>) {
        self.phone_number = phone_number.into();
    }

    pub fn auth_key(&self) -> &[u8] { &self.auth_key }
    pub fn set_auth_key(&mut self, auth_key: Vec<u8>) { self.auth_key = auth_key; }

    pub fn auth_id(&self) -> u64 { self.auth_id }
    pub fn set_auth_id(&mut self, auth_id: u64) { self.auth_id = auth_id; }

    pub fn delta_time(&self) -> i32 { self.delta_time }
    pub fn set_delta_time(&mut self, delta_time: i32) { self.delta_time = delta_time; }

    pub fn dc_info(&self) -> &DcOption { &self.dc_info }
    pub fn set_dc_info(&mut self, dc_info: DcOption) { self.dc_info = dc_info; }

    /// Forget the credential tuple (e.g. on sign-out). Identity fields stay.
    pub fn clear(&mut self) {
        self.auth_key.clear();
        self.auth_id = 0;
        self.delta_time = 0;
        self.dc_info = DcOption::default();
    }

    pub fn file_name(&self) -> Option<&Path> {
        match &self.backend {
            StorageBackend::File { file_name } => file_name.as_deref(),
            StorageBackend::InMemory => None,
        }
    }

    /// Change the backing file. Ignored for in-memory storage.
    pub fn set_file_name(&mut self, new_name: impl Into<PathBuf>) {
        let StorageBackend::File { file_name } = &mut self.backend else {
            tracing::warn!("[storage] in-memory storage has no file name");
            return;
        };
        let new_name = new_name.into();
        if file_name.as_ref() == Some(&new_name) {
            return;
        }
        *file_name = Some(new_name.clone());
        let _ = self.events.send(StorageEvent::FileNameChanged(new_name));
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Write the credential tuple to the backing file.
    pub fn save_data(&self) -> Result<(), StorageError> {
        let path = self.file_name().ok_or(StorageError::NoFileName)?;

        let mut b = Vec::with_capacity(64 + self.auth_key.len());
        b.extend_from_slice(MAGIC);
        b.extend_from_slice(&self.delta_time.to_le_bytes());
        b.extend_from_slice(&self.dc_info.id.to_le_bytes());
        put_bytes(&mut b, &to_latin1(&self.dc_info.address));
        b.extend_from_slice(&self.dc_info.port.to_le_bytes());
        put_bytes(&mut b, &self.auth_key);
        b.extend_from_slice(&self.auth_id.to_le_bytes());

        if let Err(e) = fs::write(path, b) {
            tracing::warn!("[storage] unable to write {}: {e}", path.display());
            return Err(e.into());
        }
        tracing::debug!("[storage] saved key {:x}", self.auth_id);
        Ok(())
    }

    /// Read the credential tuple from the backing file.
    ///
    /// Fields are only replaced once the whole file has been decoded.
    pub fn load_data(&mut self) -> Result<(), StorageError> {
        let Some(path) = self.file_name() else {
            tracing::debug!("[storage] file name is not set");
            return Err(StorageError::NoFileName);
        };
        let buf = fs::read(path).inspect_err(|e| {
            tracing::warn!("[storage] unable to read {}: {e}", path.display());
        })?;

        let mut cur = Cursor::from_slice(&buf);
        let mut magic = [0u8; MAGIC_LEN];
        cur.read_exact(&mut magic).map_err(|_| StorageError::BadMagic)?;
        if &magic != MAGIC {
            return Err(StorageError::BadMagic);
        }

        let delta_time = i32::from_le_bytes(take(&mut cur)?);
        let dc_id      = u32::from_le_bytes(take(&mut cur)?);
        let address    = from_latin1(&get_bytes(&mut cur)?);
        let port       = u16::from_le_bytes(take(&mut cur)?);
        let auth_key   = get_bytes(&mut cur)?;
        let auth_id    = u64::from_le_bytes(take(&mut cur)?);

        self.delta_time = delta_time;
        self.dc_info = DcOption { id: dc_id, address, port };
        self.auth_key = auth_key;
        self.auth_id = auth_id;
        tracing::debug!("[storage] loaded key {:x}", self.auth_id);
        Ok(())
    }

    /// Persist (file backend) and raise [`StorageEvent::Synced`].
    ///
    /// The notification is raised even when saving fails; the save error is
    /// still returned.
    pub fn sync(&mut self) -> Result<(), StorageError> {
        let saved = match self.backend {
            StorageBackend::InMemory   => Ok(()),
            StorageBackend::File { .. } => self.save_data(),
        };
        let _ = self.events.send(StorageEvent::Synced);
        saved
    }
}

impl Default for AccountStorage {
    fn default() -> Self { Self::in_memory() }
}

impl std::fmt::Debug for AccountStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStorage")
            .field("backend", &self.backend)
            .field("phone_number", &self.phone_number)
            .field("auth_id", &format_args!("{:x}", self.auth_id))
            .field("dc_info", &self.dc_info)
            .finish_non_exhaustive()
    }
}

// ─── Encoding helpers ─────────────────────────────────────────────────────────

fn put_bytes(b: &mut Vec<u8>, data: &[u8]) {
    b.extend_from_slice(&(data.len() as u32).to_le_bytes());
    b.extend_from_slice(data);
}

fn take<const N: usize>(cur: &mut Cursor<'_>) -> Result<[u8; N], StorageError> {
    let mut out = [0u8; N];
    cur.read_exact(&mut out)?;
    Ok(out)
}

fn get_bytes(cur: &mut Cursor<'_>) -> Result<Vec<u8>, StorageError> {
    let len = u32::from_le_bytes(take(cur)?) as usize;
    if len > cur.remaining() {
        return Err(StorageError::Truncated);
    }
    let mut out = vec![0u8; len];
    cur.read_exact(&mut out)?;
    Ok(out)
}

fn to_latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect()
}

fn from_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}
