use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rand::{CryptoRng, RngCore};
use zk_primitives::{Element, FieldHasher};

use crate::{
    commitment::CommitmentScheme,
    note::{MerklePath, Note},
};

/// An error that can occur while persisting a [`Note`]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// A single note slot
pub trait NoteStore: Send + Sync {
    fn save(&self, note: &Note) -> Result<(), StorageError>;

    /// The stored note, or `None` if the slot is empty or unreadable
    fn load(&self) -> Option<Note>;

    /// Mark the stored note claimed, if it is the note with `nullifier` and is not claimed yet.
    ///
    /// Returns the stored note after the update.
    fn mark_claimed(&self, nullifier: Element, tx_hash: &str) -> Result<Option<Note>, StorageError> {
        let Some(mut note) = self.load() else {
            return Ok(None);
        };

        if note.nullifier == nullifier && note.mark_claimed(tx_hash) {
            self.save(&note)?;
        }

        Ok(Some(note))
    }
}

/// A freshly created note, with its commitment and root in wire form for the deposit calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedNote {
    pub note: Note,
    pub commitment_hex: String,
    pub root_hex: String,
}

/// Create a single-leaf note for `value`, bound to `secret`.
///
/// `random` is drawn from `rng` unless overridden.
pub fn create_note<H: FieldHasher, R: RngCore + CryptoRng>(
    scheme: &CommitmentScheme<H>,
    value: Element,
    secret: Element,
    random: Option<Element>,
    rng: &mut R,
) -> CreatedNote {
    let random = random.unwrap_or_else(|| Element::secure_random(rng));
    let derived = scheme.derive(value, secret, random);

    let note = Note {
        value,
        secret,
        random,
        nullifier: derived.nullifier,
        commitment: derived.commitment,
        entry: derived.entry,
        root: derived.root,
        merkle_path: MerklePath::single_leaf(),
        claimed: false,
        claimed_tx_hash: None,
    };

    CreatedNote {
        commitment_hex: note.commitment.to_hex(),
        root_hex: note.root.to_hex(),
        note,
    }
}

/// Stores the note as a JSON file
///
/// Writes go to a sibling temp file which is then renamed over the slot, so a crash leaves
/// either the old note or the new one.
#[derive(Debug, Clone)]
pub struct FileNoteStore {
    path: PathBuf,
}

impl FileNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl NoteStore for FileNoteStore {
    fn save(&self, note: &Note) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(note)?;
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), nullifier = %note.nullifier.to_hex(), "saved note");
        Ok(())
    }

    fn load(&self) -> Option<Note> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), ?err, "failed to read note");
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(note) => Some(note),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), ?err, "ignoring unreadable note");
                None
            }
        }
    }
}

/// In-process note slot
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    note: Mutex<Option<Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoteStore for MemoryNoteStore {
    fn save(&self, note: &Note) -> Result<(), StorageError> {
        *self.note.lock() = Some(note.clone());
        Ok(())
    }

    fn load(&self) -> Option<Note> {
        self.note.lock().clone()
    }
}
