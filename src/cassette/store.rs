//! The interaction store: an ordered list of interactions, a fingerprint
//! index over it, and persistence to a versioned cassette file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::fingerprint::{DefaultFingerprinter, Fingerprinter};
use super::format::{
    CassetteDocument, CassetteFile, Interaction, RecordedRequest, FORMAT_VERSION,
};
use crate::error::{Error, Result};
use crate::ports::http::HttpRequest;

/// What a lookup does once every interaction with a matching fingerprint has
/// already been replayed (only relevant when interactions are not replayable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayExhaustion {
    /// Return the most recently replayed match again and log a warning.
    #[default]
    ReuseLast,
    /// Report [`Error::InteractionNotFound`].
    Strict,
}

/// Interactions plus the fingerprint index derived from them.
///
/// `index[f]` holds, in ascending order, the offsets of every interaction
/// whose fingerprint is `f`. Offsets equal interaction ids.
#[derive(Default)]
struct State {
    interactions: Vec<Interaction>,
    index: HashMap<String, Vec<usize>>,
    is_new: bool,
    needs_upgrade: bool,
}

impl State {
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (offset, interaction) in self.interactions.iter().enumerate() {
            self.index.entry(interaction.fingerprint.clone()).or_default().push(offset);
        }
    }
}

/// A named, versioned collection of recorded interactions.
///
/// Every operation locks the interaction list and index for its full
/// duration, so a cassette can be shared across request-handling tasks.
pub struct Cassette {
    name: String,
    compression: bool,
    replayable: bool,
    exhaustion: ReplayExhaustion,
    fingerprinter: Arc<dyn Fingerprinter>,
    state: Mutex<State>,
}

impl std::fmt::Debug for Cassette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cassette")
            .field("name", &self.name)
            .field("compression", &self.compression)
            .field("replayable", &self.replayable)
            .field("exhaustion", &self.exhaustion)
            .field("interactions", &self.len())
            .finish_non_exhaustive()
    }
}

impl Cassette {
    /// Creates an empty, newly created cassette. Nothing touches disk until
    /// [`load`](Self::load) or [`save`](Self::save).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compression: false,
            replayable: false,
            exhaustion: ReplayExhaustion::default(),
            fingerprinter: Arc::new(DefaultFingerprinter::new()),
            state: Mutex::new(State { is_new: true, ..State::default() }),
        }
    }

    /// Loads an existing cassette with default settings.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn open(name: impl Into<String>) -> Result<Self> {
        let cassette = Self::new(name);
        cassette.load()?;
        Ok(cassette)
    }

    /// Reads and writes the file gzip-compressed (`<name>.yaml.gz`).
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Allows the same interaction to be returned by any number of lookups.
    #[must_use]
    pub fn with_replayable_interactions(mut self, enabled: bool) -> Self {
        self.replayable = enabled;
        self
    }

    /// Sets the policy for lookups whose matches were all replayed already.
    #[must_use]
    pub fn with_replay_exhaustion(mut self, policy: ReplayExhaustion) -> Self {
        self.exhaustion = policy;
        self
    }

    /// Replaces the fingerprint function used for indexing and lookup.
    #[must_use]
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Cassette name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the cassette is stored in: `<name>.yaml`, plus `.gz` when compressed.
    #[must_use]
    pub fn file(&self) -> PathBuf {
        let file = format!("{}.yaml", self.name);
        if self.compression {
            PathBuf::from(file + ".gz")
        } else {
            PathBuf::from(file)
        }
    }

    /// True when compression is enabled.
    #[must_use]
    pub fn compression_enabled(&self) -> bool {
        self.compression
    }

    /// True unless the cassette was loaded from an existing file.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.state.lock().is_new
    }

    /// True when a load had to recompute fingerprints missing from the file.
    #[must_use]
    pub fn needs_upgrade(&self) -> bool {
        self.state.lock().needs_upgrade
    }

    /// Number of interactions held in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().interactions.len()
    }

    /// True when no interaction is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the interactions held in memory, in id order.
    #[must_use]
    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().interactions.clone()
    }

    /// Fingerprint of a live request under this cassette's fingerprint function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fingerprint`] when the fingerprint function fails.
    pub fn fingerprint(&self, request: &HttpRequest) -> Result<String> {
        self.fingerprinter.fingerprint(request).map_err(Error::Fingerprint)
    }

    fn fingerprint_recorded(&self, request: &RecordedRequest) -> Result<String> {
        self.fingerprint(&request.to_http_request()?)
    }

    /// Replaces the in-memory state with the contents of the cassette file.
    ///
    /// Interactions missing a persisted fingerprint get one computed and the
    /// cassette is flagged by [`needs_upgrade`](Self::needs_upgrade); the file
    /// itself is never rewritten here.
    ///
    /// # Errors
    ///
    /// - [`Error::CassetteNotFound`] if the file does not exist
    /// - [`Error::UnsupportedFormat`] if the file's version is not [`FORMAT_VERSION`]
    /// - [`Error::Io`] or [`Error::Decode`] if the file cannot be read or parsed
    /// - fingerprinting errors for legacy interactions
    pub fn load(&self) -> Result<()> {
        let path = self.file();
        let bytes = self.read_file(&path)?;
        let interactions = decode(&path, &bytes)?;

        let mut state = State::default();
        let mut recomputed = 0usize;
        for (offset, mut interaction) in interactions.into_iter().enumerate() {
            let offset_id = offset as u64;
            if interaction.id != offset_id {
                debug!(file = %path.display(), from = interaction.id, to = offset_id, "renumbering interaction");
                interaction.id = offset_id;
                state.needs_upgrade = true;
            }
            if interaction.fingerprint.is_empty() {
                interaction.fingerprint = self.fingerprint_recorded(&interaction.request)?;
                recomputed += 1;
            }
            state.interactions.push(interaction);
        }
        state.rebuild_index();
        if recomputed > 0 {
            warn!(
                file = %path.display(),
                recomputed,
                "cassette has interactions without a stored fingerprint; upgrade it to skip recomputation"
            );
            state.needs_upgrade = true;
        }

        info!(file = %path.display(), interactions = state.interactions.len(), "loaded cassette");
        *self.state.lock() = state;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let io_err = |source| Error::Io { path: path.to_path_buf(), source };
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CassetteNotFound { path: path.to_path_buf() });
            }
            Err(e) => return Err(io_err(e)),
        };

        let mut bytes = Vec::new();
        if self.compression {
            GzDecoder::new(file).read_to_end(&mut bytes).map_err(io_err)?;
        } else {
            file.read_to_end(&mut bytes).map_err(io_err)?;
        }
        Ok(bytes)
    }

    /// Appends an interaction, assigning it the next id and indexing it under
    /// the fingerprint of its recorded request.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorded request cannot be fingerprinted; the
    /// cassette is left unchanged in that case.
    pub fn add_interaction(&self, mut interaction: Interaction) -> Result<u64> {
        let fingerprint = self.fingerprint_recorded(&interaction.request)?;

        let mut state = self.state.lock();
        let offset = state.interactions.len();
        interaction.id = offset as u64;
        interaction.fingerprint = fingerprint.clone();
        state.index.entry(fingerprint).or_default().push(offset);
        state.interactions.push(interaction);
        Ok(offset as u64)
    }

    /// Finds the recorded interaction matching a live request.
    ///
    /// The returned interaction is a copy whose request body and form carry
    /// what the live request actually sent, not what was recorded.
    ///
    /// # Errors
    ///
    /// - [`Error::InteractionNotFound`] if nothing matches (or, under
    ///   [`ReplayExhaustion::Strict`], every match was already replayed)
    /// - [`Error::Fingerprint`] if the live request cannot be fingerprinted
    pub fn get_interaction(&self, request: &HttpRequest) -> Result<Interaction> {
        let fingerprint = self.fingerprint(request)?;

        let mut state = self.state.lock();
        let State { interactions, index, .. } = &mut *state;
        let bucket = index.get(&fingerprint).ok_or(Error::InteractionNotFound)?;

        let offset = if self.replayable {
            bucket[0]
        } else if let Some(&fresh) = bucket.iter().find(|&&o| !interactions[o].replayed) {
            fresh
        } else {
            // First-unreplayed ordering means the last entry was replayed last.
            let last = *bucket.last().ok_or(Error::InteractionNotFound)?;
            match self.exhaustion {
                ReplayExhaustion::ReuseLast => {
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        id = last,
                        "every matching interaction was already replayed; reusing the last one"
                    );
                    last
                }
                ReplayExhaustion::Strict => {
                    debug!(method = %request.method, url = %request.url, "matching interactions exhausted");
                    return Err(Error::InteractionNotFound);
                }
            }
        };

        let stored = &mut interactions[offset];
        stored.replayed = true;
        let mut matched = stored.clone();
        drop(state);

        matched.request.body = request.body.clone();
        matched.request.form = request.post_form();
        Ok(matched)
    }

    /// Runs `f` over a copy of every interaction in id order, stopping at the
    /// first error, then stores the edited copies back.
    ///
    /// The lock is not held while `f` runs, so `f` may use this cassette.
    /// Ids, fingerprints and replay state are kept from the stored interaction.
    pub(crate) fn try_for_each<E>(
        &self,
        mut f: impl FnMut(&mut Interaction) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut edited = self.interactions();
        let outcome = edited.iter_mut().try_for_each(&mut f);

        let mut state = self.state.lock();
        for (stored, mut copy) in state.interactions.iter_mut().zip(edited) {
            copy.id = stored.id;
            copy.fingerprint = std::mem::take(&mut stored.fingerprint);
            copy.replayed = stored.replayed;
            *stored = copy;
        }
        outcome
    }

    /// Writes the cassette file.
    ///
    /// Interactions flagged `discard_on_save` are dropped first and the rest
    /// renumbered densely from zero. The parent directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] or [`Error::Io`] on failure.
    pub fn save(&self) -> Result<()> {
        let path = self.file();
        let mut state = self.state.lock();

        let before = state.interactions.len();
        state.interactions.retain(|i| !i.discard_on_save);
        for (offset, interaction) in state.interactions.iter_mut().enumerate() {
            interaction.id = offset as u64;
        }
        state.rebuild_index();

        let document = CassetteDocument {
            version: FORMAT_VERSION,
            compression_enabled: self.compression,
            interactions: &state.interactions,
        };
        let yaml = serde_yaml::to_string(&document).map_err(Error::Encode)?;
        write_file(&path, self.compression, yaml.as_bytes())?;

        state.needs_upgrade = false;
        info!(
            file = %path.display(),
            interactions = state.interactions.len(),
            discarded = before - state.interactions.len(),
            "saved cassette"
        );
        Ok(())
    }

    /// Rewrites a cassette flagged by [`needs_upgrade`](Self::needs_upgrade)
    /// so later loads read every fingerprint from the file.
    ///
    /// Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save).
    pub fn upgrade(&self) -> Result<bool> {
        if !self.needs_upgrade() {
            return Ok(false);
        }
        self.save()?;
        info!(file = %self.file().display(), "upgraded cassette");
        Ok(true)
    }
}

/// Validates the format version, then decodes the interaction list.
fn decode(path: &Path, bytes: &[u8]) -> Result<Vec<Interaction>> {
    let decode_err = |source| Error::Decode { path: path.to_path_buf(), source };
    let value: serde_yaml::Value = serde_yaml::from_slice(bytes).map_err(decode_err)?;

    let found = value.get("version").and_then(serde_yaml::Value::as_u64).unwrap_or(0);
    if found != u64::from(FORMAT_VERSION) {
        return Err(Error::UnsupportedFormat { found, supported: FORMAT_VERSION });
    }

    let file: CassetteFile = serde_yaml::from_value(value).map_err(decode_err)?;
    Ok(file.interactions)
}

/// Writes `---` followed by the document, optionally gzip-compressed.
fn write_file(path: &Path, compress: bool, yaml: &[u8]) -> Result<()> {
    let io_err = |source| Error::Io { path: path.to_path_buf(), source };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }

    let mut file = File::create(path).map_err(io_err)?;
    if compress {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b"---\n").map_err(io_err)?;
        encoder.write_all(yaml).map_err(io_err)?;
        encoder.finish().map_err(io_err)?;
    } else {
        file.write_all(b"---\n").map_err(io_err)?;
        file.write_all(yaml).map_err(io_err)?;
    }
    Ok(())
}
