//! The recorder: decides per request whether to replay from the cassette,
//! hit the real transport, or both, and drives the hook chains.

pub mod config;
pub mod hooks;
pub mod mode;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

pub use config::RecorderConfig;
pub use hooks::{Hook, HookKind, Hooks};
pub use mode::Mode;

use crate::adapters::live::LiveTransport;
use crate::adapters::recording::{RecorderTransport, RecordingHandler};
use crate::cassette::{
    Cassette, DefaultFingerprinter, Fingerprinter, Interaction, RecordedRequest, RecordedResponse,
    ReplayExhaustion,
};
use crate::error::{Error, Result};
use crate::ports::{BoxError, Handler, HttpRequest, HttpResponse, Transport};

/// Methods that may reach a real endpoint while unsafe-method blocking is on.
pub const SAFE_METHODS: [&str; 4] = ["GET", "HEAD", "OPTIONS", "TRACE"];

/// Predicate selecting requests that bypass the cassette entirely.
pub type Passthrough = Box<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

/// Records and replays HTTP interactions for one cassette.
///
/// A recorder is shared by reference (usually behind an [`Arc`]) between all
/// tasks issuing requests through it. Call [`stop`](Self::stop) once when done.
pub struct Recorder {
    cassette: Cassette,
    mode: Mode,
    recording: bool,
    transport: Box<dyn Transport>,
    passthrough: Option<Passthrough>,
    hooks: Hooks,
    block_unsafe_methods: bool,
    simulate_latency: bool,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("cassette", &self.cassette)
            .field("mode", &self.mode)
            .field("recording", &self.recording)
            .field("hooks", &self.hooks)
            .field("block_unsafe_methods", &self.block_unsafe_methods)
            .field("simulate_latency", &self.simulate_latency)
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Starts configuring a recorder for the cassette `name` (`<name>.yaml`).
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RecorderBuilder {
        RecorderBuilder::new(name)
    }

    /// Opens `name` in [`Mode::RecordOnce`] with the live transport.
    ///
    /// # Errors
    ///
    /// See [`RecorderBuilder::build`].
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::builder(name).build()
    }

    /// Resolved mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether exchanges are captured, fixed when the recorder was built.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether the cassette did not exist on disk when the recorder was built.
    #[must_use]
    pub fn is_new_cassette(&self) -> bool {
        self.cassette.is_new()
    }

    /// The cassette backing this recorder.
    #[must_use]
    pub fn cassette(&self) -> &Cassette {
        &self.cassette
    }

    /// A [`Transport`] that sends requests through this recorder.
    #[must_use]
    pub fn transport(self: &Arc<Self>) -> RecorderTransport {
        RecorderTransport::new(Arc::clone(self))
    }

    /// A [`Handler`] that captures every exchange served by `inner`.
    #[must_use]
    pub fn middleware(self: &Arc<Self>, inner: impl Handler + 'static) -> RecordingHandler {
        RecordingHandler::new(Box::new(inner), Arc::clone(self))
    }

    fn is_passthrough(&self, request: &HttpRequest) -> bool {
        self.mode == Mode::Passthrough || self.passthrough.as_ref().is_some_and(|p| p(request))
    }

    /// Resolves one outbound request.
    ///
    /// Passthrough requests go straight to the real transport. Otherwise the
    /// method is checked against [`SAFE_METHODS`] when blocking is on, the
    /// cassette is consulted when the mode allows replay, and on a miss the
    /// real transport is called and the exchange captured when recording.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsafeMethod`] when the method is blocked
    /// - [`Error::InteractionNotFound`] on a miss while not recording
    /// - [`Error::Transport`] when the real transport fails
    /// - [`Error::Hook`] when a hook aborts
    /// - cassette errors from lookup or capture
    pub async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse> {
        if self.is_passthrough(request) {
            debug!(method = %request.method, url = %request.url, "passthrough");
            return self.transport.perform(request).await.map_err(Error::Transport);
        }

        if self.block_unsafe_methods && !SAFE_METHODS.contains(&request.method.as_str()) {
            debug!(method = %request.method, url = %request.url, "blocked unsafe method");
            return Err(Error::UnsafeMethod(request.method.clone()));
        }

        if let Some(response) = self.replay(request).await? {
            return Ok(response);
        }
        if !self.recording {
            return Err(Error::InteractionNotFound);
        }

        let started = Instant::now();
        let response = self.transport.perform(request).await.map_err(Error::Transport)?;
        self.capture(request, &response, started)?;
        Ok(response)
    }

    /// Serves one inbound request through `handler`, capturing the exchange
    /// when recording. The handler's response is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the handler fails, or capture errors.
    pub async fn capture_inbound(&self, request: &HttpRequest, handler: &dyn Handler) -> Result<HttpResponse> {
        let started = Instant::now();
        let response = handler.handle(request).await.map_err(Error::Transport)?;
        if self.recording && !self.is_passthrough(request) {
            self.capture(request, &response, started)?;
        }
        Ok(response)
    }

    async fn replay(&self, request: &HttpRequest) -> Result<Option<HttpResponse>> {
        if !self.mode.permits_replay() {
            return Ok(None);
        }
        let mut interaction = match self.cassette.get_interaction(request) {
            Ok(interaction) => interaction,
            Err(e) if e.is_not_found() => {
                debug!(method = %request.method, url = %request.url, "no recorded interaction");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        self.hooks.run(HookKind::BeforeResponseReplay, &mut interaction)?;
        if self.simulate_latency {
            tokio::time::sleep(interaction.response.duration).await;
        }
        debug!(method = %request.method, url = %request.url, id = interaction.id(), "replayed");
        Ok(Some(interaction.response.to_http_response()))
    }

    fn capture(&self, request: &HttpRequest, response: &HttpResponse, started: Instant) -> Result<()> {
        let mut interaction = Interaction::new(
            RecordedRequest::from_http(request),
            RecordedResponse::from_http(response, started.elapsed()),
        );
        self.hooks.run(HookKind::AfterCapture, &mut interaction)?;
        let id = self.cassette.add_interaction(interaction)?;
        debug!(method = %request.method, url = %request.url, id, "recorded");
        Ok(())
    }

    /// Finishes the session: runs the before-save hooks over every
    /// interaction, saves the cassette when recording, then runs the
    /// on-stop hooks.
    ///
    /// Call this once.
    ///
    /// # Errors
    ///
    /// Returns the first hook or save error; later stages do not run.
    pub fn stop(&self) -> Result<()> {
        self.cassette.try_for_each(|i| self.hooks.run(HookKind::BeforeSave, i))?;
        if self.recording {
            self.cassette.save()?;
        }
        self.cassette.try_for_each(|i| self.hooks.run(HookKind::OnRecorderStop, i))?;
        info!(cassette = self.cassette.name(), mode = %self.mode, saved = self.recording, "recorder stopped");
        Ok(())
    }
}

/// Configures and opens a [`Recorder`].
pub struct RecorderBuilder {
    name: String,
    mode: Mode,
    mode_name: Option<String>,
    transport: Option<Box<dyn Transport>>,
    fingerprinter: Option<Arc<dyn Fingerprinter>>,
    ignore_headers: Vec<String>,
    passthrough: Option<Passthrough>,
    hooks: Hooks,
    block_unsafe_methods: bool,
    replayable_interactions: bool,
    compression: bool,
    replay_exhaustion: ReplayExhaustion,
    simulate_latency: bool,
    upgrade_legacy: bool,
}

impl RecorderBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::default(),
            mode_name: None,
            transport: None,
            fingerprinter: None,
            ignore_headers: Vec::new(),
            passthrough: None,
            hooks: Hooks::default(),
            block_unsafe_methods: false,
            replayable_interactions: false,
            compression: false,
            replay_exhaustion: ReplayExhaustion::default(),
            simulate_latency: false,
            upgrade_legacy: false,
        }
    }

    /// Sets the mode.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self.mode_name = None;
        self
    }

    /// Sets the mode by name; an unknown name fails [`build`](Self::build).
    #[must_use]
    pub fn mode_name(mut self, name: impl Into<String>) -> Self {
        self.mode_name = Some(name.into());
        self
    }

    /// Replaces the real transport (default: [`LiveTransport`]).
    #[must_use]
    pub fn real_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Replaces the fingerprint function. Headers passed to
    /// [`ignore_headers`](Self::ignore_headers) no longer apply.
    #[must_use]
    pub fn fingerprinter(mut self, fingerprinter: impl Fingerprinter + 'static) -> Self {
        self.fingerprinter = Some(Arc::new(fingerprinter));
        self
    }

    /// Excludes headers from the default fingerprint.
    #[must_use]
    pub fn ignore_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_headers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sends requests matching `predicate` live without recording them.
    #[must_use]
    pub fn passthrough(mut self, predicate: impl Fn(&HttpRequest) -> bool + Send + Sync + 'static) -> Self {
        self.passthrough = Some(Box::new(predicate));
        self
    }

    /// Registers a hook at the end of the `kind` chain.
    #[must_use]
    pub fn hook(
        mut self,
        kind: HookKind,
        hook: impl Fn(&mut Interaction) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.hooks.push(kind, Box::new(hook));
        self
    }

    /// Rejects methods outside [`SAFE_METHODS`] before any lookup or network call.
    #[must_use]
    pub fn block_unsafe_methods(mut self, enabled: bool) -> Self {
        self.block_unsafe_methods = enabled;
        self
    }

    /// Lets a recorded interaction answer any number of requests.
    #[must_use]
    pub fn replayable_interactions(mut self, enabled: bool) -> Self {
        self.replayable_interactions = enabled;
        self
    }

    /// Stores the cassette gzip-compressed as `<name>.yaml.gz`.
    #[must_use]
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Sets what a lookup does once every match was replayed.
    #[must_use]
    pub fn replay_exhaustion(mut self, policy: ReplayExhaustion) -> Self {
        self.replay_exhaustion = policy;
        self
    }

    /// Delays replayed responses by their recorded duration.
    #[must_use]
    pub fn simulate_latency(mut self, enabled: bool) -> Self {
        self.simulate_latency = enabled;
        self
    }

    /// Rewrites a loaded cassette that lacks stored fingerprints.
    #[must_use]
    pub fn upgrade_legacy(mut self, enabled: bool) -> Self {
        self.upgrade_legacy = enabled;
        self
    }

    /// Applies every field set in `config`.
    #[must_use]
    pub fn config(mut self, config: RecorderConfig) -> Self {
        if let Some(mode) = config.mode {
            self.mode_name = Some(mode);
        }
        if let Some(enabled) = config.block_unsafe_methods {
            self.block_unsafe_methods = enabled;
        }
        if let Some(enabled) = config.replayable_interactions {
            self.replayable_interactions = enabled;
        }
        if let Some(enabled) = config.compression {
            self.compression = enabled;
        }
        if let Some(strict) = config.strict_replay {
            self.replay_exhaustion = if strict { ReplayExhaustion::Strict } else { ReplayExhaustion::ReuseLast };
        }
        if let Some(enabled) = config.simulate_latency {
            self.simulate_latency = enabled;
        }
        if let Some(headers) = config.ignore_headers {
            self.ignore_headers.extend(headers);
        }
        self
    }

    /// Opens the cassette according to the mode and returns the recorder.
    ///
    /// [`Mode::RecordOnly`] and [`Mode::Passthrough`] start from an empty
    /// cassette. [`Mode::ReplayOnly`] requires the file to exist. The other
    /// modes load it when present and start empty otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidMode`] for an unknown mode name
    /// - [`Error::CassetteNotFound`] in replay-only mode without a file
    /// - any other load or upgrade error
    pub fn build(self) -> Result<Recorder> {
        let mode = match &self.mode_name {
            Some(name) => name.parse()?,
            None => self.mode,
        };

        let fingerprinter = self.fingerprinter.unwrap_or_else(|| {
            Arc::new(DefaultFingerprinter::new().ignore_headers(&self.ignore_headers))
        });
        let cassette = Cassette::new(self.name)
            .with_compression(self.compression)
            .with_replayable_interactions(self.replayable_interactions)
            .with_replay_exhaustion(self.replay_exhaustion)
            .with_fingerprinter(fingerprinter);

        match mode {
            Mode::RecordOnly | Mode::Passthrough => {}
            Mode::ReplayOnly => cassette.load()?,
            Mode::RecordOnce | Mode::ReplayWithNewEpisodes => match cassette.load() {
                Err(e) if e.is_cassette_not_found() => {
                    debug!(file = %cassette.file().display(), "starting a new cassette");
                }
                other => other?,
            },
        }
        if self.upgrade_legacy && cassette.needs_upgrade() {
            cassette.upgrade()?;
        }

        let recording = mode.is_recording(cassette.is_new());
        let transport = self.transport.unwrap_or_else(|| Box::new(LiveTransport::new()));
        Ok(Recorder {
            cassette,
            mode,
            recording,
            transport,
            passthrough: self.passthrough,
            hooks: self.hooks,
            block_unsafe_methods: self.block_unsafe_methods,
            simulate_latency: self.simulate_latency,
        })
    }
}
