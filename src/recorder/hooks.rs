//! Hook chains run at fixed points of the recorder lifecycle.

use std::fmt;

use crate::cassette::format::Interaction;
use crate::error::{Error, Result};
use crate::ports::BoxError;

/// Lifecycle point a hook is registered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// After a live exchange is captured, before it is added to the cassette.
    AfterCapture,
    /// At stop, over every interaction, before the cassette is saved.
    BeforeSave,
    /// After a lookup matched, before the response is returned.
    BeforeResponseReplay,
    /// At stop, over every interaction, after the cassette is saved.
    OnRecorderStop,
}

/// Transform-or-fail over a single interaction.
pub type Hook = Box<dyn Fn(&mut Interaction) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Ordered hook lists, one per [`HookKind`].
#[derive(Default)]
pub struct Hooks {
    after_capture: Vec<Hook>,
    before_save: Vec<Hook>,
    before_response_replay: Vec<Hook>,
    on_recorder_stop: Vec<Hook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("after_capture", &self.after_capture.len())
            .field("before_save", &self.before_save.len())
            .field("before_response_replay", &self.before_response_replay.len())
            .field("on_recorder_stop", &self.on_recorder_stop.len())
            .finish()
    }
}

impl Hooks {
    fn chain(&self, kind: HookKind) -> &[Hook] {
        match kind {
            HookKind::AfterCapture => &self.after_capture,
            HookKind::BeforeSave => &self.before_save,
            HookKind::BeforeResponseReplay => &self.before_response_replay,
            HookKind::OnRecorderStop => &self.on_recorder_stop,
        }
    }

    /// Appends a hook to the chain for `kind`.
    pub fn push(&mut self, kind: HookKind, hook: Hook) {
        let chain = match kind {
            HookKind::AfterCapture => &mut self.after_capture,
            HookKind::BeforeSave => &mut self.before_save,
            HookKind::BeforeResponseReplay => &mut self.before_response_replay,
            HookKind::OnRecorderStop => &mut self.on_recorder_stop,
        };
        chain.push(hook);
    }

    /// Number of hooks registered for `kind`.
    #[must_use]
    pub fn len(&self, kind: HookKind) -> usize {
        self.chain(kind).len()
    }

    /// Runs the chain for `kind` in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first hook error as [`Error::Hook`]; later hooks do not run.
    pub fn run(&self, kind: HookKind, interaction: &mut Interaction) -> Result<()> {
        for hook in self.chain(kind) {
            hook(interaction).map_err(Error::Hook)?;
        }
        Ok(())
    }
}
