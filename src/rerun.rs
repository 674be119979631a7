//! Restart, stop and redirect signalling
//!
//! A render function returns [`PassResult`]. Besides ordinary failures it can
//! end a pass early with one of three control-flow signals, each consumed by
//! the orchestrator and never reported as an error:
//!
//! - [`Interrupt::Rerun`]: discard the partial tree and run again from the
//!   top, keeping every Session State write made so far
//! - [`Interrupt::Stop`]: finish with the tree built so far
//! - [`Interrupt::Redirect`]: answer with a redirect instead of a tree
//!
//! Because signals travel as `Err` values, `?` carries them out of nested
//! scopes and helper functions, and scope guards close on the way out.
//!
//! Restarts are unbounded; a render function that always asks for a rerun
//! never returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::form_urlencoded;

use crate::error::GuiError;

/// Result of one execution of a render function
pub type PassResult = Result<(), Interrupt>;

/// Redirect directive returned instead of a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
    pub status: u16,
}

impl Redirect {
    /// Temporary redirect (302)
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_status(url, 302)
    }

    pub fn with_status(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
        }
    }

    /// Redirect to the current page with new query parameters (303)
    ///
    /// Null values are dropped; strings are used verbatim and anything else
    /// is written in its JSON form.
    pub fn query_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    query.append_pair(key, s);
                }
                other => {
                    query.append_pair(key, &other.to_string());
                }
            }
        }
        Self::with_status(format!("?{}", query.finish()), 303)
    }
}

/// Why a pass ended before the render function returned normally
#[derive(Debug, Error)]
pub enum Interrupt {
    #[error("rerun requested")]
    Rerun,

    #[error("stop requested")]
    Stop,

    #[error("redirect to {} ({})", .0.url, .0.status)]
    Redirect(Redirect),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<GuiError> for Interrupt {
    fn from(err: GuiError) -> Self {
        Interrupt::Failed(anyhow::Error::new(err))
    }
}

impl Interrupt {
    /// Whether this is a control-flow signal rather than a failure
    pub fn is_signal(&self) -> bool {
        !matches!(self, Interrupt::Failed(_))
    }
}

/// Restart the render function from the top
pub fn rerun<T>() -> Result<T, Interrupt> {
    Err(Interrupt::Rerun)
}

/// Finish the pass with the tree built so far
pub fn stop<T>() -> Result<T, Interrupt> {
    Err(Interrupt::Stop)
}

/// Answer with a 302 redirect to `url`
pub fn redirect<T>(url: impl Into<String>) -> Result<T, Interrupt> {
    Err(Interrupt::Redirect(Redirect::new(url)))
}

/// State of the pass currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// No pass has started yet
    Idle,
    /// The render function is executing
    Running,
    /// The last pass asked to be run again
    RestartRequested,
    /// A terminal exit was reached
    Finished,
}

/// How the invocation ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassExit {
    /// The render function returned normally
    Completed,
    /// The render function asked to stop
    Stopped,
    /// The render function asked for a redirect
    Redirected(Redirect),
}

/// What the orchestrator does after a pass
#[derive(Debug)]
pub enum Decision {
    Rerun,
    Finish(PassExit),
    Fail(anyhow::Error),
}

/// Tracks pass state across the restart loop
#[derive(Debug)]
pub struct RerunController {
    state: PassState,
    passes: u64,
}

impl Default for RerunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RerunController {
    pub fn new() -> Self {
        Self {
            state: PassState::Idle,
            passes: 0,
        }
    }

    /// Mark the start of a pass
    pub fn begin_pass(&mut self) {
        self.state = PassState::Running;
        self.passes += 1;
    }

    /// Interpret the result of the pass that just ran
    pub fn settle(&mut self, result: PassResult) -> Decision {
        let decision = match result {
            Ok(()) => Decision::Finish(PassExit::Completed),
            Err(Interrupt::Rerun) => Decision::Rerun,
            Err(Interrupt::Stop) => Decision::Finish(PassExit::Stopped),
            Err(Interrupt::Redirect(redirect)) => Decision::Finish(PassExit::Redirected(redirect)),
            Err(Interrupt::Failed(err)) => Decision::Fail(err),
        };
        self.state = match decision {
            Decision::Rerun => PassState::RestartRequested,
            _ => PassState::Finished,
        };
        decision
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Number of passes started so far
    pub fn passes(&self) -> u64 {
        self.passes
    }
}
