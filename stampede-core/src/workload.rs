//! Request mix issued by every worker.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of request a worker issues next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    Redirect,
    SignUp,
    SignIn,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Redirect => "redirect",
            RequestKind::SignUp => "sign-up",
            RequestKind::SignIn => "sign-in",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const REDIRECT_WEIGHT: usize = 10;
const CYCLE_LEN: usize = REDIRECT_WEIGHT + 2;

/// Endless weighted cycle of request kinds: ten redirects, one sign-up, one sign-in.
///
/// The sequence is a pure function of the position in the cycle, so a worker may stop pulling
/// from it at any point. A fresh `RequestMix` starts over from the beginning.
#[derive(Debug, Clone, Default)]
pub struct RequestMix {
    position: usize,
}

impl RequestMix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind_at(position: usize) -> RequestKind {
        match position % CYCLE_LEN {
            p if p < REDIRECT_WEIGHT => RequestKind::Redirect,
            p if p == REDIRECT_WEIGHT => RequestKind::SignUp,
            _ => RequestKind::SignIn,
        }
    }

    pub const fn cycle_len() -> usize {
        CYCLE_LEN
    }
}

impl Iterator for RequestMix {
    type Item = RequestKind;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = Self::kind_at(self.position);
        self.position = (self.position + 1) % CYCLE_LEN;
        Some(kind)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl std::iter::FusedIterator for RequestMix {}
