//! TTL refresh policy using enum dispatch.

use std::collections::{HashMap, HashSet};

/// When a command re-arms the expiry of the key it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtlRefresh {
    /// After a write that changed content or membership
    #[default]
    OnChange,
    /// After a read that found something (sliding expiration)
    OnHit,
    /// After every successful call
    Always,
    /// Leave the expiry alone
    Never,
}

impl TtlRefresh {
    /// Decide from the command's reply whether to issue `EXPIRE`.
    pub fn applies<O: Touched + ?Sized>(self, outcome: &O) -> bool {
        match self {
            Self::OnChange | Self::OnHit => outcome.touched(),
            Self::Always => true,
            Self::Never => false,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnChange => "on_change",
            Self::OnHit => "on_hit",
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

/// Whether a command reply counts as having touched the key.
pub trait Touched {
    fn touched(&self) -> bool;
}

impl Touched for bool {
    fn touched(&self) -> bool {
        *self
    }
}

/// Counts and lengths: positive means something was added or is present.
impl Touched for i64 {
    fn touched(&self) -> bool {
        *self > 0
    }
}

impl Touched for usize {
    fn touched(&self) -> bool {
        *self > 0
    }
}

impl<T> Touched for Option<T> {
    fn touched(&self) -> bool {
        self.is_some()
    }
}

impl<T> Touched for [T] {
    fn touched(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Touched for Vec<T> {
    fn touched(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, H> Touched for HashMap<K, V, H> {
    fn touched(&self) -> bool {
        !self.is_empty()
    }
}

impl<T, H> Touched for HashSet<T, H> {
    fn touched(&self) -> bool {
        !self.is_empty()
    }
}
