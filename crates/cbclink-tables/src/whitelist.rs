use std::collections::HashSet;

/// Access-control list for signal or group ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Whitelist {
    /// No list configured: every id passes.
    #[default]
    AllowAll,
    /// Only the listed ids pass.
    Only(HashSet<u16>),
}

impl Whitelist {
    pub fn only(ids: impl IntoIterator<Item = u16>) -> Self {
        Whitelist::Only(ids.into_iter().collect())
    }

    /// Returns true if `id` may be forwarded.
    pub fn verify(&self, id: u16) -> bool {
        match self {
            Whitelist::AllowAll => true,
            Whitelist::Only(ids) => ids.contains(&id),
        }
    }

    /// Number of listed ids, or `None` when everything passes.
    pub fn len(&self) -> Option<usize> {
        match self {
            Whitelist::AllowAll => None,
            Whitelist::Only(ids) => Some(ids.len()),
        }
    }
}

impl From<Option<Vec<u16>>> for Whitelist {
    fn from(ids: Option<Vec<u16>>) -> Self {
        ids.map_or(Whitelist::AllowAll, Whitelist::only)
    }
}
