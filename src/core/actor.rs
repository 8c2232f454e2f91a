// Who performed an action. Stored alongside audit records so history stays
// readable after the member leaves the server.

/// The member behind a mutation (link issue, stock movement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub name: String,
}

impl Actor {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
