//! Reader identity model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable reader identifier.
pub type ReaderId = Uuid;

/// Owner of every publication, note, tag and outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reader {
    pub id: ReaderId,
    /// External identity yielded by the authentication layer.
    pub auth_id: String,
    pub name: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}
