use serde::{Deserialize, Serialize};
use tandem_store::{StoreError, StoreResult};

/// How `write_stream` obtains a second readable stream for the replica.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamReplay {
    /// Rewind the caller's stream when it is seekable, otherwise reopen the
    /// path on the source.
    #[default]
    RewindOrReacquire,
    /// Always reopen the path on the source, so the replica receives exactly
    /// what the source persisted even if the source transformed it.
    AlwaysReacquire,
}

/// Replication policy for a [`ReplicatingStore`](crate::ReplicatingStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    pub stream_replay: StreamReplay,
    /// Ask the replica whether a path exists before mirroring a delete, and
    /// skip the replica delete when it does not. Turning this off mirrors
    /// every delete, for replicas whose delete already tolerates missing
    /// paths.
    pub check_replica_before_delete: bool,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            stream_replay: StreamReplay::RewindOrReacquire,
            check_replica_before_delete: true,
        }
    }
}

impl ReplicationConfig {
    /// Parse a config from TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }
}
