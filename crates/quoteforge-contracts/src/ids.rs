//! UUID-backed identifier newtypes.
//!
//! Every record in the runtime is addressed by its own identifier type so a
//! `DatasetId` can never be passed where a `CheckpointId` is expected.

use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Create a new, random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a `PricingAgent`.
    AgentId
);
uuid_id!(
    /// Identifier of a single immutable `Checkpoint`.
    CheckpointId
);
uuid_id!(
    /// Identifier of a `HumanInputMessage` inside a checkpoint.
    MessageId
);
uuid_id!(
    /// Identifier of a `TestingDataset`.
    DatasetId
);
uuid_id!(
    /// Identifier of a happy- or unhappy-path dataset case.
    CaseId
);
uuid_id!(
    /// Identifier of a `CheckpointTestRun`.
    TestRunId
);
uuid_id!(
    /// Identifier of a `DatasetAssignment`.
    AssignmentId
);
uuid_id!(
    /// Identifier of a diagnostics `FaultReport`.
    ReportId
);
