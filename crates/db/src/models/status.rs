//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use scenesmith_core::error::CoreError;
use scenesmith_core::job::BuildStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Build job pipeline status, matching `build_job_statuses` seed data.
    BuildJobStatus {
        Pending = 1,
        Generating = 2,
        Transforming = 3,
        Storing = 4,
        Ready = 5,
        Failed = 6,
    }
}

impl BuildJobStatus {
    pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
        match id {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Generating),
            3 => Ok(Self::Transforming),
            4 => Ok(Self::Storing),
            5 => Ok(Self::Ready),
            6 => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown build job status id {other}"
            ))),
        }
    }
}

impl From<BuildStatus> for BuildJobStatus {
    fn from(status: BuildStatus) -> Self {
        match status {
            BuildStatus::Pending => Self::Pending,
            BuildStatus::Generating => Self::Generating,
            BuildStatus::Transforming => Self::Transforming,
            BuildStatus::Storing => Self::Storing,
            BuildStatus::Ready => Self::Ready,
            BuildStatus::Failed => Self::Failed,
        }
    }
}

impl From<BuildJobStatus> for BuildStatus {
    fn from(status: BuildJobStatus) -> Self {
        match status {
            BuildJobStatus::Pending => Self::Pending,
            BuildJobStatus::Generating => Self::Generating,
            BuildJobStatus::Transforming => Self::Transforming,
            BuildJobStatus::Storing => Self::Storing,
            BuildJobStatus::Ready => Self::Ready,
            BuildJobStatus::Failed => Self::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_seed_order() {
        assert_eq!(BuildJobStatus::Pending.id(), 1);
        assert_eq!(BuildJobStatus::Failed.id(), 6);
    }

    #[test]
    fn core_status_roundtrips_through_id() {
        for status in [
            BuildStatus::Pending,
            BuildStatus::Generating,
            BuildStatus::Transforming,
            BuildStatus::Storing,
            BuildStatus::Ready,
            BuildStatus::Failed,
        ] {
            let db = BuildJobStatus::from(status);
            let back = BuildJobStatus::from_id(db.id()).unwrap();
            assert_eq!(BuildStatus::from(back), status);
        }
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert!(BuildJobStatus::from_id(0).is_err());
        assert!(BuildJobStatus::from_id(7).is_err());
    }
}
