use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            /// Generate a fresh identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                s.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a maintenance task (UUID v7).
    TaskId
);
uuid_id!(
    /// Identifier of a dependency edge (UUID v7).
    DependencyId
);
uuid_id!(
    /// Identifier of a schedule change record (UUID v7).
    ScheduleEventId
);
uuid_id!(
    /// Identifier of a tenant organization.
    TenantId
);
uuid_id!(
    /// Identifier of a user (scheduler, mechanic, admin...).
    UserId
);
uuid_id!(
    /// Identifier of an aircraft.
    AircraftId
);
uuid_id!(
    /// Identifier of the maintenance program a task originated from.
    ProgramId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_uses_uuid_v7() {
        let id = TaskId::new();
        assert_eq!(id.0.get_version_num(), 7);
    }

    #[test]
    fn task_id_roundtrip() -> Result<(), uuid::Error> {
        let uuid = Uuid::now_v7();
        let parsed: TaskId = uuid.to_string().parse()?;
        assert_eq!(parsed.0, uuid);
        Ok(())
    }

    #[test]
    fn ids_serialize_as_plain_strings() -> Result<(), serde_json::Error> {
        let id = DependencyId::new();
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, format!("\"{id}\""));
        let back: DependencyId = serde_json::from_str(&json)?;
        assert_eq!(back, id);
        Ok(())
    }

    #[test]
    fn malformed_id_is_rejected() {
        assert!("not-a-uuid".parse::<TenantId>().is_err());
    }
}
