use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde representation is the same string as `as_str`.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Scheduled => "Scheduled",
    Cancelled => "Cancelled",
    Completed => "Completed",
});

str_enum!(RecordStatus {
    Scheduled => "Scheduled",
    Completed => "Completed",
    Rescheduled => "Rescheduled",
});

str_enum!(Gender {
    Male => "Male",
    Female => "Female",
});

str_enum!(MeasurementKind {
    Height => "height",
    Weight => "weight",
    HeadCircumference => "headCircumference",
});

str_enum!(EventStatus {
    Upcoming => "Upcoming",
    Ongoing => "Ongoing",
    Completed => "Completed",
});

// Tab selector shared by the appointment list and the vaccine list.
str_enum!(StatusTab {
    All => "All",
    Scheduled => "Scheduled",
    Completed => "Completed",
});

impl MeasurementKind {
    /// Field name of the matching history inside `measurements`.
    pub fn history_field(&self) -> &'static str {
        match self {
            Self::Height => "heightHistory",
            Self::Weight => "weightHistory",
            Self::HeadCircumference => "headCircumferenceHistory",
        }
    }
}

impl Default for StatusTab {
    fn default() -> Self {
        Self::All
    }
}
