use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde representation is the same string as `as_str`.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident {
        $($(#[$vmeta:meta])* $variant:ident => $s:literal),+ $(,)?
    }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(#[derive(Default)] Urgency {
    High => "High",
    #[default]
    Medium => "Medium",
    Low => "Low",
});

str_enum!(CaseStatus {
    Pending => "pending",
    Completed => "completed",
});

str_enum!(SortOrder {
    Urgency => "urgency",
    Time => "time",
});

str_enum!(TriageStatus {
    Idle => "idle",
    Recording => "recording",
    Processing => "processing",
});

/// Remote markers meaning "analysis still running".
const PENDING_MARKERS: &[&str] = &["Pending...", "pending"];

impl Urgency {
    /// Display rank: High sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Case-insensitive match of a recognised level. `None` for anything else.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// True when the remote urgency is one of the "analysis pending" markers.
    pub fn is_pending_marker(raw: Option<&str>) -> bool {
        raw.is_some_and(|r| PENDING_MARKERS.contains(&r))
    }

    /// Map a queue-listing urgency: pending markers, absent and unknown values
    /// all land on Medium.
    pub fn from_remote(raw: Option<&str>) -> Self {
        if Self::is_pending_marker(raw) {
            return Self::Medium;
        }
        raw.and_then(Self::parse_loose).unwrap_or(Self::Medium)
    }

    /// Score badge shown for listing entries that carry no score of their own.
    pub fn default_score(&self) -> &'static str {
        match self {
            Self::High => "8/10",
            Self::Medium => "5/10",
            Self::Low => "2/10",
        }
    }
}
