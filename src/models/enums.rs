use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
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

str_enum!(SourceKind {
    Arxiv => "arxiv",
    Scopus => "scopus",
    IeeeXplore => "ieee_xplore",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn source_kind_round_trips_through_str() {
        for kind in [SourceKind::Arxiv, SourceKind::Scopus, SourceKind::IeeeXplore] {
            assert_eq!(SourceKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        let err = SourceKind::from_str("pubmed").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serde_uses_config_spelling() {
        let json = serde_json::to_string(&SourceKind::IeeeXplore).unwrap();
        assert_eq!(json, "\"ieee_xplore\"");
    }
}
