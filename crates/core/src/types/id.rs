//! Newtype IDs for backend entity references.
//!
//! The REST backend hands out integer IDs for every entity. Wrapping them
//! keeps a `CourseId` from ever being passed where a `ProductId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>`, `Into<i32>` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use ringside_core::define_id;
/// define_id!(GymId);
/// define_id!(CoachId);
///
/// let gym = GymId::new(1);
/// let coach = CoachId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: GymId = coach;
/// # let _ = (gym, coach);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(CourseId);
define_id!(LessonId);
define_id!(ProductId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&CourseId::new(42)).unwrap();
        assert_eq!(json, "42");

        let id: LessonId = serde_json::from_str("7").unwrap();
        assert_eq!(id.as_i32(), 7);
    }

    #[test]
    fn test_id_from_str_trims() {
        let id: ProductId = " 12 ".parse().unwrap();
        assert_eq!(id, ProductId::new(12));
        assert!("twelve".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_id_ordering_follows_inner_value() {
        assert!(CourseId::new(1) < CourseId::new(2));
    }
}
