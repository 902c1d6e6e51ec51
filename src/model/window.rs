use std::fmt;
use std::num::NonZeroU32;

#[allow(non_camel_case_types)]
pub type pid_t = i32;

/// An identifier representing a window, as reported by the OS layer.
///
/// The owning process id is part of the identity, which lets every window of
/// an application be dropped when the application terminates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WindowId {
    pub pid: pid_t,
    pub idx: NonZeroU32,
}

impl WindowId {
    pub fn new(pid: pid_t, idx: u32) -> WindowId {
        WindowId {
            pid,
            idx: NonZeroU32::new(idx).expect("window idx must be non-zero"),
        }
    }

    /// Parses the compact `pid:idx` form produced by `Display`.
    pub fn parse(s: &str) -> Option<WindowId> {
        let (pid, idx) = s.trim().split_once(':')?;
        Some(WindowId {
            pid: pid.parse().ok()?,
            idx: NonZeroU32::new(idx.parse().ok()?)?,
        })
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}:{}", self.pid, self.idx) }
}

impl serde::ser::Serialize for WindowId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: serde::ser::Serializer {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("WindowId", 2)?;
        s.serialize_field("pid", &self.pid)?;
        s.serialize_field("idx", &self.idx.get())?;
        s.end()
    }
}

impl<'de> serde::de::Deserialize<'de> for WindowId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::de::Deserializer<'de> {
        struct WindowIdVisitor;
        impl<'de> serde::de::Visitor<'de> for WindowIdVisitor {
            type Value = WindowId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a window id as `{pid, idx}`, `[pid, idx]` or \"pid:idx\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where E: serde::de::Error {
                WindowId::parse(v).ok_or_else(|| E::custom("invalid window id string"))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<WindowId, A::Error>
            where A: serde::de::SeqAccess<'de> {
                let pid: pid_t = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
                let idx: u32 = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::invalid_length(1, &self))?;
                let idx = NonZeroU32::new(idx)
                    .ok_or_else(|| serde::de::Error::custom("idx must be non-zero"))?;
                Ok(WindowId { pid, idx })
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where M: serde::de::MapAccess<'de> {
                let mut pid: Option<pid_t> = None;
                let mut idx: Option<u32> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "pid" => pid = Some(map.next_value()?),
                        "idx" => idx = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                let pid = pid.ok_or_else(|| serde::de::Error::missing_field("pid"))?;
                let idx = idx.ok_or_else(|| serde::de::Error::missing_field("idx"))?;
                let idx = NonZeroU32::new(idx)
                    .ok_or_else(|| serde::de::Error::custom("idx must be non-zero"))?;
                Ok(WindowId { pid, idx })
            }
        }

        deserializer.deserialize_any(WindowIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_encodings() {
        let expected = WindowId::new(42, 7);
        for input in [r#"{"pid":42,"idx":7}"#, "[42,7]", r#""42:7""#] {
            let parsed: WindowId = serde_json::from_str(input).unwrap();
            assert_eq!(parsed, expected, "input {input}");
        }
        assert!(serde_json::from_str::<WindowId>("[42,0]").is_err());
        assert_eq!(expected.to_string(), "42:7");
    }
}
