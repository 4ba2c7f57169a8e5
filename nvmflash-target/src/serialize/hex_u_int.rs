use super::serialize_u_int::SerializeUnsignedInt;
use serde::{self, Serializer};

pub(crate) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: std::fmt::LowerHex + SerializeUnsignedInt,
{
    // Register addresses and magic values read best as hex in YAML.
    if serializer.is_human_readable() {
        serializer.serialize_str(format!("{value:#x}").as_str())
    } else {
        value.serialize_int(serializer)
    }
}
