mod hex_range;
mod hex_u_int;
mod serialize_u_int;

pub(crate) use hex_range::serialize as hex_range;
pub(crate) use hex_u_int::serialize as hex_u_int;
