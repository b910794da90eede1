//! RFC 6901 JSON pointer evaluation helpers.

use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Percent-decode a pointer fragment and split it into reference tokens.
///
/// The whole fragment is decoded before splitting, so `%2F` produces a
/// token boundary; escaping `/` inside a token is `~1`'s job. Token
/// escapes decode `~1` before `~0` so that `~01` comes out as `~1`.
pub(crate) fn tokens(pointer: &str) -> Vec<String> {
    let decoded = percent_decode_str(pointer).decode_utf8_lossy();
    let unprefixed = decoded.strip_prefix('/').unwrap_or(&decoded);
    unprefixed
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Descend one reference token into a value.
///
/// Objects step by property, arrays by integer index; anything else (and
/// any absent property or out-of-bounds index) is a dead end.
pub(crate) fn step<'v>(value: &'v Value, token: &str) -> Option<&'v Value> {
    match value {
        Value::Object(object) => object.get(token),
        Value::Array(array) => token.parse::<usize>().ok().and_then(|index| array.get(index)),
        _ => None,
    }
}
