use crate::key::{DIGITS, FUNCTION_KEYS, KeyId, LETTERS};

// Word aliases, matched against the uppercased input.
macro_rules! key_aliases {
    ( $s:expr, $( $word:literal => $k:ident, )* ) => {
        match $s {
            $( $word => Some(KeyId::$k), )*
            _ => None,
        }
    };
}

/// Resolve a user-typed key name to a [`KeyId`].
///
/// Rules, in order:
/// - surrounding whitespace is trimmed; empty input is `None`
/// - a single ASCII letter is that letter key (any case)
/// - `F1`..`F12` (any case, no leading zero) is the function key
/// - a fixed word alias table (`enter`, `return`, `esc`, `ctrl`, `cmd`, ...)
/// - a single digit is the numeric key
///
/// Anything else is `None`. Unrecognised text is never an error.
pub fn resolve(raw: &str) -> Option<KeyId> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    let upper = value.to_ascii_uppercase();

    let single = single_char(&upper);
    if let Some(c) = single
        && c.is_ascii_uppercase()
    {
        return Some(LETTERS[usize::from(c as u8 - b'A')]);
    }

    if let Some(n) = function_number(&upper) {
        return Some(FUNCTION_KEYS[usize::from(n - 1)]);
    }

    if let some @ Some(_) = alias(&upper) {
        return some;
    }

    match single {
        Some(c) if c.is_ascii_digit() => Some(DIGITS[usize::from(c as u8 - b'0')]),
        _ => None,
    }
}

/// The only character of `s`, if it has exactly one.
fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Parse `F<n>` with `n` in 1..=12 and no leading zero.
fn function_number(upper: &str) -> Option<u8> {
    let digits = upper.strip_prefix('F')?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let n: u8 = digits.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

/// Look up the word alias table.
fn alias(upper: &str) -> Option<KeyId> {
    key_aliases! { upper,
        "ENTER" => Enter,
        "RETURN" => Enter,
        "ESC" => Escape,
        "ESCAPE" => Escape,
        "SPACE" => Space,
        "TAB" => Tab,
        "SHIFT" => LeftShift,
        "CTRL" => LeftControl,
        "CONTROL" => LeftControl,
        "ALT" => LeftAlt,
        "CMD" => LeftSuper,
        "COMMAND" => LeftSuper,
        "UP" => Up,
        "DOWN" => Down,
        "LEFT" => Left,
        "RIGHT" => Right,
        "BACKSPACE" => Backspace,
        "DELETE" => Delete,
    }
}
