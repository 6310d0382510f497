// Licensed under the Apache-2.0 license

//! Utility functions for identifier validation and formatting.
//!
//! This module provides the naming rules shared by fields, registers,
//! interrupts and internal signals, plus small formatting helpers used by
//! the address map dump.

/// Returns whether `s` is a valid lowercase-style name: an ASCII letter
/// followed by letters, digits and underscores.
///
/// # Examples
/// ```
/// use regfile_compiler::util::is_valid_name;
/// assert!(is_valid_name("rx_data"));
/// assert!(is_valid_name("Ctrl0"));
/// assert!(!is_valid_name("3com"));
/// assert!(!is_valid_name("rx-data"));
/// ```
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns whether `s` is a valid mnemonic: an uppercase ASCII letter
/// followed by uppercase letters, digits and underscores.
///
/// # Examples
/// ```
/// use regfile_compiler::util::is_valid_mnemonic;
/// assert!(is_valid_mnemonic("RXD"));
/// assert!(is_valid_mnemonic("CTRL_2"));
/// assert!(!is_valid_mnemonic("rxd"));
/// ```
pub fn is_valid_mnemonic(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Collapses runs of whitespace into single spaces and trims the ends.
/// Used for brief documentation strings, which must be single-line.
///
/// # Examples
/// ```
/// use regfile_compiler::util::collapse_whitespace;
/// assert_eq!(collapse_whitespace(" controls  the\n thing "), "controls the thing");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the uppercase letter suffix for block `index`, `A` through `Z`.
/// Returns `None` past `Z`; registers that wide are rejected by the caller.
///
/// # Examples
/// ```
/// use regfile_compiler::util::block_letter;
/// assert_eq!(block_letter(0), Some('A'));
/// assert_eq!(block_letter(25), Some('Z'));
/// assert_eq!(block_letter(26), None);
/// ```
pub fn block_letter(index: usize) -> Option<char> {
    if index < 26 {
        char::from_u32('A' as u32 + index as u32)
    } else {
        None
    }
}

/// Formats an integer as a hex constant with underscores for readability.
///
/// Values <= 9 are formatted as decimal; larger values use hex with
/// underscore separators every 4 digits.
///
/// # Examples
/// ```
/// use regfile_compiler::util::hex_const;
/// assert_eq!(hex_const(5), "5");
/// assert_eq!(hex_const(0x12345678), "0x1234_5678");
/// ```
pub fn hex_const(val: u64) -> String {
    if val > 9 {
        let mut x = String::new();
        for (i, c) in format!("{val:x}").chars().rev().enumerate() {
            if i % 4 == 0 && i != 0 {
                x.push('_');
            }
            x.push(c);
        }
        "0x".to_string() + &x.chars().rev().collect::<String>()
    } else {
        format!("{val}")
    }
}
