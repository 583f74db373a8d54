//! JNI native-method symbol names.
//!
//! Input is modified UTF-8 as the VM stores it. Decoding follows the VM's
//! legacy decoder exactly, including its lossy handling of four-byte leads.
//!
//! ```
//! use pcall_agent::mangle::{mangle_for_jni, mangled_name};
//!
//! assert_eq!(mangle_for_jni("com/example/Foo"), "com_example_Foo");
//! assert_eq!(mangled_name("com/example/Foo", "bar"), "Java_com_example_Foo_bar");
//! ```

use std::fmt::Write;

/// UTF-16 code units decoded from modified UTF-8.
///
/// The lead byte is classified by testing `0x80`, `0x20` and `0x10` in turn.
/// Anything past the three-byte form is not decoded: three further bytes are
/// skipped and `0` is produced. Bytes missing at the end of input read as `0`.
#[derive(Debug, Clone)]
pub struct Mutf8Units<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Mutf8Units<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Mutf8Units { bytes, pos: 0 }
    }

    fn take(&mut self) -> u16 {
        let byte = self.bytes.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        u16::from(byte)
    }
}

impl Iterator for Mutf8Units<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let one = self.take();
        if one & 0x80 == 0 {
            return Some(one);
        }

        let two = self.take();
        if one & 0x20 == 0 {
            return Some(((one & 0x1f) << 6) | (two & 0x3f));
        }

        let three = self.take();
        if one & 0x10 == 0 {
            return Some(((one & 0x0f) << 12) | ((two & 0x3f) << 6) | (three & 0x3f));
        }

        // Four-byte lead.
        self.pos += 3;
        Some(0)
    }
}

/// Escapes one modified-UTF-8 string for use in a JNI symbol.
pub fn mangle_for_jni<S: AsRef<[u8]> + ?Sized>(input: &S) -> String {
    let bytes = input.as_ref();
    let mut out = String::with_capacity(bytes.len());

    for unit in Mutf8Units::new(bytes) {
        match unit {
            0x30..=0x39 | 0x41..=0x5a | 0x61..=0x7a => out.push(char::from(unit as u8)),
            0x2e | 0x2f => out.push('_'),
            0x5f => out.push_str("_1"),
            0x3b => out.push_str("_2"),
            0x5b => out.push_str("_3"),
            _ => {
                let _ = write!(out, "_0{:04x}", unit);
            }
        }
    }
    out
}

/// `Java_<class>_<method>`.
pub fn mangled_name<C, M>(class_signature: &C, identifier: &M) -> String
where
    C: AsRef<[u8]> + ?Sized,
    M: AsRef<[u8]> + ?Sized,
{
    format!("Java_{}_{}", mangle_for_jni(class_signature), mangle_for_jni(identifier))
}
