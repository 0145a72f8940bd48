use ufmt::{uDisplay, uWrite, Formatter};

/// Compact identity of a source checkpoint: the first four bytes of the file name and of the
/// function name, each packed big-endian into a word
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Packed file name
    pub file: u32,
    /// Packed function name
    pub function: u32,
}

/// Packs the first four bytes of `file_name` and `func_name` into a [`Tag`]
///
/// Names shorter than four bytes are padded on the right with zeros.
pub const fn encode_tag(file_name: &str, func_name: &str) -> Tag {
    Tag {
        file: pack(file_name.as_bytes()),
        function: pack(func_name.as_bytes()),
    }
}

// byte0 << 24 | byte1 << 16 | byte2 << 8 | byte3
const fn pack(name: &[u8]) -> u32 {
    let mut word = 0;
    let mut i = 0;
    while i < 4 {
        word <<= 8;
        if i < name.len() {
            word |= name[i] as u32;
        }
        i += 1;
    }
    word
}

impl Tag {
    /// The two mailbox words, file first
    pub const fn words(self) -> [u32; 2] {
        [self.file, self.function]
    }
}

/// Writes the packed name, dropping the zero padding and replacing non printable bytes with `?`
fn fmt_name<W>(word: u32, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    let mut bytes = word.to_be_bytes();
    let len = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    for byte in &mut bytes[..len] {
        if !byte.is_ascii_graphic() && *byte != b' ' {
            *byte = b'?';
        }
    }

    // only ASCII left
    match core::str::from_utf8(&bytes[..len]) {
        Ok(s) => f.write_str(s),
        Err(_) => f.write_str("?"),
    }
}

impl uDisplay for Tag {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        fmt_name(self.file, f)?;
        f.write_str(":")?;
        fmt_name(self.function, f)
    }
}

#[cfg(test)]
mod tests {
    use crate::fake::render;

    use super::{encode_tag, Tag};

    #[test]
    fn packs_big_endian() {
        let tag = encode_tag("src/main.rs", "main");

        assert_eq!(tag.file, u32::from_be_bytes(*b"src/"));
        assert_eq!(tag.function, 0x6d61_696e);
        assert_eq!(tag.words(), [tag.file, tag.function]);
    }

    #[test]
    fn truncates_long_names() {
        assert_eq!(encode_tag("abcdefgh", "ipc_cmd_handler"), encode_tag("abcd", "ipc_"));
    }

    #[test]
    fn pads_short_names_with_zeros() {
        let tag = encode_tag("a.c", "");

        assert_eq!(tag.file, 0x612e_6300);
        assert_eq!(tag.function, 0);
        assert_eq!(encode_tag("x", "ab").function, 0x6162_0000);
    }

    #[test]
    fn usable_in_const_context() {
        const TAG: Tag = encode_tag("dma.c", "dma_start");

        assert_eq!(TAG.file, u32::from_be_bytes(*b"dma."));
    }

    #[test]
    fn renders_names() {
        assert_eq!(render(&encode_tag("src/lib.rs", "init")), "src/:init");
        assert_eq!(render(&encode_tag("a", "")), "a:");
        assert_eq!(
            render(&Tag {
                file: 0x4142_0a43,
                function: 0,
            }),
            "AB?C:"
        );
    }
}
