use crate::catalog::CONTEXT_SEPARATOR;
use crate::mo::{HEADER_SIZE, MAGIC};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::Write;

/// Compiles messages into the binary GNU MO format.
///
/// Entries are written sorted by their original string (as required by the format) and
/// without a hash table.
#[derive(Debug, Clone, Default)]
pub struct MoWriter {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header entry (the translation of the empty message id).
    pub fn header(self, header: &str) -> Self {
        self.raw(Vec::new(), header.as_bytes().to_vec())
    }

    pub fn message(self, msgid: &str, msgstr: &str) -> Self {
        self.raw(msgid.as_bytes().to_vec(), msgstr.as_bytes().to_vec())
    }

    pub fn context_message(self, context: &str, msgid: &str, msgstr: &str) -> Self {
        self.message(&format!("{context}{CONTEXT_SEPARATOR}{msgid}"), msgstr)
    }

    pub fn plural(self, msgid: &str, msgid_plural: &str, forms: &[&str]) -> Self {
        self.raw(
            format!("{msgid}\0{msgid_plural}").into_bytes(),
            forms.join("\0").into_bytes(),
        )
    }

    /// Adds an entry from already encoded bytes.
    pub fn raw(mut self, original: Vec<u8>, translation: Vec<u8>) -> Self {
        self.entries.insert(original, translation);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bytes_with::<LittleEndian>()
    }

    /// Compiles the catalog using byte order `B`.
    pub fn to_bytes_with<B: ByteOrder>(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // writing into a vector cannot fail
        let _ = self.write_to::<B, _>(&mut buffer);
        buffer
    }

    /// Writes the compiled catalog into `writer` using byte order `B`.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let count = self.entries.len();
        let originals_table = HEADER_SIZE;
        let translations_table = originals_table + 8 * count;
        let data_start = translations_table + 8 * count;

        // lay out all strings (NUL terminated) behind the tables
        let mut data = Vec::new();
        let mut originals = Vec::with_capacity(count);
        let mut translations = Vec::with_capacity(count);
        for original in self.entries.keys() {
            originals.push((original.len(), data_start + data.len()));
            data.extend_from_slice(original);
            data.push(0);
        }
        for translation in self.entries.values() {
            translations.push((translation.len(), data_start + data.len()));
            data.extend_from_slice(translation);
            data.push(0);
        }

        writer.write_u32::<B>(MAGIC)?;
        // revision
        writer.write_u32::<B>(0)?;
        writer.write_u32::<B>(to_u32(count)?)?;
        writer.write_u32::<B>(to_u32(originals_table)?)?;
        writer.write_u32::<B>(to_u32(translations_table)?)?;
        // hash table size and offset
        writer.write_u32::<B>(0)?;
        writer.write_u32::<B>(to_u32(data_start)?)?;
        for (length, offset) in originals.into_iter().chain(translations) {
            writer.write_u32::<B>(to_u32(length)?)?;
            writer.write_u32::<B>(to_u32(offset)?)?;
        }
        writer.write_all(&data)
    }
}

fn to_u32(value: usize) -> std::io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "catalog exceeds the 4 GiB limit of the MO format",
        )
    })
}
