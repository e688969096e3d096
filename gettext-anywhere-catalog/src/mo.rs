use crate::catalog::{Catalog, CatalogContent, Translation};
use crate::plural::PluralRule;
use crate::{CatalogParser, Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::HashMap;
use tracing::trace;

/// The magic number of GNU MO files (as read in the byte order the file was written in).
pub const MAGIC: u32 = 0x950412de;

/// The size of the fixed MO file header that precedes the offset tables.
pub const HEADER_SIZE: usize = 28;

/// The charsets that catalog messages can be decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    Utf8,
    Ascii,
    Latin1,
}

impl Charset {
    fn from_label(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "ascii" | "us-ascii" | "ansi_x3.4-1968" => Ok(Charset::Ascii),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" => {
                Ok(Charset::Latin1)
            }
            _ => Err(Error::UnsupportedCharset {
                charset: label.to_string(),
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Ascii => "ascii",
            Charset::Latin1 => "iso-8859-1",
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String> {
        let invalid = || Error::InvalidEncoding {
            charset: self.name(),
        };
        match self {
            Charset::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| invalid()),
            Charset::Ascii if bytes.is_ascii() => {
                String::from_utf8(bytes.to_vec()).map_err(|_| invalid())
            }
            Charset::Ascii => Err(invalid()),
            Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// The parser for compiled GNU gettext catalogs (`.mo` files).
#[derive(Debug, Clone, Copy, Default)]
pub struct MoParser;

impl CatalogParser for MoParser {
    fn kind(&self) -> &'static str {
        "mo"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Catalog> {
        parse(bytes).map(Catalog::new)
    }
}

/// Parses the raw bytes of a MO file into catalog content.
///
/// Both byte orders are accepted. Empty or truncated input is rejected, so a handler that
/// reads nothing for a vanished catalog fails here instead of producing an empty catalog.
pub fn parse(bytes: &[u8]) -> Result<CatalogContent> {
    let Some(magic) = bytes.get(..4) else {
        return Err(Error::Truncated {
            length: bytes.len(),
        });
    };

    if LittleEndian::read_u32(magic) == MAGIC {
        parse_ordered::<LittleEndian>(bytes)
    } else if BigEndian::read_u32(magic) == MAGIC {
        parse_ordered::<BigEndian>(bytes)
    } else {
        Err(Error::BadMagic {
            magic: LittleEndian::read_u32(magic),
        })
    }
}

fn parse_ordered<B: ByteOrder>(bytes: &[u8]) -> Result<CatalogContent> {
    let Some(header) = bytes.get(..HEADER_SIZE) else {
        return Err(Error::Truncated {
            length: bytes.len(),
        });
    };

    let revision = B::read_u32(&header[4..8]);
    if revision >> 16 > 1 {
        return Err(Error::UnsupportedRevision { revision });
    }
    let count = B::read_u32(&header[8..12]) as usize;
    let originals = B::read_u32(&header[12..16]) as usize;
    let translations = B::read_u32(&header[16..20]) as usize;
    trace!(revision, count, "parsing mo catalog");

    // both descriptor tables must lie within the input before anything is reserved for them
    for table in [originals, translations] {
        let end = count
            .checked_mul(8)
            .and_then(|size| size.checked_add(table))
            .ok_or(Error::Corrupt { offset: table })?;
        if end > bytes.len() {
            return Err(Error::Corrupt { offset: table });
        }
    }

    // collect all raw entries first, the header entry determines how the others are decoded
    let mut raw = Vec::with_capacity(count);
    for index in 0..count {
        let original = string_at::<B>(bytes, originals, index)?;
        let translation = string_at::<B>(bytes, translations, index)?;
        raw.push((original, translation));
    }

    let mut content = CatalogContent::default();
    if let Some((_, header)) = raw.iter().find(|(original, _)| original.is_empty()) {
        parse_header(header, &mut content)?;
    }
    let charset = match content.charset.as_deref() {
        Some(label) => Charset::from_label(label)?,
        None => Charset::Ascii,
    };

    let mut entries = HashMap::with_capacity(raw.len());
    for (original, translation) in raw {
        match original.iter().position(|&b| b == 0) {
            Some(split) => {
                let singular = charset.decode(&original[..split])?;
                let forms = translation
                    .split(|&b| b == 0)
                    .map(|form| charset.decode(form))
                    .collect::<Result<Vec<_>>>()?;
                entries.insert(singular, Translation::Plural(forms));
            }
            None => {
                entries.insert(
                    charset.decode(original)?,
                    Translation::Singular(charset.decode(translation)?),
                );
            }
        }
    }
    content.entries = entries;

    Ok(content)
}

/// Resolves the string referenced by the `index`-th descriptor of the table at `table`.
fn string_at<B: ByteOrder>(bytes: &[u8], table: usize, index: usize) -> Result<&[u8]> {
    let descriptor = index
        .checked_mul(8)
        .and_then(|offset| offset.checked_add(table))
        .ok_or(Error::Corrupt { offset: table })?;
    let entry = descriptor
        .checked_add(8)
        .and_then(|end| bytes.get(descriptor..end))
        .ok_or(Error::Corrupt { offset: descriptor })?;

    let length = B::read_u32(&entry[..4]) as usize;
    let offset = B::read_u32(&entry[4..]) as usize;
    offset
        .checked_add(length)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(Error::Corrupt { offset })
}

/// Reads the metadata of the header entry (the translation of the empty message id).
fn parse_header(header: &[u8], content: &mut CatalogContent) -> Result<()> {
    let header = Charset::Utf8.decode(header)?;

    let mut last_key: Option<String> = None;
    for line in header.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        // separators left behind by msgcat when merging headers
        if line.starts_with("#-#-#-#-#") && line.ends_with("#-#-#-#-#") {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            if let Some(value) = last_key.as_ref().and_then(|key| content.info.get_mut(key)) {
                value.push('\n');
                value.push_str(line);
            }
            continue;
        };

        let key = key.trim().to_lowercase();
        let value = value.trim();
        match key.as_str() {
            "content-type" => {
                if let Some((_, charset)) = value.split_once("charset=") {
                    let charset = charset.split(';').next().unwrap_or(charset).trim();
                    content.charset = Some(charset.to_string());
                }
            }
            "plural-forms" => content.plural = PluralRule::from_header(value)?,
            _ => {}
        }
        content.info.insert(key.clone(), value.to_string());
        last_key = Some(key);
    }

    Ok(())
}
