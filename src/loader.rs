use miette::Result;

use crate::error;
use crate::runtime::MEMORY_SIZE;

/// Program bytes, guaranteed to fit in memory.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    /// Parse a text image: one base-2 byte per line, `#` starts a comment.
    pub fn parse(src: &str) -> Result<Image> {
        let mut bytes = Vec::new();
        let mut offs = 0;

        for line in src.split_inclusive('\n') {
            let code = match line.find('#') {
                Some(comment) => &line[..comment],
                None => line,
            };
            let lit = code.trim();
            if !lit.is_empty() {
                let start = offs + code.len() - code.trim_start().len();
                let span = start..start + lit.len();

                let byte = u8::from_str_radix(lit, 2)
                    .map_err(|e| error::load_bad_lit(span.clone(), src, e))?;
                if bytes.len() == MEMORY_SIZE {
                    return Err(error::load_too_large(span, src));
                }
                bytes.push(byte);
            }
            offs += line.len();
        }

        Ok(Image { bytes })
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Image> {
        if raw.len() > MEMORY_SIZE {
            return Err(error::load_too_large_raw(raw.len()));
        }
        Ok(Image {
            bytes: raw.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
