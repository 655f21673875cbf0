// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! Token wire-format codec.
//!
//! A signed token travels in two shapes. On the wire towards the
//! cryptographic tooling it is a PEM-armored CMS block: a `BEGIN CMS`
//! delimiter line, the base64 body wrapped at 64 characters per line and an
//! `END CMS` delimiter line. In an HTTP header it is the compact form: the
//! same base64 body with the delimiters and newlines stripped and `/`
//! replaced by `-`, since `/` is not safe in every place a token id ends up
//! in. The two transforms here are exact inverses of each other; neither
//! validates the structure - that is the job of the verification backend.

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

use crate::cms::error::CmsProviderError;

/// Prefix of every base64 encoded DER SEQUENCE with a 2-octet long-form
/// length, i.e. of every realistically sized signed token.
pub const PKI_ASN1_PREFIX: &str = "MII";

/// Prefix marking a zlib-compressed (PKIZ) signed token.
pub const PKIZ_PREFIX: &str = "PKIZ_";

const BEGIN_CMS_MARKER: &str = "-----BEGIN CMS-----";
const END_CMS_MARKER: &str = "-----END CMS-----";

/// Width of the base64 body lines inside the PEM armor. The external tool
/// rejects any other wrapping.
const CMS_LINE_WIDTH: usize = 64;

/// Whether the token is an uncompressed signed (PKI) token.
///
/// A DER SEQUENCE whose length takes two octets encodes as `0x30 0x82 ...`,
/// and the base64 of that always starts with `MII`. Tokens large enough to
/// need three or more length octets produce a different prefix and are not
/// recognized here; real-world tokens stay far below that size.
pub fn is_asn1_token(token: &str) -> bool {
    token.starts_with(PKI_ASN1_PREFIX)
}

/// Whether the token is a compressed (PKIZ) signed token.
pub fn is_pkiz(token: &str) -> bool {
    token.starts_with(PKIZ_PREFIX)
}

/// Whether the token carries a signature at all, as opposed to being a
/// short opaque identifier that is used as a lookup key directly.
pub fn is_signed_token(token: &str) -> bool {
    is_asn1_token(token) || is_pkiz(token)
}

/// Expand the compact token into the PEM-armored CMS block.
///
/// Reverses the `/` -> `-` substitution, wraps the body at 64 characters
/// per line and adds the delimiter lines. The output matches the PEM input
/// the external tool expects byte for byte.
pub fn token_to_cms(signed_text: &str) -> String {
    let body = signed_text.replace('-', "/");
    let mut out = String::with_capacity(body.len() + body.len() / CMS_LINE_WIDTH + 64);
    out.push_str(BEGIN_CMS_MARKER);
    out.push('\n');
    let mut width = 0;
    for ch in body.chars() {
        out.push(ch);
        width += 1;
        if width == CMS_LINE_WIDTH {
            out.push('\n');
            width = 0;
        }
    }
    if width > 0 {
        out.push('\n');
    }
    out.push_str(END_CMS_MARKER);
    out.push('\n');
    out
}

/// Collapse a PEM-armored CMS block into the compact token form.
///
/// Strips the delimiter lines and newlines and substitutes `/` with `-`.
/// Deliberately lenient: missing delimiters or a missing trailing newline
/// are not errors, the text simply passes through the substitutions.
pub fn cms_to_token(cms_text: &str) -> String {
    cms_text
        .replace(BEGIN_CMS_MARKER, "")
        .replace(END_CMS_MARKER, "")
        .replace('\n', "")
        .replace('/', "-")
}

/// Encode a DER signed structure into the compact PKIZ token form:
/// `PKIZ_` followed by the urlsafe base64 of the zlib-compressed data.
pub fn pkiz_encode(der: &[u8], compression_level: u32) -> Result<String, CmsProviderError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(compression_level.min(9)));
    encoder.write_all(der)?;
    let compressed = encoder.finish()?;
    Ok(format!("{PKIZ_PREFIX}{}", URL_SAFE.encode(compressed)))
}

/// Decode a compact PKIZ token back into the DER signed structure.
pub fn pkiz_decode(credential: &str) -> Result<Vec<u8>, CmsProviderError> {
    let body = credential.strip_prefix(PKIZ_PREFIX).unwrap_or(credential);
    let compressed = URL_SAFE.decode(body)?;
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut der = Vec::new();
    decoder.read_to_end(&mut der)?;
    Ok(der)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Matches the alphabet the signing tool emits: standard base64 with
    // padding, `/` already substituted.
    fn sample_token(len: usize) -> String {
        let mut token = String::from(PKI_ASN1_PREFIX);
        while token.len() < len {
            token.push_str("AQIDBAUGBwgJ-abcdefghij+klmnopqrstuvwxyz0123456789-ABCDEFGH");
        }
        token.truncate(len - 2);
        token.push_str("==");
        token
    }

    #[test]
    fn test_roundtrip() {
        for len in [16, 63, 64, 65, 128, 1000, 4097] {
            let token = sample_token(len);
            assert_eq!(token, cms_to_token(&token_to_cms(&token)));
        }
    }

    #[test]
    fn test_roundtrip_random_body() {
        use rand::distr::{Alphanumeric, SampleString};
        let body = Alphanumeric.sample_string(&mut rand::rng(), 3000);
        let token = format!("MII{body}-{body}=");
        assert_eq!(token, cms_to_token(&token_to_cms(&token)));
    }

    #[test]
    fn test_armor_layout() {
        let token = sample_token(1000);
        let armored = token_to_cms(&token);
        let lines: Vec<&str> = armored.split_terminator('\n').collect();
        assert_eq!(Some(&BEGIN_CMS_MARKER), lines.first());
        assert_eq!(Some(&END_CMS_MARKER), lines.last());
        let body = &lines[1..lines.len() - 1];
        for line in &body[..body.len() - 1] {
            assert_eq!(CMS_LINE_WIDTH, line.len());
        }
        assert!(body[body.len() - 1].len() <= CMS_LINE_WIDTH);
        assert!(armored.ends_with('\n'));
        // The `-` -> `/` substitution must leave no `-` in the body.
        assert!(!body.concat().contains('-'));
    }

    #[test]
    fn test_cms_to_token_lenient() {
        // No delimiters at all: only the substitutions apply.
        assert_eq!("MIIab-cd", cms_to_token("MIIab/cd"));
        // Trailing newline after the footer is optional.
        let armored = token_to_cms("MIIabcd-");
        assert_eq!("MIIabcd-", cms_to_token(armored.trim_end()));
        assert_eq!("MIIabcd-", cms_to_token(&armored));
    }

    #[test]
    fn test_is_asn1_token() {
        assert!(is_asn1_token(&sample_token(1000)));
        assert!(is_asn1_token("MII"));
        assert!(!is_asn1_token(""));
        assert!(!is_asn1_token("MI"));
        // An opaque UUID style identifier.
        assert!(!is_asn1_token("8286720fbe4941e69fa8241723bb02df"));
        // PKIZ tokens have their own marker.
        assert!(!is_asn1_token("PKIZ_eJwLycgsVgCi4vzcVIXixNyCnFQ9AEPvB70="));
    }

    #[test]
    fn test_is_signed_token() {
        assert!(is_signed_token("MIIabcd"));
        assert!(is_signed_token("PKIZ_abcd"));
        assert!(!is_signed_token("8286720fbe4941e69fa8241723bb02df"));
        assert!(!is_signed_token(""));
    }

    #[test]
    fn test_pkiz_roundtrip() {
        let der: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let token = pkiz_encode(&der, 6).unwrap();
        assert!(is_pkiz(&token));
        assert_eq!(der, pkiz_decode(&token).unwrap());
    }

    #[test]
    fn test_pkiz_decode_garbage() {
        assert!(pkiz_decode("PKIZ_not/valid/base64!").is_err());
        // Valid base64, but not a zlib stream.
        let bogus = format!("{PKIZ_PREFIX}{}", URL_SAFE.encode(b"plain bytes"));
        assert!(pkiz_decode(&bogus).is_err());
    }
}
