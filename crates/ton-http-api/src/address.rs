//! Account address forms.
//!
//! An address is a workchain id plus a 32-byte account id. It travels either
//! as the raw form `<workchain>:<64 hex digits>` or as a 48-character
//! user-friendly string: base64 (standard or url-safe alphabet) over
//! `tag | workchain | account id | crc16`.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::Serialize;
use thiserror::Error;
use ton_http_api_json_rpc::GatewayError;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

const FRIENDLY_LEN: usize = 48;
const PACKED_LEN: usize = 36;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("unrecognized address format")]
    Format,
    #[error("invalid workchain: {0}")]
    Workchain(String),
    #[error("invalid account id")]
    AccountId,
    #[error("invalid base64 encoding")]
    Encoding,
    #[error("unknown address tag 0x{0:02x}")]
    Tag(u8),
    #[error("address checksum mismatch")]
    Checksum,
}

impl From<AddressError> for GatewayError {
    fn from(_: AddressError) -> Self {
        GatewayError::InvalidAddress
    }
}

/// How an address was written by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressForm {
    RawForm,
    FriendlyBounceable,
    FriendlyNonBounceable,
}

/// A decoded account address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub workchain: i8,
    pub account_id: [u8; 32],
}

/// Result of parsing: the address plus how it was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress {
    pub address: Address,
    pub form: AddressForm,
    pub test_only: bool,
}

impl Address {
    pub fn parse(input: &str) -> Result<ParsedAddress, AddressError> {
        let input = input.trim();
        if input.contains(':') {
            Self::parse_raw(input).map(|address| ParsedAddress {
                address,
                form: AddressForm::RawForm,
                test_only: false,
            })
        } else if input.len() == FRIENDLY_LEN {
            Self::parse_friendly(input)
        } else {
            Err(AddressError::Format)
        }
    }

    fn parse_raw(input: &str) -> Result<Self, AddressError> {
        let (workchain, account) = input.split_once(':').ok_or(AddressError::Format)?;
        let workchain = workchain
            .parse::<i8>()
            .map_err(|_| AddressError::Workchain(workchain.to_string()))?;

        if account.len() != 64 {
            return Err(AddressError::AccountId);
        }
        let mut account_id = [0u8; 32];
        hex::decode_to_slice(account, &mut account_id).map_err(|_| AddressError::AccountId)?;

        Ok(Self {
            workchain,
            account_id,
        })
    }

    fn parse_friendly(input: &str) -> Result<ParsedAddress, AddressError> {
        let engine = if input.contains(['-', '_']) {
            &URL_SAFE
        } else {
            &STANDARD
        };
        let bytes = engine.decode(input).map_err(|_| AddressError::Encoding)?;
        if bytes.len() != PACKED_LEN {
            return Err(AddressError::Format);
        }

        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != expected {
            return Err(AddressError::Checksum);
        }

        let tag = bytes[0];
        let test_only = tag & TAG_TEST_ONLY != 0;
        let form = match tag & !TAG_TEST_ONLY {
            TAG_BOUNCEABLE => AddressForm::FriendlyBounceable,
            TAG_NON_BOUNCEABLE => AddressForm::FriendlyNonBounceable,
            _ => return Err(AddressError::Tag(tag)),
        };

        let mut account_id = [0u8; 32];
        account_id.copy_from_slice(&bytes[2..34]);

        Ok(ParsedAddress {
            address: Address {
                workchain: bytes[1] as i8,
                account_id,
            },
            form,
            test_only,
        })
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.account_id))
    }

    fn pack(&self, bounceable: bool, test_only: bool) -> [u8; PACKED_LEN] {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut bytes = [0u8; PACKED_LEN];
        bytes[0] = tag;
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.account_id);
        let crc = crc16(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());
        bytes
    }

    pub fn to_friendly(&self, bounceable: bool, test_only: bool, url_safe: bool) -> String {
        let packed = self.pack(bounceable, test_only);
        if url_safe {
            URL_SAFE.encode(packed)
        } else {
            STANDARD.encode(packed)
        }
    }

    fn encodings(&self, bounceable: bool, test_only: bool) -> FriendlyForms {
        FriendlyForms {
            b64: self.to_friendly(bounceable, test_only, false),
            b64url: self.to_friendly(bounceable, test_only, true),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendlyForms {
    pub b64: String,
    pub b64url: String,
}

/// Every form of an address, as returned by `detectAddress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedAddress {
    pub raw_form: String,
    pub bounceable: FriendlyForms,
    pub non_bounceable: FriendlyForms,
    pub given_type: AddressForm,
    pub test_only: bool,
}

pub fn detect_address(input: &str) -> Result<DetectedAddress, AddressError> {
    let parsed = Address::parse(input)?;
    let address = parsed.address;
    Ok(DetectedAddress {
        raw_form: address.to_raw(),
        bounceable: address.encodings(true, parsed.test_only),
        non_bounceable: address.encodings(false, parsed.test_only),
        given_type: parsed.form,
        test_only: parsed.test_only,
    })
}

/// User-friendly form handed to the client. Raw input becomes bounceable
/// base64url; friendly input is checked and kept as written.
pub fn prepare_address(input: &str) -> Result<String, AddressError> {
    let parsed = Address::parse(input)?;
    match parsed.form {
        AddressForm::RawForm => Ok(parsed.address.to_friendly(true, false, true)),
        AddressForm::FriendlyBounceable | AddressForm::FriendlyNonBounceable => {
            Ok(input.trim().to_string())
        }
    }
}

// CRC-16/XMODEM
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
