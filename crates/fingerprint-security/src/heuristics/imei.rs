// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! IMEI structural validation.

use std::ops::RangeInclusive;

const VALID_LENGTH: RangeInclusive<usize> = 14..=16;

/// Why an IMEI failed structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImeiViolation {
    NonDigit,
    Length(usize),
    Luhn,
}

impl ImeiViolation {
    pub fn reason(&self) -> String {
        match self {
            ImeiViolation::NonDigit => "imei_non_digit".to_string(),
            ImeiViolation::Length(len) => format!("imei_length_{len}"),
            ImeiViolation::Luhn => "imei_luhn".to_string(),
        }
    }
}

pub fn check_imei(imei: &str) -> Result<(), ImeiViolation> {
    if imei.is_empty() || !imei.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ImeiViolation::NonDigit);
    }
    if !VALID_LENGTH.contains(&imei.len()) {
        return Err(ImeiViolation::Length(imei.len()));
    }
    if !luhn_valid(imei) {
        return Err(ImeiViolation::Luhn);
    }
    Ok(())
}

pub fn imei_valid(imei: &str) -> bool {
    check_imei(imei).is_ok()
}

/// Luhn checksum over an ASCII digit string, doubling every second digit
/// from the right.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let mut d = u32::from(b - b'0');
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("490154203237518", true)]
    #[case("490154203237519", false)]
    #[case("12AB", false)]
    #[case("35145120840121", true)]
    #[case("", false)]
    fn test_imei_valid(#[case] imei: &str, #[case] expected: bool) {
        assert_eq!(imei_valid(imei), expected);
    }

    #[rstest]
    #[case("12AB", ImeiViolation::NonDigit, "imei_non_digit")]
    #[case("4901542032", ImeiViolation::Length(10), "imei_length_10")]
    #[case("490154203237519", ImeiViolation::Luhn, "imei_luhn")]
    fn test_violation_reason(
        #[case] imei: &str,
        #[case] violation: ImeiViolation,
        #[case] reason: &str,
    ) {
        assert_eq!(check_imei(imei), Err(violation));
        assert_eq!(violation.reason(), reason);
    }

    #[test]
    fn test_all_zero_imei_passes_structure() {
        // structurally valid, caught elsewhere if at all
        assert!(imei_valid("000000000000000"));
    }
}
