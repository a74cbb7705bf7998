//! Structural validators for pattern matches.
//!
//! A validator receives the matched text and returns `false` to suppress the match.
//! Rejection is not an error; the catalog counts it and moves on.

/// Signature shared by all validators.
pub type Validator = fn(&str) -> bool;

fn digits(text: &str) -> Vec<u32> {
    text.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Luhn checksum over the digits of `text` (separators ignored).
///
/// Doubles every second digit from the right, subtracts 9 from results above 9 and
/// accepts when the sum is a multiple of 10.
///
/// # Examples
///
/// ```
/// use docveil::patterns::validators::luhn;
///
/// assert!(luhn("4111 1111 1111 1111"));
/// assert!(!luhn("4111 1111 1111 1112"));
/// ```
pub fn luhn(text: &str) -> bool {
    let digits = digits(text);
    if digits.len() < 2 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Payment card number: 13 to 19 digits passing the Luhn check.
pub fn payment_card(text: &str) -> bool {
    let len = digits(text).len();
    (13..=19).contains(&len) && luhn(text)
}

/// US Social Security Number structure.
///
/// Rejects area 000, 666 and 900-999, group 00 and serial 0000.
pub fn us_ssn(text: &str) -> bool {
    let d = digits(text);
    if d.len() != 9 {
        return false;
    }
    let area = d[0] * 100 + d[1] * 10 + d[2];
    let group = d[3] * 10 + d[4];
    let serial = d[5] * 1000 + d[6] * 100 + d[7] * 10 + d[8];
    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}

/// IBAN check (ISO 13616, mod 97 == 1).
pub fn iban(text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if !(15..=34).contains(&compact.len()) || !compact.is_ascii() {
        return false;
    }
    let (head, tail) = compact.split_at(4);
    if !head[..2].chars().all(|c| c.is_ascii_uppercase())
        || !head[2..].chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }

    let mut remainder: u32 = 0;
    for ch in tail.chars().chain(head.chars()) {
        let value = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            'A'..='Z' => ch as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}

/// IPv4 address outside the reserved ranges.
///
/// Rejects malformed octets and 0.0.0.0/8, 127.0.0.0/8 (loopback),
/// 169.254.0.0/16 (link-local) and 224.0.0.0 and above (multicast, reserved,
/// broadcast). Private ranges are kept: they still identify a network.
pub fn public_ipv4(text: &str) -> bool {
    let mut octets = [0u8; 4];
    let mut count = 0;
    for part in text.split('.') {
        if count == 4 || part.is_empty() || part.len() > 3 {
            return false;
        }
        if part.len() > 1 && part.starts_with('0') {
            return false;
        }
        match part.parse::<u8>() {
            Ok(value) => octets[count] = value,
            Err(_) => return false,
        }
        count += 1;
    }
    if count != 4 {
        return false;
    }
    match octets {
        [0, ..] | [127, ..] | [169, 254, ..] => false,
        [first, ..] if first >= 224 => false,
        _ => true,
    }
}

/// UK National Insurance number prefix rules.
pub fn uk_nino(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() != 9 || !compact.is_ascii() {
        return false;
    }
    let prefix = &compact[..2];
    !matches!(prefix, "BG" | "GB" | "NK" | "KN" | "TN" | "NT" | "ZZ")
}

/// Calendar plausibility for `dd/mm/yyyy` or `mm/dd/yyyy` dates.
pub fn plausible_date(text: &str) -> bool {
    let parts: Vec<u32> = text
        .split(['/', '.', '-'])
        .filter_map(|p| p.parse().ok())
        .collect();
    if parts.len() != 3 {
        return false;
    }
    let (a, b, year) = (parts[0], parts[1], parts[2]);
    let valid = |day: u32, month: u32| {
        let max_day = match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 => 29,
            _ => return false,
        };
        (1..=max_day).contains(&day)
    };
    (1900..=2100).contains(&year) && (valid(a, b) || valid(b, a))
}

/// Chinese resident identity number, ISO 7064 MOD 11-2 check character.
pub fn cn_resident_id(text: &str) -> bool {
    const WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];
    const CHECK: [char; 11] = ['1', '0', 'X', '9', '8', '7', '6', '5', '4', '3', '2'];

    let chars: Vec<char> = text.chars().collect();
    if chars.len() != 18 {
        return false;
    }
    let mut sum = 0;
    for (ch, weight) in chars[..17].iter().zip(WEIGHTS) {
        match ch.to_digit(10) {
            Some(d) => sum += d * weight,
            None => return false,
        }
    }
    chars[17].to_ascii_uppercase() == CHECK[(sum % 11) as usize]
}

/// Russian taxpayer number (INN), 10 or 12 digits with check digits.
pub fn ru_inn(text: &str) -> bool {
    fn check(d: &[u32], weights: &[u32]) -> u32 {
        let sum: u32 = d.iter().zip(weights).map(|(a, b)| a * b).sum();
        sum % 11 % 10
    }
    const W10: [u32; 9] = [2, 4, 10, 3, 5, 9, 4, 6, 8];
    const W11: [u32; 10] = [7, 2, 4, 10, 3, 5, 9, 4, 6, 8];
    const W12: [u32; 11] = [3, 7, 2, 4, 10, 3, 5, 9, 4, 6, 8];

    if !text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let d = digits(text);
    match d.len() {
        10 => check(&d, &W10) == d[9],
        12 => check(&d, &W11) == d[10] && check(&d, &W12) == d[11],
        _ => false,
    }
}

/// Japanese domestic phone number: 10 digits (landline) or 11 (mobile and IP),
/// trunk prefix 0 followed by a non-zero digit.
pub fn jp_phone(text: &str) -> bool {
    let d = digits(text);
    matches!(d.len(), 10 | 11) && d[0] == 0 && d[1] != 0
}

/// Korean resident registration number check digit.
pub fn kr_rrn(text: &str) -> bool {
    const WEIGHTS: [u32; 12] = [2, 3, 4, 5, 6, 7, 8, 9, 2, 3, 4, 5];
    let d = digits(text);
    if d.len() != 13 {
        return false;
    }
    let sum: u32 = d.iter().zip(WEIGHTS).map(|(a, b)| a * b).sum();
    (11 - sum % 11) % 10 == d[12]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn_known_numbers() {
        assert!(luhn("4111111111111111"));
        assert!(luhn("5500 0000 0000 0004"));
        assert!(luhn("3782-822463-10005"));
        assert!(luhn("79927398713"));
        assert!(!luhn("79927398710"));
        assert!(!luhn("1"));
    }

    #[test]
    fn test_payment_card_length() {
        assert!(payment_card("4111 1111 1111 1111"));
        // Luhn-valid but too short for a card
        assert!(!payment_card("79927398713"));
    }

    #[test]
    fn test_ssn_rules() {
        assert!(us_ssn("123-45-6789"));
        assert!(!us_ssn("000-12-3456"));
        assert!(!us_ssn("666-12-3456"));
        assert!(!us_ssn("912-12-3456"));
        assert!(!us_ssn("123-00-4567"));
        assert!(!us_ssn("123-45-0000"));
        assert!(!us_ssn("123-45-678"));
    }

    #[test]
    fn test_iban() {
        assert!(iban("GB82 WEST 1234 5698 7654 32"));
        assert!(iban("DE89370400440532013000"));
        assert!(!iban("GB82 WEST 1234 5698 7654 33"));
        assert!(!iban("GB82"));
    }

    #[test]
    fn test_public_ipv4() {
        assert!(public_ipv4("8.8.8.8"));
        assert!(public_ipv4("192.168.1.20"));
        assert!(!public_ipv4("127.0.0.1"));
        assert!(!public_ipv4("0.1.2.3"));
        assert!(!public_ipv4("169.254.10.1"));
        assert!(!public_ipv4("239.1.1.1"));
        assert!(!public_ipv4("255.255.255.255"));
        assert!(!public_ipv4("256.1.1.1"));
        assert!(!public_ipv4("01.2.3.4"));
        assert!(!public_ipv4("1.2.3"));
    }

    #[test]
    fn test_uk_nino() {
        assert!(uk_nino("AB 12 34 56 C"));
        assert!(!uk_nino("GB123456A"));
    }

    #[test]
    fn test_plausible_date() {
        assert!(plausible_date("31/12/1980"));
        assert!(plausible_date("12/31/1980"));
        assert!(!plausible_date("31/31/1980"));
        assert!(!plausible_date("30/02/1850"));
    }

    #[test]
    fn test_cn_resident_id() {
        assert!(cn_resident_id("11010519491231002X"));
        assert!(cn_resident_id("11010519491231002x"));
        assert!(!cn_resident_id("110105194912310021"));
        assert!(!cn_resident_id("1101051949123100"));
    }

    #[test]
    fn test_ru_inn() {
        assert!(ru_inn("7707083893"));
        assert!(ru_inn("500100732259"));
        assert!(!ru_inn("7707083894"));
        assert!(!ru_inn("12345"));
    }

    #[test]
    fn test_jp_phone() {
        assert!(jp_phone("03-1234-5678"));
        assert!(jp_phone("090-1234-5678"));
        assert!(!jp_phone("000-12-3456"));
        assert!(!jp_phone("03-123-456"));
    }

    #[test]
    fn test_kr_rrn() {
        // 900101-123456?: sum = 2*9+3*0+4*0+5*1+6*0+7*1+8*1+9*2+2*3+3*4+4*5+5*6 = 124
        // check = (11 - 124 % 11) % 10 = (11 - 3) % 10 = 8
        assert!(kr_rrn("900101-1234568"));
        assert!(!kr_rrn("900101-1234567"));
    }
}
