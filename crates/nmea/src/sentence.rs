//! Sentence classification.
//!
//! A sentence is identified by the two characters following its formatter's first letter
//! (`$GPGGA` is looked up as `GA`), then validated against the full prefix in the same pass
//! that computes the checksum and inspects the field that tells whether the receiver had a
//! fix.

/// Sentence types the classifier knows. Each one owns a distinct bit of [`Classification`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Gga = 0x02,
    Rmc = 0x04,
    Gsa = 0x08,
    Gsv = 0x10,
    Gll = 0x20,
    Vtg = 0x40,
    Zda = 0x80,
}

impl Kind {
    const ALL: [Kind; 7] = [
        Kind::Gga,
        Kind::Rmc,
        Kind::Gsa,
        Kind::Gsv,
        Kind::Gll,
        Kind::Vtg,
        Kind::Zda,
    ];
}

/// Kind bits plus [`Classification::VALID`]. Zero means unrecognized or corrupt.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification(u8);

impl Classification {
    pub const UNRECOGNIZED: Self = Self(0);
    pub const VALID: u8 = 0x01;

    pub const fn new(kind: Kind, valid: bool) -> Self {
        Self(kind as u8 | if valid { Self::VALID } else { 0 })
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> Option<Kind> {
        Kind::ALL.into_iter().find(|&k| self.contains(k))
    }

    pub const fn contains(self, kind: Kind) -> bool {
        self.0 & kind as u8 != 0
    }

    pub const fn is_recognized(self) -> bool {
        self.0 != 0
    }

    pub const fn is_valid(self) -> bool {
        self.0 & Self::VALID != 0
    }
}

/// How the validity field is compared against its token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expect {
    /// Valid when the field equals the token.
    Equal,
    /// Valid when the field differs from the token.
    NotEqual,
}

/// XOR of `body`, the bytes between `$` and `*`.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, c| acc ^ c)
}

pub(crate) const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(0x0a + c - b'A'),
        b'a'..=b'f' => Some(0x0a + c - b'a'),
        _ => None,
    }
}

pub(crate) fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    Some(hex_digit(hi)? << 4 | hex_digit(lo)?)
}

/// Validates `sentence` as a `kind` sentence.
///
/// The sentence must start with `prefix` (including the `$`). `field` is the 1-based index of
/// the comma separated field holding the validity token, `0` skips the check. A sentence that
/// ends before that field is invalid either way.
///
/// When the sentence carries a `*` followed by two hex digits and they don't match the XOR of
/// everything between `$` and `*`, the sentence is [`Classification::UNRECOGNIZED`] whatever
/// its validity field says.
pub fn check_sentence(
    sentence: &[u8],
    kind: Kind,
    prefix: &[u8],
    field: u8,
    token: &[u8],
    expect: Expect,
) -> Classification {
    if sentence.len() < prefix.len() {
        return Classification::UNRECOGNIZED;
    }

    let mut sum = 0;
    let mut star = None;
    let mut current = 0_u8;
    let mut pos = 0;
    let mut mismatch = false;

    for (i, &c) in sentence.iter().enumerate() {
        if prefix.get(i).is_some_and(|&p| p != c) {
            return Classification::UNRECOGNIZED;
        }
        match c {
            b'*' => {
                star = Some(i);
                break;
            }
            b'\r' | b'\n' | 0 => break,
            _ => {}
        }
        if i > 0 {
            sum ^= c;
        }

        if field == 0 {
            continue;
        }
        if c == b',' {
            if current == field && pos != token.len() {
                mismatch = true;
            }
            current = current.saturating_add(1);
            pos = 0;
        } else if current == field {
            if token.get(pos) != Some(&c) {
                mismatch = true;
            }
            pos += 1;
        }
    }
    let truncated = current < field;
    if current == field && pos != token.len() {
        mismatch = true;
    }

    if let Some(star) = star {
        if let Some(&[hi, lo]) = sentence.get(star + 1..star + 3) {
            if hex_byte(hi, lo).is_some_and(|expected| expected != sum) {
                return Classification::UNRECOGNIZED;
            }
        }
    }

    let valid = match expect {
        _ if field == 0 => true,
        _ if truncated => false,
        Expect::Equal => !mismatch,
        Expect::NotEqual => mismatch,
    };
    Classification::new(kind, valid)
}

struct Rule {
    key: [u8; 2],
    kind: Kind,
    prefix: &'static [u8],
    field: u8,
    token: &'static [u8],
    expect: Expect,
}

impl Rule {
    const fn new(
        kind: Kind,
        prefix: &'static [u8],
        field: u8,
        token: &'static [u8],
        expect: Expect,
    ) -> Self {
        Self {
            key: [prefix[4], prefix[5]],
            kind,
            prefix,
            field,
            token,
            expect,
        }
    }
}

/// Dispatch table, keyed by bytes 4 and 5 of the sentence.
const RULES: [Rule; 7] = [
    // fix quality 0 is "no fix"
    Rule::new(Kind::Gga, b"$GPGGA,", 6, b"0", Expect::NotEqual),
    Rule::new(Kind::Rmc, b"$GPRMC,", 2, b"A", Expect::Equal),
    // mode 1 is "no fix"
    Rule::new(Kind::Gsa, b"$GPGSA,", 2, b"1", Expect::NotEqual),
    Rule::new(Kind::Gll, b"$GPGLL,", 6, b"A", Expect::Equal),
    Rule::new(Kind::Gsv, b"$GPGSV,", 0, b"", Expect::Equal),
    Rule::new(Kind::Vtg, b"$GPVTG,", 0, b"", Expect::Equal),
    Rule::new(Kind::Zda, b"$GPZDA,", 0, b"", Expect::Equal),
];

/// Classifies a framed sentence. Anything not in the dispatch table is unrecognized.
pub fn classify(sentence: &[u8]) -> Classification {
    let Some(key) = sentence.get(4..6) else {
        return Classification::UNRECOGNIZED;
    };
    RULES
        .iter()
        .find(|rule| rule.key == key)
        .map_or(Classification::UNRECOGNIZED, |rule| {
            check_sentence(
                sentence,
                rule.kind,
                rule.prefix,
                rule.field,
                rule.token,
                rule.expect,
            )
        })
}
