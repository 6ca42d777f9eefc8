//! Media ranges, quality values and `Accept` header formatting.
//!
//! This is the slice of the header catalog the client core needs for content
//! negotiation: just enough to build an `Accept` header from an ordered list
//! of media ranges with optional quality values, round-tripping the wire
//! representation exactly.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A media range such as `application/json`, `text/*` or `*/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRange {
    main: String,
    sub: String,
}

impl MediaRange {
    /// Build a media range from its two components.
    pub fn new(main: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            sub: sub.into(),
        }
    }

    /// The main type (`application`, `text`, `*`).
    pub fn main_type(&self) -> &str {
        &self.main
    }

    /// The subtype (`json`, `*`).
    pub fn subtype(&self) -> &str {
        &self.sub
    }

    /// Whether `other` (a concrete media type) falls within this range.
    ///
    /// Comparison is case-insensitive; `*` matches anything on its side.
    pub fn matches(&self, other: &MediaRange) -> bool {
        (self.main == "*" || self.main.eq_ignore_ascii_case(&other.main))
            && (self.sub == "*" || self.sub.eq_ignore_ascii_case(&other.sub))
    }
}

impl fmt::Display for MediaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main, self.sub)
    }
}

impl FromStr for MediaRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let (main, sub) = s
            .split_once('/')
            .ok_or_else(|| Error::decode(format!("invalid media range: {s:?}")))?;
        if main.is_empty() || sub.is_empty() || sub.contains('/') {
            return Err(Error::decode(format!("invalid media range: {s:?}")));
        }
        Ok(MediaRange::new(main, sub))
    }
}

/// A quality value in thousandths, `0` through `1000` (`q=0` .. `q=1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QValue(u16);

impl QValue {
    /// The maximum quality, `q=1`.
    pub const ONE: QValue = QValue(1000);

    /// Build a quality value from thousandths. Fails above `1000`.
    pub fn from_thousandths(value: u16) -> Result<Self, Error> {
        if value > 1000 {
            return Err(Error::decode(format!("quality value out of range: {value}")));
        }
        Ok(QValue(value))
    }

    /// The value in thousandths.
    pub fn thousandths(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for QValue {
    /// Renders without trailing zeros: `1`, `0.5`, `0.053`, `0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 1000 {
            return write!(f, "1");
        }
        if self.0 == 0 {
            return write!(f, "0");
        }
        let mut frac = format!("{:03}", self.0);
        while frac.ends_with('0') {
            frac.pop();
        }
        write!(f, "0.{}", frac)
    }
}

impl FromStr for QValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::decode(format!("invalid quality value: {s:?}"));
        let (int, frac) = match s.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (s, ""),
        };
        if frac.len() > 3
            || !frac.bytes().all(|b| b.is_ascii_digit())
            || (int != "0" && int != "1")
        {
            return Err(invalid());
        }
        let mut thousandths: u16 = if int == "1" { 1000 } else { 0 };
        if !frac.is_empty() {
            let digits: u16 = frac.parse().map_err(|_| invalid())?;
            thousandths += digits * 10u16.pow(3 - frac.len() as u32);
        }
        QValue::from_thousandths(thousandths).map_err(|_| invalid())
    }
}

/// Render an `Accept` header value from an ordered list of media ranges with
/// optional quality values.
///
/// Order is preserved exactly; ranges without a quality value carry no
/// `;q=` parameter.
pub fn accept_value(ranges: &[(MediaRange, Option<QValue>)]) -> String {
    let mut out = String::new();
    for (i, (range, q)) in ranges.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&range.to_string());
        if let Some(q) = q {
            out.push_str(";q=");
            out.push_str(&q.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_range_display_parse_round_trip() {
        for s in ["application/json", "text/*", "*/*", "application/xhtml+xml"] {
            let range: MediaRange = s.parse().unwrap();
            assert_eq!(range.to_string(), s);
        }
    }

    #[test]
    fn test_media_range_rejects_garbage() {
        assert!("application".parse::<MediaRange>().is_err());
        assert!("/json".parse::<MediaRange>().is_err());
        assert!("a/b/c".parse::<MediaRange>().is_err());
    }

    #[test]
    fn test_media_range_matching() {
        let any: MediaRange = "*/*".parse().unwrap();
        let text: MediaRange = "text/*".parse().unwrap();
        let plain: MediaRange = "text/plain".parse().unwrap();
        let json: MediaRange = "application/json".parse().unwrap();

        assert!(any.matches(&plain));
        assert!(text.matches(&plain));
        assert!(!text.matches(&json));
        assert!(plain.matches(&MediaRange::new("Text", "Plain")));
        assert!(!plain.matches(&text));
    }

    #[test]
    fn test_qvalue_display() {
        assert_eq!(QValue::ONE.to_string(), "1");
        assert_eq!(QValue::from_thousandths(500).unwrap().to_string(), "0.5");
        assert_eq!(QValue::from_thousandths(53).unwrap().to_string(), "0.053");
        assert_eq!(QValue::from_thousandths(0).unwrap().to_string(), "0");
    }

    #[test]
    fn test_qvalue_parse() {
        assert_eq!("1".parse::<QValue>().unwrap(), QValue::ONE);
        assert_eq!("0.5".parse::<QValue>().unwrap().thousandths(), 500);
        assert_eq!("0.053".parse::<QValue>().unwrap().thousandths(), 53);
        assert!("1.5".parse::<QValue>().is_err());
        assert!("0.0001".parse::<QValue>().is_err());
        assert!("2".parse::<QValue>().is_err());
        // u16's FromStr tolerates a sign; the fraction must not.
        assert!("0.+5".parse::<QValue>().is_err());
        assert!("0.-5".parse::<QValue>().is_err());
    }

    #[test]
    fn test_accept_value_preserves_order_and_q() {
        let ranges = vec![
            ("application/json".parse().unwrap(), None),
            ("text/*".parse().unwrap(), Some(QValue::from_thousandths(800).unwrap())),
            ("*/*".parse().unwrap(), Some(QValue::from_thousandths(100).unwrap())),
        ];
        assert_eq!(
            accept_value(&ranges),
            "application/json, text/*;q=0.8, */*;q=0.1"
        );
    }
}
